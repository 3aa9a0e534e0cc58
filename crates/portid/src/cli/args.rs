//! # CLI Arguments
//!
//! - `portid init [--force]`
//! - `portid key generate <REF> [--alg ALG]`
//! - `portid key seed <REF> [--force]`
//! - `portid key list`
//! - `portid key export <REF> [--private]`
//! - `portid pairwise <SEED_REF> <PERSONA> <PEER> [--save REF]`
//! - `portid jws sign <REF> <PAYLOAD> [--format FORMAT] [--kid KID]`
//! - `portid jws verify <TOKEN> [--key FILE]... [--all] [--allow-first-candidate]`
//!
//! Global options: `-v` (repeatable), `-c, --config <PATH>`,
//! `--log-format <pretty|json|compact>` and `--log-file <PATH>`.

use std::fmt;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use portid_core::algorithm::{Algorithm, HashAlgorithm};
use portid_core::config::JwsFormat;

use crate::logging::LogFormat;

/// Client-side DID key management and JWS signing.
#[derive(Debug, Parser)]
#[command(name = "portid")]
#[command(author, version, about = "Client-side DID key management and JWS signing")]
#[command(propagate_version = true)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Increase verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to config file (default: ~/.portid/config.toml)
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log output format on stderr and in the log file
    #[arg(
        long,
        global = true,
        value_enum,
        default_value_t = LogFormat::Compact,
        value_name = "FORMAT"
    )]
    pub log_format: LogFormat,

    /// Also write logs to a daily-rolling file (PATH.YYYY-MM-DD)
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Write the default configuration and create the key directory
    Init {
        /// Overwrite an existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Key management
    Key {
        /// Key command to execute
        #[command(subcommand)]
        command: KeyCommands,
    },

    /// Derive the pairwise key for a persona and peer
    Pairwise(PairwiseArgs),

    /// Sign and verify JSON Web Signatures
    Jws {
        /// JWS command to execute
        #[command(subcommand)]
        command: JwsCommands,
    },
}

/// Key management commands.
#[derive(Debug, Subcommand)]
pub enum KeyCommands {
    /// Generate a key pair (or HMAC secret) and print its public JWK
    Generate(KeyGenerateArgs),

    /// Generate a random pairwise seed
    Seed(KeySeedArgs),

    /// List stored references and their key ids
    List,

    /// Print a stored key as JWK
    Export(KeyExportArgs),
}

/// Arguments for `key generate`.
#[derive(Debug, Clone, Args)]
pub struct KeyGenerateArgs {
    /// Reference to store the key under; also used as its kid
    #[arg(value_name = "REF")]
    pub reference: String,

    /// Key algorithm
    #[arg(short, long, value_enum, default_value_t = KeyAlgorithmArg::Es256k)]
    pub alg: KeyAlgorithmArg,
}

/// Arguments for `key seed`.
#[derive(Debug, Clone, Args)]
pub struct KeySeedArgs {
    /// Reference to store the seed under
    #[arg(value_name = "REF")]
    pub reference: String,

    /// Replace an existing seed, changing every pairwise key derived from it
    #[arg(long)]
    pub force: bool,
}

/// Arguments for `key export`.
#[derive(Debug, Clone, Args)]
pub struct KeyExportArgs {
    /// Reference of the key to export
    #[arg(value_name = "REF")]
    pub reference: String,

    /// Include private members (refused for non-extractable keys)
    #[arg(long)]
    pub private: bool,
}

/// Arguments for `pairwise`.
#[derive(Debug, Clone, Args)]
pub struct PairwiseArgs {
    /// Reference of the stored seed
    #[arg(value_name = "SEED_REF")]
    pub seed: String,

    /// Persona identifier (typically the user's DID)
    #[arg(value_name = "PERSONA")]
    pub persona: String,

    /// Peer identifier (typically the relying party's DID)
    #[arg(value_name = "PEER")]
    pub peer: String,

    /// Also store the derived pair under this reference
    #[arg(long, value_name = "REF")]
    pub save: Option<String>,
}

/// JWS commands.
#[derive(Debug, Subcommand)]
pub enum JwsCommands {
    /// Sign a payload with a stored key
    Sign(JwsSignArgs),

    /// Verify a token; exits with status 1 when it does not verify
    Verify(JwsVerifyArgs),
}

/// Arguments for `jws sign`.
#[derive(Debug, Clone, Args)]
pub struct JwsSignArgs {
    /// Reference of the signing key
    #[arg(value_name = "REF")]
    pub reference: String,

    /// Payload text, or `-` to read stdin
    #[arg(value_name = "PAYLOAD")]
    pub payload: String,

    /// Output format (default from config: compact)
    #[arg(short, long, value_name = "FORMAT")]
    pub format: Option<JwsFormat>,

    /// Key id to put in the protected header instead of the key's own
    #[arg(long, value_name = "KID")]
    pub kid: Option<String>,
}

/// Arguments for `jws verify`.
#[derive(Debug, Clone, Args)]
pub struct JwsVerifyArgs {
    /// Token in any serialization, or `-` to read stdin
    #[arg(value_name = "TOKEN")]
    pub token: String,

    /// Public JWK file to verify against (repeatable)
    #[arg(short, long = "key", value_name = "FILE")]
    pub keys: Vec<PathBuf>,

    /// Require every signature to verify
    #[arg(long)]
    pub all: bool,

    /// Try the first key when no kid matches
    #[arg(long)]
    pub allow_first_candidate: bool,
}

/// Algorithms `key generate` accepts, by JWA name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum KeyAlgorithmArg {
    /// ECDSA on secp256k1 with SHA-256
    #[default]
    #[value(name = "ES256K")]
    Es256k,
    /// RSASSA-PKCS1-v1_5 with SHA-256
    #[value(name = "RS256")]
    Rs256,
    /// RSASSA-PKCS1-v1_5 with SHA-384
    #[value(name = "RS384")]
    Rs384,
    /// RSASSA-PKCS1-v1_5 with SHA-512
    #[value(name = "RS512")]
    Rs512,
    /// HMAC with SHA-256
    #[value(name = "HS256")]
    Hs256,
    /// HMAC with SHA-512
    #[value(name = "HS512")]
    Hs512,
}

impl KeyAlgorithmArg {
    /// Whether this produces a single secret key rather than a pair.
    #[must_use]
    pub const fn is_secret(self) -> bool {
        matches!(self, Self::Hs256 | Self::Hs512)
    }

    /// The algorithm descriptor, with `modulus_length` applied to RSA.
    #[must_use]
    pub fn to_algorithm(self, modulus_length: usize) -> Algorithm {
        let rsa = |hash| Algorithm::RsassaPkcs1V15 {
            modulus_length,
            hash,
        };
        match self {
            Self::Es256k => Algorithm::es256k(),
            Self::Rs256 => rsa(HashAlgorithm::Sha256),
            Self::Rs384 => rsa(HashAlgorithm::Sha384),
            Self::Rs512 => rsa(HashAlgorithm::Sha512),
            Self::Hs256 => Algorithm::hmac(HashAlgorithm::Sha256),
            Self::Hs512 => Algorithm::hmac(HashAlgorithm::Sha512),
        }
    }
}

impl fmt::Display for KeyAlgorithmArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Es256k => "ES256K",
            Self::Rs256 => "RS256",
            Self::Rs384 => "RS384",
            Self::Rs512 => "RS512",
            Self::Hs256 => "HS256",
            Self::Hs512 => "HS512",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap_or_else(|e| panic!("{args:?}: {e}"))
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_init() {
        let cli = parse(&["portid", "init", "--force"]);
        assert!(matches!(cli.command, Commands::Init { force: true }));
    }

    #[test]
    fn test_parse_key_generate_default_alg() {
        let cli = parse(&["portid", "key", "generate", "signing"]);
        match cli.command {
            Commands::Key {
                command: KeyCommands::Generate(args),
            } => {
                assert_eq!(args.reference, "signing");
                assert_eq!(args.alg, KeyAlgorithmArg::Es256k);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_parse_key_generate_rs384() {
        let cli = parse(&["portid", "key", "generate", "rsa", "--alg", "RS384"]);
        let Commands::Key {
            command: KeyCommands::Generate(args),
        } = cli.command
        else {
            panic!("expected key generate");
        };
        assert_eq!(args.alg, KeyAlgorithmArg::Rs384);
        assert_eq!(
            args.alg.to_algorithm(3072),
            Algorithm::RsassaPkcs1V15 {
                modulus_length: 3072,
                hash: HashAlgorithm::Sha384
            }
        );
    }

    #[test]
    fn test_parse_key_seed() {
        let cli = parse(&["portid", "key", "seed", "master"]);
        let Commands::Key {
            command: KeyCommands::Seed(args),
        } = cli.command
        else {
            panic!("expected key seed");
        };
        assert_eq!(args.reference, "master");
        assert!(!args.force);
    }

    #[test]
    fn test_parse_unknown_alg_fails() {
        assert!(Cli::try_parse_from(["portid", "key", "generate", "k", "--alg", "ES256"]).is_err());
    }

    #[test]
    fn test_parse_pairwise() {
        let cli = parse(&[
            "portid",
            "pairwise",
            "seed",
            "did:persona:1",
            "did:peer:1",
            "--save",
            "peer-1",
        ]);
        let Commands::Pairwise(args) = cli.command else {
            panic!("expected pairwise");
        };
        assert_eq!(args.seed, "seed");
        assert_eq!(args.persona, "did:persona:1");
        assert_eq!(args.peer, "did:peer:1");
        assert_eq!(args.save.as_deref(), Some("peer-1"));
    }

    #[test]
    fn test_parse_jws_sign_format() {
        let cli = parse(&["portid", "jws", "sign", "k", "hello", "--format", "general"]);
        let Commands::Jws {
            command: JwsCommands::Sign(args),
        } = cli.command
        else {
            panic!("expected jws sign");
        };
        assert_eq!(args.format, Some(JwsFormat::General));
        assert!(args.kid.is_none());

        assert!(Cli::try_parse_from(["portid", "jws", "sign", "k", "x", "-f", "xml"]).is_err());
    }

    #[test]
    fn test_parse_jws_verify_keys() {
        let cli = parse(&[
            "portid", "jws", "verify", "a.b.c", "--key", "one.json", "-k", "two.json", "--all",
        ]);
        let Commands::Jws {
            command: JwsCommands::Verify(args),
        } = cli.command
        else {
            panic!("expected jws verify");
        };
        assert_eq!(args.keys, [PathBuf::from("one.json"), PathBuf::from("two.json")]);
        assert!(args.all);
        assert!(!args.allow_first_candidate);
    }

    #[test]
    fn test_global_options() {
        let cli = parse(&["portid", "key", "list", "-vv", "-c", "/tmp/portid.toml"]);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/portid.toml")));
    }

    #[test]
    fn test_log_options() {
        let cli = parse(&["portid", "key", "list"]);
        assert_eq!(cli.log_format, LogFormat::Compact);
        assert_eq!(cli.log_file, None);

        let cli = parse(&[
            "portid",
            "--log-format",
            "json",
            "key",
            "list",
            "--log-file",
            "/var/log/portid.log",
        ]);
        assert_eq!(cli.log_format, LogFormat::Json);
        assert_eq!(cli.log_file, Some(PathBuf::from("/var/log/portid.log")));
    }

    #[test]
    fn test_key_algorithm_display_matches_value_names() {
        for alg in KeyAlgorithmArg::value_variants() {
            let value = alg.to_possible_value().unwrap();
            assert_eq!(value.get_name(), alg.to_string());
        }
        assert!(KeyAlgorithmArg::Hs512.is_secret());
        assert!(!KeyAlgorithmArg::Rs256.is_secret());
    }
}
