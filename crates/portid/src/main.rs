//! # portid
//!
//! ```bash
//! portid init
//! portid key seed seed
//! portid pairwise seed did:example:alice did:example:bob --save bob
//! portid jws sign bob '{"nonce":"42"}' > token.jws
//! portid key export bob > bob.jwk
//! portid jws verify - --key bob.jwk < token.jws
//! ```
//!
//! Exit status: 0 on success, 1 when `jws verify` rejects a token, 2 on
//! any error.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

use std::path::Path;

use clap::Parser;
use portid::cli::commands::exit_codes::{EXIT_ERROR, EXIT_SUCCESS, EXIT_VERIFY_FAILED};
use portid::cli::commands::{
    read_argument, read_jwk, InitCommand, JwsSignCommand, JwsVerifyCommand, KeyExportCommand,
    KeyGenerateCommand, KeyListCommand, KeySeedCommand, PairwiseCommand,
};
use portid::cli::{
    Cli, CommandContext, CommandError, Commands, JwsCommands, JwsVerifyArgs, KeyCommands,
};
use portid::logging::{init_logging, verbosity_to_level, LogConfig, LogError, LogGuard};
use portid_core::config::Config;
use portid_crypto::CryptoOperations;

fn setup_logging(cli: &Cli) -> Result<LogGuard, LogError> {
    init_logging(&LogConfig {
        level: verbosity_to_level(cli.verbose),
        format: cli.log_format,
        file_path: cli.log_file.clone(),
    })
}

fn main() {
    let cli = Cli::parse();

    let guard = match setup_logging(&cli) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            std::process::exit(EXIT_ERROR);
        }
    };

    let code = match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            EXIT_ERROR
        }
    };
    // `process::exit` skips destructors; flush the log file first.
    drop(guard);
    std::process::exit(code);
}

fn run(cli: Cli) -> Result<i32, CommandError> {
    let explicit = cli.config.as_deref();
    match cli.command {
        Commands::Init { force } => {
            let path = CommandContext::resolve_config_path(explicit)?;
            println!("{}", InitCommand::new(force).run(&path)?);
            Ok(EXIT_SUCCESS)
        }
        Commands::Jws {
            command: JwsCommands::Verify(args),
        } => verify(&CommandContext::load(explicit)?, args),
        Commands::Jws {
            command: JwsCommands::Sign(args),
        } => with_store(explicit, |ops, config| {
            JwsSignCommand {
                reference: args.reference,
                payload: read_argument(&args.payload)?.into_bytes(),
                format: args.format,
                kid: args.kid,
            }
            .run(ops, config)
        }),
        Commands::Pairwise(args) => with_store(explicit, |ops, config| {
            PairwiseCommand {
                seed: args.seed,
                persona: args.persona,
                peer: args.peer,
                save: args.save,
            }
            .run(ops, config)
        }),
        Commands::Key {
            command: KeyCommands::List,
        } => {
            let ctx = CommandContext::load(explicit)?;
            println!("{}", KeyListCommand.run(&ctx.list_keys()?));
            Ok(EXIT_SUCCESS)
        }
        Commands::Key { command } => with_store(explicit, |ops, config| match command {
            KeyCommands::Generate(args) => KeyGenerateCommand {
                reference: args.reference,
                alg: args.alg,
            }
            .run(ops, config),
            KeyCommands::Seed(args) => KeySeedCommand {
                reference: args.reference,
                force: args.force,
            }
            .run(ops),
            KeyCommands::List => Ok(KeyListCommand.run(&ops.store().list()?)),
            KeyCommands::Export(args) => KeyExportCommand {
                reference: args.reference,
                private: args.private,
            }
            .run(ops),
        }),
    }
}

/// Opens the configured key store, runs `command`, and prints its output.
fn with_store(
    explicit: Option<&Path>,
    command: impl FnOnce(&CryptoOperations, &Config) -> Result<String, CommandError>,
) -> Result<i32, CommandError> {
    let ctx = CommandContext::load(explicit)?;
    let ops = ctx.open_operations()?;
    println!("{}", command(&ops, ctx.config())?);
    Ok(EXIT_SUCCESS)
}

fn verify(ctx: &CommandContext, args: JwsVerifyArgs) -> Result<i32, CommandError> {
    let keys = args
        .keys
        .iter()
        .map(|path| read_jwk(path))
        .collect::<Result<Vec<_>, _>>()?;

    let valid = JwsVerifyCommand {
        token: read_argument(&args.token)?.trim().to_string(),
        keys,
        options: ctx.verify_options(args.all, args.allow_first_candidate),
    }
    .run(&CryptoOperations::in_memory())?;

    if valid {
        println!("valid");
        Ok(EXIT_SUCCESS)
    } else {
        println!("invalid");
        Ok(EXIT_VERIFY_FAILED)
    }
}
