//! # portid-jose
//!
//! JSON Web Signatures over the portid crypto core.
//!
//! ## Modules
//!
//! - [`algorithms`] - JWA names and their algorithm descriptors
//! - [`jws`] - `JwsToken`: sign, verify, and the three RFC 7515 serializations
//!
//! ## Example
//!
//! ```rust
//! use portid_core::config::JwsFormat;
//! use portid_core::Algorithm;
//! use portid_crypto::CryptoOperations;
//! use portid_jose::{Header, JwsToken, VerifyOptions};
//!
//! let ops = CryptoOperations::in_memory();
//! let public = ops.generate_key_pair("key-1", &Algorithm::es256k()).expect("generate");
//!
//! let mut token = JwsToken::new(br#"{"sub":"did:example:123"}"#);
//! token.sign(&ops, "key-1", &Header::new()).expect("sign");
//!
//! let compact = token.serialize(JwsFormat::Compact).expect("one signature");
//! let parsed = JwsToken::deserialize(&compact).expect("compact");
//! assert!(parsed.verify(&ops, &[public], VerifyOptions::default()));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod algorithms;
pub mod jws;

pub use algorithms::{from_jwa, to_jwa};
pub use jws::{Header, JwsSignature, JwsToken, VerifyOptions};
