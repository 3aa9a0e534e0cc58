//! Fuzz target for JWS deserialization.
//!
//! Feeds arbitrary strings through format detection and the compact, flat
//! and general JSON parsers, then re-serializes whatever parsed.
//!
//! # Running
//!
//! ```bash
//! cargo +nightly fuzz run jws_deserialize
//! ```

#![no_main]

use libfuzzer_sys::fuzz_target;
use portid_core::config::JwsFormat;
use portid_jose::JwsToken;

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };

    let Ok(token) = JwsToken::deserialize(input) else {
        return;
    };

    let _ = token.payload();
    for signature in token.signatures() {
        let _ = signature.protected_header();
    }

    // General serialization accepts any number of signatures.
    if let Ok(general) = token.serialize(JwsFormat::General) {
        assert!(JwsToken::deserialize(&general).is_ok());
    }
    let _ = token.serialize(JwsFormat::Compact);
});
