//! Pairwise derivation vectors and properties.

#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use portid_core::algorithm::{Algorithm, HashAlgorithm};
use portid_core::error::{CryptoError, PairwiseKeyError};
use portid_core::jwk::JsonWebKey;
use portid_crypto::{CryptoOperations, KeySource};
use proptest::prelude::*;

const MASTER_KEY_VECTOR: &str =
    "h-Z5gO1eBjY1EYXh64-f8qQF5ojeh1KVMKxmd0JI3YKScTOYjVm-h1j2pUNV8q6s8yphAR4lk5yXYiQhAOVlUw";

fn ops_with_seed(seed: &[u8]) -> CryptoOperations {
    let ops = CryptoOperations::in_memory();
    ops.import_jwk(
        "seed",
        &JsonWebKey::oct(seed),
        &Algorithm::hmac(HashAlgorithm::Sha512),
    )
    .unwrap();
    ops
}

fn private_scalar(ops: &CryptoOperations, persona: &str, peer: &str) -> Vec<u8> {
    let pair = ops
        .generate_pairwise(&Algorithm::es256k(), "seed", persona, peer)
        .unwrap();
    pair.private_key.raw_bytes().unwrap().to_vec()
}

// ============================================================================
// Master key
// ============================================================================

#[test]
fn test_master_key_vector() {
    let ops = ops_with_seed(b"abcdefg");
    let master = ops.pairwise().master_key(&ops, "seed", "persona").unwrap();
    assert_eq!(URL_SAFE_NO_PAD.encode(master.as_slice()), MASTER_KEY_VECTOR);
}

#[test]
fn test_master_key_differs_per_persona() {
    let ops = ops_with_seed(b"abcdefg");
    let master = ops.pairwise().master_key(&ops, "seed", "persona1").unwrap();
    assert_ne!(URL_SAFE_NO_PAD.encode(master.as_slice()), MASTER_KEY_VECTOR);
}

#[test]
fn test_master_key_cache_survives_seed_overwrite() {
    let ops = ops_with_seed(b"abcdefg");
    let before = ops.pairwise().master_key(&ops, "seed", "persona").unwrap();

    ops.import_jwk(
        "seed",
        &JsonWebKey::oct(b"other seed"),
        &Algorithm::hmac(HashAlgorithm::Sha512),
    )
    .unwrap();
    let cached = ops.pairwise().master_key(&ops, "seed", "persona").unwrap();
    assert_eq!(before.as_slice(), cached.as_slice());

    ops.pairwise().clear_cache();
    let fresh = ops.pairwise().master_key(&ops, "seed", "persona").unwrap();
    assert_ne!(before.as_slice(), fresh.as_slice());
}

// ============================================================================
// Pairwise keys
// ============================================================================

#[test]
fn test_deterministic_across_instances() {
    let first = ops_with_seed(b"abcdefg");
    let second = ops_with_seed(b"abcdefg");

    assert_eq!(
        private_scalar(&first, "did:persona:1", "did:peer:1"),
        private_scalar(&second, "did:persona:1", "did:peer:1")
    );
}

#[test]
fn test_fifty_peers_give_fifty_keys() {
    let ops = ops_with_seed(b"abcdefg");
    let scalars: HashSet<Vec<u8>> = (0..50)
        .map(|i| private_scalar(&ops, "did:persona:1", &format!("did:peer:1-peer-{i}")))
        .collect();
    assert_eq!(scalars.len(), 50);
}

#[test]
fn test_persona_changes_key() {
    let ops = ops_with_seed(b"abcdefg");
    assert_ne!(
        private_scalar(&ops, "did:persona:1", "did:peer:1"),
        private_scalar(&ops, "did:persona:2", "did:peer:1")
    );
}

#[test]
fn test_secp256r1_is_rejected() {
    let ops = ops_with_seed(b"abcdefg");
    let p256 = Algorithm::Ecdsa {
        named_curve: "secp256r1".to_string(),
        hash: HashAlgorithm::Sha256,
    };
    let err = ops
        .generate_pairwise(&p256, "seed", "did:persona:1", "did:peer:1")
        .unwrap_err();
    assert!(matches!(
        err,
        CryptoError::Pairwise(PairwiseKeyError::UnsupportedAlgorithm { .. })
    ));
    assert!(err.to_string().contains("secp256r1"));
}

#[test]
fn test_pairwise_keys_sign() {
    let ops = ops_with_seed(b"abcdefg");
    let pair = ops
        .generate_pairwise(&Algorithm::es256k(), "seed", "did:persona:1", "did:peer:1")
        .unwrap();
    let signature = ops
        .sign_with_key(b"payload", &pair.private_key, &Algorithm::es256k())
        .unwrap();
    assert!(ops
        .verify(
            b"payload",
            &signature,
            KeySource::Key(&pair.public_key),
            &Algorithm::es256k()
        )
        .unwrap());
}

#[test]
fn test_concurrent_same_persona() {
    let ops = Arc::new(ops_with_seed(b"abcdefg"));
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let ops = Arc::clone(&ops);
            thread::spawn(move || private_scalar(&ops, "did:persona:1", "did:peer:1"))
        })
        .collect();

    let results: HashSet<Vec<u8>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(results.len(), 1);
    assert_eq!(ops.pairwise().cached_personas(), 1);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_derivation_is_deterministic(
        seed in proptest::collection::vec(any::<u8>(), 1..64),
        persona in "[a-z:0-9]{1,24}",
        peer in "[a-z:0-9]{1,24}",
    ) {
        let first = ops_with_seed(&seed);
        let second = ops_with_seed(&seed);
        prop_assert_eq!(
            private_scalar(&first, &persona, &peer),
            private_scalar(&second, &persona, &peer)
        );
    }
}
