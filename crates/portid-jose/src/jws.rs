//! # JWS Token Engine
//!
//! Signing, verification, and the three RFC 7515 serializations.
//!
//! ## Wire Formats
//!
//! | Format | Shape | Signatures |
//! |--------|-------|------------|
//! | Compact | `protected.payload.signature` | exactly one |
//! | Flat JSON | `{payload, protected, header?, signature}` | exactly one |
//! | General JSON | `{payload, signatures: [{protected, header?, signature}]}` | any |
//!
//! ## Verification
//!
//! Verification never fails with an error. A signature whose key cannot be
//! resolved, whose header is malformed, or whose bytes do not match counts
//! as `false`; the per-signature results are then combined with OR (default)
//! or AND (`match_all`).
//!
//! Key resolution for one signature, in order:
//!
//! 1. the `kid` (protected header first) with any `did...#` prefix removed
//! 2. a public key stored under that id
//! 3. a candidate whose `kid` ends with that id
//! 4. with `allow_first_candidate_fallback` only, the first candidate

use std::collections::BTreeMap;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use portid_core::config::JwsFormat;
use portid_core::error::{CryptoError, JoseError};
use portid_crypto::{CryptoKey, CryptoOperations, KeySource};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::algorithms::{from_jwa, to_jwa};

/// JOSE header parameters as supplied by callers.
pub type Header = BTreeMap<String, String>;

// ============================================================================
// Types
// ============================================================================

/// One signature over the token payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwsSignature {
    /// Base64url of the protected header JSON.
    #[serde(default)]
    protected: String,
    /// Unprotected header parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    header: Option<Header>,
    /// Base64url of the raw signature.
    signature: String,
}

impl JwsSignature {
    /// The encoded protected header.
    #[must_use]
    pub fn protected_encoded(&self) -> &str {
        &self.protected
    }

    /// The unprotected header, if any.
    #[must_use]
    pub const fn unprotected_header(&self) -> Option<&Header> {
        self.header.as_ref()
    }

    /// The encoded signature value.
    #[must_use]
    pub fn signature_encoded(&self) -> &str {
        &self.signature
    }

    /// Decodes the protected header. An absent header decodes as empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the header is not base64url JSON object.
    pub fn protected_header(&self) -> Result<BTreeMap<String, Value>, JoseError> {
        if self.protected.is_empty() {
            return Ok(BTreeMap::new());
        }
        let json = URL_SAFE_NO_PAD.decode(&self.protected)?;
        Ok(serde_json::from_slice(&json)?)
    }

    /// Looks up a string parameter, protected header first.
    fn parameter(&self, protected: &BTreeMap<String, Value>, name: &str) -> Option<String> {
        protected
            .get(name)
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| self.header.as_ref().and_then(|h| h.get(name).cloned()))
    }
}

/// Options for [`JwsToken::verify`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VerifyOptions {
    /// Require every signature to verify instead of any.
    pub match_all: bool,
    /// Try the first candidate key when no `kid` matches.
    ///
    /// This accepts a signature from any candidate regardless of the `kid`
    /// it claims, so it stays off unless a peer is known to omit kids.
    pub allow_first_candidate_fallback: bool,
}

impl VerifyOptions {
    /// Requires every signature to verify.
    #[must_use]
    pub const fn match_all() -> Self {
        Self {
            match_all: true,
            allow_first_candidate_fallback: false,
        }
    }
}

/// A payload and the signatures accumulated over it.
///
/// The payload is fixed at construction. Signatures are only ever appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JwsToken {
    payload: String,
    signatures: Vec<JwsSignature>,
}

#[derive(Serialize, Deserialize)]
struct FlatJws {
    payload: String,
    #[serde(default)]
    protected: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    header: Option<Header>,
    signature: String,
}

#[derive(Serialize, Deserialize)]
struct GeneralJws {
    payload: String,
    signatures: Vec<JwsSignature>,
}

// ============================================================================
// Construction and signing
// ============================================================================

impl JwsToken {
    /// Creates an unsigned token over `payload`.
    #[must_use]
    pub fn new(payload: &[u8]) -> Self {
        Self {
            payload: URL_SAFE_NO_PAD.encode(payload),
            signatures: Vec::new(),
        }
    }

    /// The base64url payload.
    #[must_use]
    pub fn payload_encoded(&self) -> &str {
        &self.payload
    }

    /// The decoded payload.
    ///
    /// # Errors
    ///
    /// Returns [`JoseError::Base64`] for a payload that is not base64url.
    pub fn payload(&self) -> Result<Vec<u8>, JoseError> {
        Ok(URL_SAFE_NO_PAD.decode(&self.payload)?)
    }

    /// The signatures, in the order they were added.
    #[must_use]
    pub fn signatures(&self) -> &[JwsSignature] {
        &self.signatures
    }

    /// Signs with the key stored under `key_reference`, putting every
    /// parameter in the protected header.
    ///
    /// `alg` comes from `header["alg"]`, else from the key's algorithm;
    /// `kid` from `header["kid"]`, else from the key.
    ///
    /// # Errors
    ///
    /// - [`JoseError::MissingAlgorithm`] if neither names an algorithm
    /// - [`JoseError::Crypto`] for a missing key or a signing failure
    pub fn sign(
        &mut self,
        ops: &CryptoOperations,
        key_reference: &str,
        header: &Header,
    ) -> Result<(), JoseError> {
        self.sign_with_unprotected(ops, key_reference, header, None)
    }

    /// Like [`Self::sign`], also attaching an unprotected header.
    ///
    /// # Errors
    ///
    /// As [`Self::sign`].
    pub fn sign_with_unprotected(
        &mut self,
        ops: &CryptoOperations,
        key_reference: &str,
        header: &Header,
        unprotected: Option<Header>,
    ) -> Result<(), JoseError> {
        let key = ops
            .store()
            .get(key_reference, false)
            .map_err(CryptoError::from)?;

        let alg = header
            .get("alg")
            .cloned()
            .or_else(|| to_jwa(&key.algorithm).map(str::to_string))
            .ok_or(JoseError::MissingAlgorithm)?;
        let kid = header.get("kid").cloned().or_else(|| key.kid.clone());

        let mut protected = header.clone();
        protected.insert("alg".to_string(), alg.clone());
        if let Some(kid) = kid {
            protected.insert("kid".to_string(), kid);
        }
        let protected = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&protected)?);

        let algorithm = from_jwa(&alg)?;
        let input = signing_input(&protected, &self.payload);
        let signature = ops.sign_with_key(input.as_bytes(), &key, &algorithm)?;

        debug!(key_reference, alg = %alg, count = self.signatures.len() + 1, "signed JWS");
        self.signatures.push(JwsSignature {
            protected,
            header: unprotected,
            signature: URL_SAFE_NO_PAD.encode(signature),
        });
        Ok(())
    }

    // ========================================================================
    // Verification
    // ========================================================================

    /// Verifies the token against stored keys and `candidates`.
    ///
    /// Returns `false` for a token without signatures.
    #[must_use]
    pub fn verify(
        &self,
        ops: &CryptoOperations,
        candidates: &[CryptoKey],
        options: VerifyOptions,
    ) -> bool {
        if self.signatures.is_empty() {
            return false;
        }

        let mut results = self.signatures.iter().enumerate().map(|(index, signature)| {
            match self.verify_signature(ops, signature, candidates, options) {
                Ok(valid) => {
                    trace!(index, valid, "JWS signature checked");
                    valid
                }
                Err(err) => {
                    trace!(index, error = %err, "JWS signature rejected");
                    false
                }
            }
        });

        if options.match_all {
            results.all(|valid| valid)
        } else {
            results.any(|valid| valid)
        }
    }

    fn verify_signature(
        &self,
        ops: &CryptoOperations,
        signature: &JwsSignature,
        candidates: &[CryptoKey],
        options: VerifyOptions,
    ) -> Result<bool, JoseError> {
        let protected = signature.protected_header()?;
        let kid = signature.parameter(&protected, "kid");
        // `did:example:alice#` names no key; treat it like an absent kid.
        let local_id = kid.as_deref().map(local_key_id).filter(|id| !id.is_empty());

        let Some(key) = resolve_key(ops, local_id, candidates, options) else {
            return Ok(false);
        };

        let alg = signature
            .parameter(&protected, "alg")
            .ok_or(JoseError::MissingAlgorithm)?;
        let algorithm = from_jwa(&alg)?;
        let raw = URL_SAFE_NO_PAD.decode(&signature.signature)?;
        let input = signing_input(&signature.protected, &self.payload);

        Ok(ops.verify(input.as_bytes(), &raw, KeySource::Key(&key), &algorithm)?)
    }

    // ========================================================================
    // Serialization
    // ========================================================================

    /// Writes the token in `format`.
    ///
    /// # Errors
    ///
    /// Returns [`JoseError::Serialization`] when compact or flat output is
    /// requested for a token without exactly one signature.
    pub fn serialize(&self, format: JwsFormat) -> Result<String, JoseError> {
        match format {
            JwsFormat::Compact => {
                let signature = self.single_signature(format)?;
                Ok(format!(
                    "{}.{}.{}",
                    signature.protected, self.payload, signature.signature
                ))
            }
            JwsFormat::Flat => {
                let signature = self.single_signature(format)?;
                Ok(serde_json::to_string(&FlatJws {
                    payload: self.payload.clone(),
                    protected: signature.protected.clone(),
                    header: signature.header.clone(),
                    signature: signature.signature.clone(),
                })?)
            }
            JwsFormat::General => Ok(serde_json::to_string(&GeneralJws {
                payload: self.payload.clone(),
                signatures: self.signatures.clone(),
            })?),
        }
    }

    fn single_signature(&self, format: JwsFormat) -> Result<&JwsSignature, JoseError> {
        match self.signatures.as_slice() {
            [signature] => Ok(signature),
            other => Err(JoseError::serialization(format!(
                "{format} serialization requires exactly one signature, found {}",
                other.len()
            ))),
        }
    }

    /// Parses any of the three serializations.
    ///
    /// Detection: exactly three base64url segments joined by dots is compact,
    /// with no surrounding whitespace; text containing `"signatures"` is
    /// general JSON; text containing `"signature"` is flat JSON.
    ///
    /// # Errors
    ///
    /// Returns [`JoseError::Parse`] for unrecognized input and
    /// [`JoseError::Json`] for malformed JSON forms.
    pub fn deserialize(input: &str) -> Result<Self, JoseError> {
        if let Some([protected, payload, signature]) = compact_segments(input) {
            return Ok(Self {
                payload: payload.to_string(),
                signatures: vec![JwsSignature {
                    protected: protected.to_string(),
                    header: None,
                    signature: signature.to_string(),
                }],
            });
        }

        if input.contains("\"signatures\"") {
            let general: GeneralJws = serde_json::from_str(input)?;
            return Ok(Self {
                payload: general.payload,
                signatures: general.signatures,
            });
        }

        if input.contains("\"signature\"") {
            let flat: FlatJws = serde_json::from_str(input)?;
            return Ok(Self {
                payload: flat.payload,
                signatures: vec![JwsSignature {
                    protected: flat.protected,
                    header: flat.header,
                    signature: flat.signature,
                }],
            });
        }

        Err(JoseError::parse("unrecognized JWS format"))
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn signing_input(protected: &str, payload: &str) -> String {
    format!("{protected}.{payload}")
}

/// `did:example:123#key-1` becomes `key-1`.
fn local_key_id(kid: &str) -> &str {
    kid.rsplit_once('#').map_or(kid, |(_, fragment)| fragment)
}

fn is_base64url(segment: &str) -> bool {
    segment
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

fn compact_segments(input: &str) -> Option<[&str; 3]> {
    let mut parts = input.split('.');
    let segments = [parts.next()?, parts.next()?, parts.next()?];
    if parts.next().is_some() || !segments.iter().all(|s| is_base64url(s)) {
        return None;
    }
    Some(segments)
}

fn resolve_key(
    ops: &CryptoOperations,
    local_id: Option<&str>,
    candidates: &[CryptoKey],
    options: VerifyOptions,
) -> Option<CryptoKey> {
    if let Some(id) = local_id {
        if let Ok(key) = ops.store().get(id, true) {
            trace!(kid = id, "verifying with stored key");
            return Some(key);
        }
        if let Some(key) = candidates
            .iter()
            .find(|key| key.kid.as_deref().is_some_and(|kid| kid.ends_with(id)))
        {
            trace!(kid = id, "verifying with matching candidate");
            return Some(key.clone());
        }
    }

    if options.allow_first_candidate_fallback {
        if let Some(first) = candidates.first() {
            warn!(
                kid = local_id.unwrap_or("<none>"),
                "no key matches the JWS kid; falling back to the first candidate"
            );
            return Some(first.clone());
        }
    }

    None
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used)]

    use super::*;
    use portid_core::Algorithm;

    fn signed(ops: &CryptoOperations, reference: &str) -> JwsToken {
        let mut token = JwsToken::new(b"payload");
        token.sign(ops, reference, &Header::new()).unwrap();
        token
    }

    #[test]
    fn test_local_key_id() {
        assert_eq!(local_key_id("did:example:123#key-1"), "key-1");
        assert_eq!(local_key_id("key-1"), "key-1");
        assert_eq!(local_key_id("a#b#c"), "c");
    }

    #[test]
    fn test_compact_segments() {
        assert!(compact_segments("a.b.c").is_some());
        assert!(compact_segments("..").is_some());
        assert!(compact_segments("a.b").is_none());
        assert!(compact_segments("a.b.c.d").is_none());
        assert!(compact_segments("a.b+.c").is_none());
        assert!(compact_segments("a.b=.c").is_none());
    }

    #[test]
    fn test_protected_header_contents() {
        let ops = CryptoOperations::in_memory();
        ops.generate_key_pair("key-1", &Algorithm::es256k()).unwrap();

        let mut token = JwsToken::new(b"payload");
        let mut header = Header::new();
        header.insert("typ".to_string(), "JWT".to_string());
        token.sign(&ops, "key-1", &header).unwrap();

        let protected = token.signatures()[0].protected_header().unwrap();
        assert_eq!(protected["alg"], "ES256K");
        assert_eq!(protected["kid"], "key-1");
        assert_eq!(protected["typ"], "JWT");

        // Canonical: sorted keys.
        let json = URL_SAFE_NO_PAD
            .decode(token.signatures()[0].protected_encoded())
            .unwrap();
        assert_eq!(
            String::from_utf8(json).unwrap(),
            r#"{"alg":"ES256K","kid":"key-1","typ":"JWT"}"#
        );
    }

    #[test]
    fn test_explicit_header_wins() {
        let ops = CryptoOperations::in_memory();
        ops.generate_key_pair("key-1", &Algorithm::es256k()).unwrap();

        let mut token = JwsToken::new(b"payload");
        let mut header = Header::new();
        header.insert("kid".to_string(), "did:example:123#key-1".to_string());
        token.sign(&ops, "key-1", &header).unwrap();

        let protected = token.signatures()[0].protected_header().unwrap();
        assert_eq!(protected["kid"], "did:example:123#key-1");
        assert!(token.verify(&ops, &[], VerifyOptions::default()));
    }

    #[test]
    fn test_missing_algorithm() {
        let ops = CryptoOperations::in_memory();
        ops.generate_key(
            "mac",
            &Algorithm::hmac(portid_core::HashAlgorithm::Sha256),
        )
        .unwrap();

        let mut token = JwsToken::new(b"payload");
        assert!(matches!(
            token.sign(&ops, "mac", &Header::new()),
            Err(JoseError::MissingAlgorithm)
        ));
        assert!(token.signatures().is_empty());
    }

    #[test]
    fn test_missing_key() {
        let ops = CryptoOperations::in_memory();
        let mut token = JwsToken::new(b"payload");
        let err = token.sign(&ops, "absent", &Header::new()).unwrap_err();
        assert!(err.to_string().contains("absent"));
    }

    #[test]
    fn test_signatures_accumulate() {
        let ops = CryptoOperations::in_memory();
        ops.generate_key_pair("a", &Algorithm::es256k()).unwrap();
        ops.generate_key_pair("b", &Algorithm::es256k()).unwrap();

        let mut token = signed(&ops, "a");
        let first = token.signatures()[0].clone();
        token.sign(&ops, "b", &Header::new()).unwrap();

        assert_eq!(token.signatures().len(), 2);
        assert_eq!(token.signatures()[0], first);
    }

    #[test]
    fn test_serialize_counts() {
        let ops = CryptoOperations::in_memory();
        ops.generate_key_pair("a", &Algorithm::es256k()).unwrap();

        let empty = JwsToken::new(b"payload");
        assert!(matches!(
            empty.serialize(JwsFormat::Compact),
            Err(JoseError::Serialization { .. })
        ));
        assert!(matches!(
            empty.serialize(JwsFormat::Flat),
            Err(JoseError::Serialization { .. })
        ));
        let general = empty.serialize(JwsFormat::General).unwrap();
        assert_eq!(JwsToken::deserialize(&general).unwrap(), empty);
        assert!(!empty.verify(&ops, &[], VerifyOptions::default()));

        let mut token = signed(&ops, "a");
        token.sign(&ops, "a", &Header::new()).unwrap();
        assert!(token.serialize(JwsFormat::Compact).is_err());
        assert!(token.serialize(JwsFormat::General).is_ok());
    }

    #[test]
    fn test_unprotected_header_survives_json_forms() {
        let ops = CryptoOperations::in_memory();
        ops.generate_key_pair("a", &Algorithm::es256k()).unwrap();

        let mut unprotected = Header::new();
        unprotected.insert("x-trace".to_string(), "42".to_string());
        let mut token = JwsToken::new(b"payload");
        token
            .sign_with_unprotected(&ops, "a", &Header::new(), Some(unprotected.clone()))
            .unwrap();

        let flat = token.serialize(JwsFormat::Flat).unwrap();
        let parsed = JwsToken::deserialize(&flat).unwrap();
        assert_eq!(parsed.signatures()[0].unprotected_header(), Some(&unprotected));

        let compact = token.serialize(JwsFormat::Compact).unwrap();
        let parsed = JwsToken::deserialize(&compact).unwrap();
        assert_eq!(parsed.signatures()[0].unprotected_header(), None);
        assert!(parsed.verify(&ops, &[], VerifyOptions::default()));
    }
}
