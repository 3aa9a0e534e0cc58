//! Process exit codes.
//!
//! `jws verify` reports a token that does not verify with
//! [`EXIT_VERIFY_FAILED`], distinct from errors that prevented verification.

/// Success.
pub const EXIT_SUCCESS: i32 = 0;

/// The token was checked and did not verify.
pub const EXIT_VERIFY_FAILED: i32 = 1;

/// Configuration, key store, input, or I/O error.
pub const EXIT_ERROR: i32 = 2;
