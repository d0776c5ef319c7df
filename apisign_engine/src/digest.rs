//! # Digest algorithms
//!
//! The protocol fixes the digest per canonical form rather than letting callers choose:
//!
//! * dynamic salts: SHA-256
//! * signatures without parameters: SHA-256
//! * signatures that include request parameters: SM3
//!
//! Both produce 256-bit digests and are rendered as lowercase hex. Existing callers rely on the algorithm switching on
//! parameter inclusion alone (there is no version field), so the pairing must not be unified.
use std::fmt::Display;

use sha2::{Digest, Sha256};
use sm3::Sm3;
use subtle::ConstantTimeEq;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignAlgorithm {
    Sha256,
    Sm3,
}

impl SignAlgorithm {
    /// The algorithm used for a signature, given whether request parameters are part of the canonical string.
    pub fn for_signature(with_params: bool) -> Self {
        if with_params {
            SignAlgorithm::Sm3
        } else {
            SignAlgorithm::Sha256
        }
    }

    pub fn hex_digest(&self, input: &str) -> String {
        match self {
            SignAlgorithm::Sha256 => hex::encode(Sha256::digest(input.as_bytes())),
            SignAlgorithm::Sm3 => hex::encode(Sm3::digest(input.as_bytes())),
        }
    }
}

impl Display for SignAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignAlgorithm::Sha256 => write!(f, "SHA-256"),
            SignAlgorithm::Sm3 => write!(f, "SM3"),
        }
    }
}

/// Compares two digests without short-circuiting on the first differing byte.
pub fn digests_match(expected: &str, actual: &str) -> bool {
    expected.as_bytes().ct_eq(actual.as_bytes()).into()
}
