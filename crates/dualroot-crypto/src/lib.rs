// crates/dualroot-crypto/src/lib.rs

//! Hash substrate for the dual-root sparse Merkle verifier.
//!
//! - [`Digest`]: fixed 160-bit node digest (hex in human-readable formats).
//! - [`TreeHasher`]: the only hashing seam the verifier depends on. Every
//!   input it sees has a fixed width (a leaf encoding, or two digests), so
//!   the trait is one-shot; there is no streaming requirement.
//! - [`Blake3Hasher`]: default implementation, BLAKE3 in XOF mode truncated
//!   to [`DIGEST_LEN`] bytes.
//! - [`Blake2b160Hasher`]: unkeyed BLAKE2b with a 20-byte output, for roots
//!   committed by tooling that uses `blake2b(digest_size=20)`.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(
    missing_docs,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::unwrap_used,
    clippy::expect_used
)]

use anyhow::{ensure, Context, Result};
use blake2::digest::consts::U20;
use blake2::{Blake2b, Digest as _};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Width of every digest in bytes (160 bits).
pub const DIGEST_LEN: usize = 20;

/// A node digest. Roots, sibling hashes and leaf hashes all share this type.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Digest(pub [u8; DIGEST_LEN]);

impl Digest {
    /// All-zero digest; used to initialise scratch frames.
    pub const ZERO: Self = Self([0u8; DIGEST_LEN]);

    /// Borrow the raw bytes.
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    /// Build a digest from a slice of exactly [`DIGEST_LEN`] bytes.
    ///
    /// # Errors
    /// Returns an error if `bytes.len() != DIGEST_LEN`.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        ensure!(
            bytes.len() == DIGEST_LEN,
            "digest must be {} bytes, got {}",
            DIGEST_LEN,
            bytes.len()
        );
        let mut out = [0u8; DIGEST_LEN];
        out.copy_from_slice(bytes);
        Ok(Self(out))
    }

    /// Lowercase hex encoding.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl From<[u8; DIGEST_LEN]> for Digest {
    fn from(bytes: [u8; DIGEST_LEN]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Digest {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.to_hex())
    }
}

impl FromStr for Digest {
    type Err = anyhow::Error;

    /// Parse lowercase/uppercase hex, with or without a `0x` prefix.
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let body = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let bytes = hex::decode(body).with_context(|| format!("decode digest hex {body:?}"))?;
        Self::from_slice(&bytes)
    }
}

impl Serialize for Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Hash function used for both leaf hashing and internal-node combination.
///
/// Implementations must be pure and deterministic. Used as a type parameter,
/// e.g. `Verifier::<Blake3Hasher>::new(cfg)`.
pub trait TreeHasher {
    /// Digest an arbitrary byte string.
    fn digest(input: &[u8]) -> Digest;

    /// Combine two child digests: `H(left ‖ right)` over exactly 40 bytes.
    #[inline]
    fn combine(left: &Digest, right: &Digest) -> Digest {
        let mut buf = [0u8; 2 * DIGEST_LEN];
        buf[..DIGEST_LEN].copy_from_slice(&left.0);
        buf[DIGEST_LEN..].copy_from_slice(&right.0);
        Self::digest(&buf)
    }
}

/// BLAKE3 truncated to [`DIGEST_LEN`] bytes via its extendable output.
#[derive(Clone, Copy, Debug, Default)]
pub struct Blake3Hasher;

impl TreeHasher for Blake3Hasher {
    fn digest(input: &[u8]) -> Digest {
        let mut h = blake3::Hasher::new();
        h.update(input);
        let mut out = [0u8; DIGEST_LEN];
        h.finalize_xof().fill(&mut out);
        Digest(out)
    }
}

/// Unkeyed BLAKE2b parameterised for a [`DIGEST_LEN`]-byte output.
///
/// The output length is part of the BLAKE2 parameter block, so this is not a
/// prefix of BLAKE2b-512.
#[derive(Clone, Copy, Debug, Default)]
pub struct Blake2b160Hasher;

impl TreeHasher for Blake2b160Hasher {
    fn digest(input: &[u8]) -> Digest {
        let out = Blake2b::<U20>::digest(input);
        let mut bytes = [0u8; DIGEST_LEN];
        bytes.copy_from_slice(&out);
        Digest(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_deterministic_and_input_sensitive() {
        let a = Blake3Hasher::digest(b"ledger");
        let b = Blake3Hasher::digest(b"ledger");
        let c = Blake3Hasher::digest(b"ledgeR");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn xof_prefix_matches_full_blake3() {
        // Truncated XOF output is a prefix of the standard 32-byte hash.
        let full = blake3::hash(b"prefix");
        let short = Blake3Hasher::digest(b"prefix");
        assert_eq!(&full.as_bytes()[..DIGEST_LEN], short.as_bytes());
    }

    #[test]
    fn blake2b_160_matches_reference_vector() {
        // hashlib.blake2b(b"abc", digest_size=20).hexdigest()
        assert_eq!(
            Blake2b160Hasher::digest(b"abc").to_hex(),
            "384264f676f39536840523f284921cdc68b6846b"
        );
        use blake2::Digest as _;
        let wide = blake2::Blake2b512::digest(b"abc");
        assert_ne!(&wide[..DIGEST_LEN], Blake2b160Hasher::digest(b"abc").as_bytes());
    }

    #[test]
    fn combine_is_ordered_concat() {
        let l = Blake3Hasher::digest(b"l");
        let r = Blake3Hasher::digest(b"r");
        let mut cat = Vec::new();
        cat.extend_from_slice(l.as_bytes());
        cat.extend_from_slice(r.as_bytes());
        assert_eq!(Blake3Hasher::combine(&l, &r), Blake3Hasher::digest(&cat));
        assert_ne!(Blake3Hasher::combine(&l, &r), Blake3Hasher::combine(&r, &l));
    }

    #[test]
    fn hex_roundtrip_and_prefix() {
        let d = Blake3Hasher::digest(b"root");
        let parsed: Digest = d.to_hex().parse().unwrap();
        assert_eq!(parsed, d);
        let prefixed: Digest = format!("0x{d}").parse().unwrap();
        assert_eq!(prefixed, d);
        assert!("abcd".parse::<Digest>().is_err());
        assert!("zz".repeat(DIGEST_LEN).parse::<Digest>().is_err());
    }

    #[test]
    fn serde_uses_hex_string() {
        let d = Digest([7u8; DIGEST_LEN]);
        let json = serde_json::to_string(&d).unwrap();
        assert_eq!(json, format!("\"{}\"", "07".repeat(DIGEST_LEN)));
        let back: Digest = serde_json::from_str(&json).unwrap();
        assert_eq!(back, d);
    }
}
