//! Canonical core types shared across the dualroot workspace.
//!
//! Widths here are wire-level constants: changing any of them changes the
//! proof format and every committed root.

use anyhow::{ensure, Context};
use dualroot_crypto::{Digest, TreeHasher};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Address width in bytes (160 bits).
pub const ADDRESS_LEN: usize = 20;

/// Balance width in bytes (`u64`, little-endian on the wire).
pub const BALANCE_LEN: usize = 8;

/// Leaf hash input width: `address ‖ balance`.
pub const LEAF_INPUT_LEN: usize = ADDRESS_LEN + BALANCE_LEN;

/// Deepest tree supported; one path bit per address bit.
pub const MAX_LEAF_DEPTH: usize = ADDRESS_LEN * 8;

/// Account balance.
pub type Balance = u64;

/// Account identifier. The tree keys an address by its leading `leaf_depth`
/// bits, most significant bit first. Hex in human-readable formats.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address(pub [u8; ADDRESS_LEN]);

impl Address {
    /// Path bit `i` (0 = left, 1 = right), counted from the root.
    ///
    /// # Panics
    /// Panics if `i >= MAX_LEAF_DEPTH`.
    #[inline]
    #[must_use]
    pub const fn bit(&self, i: usize) -> bool {
        self.0[i / 8] & (0x80 >> (i % 8)) != 0
    }

    /// Set path bit `i`.
    #[inline]
    pub fn set_bit(&mut self, i: usize, value: bool) {
        let mask = 0x80u8 >> (i % 8);
        if value {
            self.0[i / 8] |= mask;
        } else {
            self.0[i / 8] &= !mask;
        }
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", hex::encode(self.0))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = anyhow::Error;

    /// Parse 40 hex chars, with or without a `0x` prefix.
    fn from_str(s: &str) -> anyhow::Result<Self> {
        let trimmed = s.trim();
        let body = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let bytes = hex::decode(body).with_context(|| format!("decode address hex {body:?}"))?;
        ensure!(
            bytes.len() == ADDRESS_LEN,
            "address must be {ADDRESS_LEN} bytes, got {}",
            bytes.len()
        );
        let mut out = [0u8; ADDRESS_LEN];
        out.copy_from_slice(&bytes);
        Ok(Self(out))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(self.0))
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A leaf as read from a proof: identity plus its pre-state balance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Leaf {
    /// Account address.
    pub address: Address,
    /// Balance committed under the pre-state root.
    pub old_balance: Balance,
}

/// Leaf digest: `H(address ‖ balance_le)` over [`LEAF_INPUT_LEN`] bytes.
#[inline]
#[must_use]
pub fn leaf_digest<H: TreeHasher>(address: &Address, balance: Balance) -> Digest {
    let mut buf = [0u8; LEAF_INPUT_LEN];
    buf[..ADDRESS_LEN].copy_from_slice(&address.0);
    buf[ADDRESS_LEN..].copy_from_slice(&balance.to_le_bytes());
    H::digest(&buf)
}

/// Which child of a node a value belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    /// Path bit 0.
    Left,
    /// Path bit 1.
    Right,
}

impl Side {
    /// The path bit this side contributes.
    #[inline]
    #[must_use]
    pub const fn bit(self) -> bool {
        matches!(self, Self::Right)
    }

    /// The other child.
    #[inline]
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }
}

/// Per-node instruction in the opcode section (one byte each on the wire).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Opcode {
    /// Advance depth by a skip descriptor's bit length; no new frame.
    Skip = 0b00,
    /// Left child is a supplied hash; descend right.
    SiblingRight = 0b01,
    /// Right child is a supplied hash; descend left.
    SiblingLeft = 0b10,
    /// Descend into both children.
    Branch = 0b11,
}

impl Opcode {
    /// Decode one opcode byte. Only the four 2-bit codes are valid.
    #[inline]
    #[must_use]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0b00 => Some(Self::Skip),
            0b01 => Some(Self::SiblingRight),
            0b10 => Some(Self::SiblingLeft),
            0b11 => Some(Self::Branch),
            _ => None,
        }
    }

    /// Wire byte.
    #[inline]
    #[must_use]
    pub const fn to_byte(self) -> u8 {
        self as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dualroot_crypto::Blake3Hasher;

    #[test]
    fn address_bits_are_msb_first() {
        let mut a = Address::default();
        a.0[0] = 0b1010_0000;
        a.0[1] = 0b0000_0001;
        assert!(a.bit(0));
        assert!(!a.bit(1));
        assert!(a.bit(2));
        assert!(a.bit(15));
        assert!(!a.bit(14));

        let mut b = Address::default();
        b.set_bit(0, true);
        b.set_bit(2, true);
        b.set_bit(15, true);
        assert_eq!(a, b);
        b.set_bit(2, false);
        assert!(!b.bit(2));
    }

    #[test]
    fn leaf_serializes_address_as_hex() {
        let leaf = Leaf {
            address: Address([0xab; ADDRESS_LEN]),
            old_balance: 7,
        };
        let json = serde_json::to_string(&leaf).unwrap();
        assert_eq!(
            json,
            format!("{{\"address\":\"{}\",\"old_balance\":7}}", "ab".repeat(ADDRESS_LEN))
        );
        let back: Leaf = serde_json::from_str(&json).unwrap();
        assert_eq!(back, leaf);

        let prefixed: Address = format!("0x{}", leaf.address).parse().unwrap();
        assert_eq!(prefixed, leaf.address);
        assert!("abcd".parse::<Address>().is_err());
    }

    #[test]
    fn opcode_byte_mapping() {
        for op in [
            Opcode::Skip,
            Opcode::SiblingRight,
            Opcode::SiblingLeft,
            Opcode::Branch,
        ] {
            assert_eq!(Opcode::from_byte(op.to_byte()), Some(op));
        }
        assert_eq!(Opcode::from_byte(4), None);
        assert_eq!(Opcode::from_byte(0xff), None);
    }

    #[test]
    fn leaf_digest_binds_address_and_balance() {
        let a = Address([1u8; ADDRESS_LEN]);
        let mut input = a.0.to_vec();
        input.extend_from_slice(&42u64.to_le_bytes());
        assert_eq!(input.len(), LEAF_INPUT_LEN);
        assert_eq!(
            leaf_digest::<Blake3Hasher>(&a, 42),
            Blake3Hasher::digest(&input)
        );
        assert_ne!(
            leaf_digest::<Blake3Hasher>(&a, 42),
            leaf_digest::<Blake3Hasher>(&a, 43)
        );
    }
}
