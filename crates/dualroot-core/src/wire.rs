//! Wire framing for proof buffers.
//!
//! [`ProofBuilder`] appends to the five sections independently and frames
//! them on [`ProofBuilder::build`]. Callers push items in the order the
//! verifier consumes them: opcodes, skips, addresses and balances in
//! pre-order; sibling digests in post-order (after the expanded child's
//! whole subtree).

use crate::reader::{SectionKind, LEN_PREFIX};
use crate::types::{Address, Balance, Opcode};
use anyhow::{Context, Result};
use dualroot_crypto::Digest;

/// Section-by-section proof encoder.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProofBuilder {
    siblings: Vec<u8>,
    addresses: Vec<u8>,
    old_balances: Vec<u8>,
    opcodes: Vec<u8>,
    skips: Vec<u8>,
}

impl ProofBuilder {
    /// Empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one opcode.
    pub fn opcode(&mut self, op: Opcode) -> &mut Self {
        self.opcodes.push(op.to_byte());
        self
    }

    /// Append a sibling digest.
    pub fn sibling(&mut self, digest: &Digest) -> &mut Self {
        self.siblings.extend_from_slice(digest.as_bytes());
        self
    }

    /// Append a leaf's address and old balance.
    pub fn leaf(&mut self, address: &Address, old_balance: Balance) -> &mut Self {
        self.addresses.extend_from_slice(&address.0);
        self.old_balance(old_balance)
    }

    /// Append an old balance without an address (derived-address proofs).
    pub fn old_balance(&mut self, old_balance: Balance) -> &mut Self {
        self.old_balances.extend_from_slice(&old_balance.to_le_bytes());
        self
    }

    /// Append a `Skip` opcode and its descriptor covering path bits
    /// `from..from + bits` of `path`.
    pub fn skip(&mut self, path: &Address, from: usize, bits: u8) -> &mut Self {
        let n = usize::from(bits);
        let mut chunk = vec![0u8; n.div_ceil(8)];
        let pad = chunk.len() * 8 - n;
        for j in 0..n {
            if path.bit(from + j) {
                let at = pad + j;
                chunk[at / 8] |= 0x80 >> (at % 8);
            }
        }
        self.opcode(Opcode::Skip);
        self.skips.push(bits);
        self.skips.extend_from_slice(&chunk);
        self
    }

    /// Direct access to one section's bytes.
    pub fn section_mut(&mut self, kind: SectionKind) -> &mut Vec<u8> {
        match kind {
            SectionKind::SiblingHashes => &mut self.siblings,
            SectionKind::Addresses => &mut self.addresses,
            SectionKind::OldBalances => &mut self.old_balances,
            SectionKind::Opcodes => &mut self.opcodes,
            SectionKind::Skips => &mut self.skips,
        }
    }

    /// Frame all sections into one buffer.
    ///
    /// # Errors
    /// Returns an error if a section is longer than `u32::MAX` bytes.
    pub fn build(&self) -> Result<Vec<u8>> {
        let sections = [
            &self.siblings,
            &self.addresses,
            &self.old_balances,
            &self.opcodes,
            &self.skips,
        ];
        let total: usize = sections.iter().map(|s| LEN_PREFIX + s.len()).sum();
        let mut out = Vec::with_capacity(total);
        for (bytes, kind) in sections.into_iter().zip(SectionKind::ALL) {
            let len = u32::try_from(bytes.len())
                .with_context(|| format!("{kind} section too long: {} bytes", bytes.len()))?;
            out.extend_from_slice(&len.to_le_bytes());
            out.extend_from_slice(bytes);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::ProofReader;
    use crate::types::ADDRESS_LEN;

    #[test]
    fn sections_land_in_wire_order() {
        let addr = Address([0xab; ADDRESS_LEN]);
        let mut b = ProofBuilder::new();
        b.opcode(Opcode::Branch)
            .leaf(&addr, 5)
            .sibling(&Digest([1; 20]));
        let buf = b.build().unwrap();

        let mut r = ProofReader::parse(&buf).unwrap();
        assert_eq!(r.next_sibling().unwrap(), Digest([1; 20]));
        assert_eq!(r.next_address().unwrap(), addr);
        assert_eq!(r.next_old_balance().unwrap(), 5);
        assert_eq!(r.next_opcode().unwrap(), Some(Opcode::Branch));
        r.finish().unwrap();
    }

    #[test]
    fn skip_encodes_path_chunk_right_aligned() {
        let mut path = Address::default();
        // bits 3..8 = 1,0,1,1,1
        for (i, v) in [(3, true), (4, false), (5, true), (6, true), (7, true)] {
            path.set_bit(i, v);
        }
        let mut b = ProofBuilder::new();
        b.skip(&path, 3, 5);
        let buf = b.build().unwrap();

        let mut r = ProofReader::parse(&buf).unwrap();
        assert_eq!(r.next_opcode().unwrap(), Some(Opcode::Skip));
        let s = r.next_skip().unwrap();
        assert_eq!(s.bits, 5);
        assert_eq!(s.chunk, &[0b0001_0111]);
        assert!(s.padding_is_clear());
        for j in 0..5 {
            assert_eq!(s.bit(j), path.bit(3 + j));
        }
    }
}
