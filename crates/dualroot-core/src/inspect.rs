//! Hash-free passes over a proof: leaf decoding and size statistics.
//!
//! Both run the same bounded traversal as verification, so a proof that
//! decodes here is structurally valid; only the root comparison is missing.

use crate::config::VerifierConfig;
use crate::error::{Error, MalformedProof};
use crate::reader::{ProofReader, SectionKind};
use crate::traverse::{walk, Join, Slot, Visitor};
use crate::types::{Leaf, Opcode};
use crate::verifier::Verifier;
use dualroot_crypto::{Blake3Hasher, TreeHasher};
use serde::{Deserialize, Serialize};

/// Size and shape summary of one proof.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofStats {
    /// Bytes in the sibling hash section.
    pub sibling_bytes: usize,
    /// Bytes in the address section.
    pub address_bytes: usize,
    /// Bytes in the old-balance section.
    pub old_balance_bytes: usize,
    /// Bytes in the opcode section.
    pub opcode_bytes: usize,
    /// Bytes in the skip-descriptor section.
    pub skip_bytes: usize,
    /// `Skip` opcodes.
    pub skips: usize,
    /// `SiblingRight` opcodes.
    pub sibling_right: usize,
    /// `SiblingLeft` opcodes.
    pub sibling_left: usize,
    /// `Branch` opcodes.
    pub branches: usize,
    /// Leaves reached.
    pub leaves: usize,
    /// Sibling digests consumed.
    pub siblings: usize,
    /// Tree levels covered by skips.
    pub skipped_bits: usize,
}

impl ProofStats {
    fn record_sections(&mut self, reader: &ProofReader<'_>) {
        for kind in SectionKind::ALL {
            let len = reader.cursor(kind).len();
            match kind {
                SectionKind::SiblingHashes => self.sibling_bytes = len,
                SectionKind::Addresses => self.address_bytes = len,
                SectionKind::OldBalances => self.old_balance_bytes = len,
                SectionKind::Opcodes => self.opcode_bytes = len,
                SectionKind::Skips => self.skip_bytes = len,
            }
        }
    }

    /// Total wire length including length prefixes.
    #[must_use]
    pub const fn total_bytes(&self) -> usize {
        5 * crate::reader::LEN_PREFIX
            + self.sibling_bytes
            + self.address_bytes
            + self.old_balance_bytes
            + self.opcode_bytes
            + self.skip_bytes
    }
}

/// [`Visitor`] that keeps leaves and counts, hashing nothing.
#[derive(Debug, Default)]
pub struct LeafCollector {
    leaves: Vec<Leaf>,
    stats: ProofStats,
}

impl Visitor for LeafCollector {
    fn leaf(&mut self, _out: Slot, _index: usize, leaf: &Leaf) -> Result<(), MalformedProof> {
        self.leaves.push(*leaf);
        Ok(())
    }

    fn combine(&mut self, _out: Slot, join: Join) -> Result<(), MalformedProof> {
        if matches!(join, Join::Sibling { .. }) {
            self.stats.siblings += 1;
        }
        Ok(())
    }

    fn opcode(&mut self, _depth: usize, op: Opcode) {
        match op {
            Opcode::Skip => self.stats.skips += 1,
            Opcode::SiblingRight => self.stats.sibling_right += 1,
            Opcode::SiblingLeft => self.stats.sibling_left += 1,
            Opcode::Branch => self.stats.branches += 1,
        }
    }

    fn skip(&mut self, _depth: usize, bits: usize) {
        self.stats.skipped_bits += bits;
    }
}

impl<H: TreeHasher> Verifier<H> {
    /// Leaves touched by `proof`, in traversal order.
    ///
    /// # Errors
    /// The same structural and resource errors as verification.
    pub fn decode_leaves(&self, proof: &[u8]) -> Result<Vec<Leaf>, Error> {
        Ok(self.collect(proof)?.leaves)
    }

    /// Decoded leaves together with size statistics.
    ///
    /// # Errors
    /// The same structural and resource errors as verification.
    pub fn inspect(&self, proof: &[u8]) -> Result<(Vec<Leaf>, ProofStats), Error> {
        let c = self.collect(proof)?;
        Ok((c.leaves, c.stats))
    }

    fn collect(&self, proof: &[u8]) -> Result<LeafCollector, Error> {
        let mut reader = self.open(proof)?;
        let mut collector = LeafCollector::default();
        collector.stats.record_sections(&reader);
        collector.stats.leaves = walk(&mut reader, self.config(), &mut collector)?;
        Ok(collector)
    }
}

/// [`Verifier::decode_leaves`] under `cfg`.
///
/// # Errors
/// As [`Verifier::decode_leaves`]; also [`Error::Config`].
pub fn decode_leaves(cfg: &VerifierConfig, proof: &[u8]) -> Result<Vec<Leaf>, Error> {
    Verifier::<Blake3Hasher>::new(*cfg)?.decode_leaves(proof)
}
