//! Proof Stream Reader: five independent, bounds-checked byte cursors.
//!
//! Wire layout (each length is a 4-byte little-endian `u32`):
//!
//! ```text
//! [len][sibling hashes] [len][addresses] [len][old balances] [len][opcodes] [len][skip descriptors]
//! ```
//!
//! Every cursor is confined to its own section: a read that would cross the
//! section's declared end fails with [`MalformedProof::SectionUnderflow`]
//! instead of touching the next section. Cursors only move forward.

use crate::error::MalformedProof;
use crate::types::{Address, Balance, Opcode, ADDRESS_LEN, BALANCE_LEN};
use dualroot_crypto::{Digest, DIGEST_LEN};
use std::fmt;
use tracing::trace;

/// Width of a section length prefix.
pub const LEN_PREFIX: usize = 4;

/// The five sections, in wire order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SectionKind {
    /// Digests of pruned sibling subtrees (post-order).
    SiblingHashes,
    /// Leaf addresses (traversal order).
    Addresses,
    /// Leaf pre-state balances (traversal order).
    OldBalances,
    /// One byte per visited internal node (pre-order).
    Opcodes,
    /// Skip descriptors: length byte + right-aligned path chunk.
    Skips,
}

impl SectionKind {
    /// Wire order.
    pub const ALL: [Self; 5] = [
        Self::SiblingHashes,
        Self::Addresses,
        Self::OldBalances,
        Self::Opcodes,
        Self::Skips,
    ];

    /// Stable lowercase name (logs, errors, stats).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SiblingHashes => "sibling-hashes",
            Self::Addresses => "addresses",
            Self::OldBalances => "old-balances",
            Self::Opcodes => "opcodes",
            Self::Skips => "skips",
        }
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Forward-only cursor over one section.
#[derive(Clone, Debug)]
pub struct Cursor<'a> {
    kind: SectionKind,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    /// Cursor at the start of `bytes`.
    #[must_use]
    pub const fn new(kind: SectionKind, bytes: &'a [u8]) -> Self {
        Self {
            kind,
            bytes,
            pos: 0,
        }
    }

    /// Section this cursor reads.
    #[must_use]
    pub const fn kind(&self) -> SectionKind {
        self.kind
    }

    /// Declared section length.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the section is empty (declared length zero).
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Bytes consumed so far.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.pos
    }

    /// Bytes still unread.
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    /// Next `n` bytes; advances the cursor.
    ///
    /// # Errors
    /// [`MalformedProof::SectionUnderflow`] if fewer than `n` bytes remain.
    pub fn read(&mut self, n: usize) -> Result<&'a [u8], MalformedProof> {
        let remaining = self.remaining();
        if n > remaining {
            return Err(MalformedProof::SectionUnderflow {
                section: self.kind,
                wanted: n,
                remaining,
            });
        }
        let out = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    /// Next `N` bytes as an array.
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], MalformedProof> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read(N)?);
        Ok(out)
    }

    /// Next byte.
    pub fn read_u8(&mut self) -> Result<u8, MalformedProof> {
        Ok(self.read(1)?[0])
    }

    /// Fails unless every byte has been consumed.
    pub fn finish(&self) -> Result<(), MalformedProof> {
        match self.remaining() {
            0 => Ok(()),
            remaining => Err(MalformedProof::UnconsumedSection {
                section: self.kind,
                remaining,
            }),
        }
    }
}

/// One decoded skip descriptor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Skip<'a> {
    /// Number of tree levels skipped.
    pub bits: usize,
    /// `ceil(bits / 8)` bytes: the skipped path bits, right-aligned big-endian.
    pub chunk: &'a [u8],
}

impl Skip<'_> {
    /// Leading zero bits that pad `chunk` to whole bytes.
    #[must_use]
    pub const fn padding(&self) -> usize {
        self.chunk.len() * 8 - self.bits
    }

    /// Path bit `j` of the skipped run (`j < bits`).
    #[must_use]
    pub const fn bit(&self, j: usize) -> bool {
        let at = self.padding() + j;
        self.chunk[at / 8] & (0x80 >> (at % 8)) != 0
    }

    /// Whether all padding bits are zero.
    #[must_use]
    pub fn padding_is_clear(&self) -> bool {
        (0..self.padding()).all(|i| self.chunk[i / 8] & (0x80 >> (i % 8)) == 0)
    }
}

/// All five cursors of one proof buffer.
#[derive(Clone, Debug)]
pub struct ProofReader<'a> {
    /// Sibling hash cursor.
    pub siblings: Cursor<'a>,
    /// Address cursor.
    pub addresses: Cursor<'a>,
    /// Old balance cursor.
    pub old_balances: Cursor<'a>,
    /// Opcode cursor.
    pub opcodes: Cursor<'a>,
    /// Skip descriptor cursor.
    pub skips: Cursor<'a>,
}

impl<'a> ProofReader<'a> {
    /// Split `buf` into its five sections.
    ///
    /// Each section uses its own declared length. The buffer must end exactly
    /// after the fifth section.
    ///
    /// # Errors
    /// [`MalformedProof`] on a truncated prefix, a length that overruns the
    /// buffer, or trailing bytes.
    pub fn parse(buf: &'a [u8]) -> Result<Self, MalformedProof> {
        let mut rest = buf;
        let mut sections: [&'a [u8]; 5] = [&[]; 5];

        for (slot, kind) in sections.iter_mut().zip(SectionKind::ALL) {
            if rest.len() < LEN_PREFIX {
                return Err(MalformedProof::TruncatedHeader { section: kind });
            }
            let (prefix, tail) = rest.split_at(LEN_PREFIX);
            let mut le = [0u8; LEN_PREFIX];
            le.copy_from_slice(prefix);
            let declared = u32::from_le_bytes(le) as usize;
            if declared > tail.len() {
                return Err(MalformedProof::SectionOverrun {
                    section: kind,
                    declared,
                    available: tail.len(),
                });
            }
            let (body, next) = tail.split_at(declared);
            trace!(section = %kind, len = declared, "parsed section");
            *slot = body;
            rest = next;
        }

        if !rest.is_empty() {
            return Err(MalformedProof::TrailingBytes { count: rest.len() });
        }

        let [siblings, addresses, old_balances, opcodes, skips] = sections;
        Ok(Self {
            siblings: Cursor::new(SectionKind::SiblingHashes, siblings),
            addresses: Cursor::new(SectionKind::Addresses, addresses),
            old_balances: Cursor::new(SectionKind::OldBalances, old_balances),
            opcodes: Cursor::new(SectionKind::Opcodes, opcodes),
            skips: Cursor::new(SectionKind::Skips, skips),
        })
    }

    /// Cursor for `kind`.
    #[must_use]
    pub const fn cursor(&self, kind: SectionKind) -> &Cursor<'a> {
        match kind {
            SectionKind::SiblingHashes => &self.siblings,
            SectionKind::Addresses => &self.addresses,
            SectionKind::OldBalances => &self.old_balances,
            SectionKind::Opcodes => &self.opcodes,
            SectionKind::Skips => &self.skips,
        }
    }

    /// Next sibling digest.
    pub fn next_sibling(&mut self) -> Result<Digest, MalformedProof> {
        Ok(Digest(self.siblings.read_array::<DIGEST_LEN>()?))
    }

    /// Next leaf address.
    pub fn next_address(&mut self) -> Result<Address, MalformedProof> {
        Ok(Address(self.addresses.read_array::<ADDRESS_LEN>()?))
    }

    /// Next old balance.
    pub fn next_old_balance(&mut self) -> Result<Balance, MalformedProof> {
        Ok(Balance::from_le_bytes(
            self.old_balances.read_array::<BALANCE_LEN>()?,
        ))
    }

    /// Next opcode, or `None` once the section is exhausted.
    pub fn next_opcode(&mut self) -> Result<Option<Opcode>, MalformedProof> {
        if self.opcodes.remaining() == 0 {
            return Ok(None);
        }
        let index = self.opcodes.position();
        let byte = self.opcodes.read_u8()?;
        Opcode::from_byte(byte)
            .map(Some)
            .ok_or(MalformedProof::UnknownOpcode { byte, index })
    }

    /// Next skip descriptor.
    pub fn next_skip(&mut self) -> Result<Skip<'a>, MalformedProof> {
        let bits = usize::from(self.skips.read_u8()?);
        let chunk = self.skips.read(bits.div_ceil(8))?;
        Ok(Skip { bits, chunk })
    }

    /// Fails unless every section has been fully consumed.
    pub fn finish(&self) -> Result<(), MalformedProof> {
        SectionKind::ALL
            .into_iter()
            .try_for_each(|kind| self.cursor(kind).finish())
    }
}
