//! Typed verification errors.
//!
//! Verification is all-or-nothing: every variant aborts the call and no new
//! root is ever returned alongside an error. [`Error::RootMismatch`] carries
//! the computed *old* root only.

use crate::reader::SectionKind;
use dualroot_crypto::Digest;
use thiserror::Error;

/// Top-level verification error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The proof buffer is not a well-formed encoding of a traversal.
    #[error(transparent)]
    MalformedProof(#[from] MalformedProof),
    /// The proof is well-formed but does not open the supplied pre-root.
    #[error("root mismatch: expected pre-root {expected}, proof commits to {computed}")]
    RootMismatch {
        /// Pre-root supplied by the caller.
        expected: Digest,
        /// Old root reconstructed from the proof.
        computed: Digest,
    },
    /// The proof exceeds a configured resource bound.
    #[error(transparent)]
    ResourceExceeded(#[from] ResourceExceeded),
    /// The verifier configuration is unusable.
    #[error("invalid verifier config: {0}")]
    Config(String),
}

/// Ways a proof buffer can be malformed.
#[allow(missing_docs)]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MalformedProof {
    #[error("malformed proof: {section} length prefix truncated")]
    TruncatedHeader { section: SectionKind },
    #[error("malformed proof: {section} declares {declared} bytes but only {available} remain")]
    SectionOverrun {
        section: SectionKind,
        declared: usize,
        available: usize,
    },
    #[error("malformed proof: {count} trailing bytes after the last section")]
    TrailingBytes { count: usize },
    #[error("malformed proof: {section} underflow, wanted {wanted} bytes with {remaining} left")]
    SectionUnderflow {
        section: SectionKind,
        wanted: usize,
        remaining: usize,
    },
    #[error("malformed proof: {section} has {remaining} unconsumed bytes")]
    UnconsumedSection { section: SectionKind, remaining: usize },
    #[error("malformed proof: unknown opcode byte {byte:#04x} at index {index}")]
    UnknownOpcode { byte: u8, index: usize },
    #[error("malformed proof: opcode stream exhausted at depth {depth}")]
    OpcodesExhausted { depth: usize },
    #[error("malformed proof: skip of {skip} bits at depth {depth} overshoots leaf depth {leaf_depth}")]
    SkipOverrun {
        depth: usize,
        skip: usize,
        leaf_depth: usize,
    },
    #[error("malformed proof: skip descriptor at depth {depth} has non-zero padding bits")]
    SkipPadding { depth: usize },
    #[error("malformed proof: leaf {leaf} address does not match its tree path")]
    AddressPathMismatch { leaf: usize },
    #[error("malformed proof: {supplied} new balances supplied for {leaves} leaves")]
    NewBalanceCount { leaves: usize, supplied: usize },
    #[error("malformed proof: frame {index} outside scratch arena of {capacity}")]
    FrameOverflow { index: usize, capacity: usize },
}

/// A configured bound the proof would exceed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("resource exceeded: {resource} is {actual}, limit {limit}")]
pub struct ResourceExceeded {
    /// Which bound tripped.
    pub resource: &'static str,
    /// Configured maximum.
    pub limit: usize,
    /// Observed value.
    pub actual: usize,
}

impl Error {
    /// `true` for [`Error::MalformedProof`].
    #[must_use]
    pub const fn is_malformed(&self) -> bool {
        matches!(self, Self::MalformedProof(_))
    }

    /// `true` for [`Error::RootMismatch`].
    #[must_use]
    pub const fn is_root_mismatch(&self) -> bool {
        matches!(self, Self::RootMismatch { .. })
    }

    /// `true` for [`Error::ResourceExceeded`].
    #[must_use]
    pub const fn is_resource_exceeded(&self) -> bool {
        matches!(self, Self::ResourceExceeded(_))
    }
}
