//! dualroot-core: verify a balance transition against a sparse Merkle root.
//!
//! A proof is a five-section byte buffer describing a pruned, skip-compressed
//! traversal of the account tree. One pass over it rebuilds the **old** root
//! (committing to old balances) and the **new** root (same tree, new balances
//! supplied by the caller). The transition is accepted iff the old root equals
//! the caller's pre-state root; only then is the new root returned.
//!
//! - [`reader`]: bounds-checked cursors over the five sections.
//! - [`traverse`]: pointerless walk with an explicit work stack.
//! - [`merkleize`]: the dual-root visitor and its frame arena.
//! - [`verifier`]: the accept/reject entry point with resource limits.
//! - [`inspect`]: leaf decoding and proof statistics (no hashing).
//! - [`pipeline`]: pre-root source / post-root sink seams.
//!
//! ```
//! use dualroot_core::prelude::*;
//! use dualroot_crypto::{Blake3Hasher, TreeHasher};
//!
//! let a = Address::default();
//! let mut pb = ProofBuilder::new();
//! pb.opcode(Opcode::SiblingLeft).leaf(&a, 10).sibling(&Digest::ZERO);
//! let proof = pb.build()?;
//!
//! let pre = Blake3Hasher::combine(&leaf_digest::<Blake3Hasher>(&a, 10), &Digest::ZERO);
//! let v = Verifier::<Blake3Hasher>::new(VerifierConfig::with_leaf_depth(1))?;
//! let post = v.verify(&pre, &proof, &[7])?;
//! assert_ne!(post, pre);
//! # Ok::<(), anyhow::Error>(())
//! ```

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::doc_markdown
)]

/// Verifier configuration (tree depth, address source, limits).
pub mod config;
/// Typed verification errors.
pub mod error;
/// Hash-free leaf decoding and proof statistics.
pub mod inspect;
/// Transition bundle and JSON/CBOR file helpers.
pub mod io;
/// Dual-root merkleizer.
pub mod merkleize;
/// Pre-root source, post-root sink, and the commit-on-accept driver.
pub mod pipeline;
/// Five-cursor proof stream reader.
pub mod reader;
/// Explicit-stack proof traversal.
pub mod traverse;
/// Canonical wire-level types.
pub mod types;
/// State transition verifier.
pub mod verifier;
/// Proof buffer framing.
pub mod wire;

pub use config::{AddressSource, Limits, VerifierConfig};
pub use error::{Error, MalformedProof, ResourceExceeded};
pub use inspect::{decode_leaves, ProofStats};
pub use io::TransitionBundle;
pub use merkleize::Roots;
pub use pipeline::{apply_transition, MemoryRoot, PostRootSink, PreRootSource};
pub use types::*;
pub use verifier::{verify, Verifier};
pub use wire::ProofBuilder;

pub use dualroot_crypto::{Blake2b160Hasher, Blake3Hasher, Digest, TreeHasher, DIGEST_LEN};

/// Commonly-used items for quick imports.
pub mod prelude {
    pub use crate::{
        apply_transition, config::*, error::*, types::*, verifier::Verifier, wire::ProofBuilder,
        PostRootSink, PreRootSource,
    };
    pub use dualroot_crypto::Digest;
}
