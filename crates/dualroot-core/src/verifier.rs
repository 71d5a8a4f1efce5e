// crates/dualroot-core/src/verifier.rs

//! State Transition Verifier.
//!
//! `verify(pre_root, proof, new_balances)` reconstructs both roots in one
//! pass, accepts iff the old root equals `pre_root`, and only then hands back
//! the new root. Nothing is exposed on any error path.

use crate::config::VerifierConfig;
use crate::error::{Error, ResourceExceeded};
use crate::merkleize::{DualRoot, Roots};
use crate::reader::ProofReader;
use crate::traverse::walk;
use crate::types::{Balance, BALANCE_LEN};
use dualroot_crypto::{Blake3Hasher, Digest, TreeHasher};
use std::marker::PhantomData;
use tracing::{debug, warn};

/// Verifier bound to a configuration and a hash function.
#[derive(Clone, Debug)]
pub struct Verifier<H: TreeHasher = Blake3Hasher> {
    cfg: VerifierConfig,
    _hasher: PhantomData<H>,
}

impl Verifier<Blake3Hasher> {
    /// BLAKE3 verifier with the default configuration.
    #[must_use]
    pub fn blake3() -> Self {
        Self {
            cfg: VerifierConfig::default(),
            _hasher: PhantomData,
        }
    }
}

impl<H: TreeHasher> Verifier<H> {
    /// Verifier for `cfg`.
    ///
    /// # Errors
    /// [`Error::Config`] if `cfg` does not validate.
    pub fn new(cfg: VerifierConfig) -> Result<Self, Error> {
        cfg.validate()?;
        Ok(Self {
            cfg,
            _hasher: PhantomData,
        })
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &VerifierConfig {
        &self.cfg
    }

    /// Accept the transition and return the post-state root, or reject.
    ///
    /// # Errors
    /// - [`Error::ResourceExceeded`] before any traversal if a limit trips.
    /// - [`Error::MalformedProof`] if the buffer does not decode to exactly
    ///   one traversal consistent with `new_balances`.
    /// - [`Error::RootMismatch`] if the proof does not open `pre_root`.
    pub fn verify(
        &self,
        pre_root: &Digest,
        proof: &[u8],
        new_balances: &[Balance],
    ) -> Result<Digest, Error> {
        debug!(
            bytes = proof.len(),
            leaves = new_balances.len(),
            "verifying transition"
        );
        let roots = self.compute_roots(proof, new_balances)?;
        if roots.old != *pre_root {
            warn!(expected = %pre_root, computed = %roots.old, "pre-root mismatch");
            return Err(Error::RootMismatch {
                expected: *pre_root,
                computed: roots.old,
            });
        }
        debug!(new_root = %roots.new, "transition accepted");
        Ok(roots.new)
    }

    /// Both roots, without comparing against any pre-root.
    ///
    /// # Errors
    /// As [`Verifier::verify`], minus the root comparison.
    pub fn compute_roots(&self, proof: &[u8], new_balances: &[Balance]) -> Result<Roots, Error> {
        let mut reader = self.open(proof)?;
        let mut merkleizer = DualRoot::<H>::new(self.cfg.leaf_depth, new_balances);
        let leaves = walk(&mut reader, &self.cfg, &mut merkleizer)?;
        Ok(merkleizer.finish(leaves)?)
    }

    /// Frame `proof` and enforce [`Limits`](crate::config::Limits) before any traversal work.
    pub(crate) fn open<'a>(&self, proof: &'a [u8]) -> Result<ProofReader<'a>, Error> {
        let limits = &self.cfg.limits;
        check("proof bytes", limits.max_proof_bytes, proof.len())?;
        let reader = ProofReader::parse(proof)?;
        check("opcodes", limits.max_opcodes, reader.opcodes.len())?;
        check(
            "leaves",
            limits.max_leaves,
            reader.old_balances.len() / BALANCE_LEN,
        )?;
        Ok(reader)
    }
}

fn check(resource: &'static str, limit: usize, actual: usize) -> Result<(), ResourceExceeded> {
    if actual > limit {
        return Err(ResourceExceeded {
            resource,
            limit,
            actual,
        });
    }
    Ok(())
}

/// One-shot [`Verifier::verify`] with BLAKE3 and `cfg`.
///
/// # Errors
/// See [`Verifier::verify`]; also [`Error::Config`] for a bad `cfg`.
pub fn verify(
    cfg: &VerifierConfig,
    pre_root: &Digest,
    proof: &[u8],
    new_balances: &[Balance],
) -> Result<Digest, Error> {
    Verifier::<Blake3Hasher>::new(*cfg)?.verify(pre_root, proof, new_balances)
}
