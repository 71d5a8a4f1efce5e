//! Collaborator seams around the verifier and the commit-on-accept driver.

use crate::types::Balance;
use crate::verifier::Verifier;
use anyhow::{Context, Result};
use dualroot_crypto::{Digest, TreeHasher};
use tracing::info;

/// Supplies the last committed root.
pub trait PreRootSource {
    /// Current pre-state root.
    fn pre_root(&self) -> Result<Digest>;
}

/// Accepts a newly verified root.
pub trait PostRootSink {
    /// Record `root` as the committed state.
    fn commit(&mut self, root: Digest) -> Result<()>;
}

/// Verify one transition against `source` and commit the new root to `sink`.
///
/// The sink is touched only after verification accepted; every error path,
/// including a root mismatch, leaves it as it was.
///
/// # Errors
/// Source or sink failures, or the verifier's [`crate::Error`] (downcastable).
pub fn apply_transition<H, S, K>(
    verifier: &Verifier<H>,
    source: &S,
    sink: &mut K,
    proof: &[u8],
    new_balances: &[Balance],
) -> Result<Digest>
where
    H: TreeHasher,
    S: PreRootSource + ?Sized,
    K: PostRootSink + ?Sized,
{
    let pre_root = source.pre_root().context("read pre-state root")?;
    let new_root = verifier.verify(&pre_root, proof, new_balances)?;
    sink.commit(new_root).context("commit post-state root")?;
    info!(pre = %pre_root, post = %new_root, "transition committed");
    Ok(new_root)
}

/// In-memory source and sink.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MemoryRoot {
    /// Current root.
    pub root: Digest,
    /// Accepted transitions so far.
    pub commits: u64,
}

impl MemoryRoot {
    /// Start at `root`.
    #[must_use]
    pub const fn new(root: Digest) -> Self {
        Self { root, commits: 0 }
    }
}

impl PreRootSource for MemoryRoot {
    fn pre_root(&self) -> Result<Digest> {
        Ok(self.root)
    }
}

impl PostRootSink for MemoryRoot {
    fn commit(&mut self, root: Digest) -> Result<()> {
        self.root = root;
        self.commits += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VerifierConfig;
    use crate::error::Error;
    use crate::types::{leaf_digest, Address, Opcode};
    use crate::wire::ProofBuilder;
    use dualroot_crypto::Blake3Hasher;

    type H = Blake3Hasher;

    fn setup() -> (Verifier<H>, Vec<u8>, Digest) {
        let a = Address::default();
        let mut pb = ProofBuilder::new();
        pb.opcode(Opcode::SiblingLeft)
            .leaf(&a, 4)
            .sibling(&Digest([8; 20]));
        let pre = H::combine(&leaf_digest::<H>(&a, 4), &Digest([8; 20]));
        let v = Verifier::new(VerifierConfig::with_leaf_depth(1)).unwrap();
        (v, pb.build().unwrap(), pre)
    }

    #[test]
    fn commits_only_on_accept() {
        let (v, proof, pre) = setup();

        let mut wrong = MemoryRoot::new(Digest::ZERO);
        let before = wrong;
        let src = wrong;
        let err = apply_transition(&v, &src, &mut wrong, &proof, &[5]).unwrap_err();
        assert!(err.downcast_ref::<Error>().is_some_and(Error::is_root_mismatch));
        assert_eq!(wrong, before);

        let mut state = MemoryRoot::new(pre);
        let src = state;
        let new_root = apply_transition(&v, &src, &mut state, &proof, &[5]).unwrap();
        assert_eq!(state.root, new_root);
        assert_eq!(state.commits, 1);
    }

    #[test]
    fn malformed_proof_leaves_sink_untouched() {
        let (v, mut proof, pre) = setup();
        proof.pop();
        let mut state = MemoryRoot::new(pre);
        let src = state;
        let err = apply_transition(&v, &src, &mut state, &proof, &[5]).unwrap_err();
        assert!(err.downcast_ref::<Error>().is_some_and(Error::is_malformed));
        assert_eq!(state, MemoryRoot::new(pre));
    }
}
