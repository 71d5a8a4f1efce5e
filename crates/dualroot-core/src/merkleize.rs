//! Dual-root merkleizer.
//!
//! One pass over the proof yields both the pre-state and the post-state root.
//! Every frame carries four digests (old/new × left/right). A pruned sibling
//! is written into both the old and the new slot, so the two roots can only
//! differ through leaf balances.

use crate::error::MalformedProof;
use crate::traverse::{Join, Slot, Visitor};
use crate::types::{leaf_digest, Balance, Leaf, Side};
use dualroot_crypto::{Digest, TreeHasher};
use std::marker::PhantomData;

/// Both roots reconstructed from one proof.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Roots {
    /// Root committing to the old balances.
    pub old: Digest,
    /// Root committing to the new balances.
    pub new: Digest,
}

/// Scratch for one internal node's children.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Frame {
    old: [Digest; 2],
    new: [Digest; 2],
}

impl Frame {
    #[inline]
    const fn idx(side: Side) -> usize {
        match side {
            Side::Left => 0,
            Side::Right => 1,
        }
    }

    /// Store a child's pair.
    #[inline]
    pub fn set(&mut self, side: Side, old: Digest, new: Digest) {
        self.old[Self::idx(side)] = old;
        self.new[Self::idx(side)] = new;
    }

    /// A child's `(old, new)` pair.
    #[inline]
    #[must_use]
    pub const fn get(&self, side: Side) -> (Digest, Digest) {
        (self.old[Self::idx(side)], self.new[Self::idx(side)])
    }
}

/// Fixed-size frame storage: `leaf_depth + 1` frames, allocated once.
#[derive(Clone, Debug)]
pub struct FrameArena {
    frames: Vec<Frame>,
}

impl FrameArena {
    /// Arena deep enough for a tree with leaves at `leaf_depth`.
    #[must_use]
    pub fn new(leaf_depth: usize) -> Self {
        Self {
            frames: vec![Frame::default(); leaf_depth + 1],
        }
    }

    /// Number of frames.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.frames.len()
    }

    /// Frame `index`.
    ///
    /// # Errors
    /// [`MalformedProof::FrameOverflow`] outside the arena.
    pub fn get(&self, index: usize) -> Result<&Frame, MalformedProof> {
        let capacity = self.frames.len();
        self.frames
            .get(index)
            .ok_or(MalformedProof::FrameOverflow { index, capacity })
    }

    /// Mutable frame `index`.
    ///
    /// # Errors
    /// [`MalformedProof::FrameOverflow`] outside the arena.
    pub fn get_mut(&mut self, index: usize) -> Result<&mut Frame, MalformedProof> {
        let capacity = self.frames.len();
        self.frames
            .get_mut(index)
            .ok_or(MalformedProof::FrameOverflow { index, capacity })
    }
}

/// [`Visitor`] that hashes the old and new trees side by side.
#[derive(Debug)]
pub struct DualRoot<'b, H: TreeHasher> {
    arena: FrameArena,
    new_balances: &'b [Balance],
    _hasher: PhantomData<H>,
}

impl<'b, H: TreeHasher> DualRoot<'b, H> {
    /// Merkleizer for a tree of `leaf_depth`, pairing leaf `i` with
    /// `new_balances[i]`.
    #[must_use]
    pub fn new(leaf_depth: usize, new_balances: &'b [Balance]) -> Self {
        Self {
            arena: FrameArena::new(leaf_depth),
            new_balances,
            _hasher: PhantomData,
        }
    }

    /// Read both roots once the walk visited `leaves` leaves.
    ///
    /// # Errors
    /// [`MalformedProof::NewBalanceCount`] if the new-balance list was not
    /// used up exactly.
    pub fn finish(self, leaves: usize) -> Result<Roots, MalformedProof> {
        if leaves != self.new_balances.len() {
            return Err(MalformedProof::NewBalanceCount {
                leaves,
                supplied: self.new_balances.len(),
            });
        }
        let (old, new) = self.arena.get(Slot::ROOT.frame)?.get(Slot::ROOT.side);
        Ok(Roots { old, new })
    }
}

impl<H: TreeHasher> Visitor for DualRoot<'_, H> {
    fn leaf(&mut self, out: Slot, index: usize, leaf: &Leaf) -> Result<(), MalformedProof> {
        let supplied = self.new_balances.len();
        let new_balance = *self
            .new_balances
            .get(index)
            .ok_or(MalformedProof::NewBalanceCount {
                leaves: index + 1,
                supplied,
            })?;
        let old = leaf_digest::<H>(&leaf.address, leaf.old_balance);
        let new = leaf_digest::<H>(&leaf.address, new_balance);
        self.arena.get_mut(out.frame)?.set(out.side, old, new);
        Ok(())
    }

    fn combine(&mut self, out: Slot, join: Join) -> Result<(), MalformedProof> {
        let children = self.arena.get_mut(out.frame + 1)?;
        if let Join::Sibling { side, digest } = join {
            children.set(side, digest, digest);
        }
        let (old_l, new_l) = children.get(Side::Left);
        let (old_r, new_r) = children.get(Side::Right);
        let old = H::combine(&old_l, &old_r);
        let new = H::combine(&new_l, &new_r);
        self.arena.get_mut(out.frame)?.set(out.side, old, new);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Address;
    use dualroot_crypto::Blake3Hasher;

    type H = Blake3Hasher;

    #[test]
    fn frame_slots_are_independent() {
        let mut f = Frame::default();
        f.set(Side::Right, Digest([1; 20]), Digest([2; 20]));
        assert_eq!(f.get(Side::Left), (Digest::ZERO, Digest::ZERO));
        assert_eq!(f.get(Side::Right), (Digest([1; 20]), Digest([2; 20])));
    }

    #[test]
    fn arena_access_is_bounds_checked() {
        let mut a = FrameArena::new(3);
        assert_eq!(a.capacity(), 4);
        a.get_mut(3).unwrap();
        assert_eq!(
            a.get(4).unwrap_err(),
            MalformedProof::FrameOverflow {
                index: 4,
                capacity: 4
            }
        );
    }

    #[test]
    fn sibling_feeds_both_trees() {
        let leaf = Leaf {
            address: Address::default(),
            old_balance: 10,
        };
        let sib = Digest([5; 20]);
        let news = [20];
        let mut m = DualRoot::<H>::new(1, &news);
        let root = Slot::ROOT;
        m.leaf(root.child(Side::Left), 0, &leaf).unwrap();
        m.combine(
            root,
            Join::Sibling {
                side: Side::Right,
                digest: sib,
            },
        )
        .unwrap();
        let roots = m.finish(1).unwrap();

        let old_leaf = leaf_digest::<H>(&leaf.address, 10);
        let new_leaf = leaf_digest::<H>(&leaf.address, 20);
        assert_eq!(roots.old, H::combine(&old_leaf, &sib));
        assert_eq!(roots.new, H::combine(&new_leaf, &sib));
    }

    #[test]
    fn too_few_new_balances_fail_at_the_leaf() {
        let leaf = Leaf {
            address: Address::default(),
            old_balance: 1,
        };
        let mut m = DualRoot::<H>::new(1, &[]);
        assert_eq!(
            m.leaf(Slot::ROOT, 0, &leaf).unwrap_err(),
            MalformedProof::NewBalanceCount {
                leaves: 1,
                supplied: 0
            }
        );
    }

    #[test]
    fn too_many_new_balances_fail_at_finish() {
        let m = DualRoot::<H>::new(1, &[1, 2, 3]);
        assert_eq!(
            m.finish(2).unwrap_err(),
            MalformedProof::NewBalanceCount {
                leaves: 2,
                supplied: 3
            }
        );
    }
}
