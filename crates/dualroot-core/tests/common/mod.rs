//! Reference compressed sparse Merkle tree and proof generator for tests.
//!
//! A subtree holding one account hashes to that account's leaf digest; a
//! subtree holding several hashes to `H(left ‖ right)` at the first bit where
//! its accounts diverge. Proofs open the touched accounts and prune every
//! untouched subtree into a sibling digest.

#![allow(dead_code)]

use dualroot_core::{leaf_digest, Address, Balance, Opcode, ProofBuilder};
use dualroot_crypto::{Blake3Hasher, Digest, TreeHasher};

pub type H = Blake3Hasher;

/// One account in the reference state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Account {
    pub address: Address,
    pub old: Balance,
    pub new: Balance,
    pub touched: bool,
}

impl Account {
    pub const fn new(address: Address, old: Balance) -> Self {
        Self {
            address,
            old,
            new: old,
            touched: false,
        }
    }

    pub const fn touch(mut self, new: Balance) -> Self {
        self.new = new;
        self.touched = true;
        self
    }

    const fn balance(&self, post: bool) -> Balance {
        if post && self.touched {
            self.new
        } else {
            self.old
        }
    }
}

/// How unbranching runs are encoded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipStyle {
    /// One `Skip(k)` per run.
    Whole,
    /// `Skip(1)` then `Skip(k - 1)`.
    Split,
    /// `k` single-level skips.
    PerLevel,
}

/// Zero every bit at or past `leaf_depth`.
pub fn masked(mut a: Address, leaf_depth: usize) -> Address {
    for i in leaf_depth..dualroot_core::MAX_LEAF_DEPTH {
        a.set_bit(i, false);
    }
    a
}

/// Address whose leading bits spell `bits` (MSB first).
pub fn addr_bits(bits: &str) -> Address {
    let mut a = Address::default();
    for (i, c) in bits.chars().enumerate() {
        a.set_bit(i, c == '1');
    }
    a
}

#[derive(Clone, Debug)]
pub struct RefTree {
    pub leaf_depth: usize,
    /// Sorted by address, unique on the leading `leaf_depth` bits.
    pub accounts: Vec<Account>,
}

impl RefTree {
    pub fn new(leaf_depth: usize, mut accounts: Vec<Account>) -> Self {
        accounts.sort_by(|a, b| a.address.cmp(&b.address));
        accounts.dedup_by(|b, a| {
            (0..leaf_depth).all(|i| a.address.bit(i) == b.address.bit(i))
        });
        assert!(!accounts.is_empty(), "reference tree needs an account");
        Self {
            leaf_depth,
            accounts,
        }
    }

    pub fn old_root(&self) -> Digest {
        self.hash(0, &self.accounts, false)
    }

    pub fn new_root(&self) -> Digest {
        self.hash(0, &self.accounts, true)
    }

    /// New balances of touched accounts in traversal order.
    pub fn new_balances(&self) -> Vec<Balance> {
        self.accounts
            .iter()
            .filter(|a| a.touched)
            .map(|a| a.new)
            .collect()
    }

    pub fn touched(&self) -> Vec<Account> {
        self.accounts.iter().copied().filter(|a| a.touched).collect()
    }

    /// Proof with explicit addresses.
    pub fn proof(&self, style: SkipStyle) -> Vec<u8> {
        self.proof_with(style, false)
    }

    pub fn proof_with(&self, style: SkipStyle, derived: bool) -> Vec<u8> {
        assert!(
            self.accounts.iter().any(|a| a.touched),
            "proof needs a touched account"
        );
        let mut pb = ProofBuilder::new();
        self.emit(0, &self.accounts, &mut pb, style, derived);
        pb.build().unwrap()
    }

    fn divergence(&self, depth: usize, accts: &[Account]) -> usize {
        let first = accts[0].address;
        (depth..self.leaf_depth)
            .find(|&i| accts.iter().any(|a| a.address.bit(i) != first.bit(i)))
            .expect("prefixes are unique")
    }

    fn split(accts: &[Account], bit: usize) -> (&[Account], &[Account]) {
        let at = accts.partition_point(|a| !a.address.bit(bit));
        accts.split_at(at)
    }

    fn hash(&self, depth: usize, accts: &[Account], post: bool) -> Digest {
        if let [a] = accts {
            return leaf_digest::<H>(&a.address, a.balance(post));
        }
        let b = self.divergence(depth, accts);
        let (l, r) = Self::split(accts, b);
        H::combine(
            &self.hash(b + 1, l, post),
            &self.hash(b + 1, r, post),
        )
    }

    fn emit(
        &self,
        depth: usize,
        accts: &[Account],
        pb: &mut ProofBuilder,
        style: SkipStyle,
        derived: bool,
    ) {
        if let [a] = accts {
            skip(pb, &a.address, depth, self.leaf_depth - depth, style);
            if derived {
                pb.old_balance(a.old);
            } else {
                pb.leaf(&a.address, a.old);
            }
            return;
        }
        let b = self.divergence(depth, accts);
        skip(pb, &accts[0].address, depth, b - depth, style);
        let (l, r) = Self::split(accts, b);
        let tl = l.iter().any(|a| a.touched);
        let tr = r.iter().any(|a| a.touched);
        match (tl, tr) {
            (true, true) => {
                pb.opcode(Opcode::Branch);
                self.emit(b + 1, l, pb, style, derived);
                self.emit(b + 1, r, pb, style, derived);
            }
            (true, false) => {
                pb.opcode(Opcode::SiblingLeft);
                self.emit(b + 1, l, pb, style, derived);
                pb.sibling(&self.hash(b + 1, r, false));
            }
            (false, true) => {
                pb.opcode(Opcode::SiblingRight);
                self.emit(b + 1, r, pb, style, derived);
                pb.sibling(&self.hash(b + 1, l, false));
            }
            (false, false) => unreachable!("only touched subtrees are expanded"),
        }
    }
}

fn skip(pb: &mut ProofBuilder, path: &Address, from: usize, bits: usize, style: SkipStyle) {
    if bits == 0 {
        return;
    }
    let k = |n: usize| u8::try_from(n).unwrap();
    match style {
        SkipStyle::Whole => {
            pb.skip(path, from, k(bits));
        }
        SkipStyle::Split => {
            pb.skip(path, from, 1);
            if bits > 1 {
                pb.skip(path, from + 1, k(bits - 1));
            }
        }
        SkipStyle::PerLevel => {
            for j in 0..bits {
                pb.skip(path, from + j, 1);
            }
        }
    }
}
