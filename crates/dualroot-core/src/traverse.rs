// crates/dualroot-core/src/traverse.rs

//! Pointerless traversal of the compressed tree encoded by a proof.
//!
//! The walker never recurses. It keeps an explicit work stack whose depth is
//! bounded by `2 * leaf_depth + 1` regardless of input, so adversarial
//! proofs cannot exhaust the call stack. Per node it reads exactly what the
//! opcode calls for:
//!
//! - `Skip`: one descriptor; path bits are fixed and depth advances, nothing
//!   is hashed and no frame is used.
//! - `SiblingRight` / `SiblingLeft`: one child is walked, then one sibling
//!   digest is read (post-order) and the node is combined.
//! - `Branch`: left subtree, then right subtree, then combine.
//! - at `leaf_depth`: one address (or path-derived address) and one balance.
//!
//! Hashing is left to a [`Visitor`]. Results flow through *slots*: a node
//! that is the `k`-th single-level step on its path writes into frame `k`,
//! on the side it hangs from; its own children write into frame `k + 1`.

use crate::config::{AddressSource, VerifierConfig};
use crate::error::MalformedProof;
use crate::reader::ProofReader;
use crate::types::{Address, Leaf, Opcode, Side};
use dualroot_crypto::Digest;

/// Destination of a resolved node's value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Slot {
    /// Frame index (number of single-level steps above the node).
    pub frame: usize,
    /// Which half of the frame.
    pub side: Side,
}

impl Slot {
    /// Where the root's value lands.
    pub const ROOT: Self = Self {
        frame: 0,
        side: Side::Left,
    };

    /// Slot for this node's child on `side`.
    #[inline]
    #[must_use]
    pub const fn child(self, side: Side) -> Self {
        Self {
            frame: self.frame + 1,
            side,
        }
    }
}

/// Shape of an internal node once its expanded children are resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Join {
    /// Both children were walked.
    Branch,
    /// One child was walked; the other is a pruned subtree digest.
    Sibling {
        /// Side the sibling sits on.
        side: Side,
        /// Its digest, identical in the old and new trees.
        digest: Digest,
    },
}

/// Receives traversal events in proof order.
pub trait Visitor {
    /// Leaf number `index` resolved; its value belongs in `out`.
    ///
    /// # Errors
    /// Implementations reject leaves they cannot account for.
    fn leaf(&mut self, out: Slot, index: usize, leaf: &Leaf) -> Result<(), MalformedProof>;

    /// The children of the node owning `out` are in frame `out.frame + 1`;
    /// combine them into `out`.
    ///
    /// # Errors
    /// Implementations may fail on frame bounds.
    fn combine(&mut self, out: Slot, join: Join) -> Result<(), MalformedProof>;

    /// Opcode `op` applied at `depth`.
    fn opcode(&mut self, _depth: usize, _op: Opcode) {}

    /// A skip of `bits` levels started at `depth`.
    fn skip(&mut self, _depth: usize, _bits: usize) {}
}

#[derive(Clone, Copy, Debug)]
enum Task {
    /// Resolve the node at `depth`. `step` is the path bit that led here
    /// when the node was entered by a single-level descent.
    Resolve {
        depth: usize,
        out: Slot,
        step: Option<bool>,
    },
    /// Both children of the node owning `out` are done.
    Combine { out: Slot, sibling: Option<Side> },
}

/// Walk the whole proof, feeding `visitor`, then require every section to
/// be fully consumed. Returns the number of leaves visited.
///
/// # Errors
/// Any [`MalformedProof`] raised by the reader, by the structural checks
/// here, or by the visitor.
pub fn walk<V: Visitor>(
    reader: &mut ProofReader<'_>,
    cfg: &VerifierConfig,
    visitor: &mut V,
) -> Result<usize, MalformedProof> {
    let leaf_depth = cfg.leaf_depth;
    let mut path = Address::default();
    let mut leaves = 0usize;
    let mut stack = Vec::with_capacity(2 * leaf_depth + 1);
    stack.push(Task::Resolve {
        depth: 0,
        out: Slot::ROOT,
        step: None,
    });

    while let Some(task) = stack.pop() {
        match task {
            Task::Resolve { depth, out, step } => {
                if let Some(bit) = step {
                    path.set_bit(depth - 1, bit);
                }
                if depth == leaf_depth {
                    let leaf = read_leaf(reader, cfg.addresses, &path, leaf_depth, leaves)?;
                    visitor.leaf(out, leaves, &leaf)?;
                    leaves += 1;
                    continue;
                }
                let op = reader
                    .next_opcode()?
                    .ok_or(MalformedProof::OpcodesExhausted { depth })?;
                visitor.opcode(depth, op);
                match op {
                    Opcode::Skip => {
                        let skip = reader.next_skip()?;
                        let bits = skip.bits;
                        if depth + bits > leaf_depth {
                            return Err(MalformedProof::SkipOverrun {
                                depth,
                                skip: bits,
                                leaf_depth,
                            });
                        }
                        if !skip.padding_is_clear() {
                            return Err(MalformedProof::SkipPadding { depth });
                        }
                        for j in 0..bits {
                            path.set_bit(depth + j, skip.bit(j));
                        }
                        visitor.skip(depth, bits);
                        stack.push(Task::Resolve {
                            depth: depth + bits,
                            out,
                            step: None,
                        });
                    }
                    Opcode::SiblingRight | Opcode::SiblingLeft => {
                        let walked = if op == Opcode::SiblingRight {
                            Side::Right
                        } else {
                            Side::Left
                        };
                        stack.push(Task::Combine {
                            out,
                            sibling: Some(walked.opposite()),
                        });
                        stack.push(Task::Resolve {
                            depth: depth + 1,
                            out: out.child(walked),
                            step: Some(walked.bit()),
                        });
                    }
                    Opcode::Branch => {
                        stack.push(Task::Combine { out, sibling: None });
                        for side in [Side::Right, Side::Left] {
                            stack.push(Task::Resolve {
                                depth: depth + 1,
                                out: out.child(side),
                                step: Some(side.bit()),
                            });
                        }
                    }
                }
            }
            Task::Combine { out, sibling } => {
                let join = match sibling {
                    Some(side) => Join::Sibling {
                        side,
                        digest: reader.next_sibling()?,
                    },
                    None => Join::Branch,
                };
                visitor.combine(out, join)?;
            }
        }
    }

    reader.finish()?;
    Ok(leaves)
}

fn read_leaf(
    reader: &mut ProofReader<'_>,
    source: AddressSource,
    path: &Address,
    leaf_depth: usize,
    index: usize,
) -> Result<Leaf, MalformedProof> {
    let address = match source {
        AddressSource::Explicit => {
            let address = reader.next_address()?;
            if !prefix_matches(&address, path, leaf_depth) {
                return Err(MalformedProof::AddressPathMismatch { leaf: index });
            }
            address
        }
        // Bits at and past `leaf_depth` are never written, so they stay zero.
        AddressSource::Derived => *path,
    };
    let old_balance = reader.next_old_balance()?;
    Ok(Leaf {
        address,
        old_balance,
    })
}

fn prefix_matches(a: &Address, b: &Address, bits: usize) -> bool {
    let full = bits / 8;
    if a.0[..full] != b.0[..full] {
        return false;
    }
    let rem = bits % 8;
    if rem == 0 {
        return true;
    }
    let mask = 0xffu8 << (8 - rem);
    (a.0[full] ^ b.0[full]) & mask == 0
}
