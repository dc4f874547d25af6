//! Bitcoin transaction Merkle trees
//!
//! Nodes are `SHA256(SHA256(left ‖ right))` over internal byte order; a level with an odd
//! number of nodes pairs its last node with itself.

use tracing::debug;

use crate::double_sha256::double_sha256;
use crate::error::ClaimError;

pub mod constraints;

/// Parent of two Merkle nodes
pub fn merkle_parent(left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
    let mut preimage = [0u8; 64];
    preimage[..32].copy_from_slice(left);
    preimage[32..].copy_from_slice(right);
    double_sha256(&preimage)
}

/// Inclusion proof of a leaf
///
/// `directions[k]` is `true` when the running hash is the right child at level `k`, i.e.
/// when `siblings[k]` sits on the left.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MerkleProof {
    pub siblings: Vec<[u8; 32]>,
    pub directions: Vec<bool>,
    pub depth: usize,
}

impl MerkleProof {
    /// Root reached from `leaf` over the first `depth` levels
    pub fn compute_root(&self, leaf: &[u8; 32]) -> [u8; 32] {
        self.siblings
            .iter()
            .zip(self.directions.iter())
            .take(self.depth)
            .fold(*leaf, |current, (sibling, is_right)| {
                if *is_right {
                    merkle_parent(sibling, &current)
                } else {
                    merkle_parent(&current, sibling)
                }
            })
    }

    /// Copy of the proof zero-filled up to `max_depth` levels
    pub fn zero_filled(&self, max_depth: usize) -> Result<Self, ClaimError> {
        if self.depth == 0 || self.depth > max_depth || self.siblings.len() < self.depth {
            return Err(ClaimError::DepthOutOfRange {
                depth: self.depth,
                max: max_depth,
            });
        }
        let mut siblings = self.siblings[..self.depth].to_vec();
        let mut directions = self.directions[..self.depth].to_vec();
        siblings.resize(max_depth, [0u8; 32]);
        directions.resize(max_depth, false);

        Ok(Self {
            siblings,
            directions,
            depth: self.depth,
        })
    }
}

/// A complete Merkle tree, kept level by level from the leaves up
#[derive(Clone, Debug)]
pub struct MerkleTree {
    levels: Vec<Vec<[u8; 32]>>,
}

impl MerkleTree {
    pub fn new(leaves: Vec<[u8; 32]>) -> Result<Self, ClaimError> {
        if leaves.is_empty() {
            return Err(ClaimError::EmptyMerkleTree);
        }
        let mut levels = vec![leaves];
        while levels[levels.len() - 1].len() > 1 {
            let current = &levels[levels.len() - 1];
            let next: Vec<[u8; 32]> = current
                .chunks(2)
                .map(|pair| merkle_parent(&pair[0], pair.get(1).unwrap_or(&pair[0])))
                .collect();
            levels.push(next);
        }
        debug!(
            leaves = levels[0].len(),
            depth = levels.len() - 1,
            "built Merkle tree"
        );

        Ok(Self { levels })
    }

    pub fn root(&self) -> [u8; 32] {
        self.levels[self.levels.len() - 1][0]
    }

    /// Number of levels above the leaves
    pub fn depth(&self) -> usize {
        self.levels.len() - 1
    }

    /// Inclusion proof of the leaf at `index`
    pub fn proof(&self, index: usize) -> Result<MerkleProof, ClaimError> {
        let leaves = self.levels[0].len();
        if index >= leaves {
            return Err(ClaimError::LeafIndexOutOfRange { index, leaves });
        }
        let mut siblings = Vec::with_capacity(self.depth());
        let mut directions = Vec::with_capacity(self.depth());
        let mut position = index;
        for level in &self.levels[..self.depth()] {
            let sibling = if position % 2 == 1 {
                level[position - 1]
            } else {
                *level.get(position + 1).unwrap_or(&level[position])
            };
            siblings.push(sibling);
            directions.push(position % 2 == 1);
            position /= 2;
        }

        Ok(MerkleProof {
            siblings,
            directions,
            depth: self.depth(),
        })
    }
}
