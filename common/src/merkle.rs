//! Sorted-pair Keccak-256 Merkle tree.
//!
//! Each parent is `keccak256(min(a, b) || max(a, b))`, so a verifier can fold
//! a proof without knowing whether each sibling sat on the left or the right.
//! A node without a partner at the end of a level moves up unchanged.

use alloc::vec;
use alloc::vec::Vec;
use core::fmt;
use sha3::{Digest, Keccak256};

use crate::address::Address;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MerkleError {
    Empty,
    IndexOutOfBounds { index: usize, leaves: usize },
}

impl fmt::Display for MerkleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MerkleError::Empty => write!(f, "cannot build a Merkle tree without leaves"),
            MerkleError::IndexOutOfBounds { index, leaves } => write!(
                f,
                "leaf index {index} is out of bounds for tree with {leaves} leaves"
            ),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for MerkleError {}

/// Leaf for an address: keccak256 over the 20 raw address bytes.
pub fn hash_leaf(address: &Address) -> [u8; 32] {
    Keccak256::digest(address.as_bytes()).into()
}

/// Hash two nodes together, smaller one first.
pub fn hash_pair(a: &[u8; 32], b: &[u8; 32]) -> [u8; 32] {
    let (left, right) = if a <= b { (a, b) } else { (b, a) };
    Keccak256::new()
        .chain_update(left)
        .chain_update(right)
        .finalize()
        .into()
}

/// Recompute the root from `leaf` and `proof` and compare it with `root`.
pub fn verify_proof(leaf: [u8; 32], proof: &[[u8; 32]], root: [u8; 32]) -> bool {
    proof
        .iter()
        .fold(leaf, |acc, sibling| hash_pair(&acc, sibling))
        == root
}

/// All levels of the tree, leaves first and the root level last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleTree {
    levels: Vec<Vec<[u8; 32]>>,
}

impl MerkleTree {
    pub fn from_leaves(leaves: Vec<[u8; 32]>) -> Result<Self, MerkleError> {
        if leaves.is_empty() {
            return Err(MerkleError::Empty);
        }

        let mut levels = vec![leaves];
        while levels[levels.len() - 1].len() > 1 {
            let next = levels[levels.len() - 1]
                .chunks(2)
                .map(|pair| match pair {
                    [left, right] => hash_pair(left, right),
                    [single] => *single,
                    _ => unreachable!("chunks(2) yields one or two nodes"),
                })
                .collect();
            levels.push(next);
        }

        Ok(Self { levels })
    }

    pub fn root(&self) -> [u8; 32] {
        self.levels[self.levels.len() - 1][0]
    }

    pub fn leaves(&self) -> &[[u8; 32]] {
        &self.levels[0]
    }

    pub fn len(&self) -> usize {
        self.levels[0].len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels[0].is_empty()
    }

    /// Number of hashing levels between the leaves and the root.
    pub fn depth(&self) -> usize {
        self.levels.len() - 1
    }

    /// Position of the first leaf equal to `leaf`.
    pub fn leaf_index(&self, leaf: &[u8; 32]) -> Option<usize> {
        self.levels[0].iter().position(|candidate| candidate == leaf)
    }

    /// Sibling hashes from the leaf at `index` up to the root. Levels where
    /// the node was promoted without a partner contribute nothing.
    pub fn proof(&self, index: usize) -> Result<Vec<[u8; 32]>, MerkleError> {
        if index >= self.len() {
            return Err(MerkleError::IndexOutOfBounds {
                index,
                leaves: self.len(),
            });
        }

        let mut proof = Vec::with_capacity(self.depth());
        let mut current = index;
        for level in &self.levels[..self.levels.len() - 1] {
            let sibling = current ^ 1;
            if sibling < level.len() {
                proof.push(level[sibling]);
            }
            current /= 2;
        }

        Ok(proof)
    }
}
