//! Allow-list built from a set of addresses: root plus one proof per member.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use crate::address::{normalize_addresses, Address};
use crate::merkle::{hash_leaf, verify_proof, MerkleError, MerkleTree};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowListEntry {
    pub address: Address,
    pub proof: Vec<[u8; 32]>,
}

#[derive(Debug, Clone)]
pub struct AllowList {
    tree: MerkleTree,
    members: Vec<Address>,
    index: BTreeMap<Address, usize>,
}

impl AllowList {
    /// Normalizes `addresses` (case variants and repeats collapse to one
    /// leaf), then builds the tree in first-occurrence order.
    pub fn build<I>(addresses: I) -> Result<Self, MerkleError>
    where
        I: IntoIterator<Item = Address>,
    {
        let members = normalize_addresses(addresses);
        let leaves = members.iter().map(hash_leaf).collect();
        let tree = MerkleTree::from_leaves(leaves)?;
        let index = members
            .iter()
            .enumerate()
            .map(|(i, address)| (*address, i))
            .collect();

        Ok(Self {
            tree,
            members,
            index,
        })
    }

    pub fn root(&self) -> [u8; 32] {
        self.tree.root()
    }

    pub fn tree(&self) -> &MerkleTree {
        &self.tree
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.index.contains_key(address)
    }

    pub fn members(&self) -> &[Address] {
        &self.members
    }

    pub fn proof_for(&self, address: &Address) -> Option<Vec<[u8; 32]>> {
        let index = *self.index.get(address)?;
        self.tree.proof(index).ok()
    }

    /// Every member with its proof, in insertion order.
    pub fn entries(&self) -> Vec<AllowListEntry> {
        self.members
            .iter()
            .enumerate()
            .filter_map(|(i, address)| {
                self.tree.proof(i).ok().map(|proof| AllowListEntry {
                    address: *address,
                    proof,
                })
            })
            .collect()
    }

    /// Checks `proof` for `address` against this list's root.
    pub fn verify(&self, address: &Address, proof: &[[u8; 32]]) -> bool {
        verify_proof(hash_leaf(address), proof, self.root())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn addr(byte: u8) -> Address {
        Address::new([byte; 20])
    }

    #[test]
    fn empty_list_is_rejected() {
        assert!(matches!(
            AllowList::build(Vec::new()),
            Err(MerkleError::Empty)
        ));
    }

    #[test]
    fn members_get_verifying_proofs() {
        let list = AllowList::build(vec![addr(1), addr(2), addr(3)]).unwrap();
        for entry in list.entries() {
            assert!(list.verify(&entry.address, &entry.proof));
            assert!(verify_proof(hash_leaf(&entry.address), &entry.proof, list.root()));
        }
    }

    #[test]
    fn outsider_has_no_proof_and_borrowed_proofs_fail() {
        let list = AllowList::build(vec![addr(1), addr(2), addr(3), addr(4)]).unwrap();
        let outsider = addr(9);
        assert!(!list.contains(&outsider));
        assert!(list.proof_for(&outsider).is_none());
        for entry in list.entries() {
            assert!(!list.verify(&outsider, &entry.proof));
        }
    }

    #[test]
    fn duplicates_collapse_to_one_leaf() {
        let once = AllowList::build(vec![addr(1), addr(2)]).unwrap();
        let twice = AllowList::build(vec![addr(1), addr(2), addr(1)]).unwrap();
        assert_eq!(twice.len(), 2);
        assert_eq!(once.root(), twice.root());
    }

    #[test]
    fn root_depends_on_membership_not_case() {
        let lower = Address::parse_strict("0xabcdef0123456789abcdef0123456789abcdef01").unwrap();
        let upper = Address::parse_strict("0xABCDEF0123456789ABCDEF0123456789ABCDEF01").unwrap();
        let a = AllowList::build(vec![lower, addr(5)]).unwrap();
        let b = AllowList::build(vec![upper, addr(5)]).unwrap();
        assert_eq!(a.root(), b.root());
    }
}
