// Merkle commitment over a board.
//
// Each cell becomes one leaf:
//
//   leaf = keccak256(keccak256(abi_encode(uint8 index, bool occupied, bytes32 salt)))
//
// where `abi_encode` packs each value into a 32-byte big-endian word (96
// bytes total). Internal nodes hash the two children in ascending byte
// order, so proofs carry no left/right flags. The tree is laid out as a flat
// array of `2n - 1` nodes with the root at slot 0 and leaf `i` at slot
// `len - 1 - i`; node `k` has children `2k + 1` and `2k + 2`. This is the
// layout the ledger's verifier expects, and leaves stay in board-index order
// rather than being sorted.
//
// A `Commitment` is immutable once built. `prove` is pure, so proving the
// same index twice yields identical proofs.

use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use thiserror::Error;

use broadside_protocol::Hash32;

use crate::board::{Board, Cell};

/// Errors producing proofs from a commitment.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum CommitError {
    #[error("no leaf {index} in a commitment of {leaves} leaves")]
    IndexOutOfRange { index: u8, leaves: usize },
}

pub fn keccak256(data: &[u8]) -> Hash32 {
    Hash32(Keccak256::digest(data).into())
}

/// ABI encoding of one cell: three 32-byte words.
pub fn encode_leaf(index: u8, occupied: bool, salt: &Hash32) -> [u8; 96] {
    let mut out = [0u8; 96];
    out[31] = index;
    out[63] = u8::from(occupied);
    out[64..].copy_from_slice(salt.as_bytes());
    out
}

pub fn leaf_hash(index: u8, occupied: bool, salt: &Hash32) -> Hash32 {
    let inner = keccak256(&encode_leaf(index, occupied, salt));
    keccak256(inner.as_bytes())
}

pub fn cell_leaf(cell: &Cell) -> Hash32 {
    leaf_hash(cell.index, cell.occupied, &cell.salt)
}

/// Order-independent parent hash.
pub fn hash_pair(a: &Hash32, b: &Hash32) -> Hash32 {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    let mut buf = [0u8; 64];
    buf[..32].copy_from_slice(lo.as_bytes());
    buf[32..].copy_from_slice(hi.as_bytes());
    keccak256(&buf)
}

/// Sibling hashes from a leaf up to (not including) the root.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Proof(pub Vec<Hash32>);

impl Proof {
    /// The empty proof sent alongside the first-move sentinel.
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// A built tree. Holds every node so proofs need no recomputation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Commitment {
    leaves: Vec<Hash32>,
    tree: Vec<Hash32>,
}

impl Commitment {
    /// Build the commitment for the board's current occupancy.
    pub fn commit(board: &Board) -> Self {
        Self::from_leaves(board.cells().iter().map(cell_leaf).collect())
    }

    /// Build from precomputed leaves in index order. An empty leaf list
    /// yields a commitment whose root is zero and which proves nothing.
    pub fn from_leaves(leaves: Vec<Hash32>) -> Self {
        let n = leaves.len();
        if n == 0 {
            return Self {
                leaves,
                tree: Vec::new(),
            };
        }
        let len = 2 * n - 1;
        let mut tree = vec![Hash32::ZERO; len];
        for (i, leaf) in leaves.iter().enumerate() {
            tree[len - 1 - i] = *leaf;
        }
        for k in (0..len - n).rev() {
            tree[k] = hash_pair(&tree[2 * k + 1], &tree[2 * k + 2]);
        }
        log::debug!("built commitment over {n} leaves");
        Self { leaves, tree }
    }

    pub fn root(&self) -> Hash32 {
        self.tree.first().copied().unwrap_or(Hash32::ZERO)
    }

    pub fn leaves(&self) -> &[Hash32] {
        &self.leaves
    }

    pub fn leaf(&self, index: u8) -> Option<Hash32> {
        self.leaves.get(usize::from(index)).copied()
    }

    /// Membership proof for leaf `index`.
    pub fn prove(&self, index: u8) -> Result<Proof, CommitError> {
        let i = usize::from(index);
        if i >= self.leaves.len() {
            return Err(CommitError::IndexOutOfRange {
                index,
                leaves: self.leaves.len(),
            });
        }
        let mut slot = self.tree.len() - 1 - i;
        let mut path = Vec::new();
        while slot > 0 {
            let sibling = if slot % 2 == 1 { slot + 1 } else { slot - 1 };
            path.push(self.tree[sibling]);
            slot = (slot - 1) / 2;
        }
        Ok(Proof(path))
    }
}

/// Fold `proof` over `leaf` and compare with `root`.
pub fn verify_leaf(root: &Hash32, leaf: &Hash32, proof: &Proof) -> bool {
    let computed = proof
        .0
        .iter()
        .fold(*leaf, |acc, sibling| hash_pair(&acc, sibling));
    computed == *root
}

/// True iff `(index, occupied, salt)` is the leaf committed under `root`.
pub fn verify(root: &Hash32, index: u8, occupied: bool, salt: &Hash32, proof: &Proof) -> bool {
    verify_leaf(root, &leaf_hash(index, occupied, salt), proof)
}

/// Everything needed to disclose one cell: its contents, its salt, and the
/// proof tying it to a root.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reveal {
    pub index: u8,
    pub occupied: bool,
    pub salt: Hash32,
    pub proof: Proof,
}

impl Reveal {
    pub fn of(board: &Board, commitment: &Commitment, index: u8) -> Result<Self, CommitError> {
        let cell = board.cell(index).ok_or(CommitError::IndexOutOfRange {
            index,
            leaves: board.cells().len(),
        })?;
        Ok(Self {
            index,
            occupied: cell.occupied,
            salt: cell.salt,
            proof: commitment.prove(index)?,
        })
    }

    pub fn verify(&self, root: &Hash32) -> bool {
        verify(root, self.index, self.occupied, &self.salt, &self.proof)
    }
}
