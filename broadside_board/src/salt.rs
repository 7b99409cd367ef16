// Per-session cell salts.
//
// Every cell's commitment leaf mixes in a 256-bit salt so the root reveals
// nothing about occupancy until a salt is disclosed. A `SaltSet` is generated
// once when a session is created, sized for the largest board, and held only
// in memory for the session's lifetime. Salts leave the process only inside
// individual reveals.
//
// Salts come from the OS CSPRNG. The all-zero value is reserved as the
// first-move sentinel and is never issued; duplicates are re-drawn.

use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use std::collections::BTreeSet;
use std::fmt;

use broadside_protocol::{Hash32, MAX_BOARD_SIDE};

use crate::board::BoardError;

/// Number of salts needed to cover the largest supported board.
pub const MAX_CELLS: usize = MAX_BOARD_SIDE as usize * MAX_BOARD_SIDE as usize;

/// Unique, non-zero salts indexed by cell.
#[derive(Clone, PartialEq, Eq)]
pub struct SaltSet {
    salts: Vec<Hash32>,
}

impl SaltSet {
    /// Draw `MAX_CELLS` fresh salts from the operating system.
    pub fn generate() -> Self {
        Self::generate_with(&mut OsRng, MAX_CELLS)
    }

    /// Draw `count` salts from `rng`, re-drawing any zero or repeated value.
    pub fn generate_with<R: RngCore + CryptoRng>(rng: &mut R, count: usize) -> Self {
        let mut seen = BTreeSet::new();
        let mut salts = Vec::with_capacity(count);
        while salts.len() < count {
            let mut bytes = [0u8; 32];
            rng.fill_bytes(&mut bytes);
            let salt = Hash32(bytes);
            if !salt.is_zero() && seen.insert(salt) {
                salts.push(salt);
            }
        }
        Self { salts }
    }

    /// Wrap externally supplied salts after checking they are usable.
    pub fn from_salts(salts: Vec<Hash32>) -> Result<Self, BoardError> {
        let mut seen = BTreeSet::new();
        for (index, salt) in salts.iter().enumerate() {
            if salt.is_zero() {
                return Err(BoardError::ZeroSalt(index));
            }
            if !seen.insert(*salt) {
                return Err(BoardError::DuplicateSalt(index));
            }
        }
        Ok(Self { salts })
    }

    pub fn get(&self, index: usize) -> Option<Hash32> {
        self.salts.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.salts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.salts.is_empty()
    }
}

// Never print salt values.
impl fmt::Debug for SaltSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SaltSet({} salts)", self.salts.len())
    }
}
