// Human- and machine-readable dump of a committed board.
//
// Used by the `board-commit` tool to inspect what a client would submit:
// the root, every cell's leaf tuple with its proof, and the ship extraction
// (or why it failed). Reports contain salts, so they are for local debugging
// only.

use serde::Serialize;
use std::fmt::Write as _;

use broadside_protocol::Hash32;

use crate::analyzer::{Extraction, ShipInventory, extract};
use crate::board::Board;
use crate::commitment::{CommitError, Commitment, Proof};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CellReport {
    pub index: u8,
    pub occupied: bool,
    pub salt: Hash32,
    pub leaf: Hash32,
    pub proof: Proof,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CommitReport {
    pub side: u8,
    pub root: Hash32,
    pub cells: Vec<CellReport>,
    /// Present when an inventory was supplied and extraction succeeded.
    pub extraction: Option<Extraction>,
    /// Present when an inventory was supplied and extraction failed.
    pub mismatch: Option<String>,
}

impl CommitReport {
    pub fn build(board: &Board, inventory: Option<&ShipInventory>) -> Result<Self, CommitError> {
        let commitment = Commitment::commit(board);
        let mut cells = Vec::with_capacity(board.cells().len());
        for cell in board.cells() {
            cells.push(CellReport {
                index: cell.index,
                occupied: cell.occupied,
                salt: cell.salt,
                leaf: commitment
                    .leaf(cell.index)
                    .ok_or(CommitError::IndexOutOfRange {
                        index: cell.index,
                        leaves: commitment.leaves().len(),
                    })?,
                proof: commitment.prove(cell.index)?,
            });
        }
        let (extraction, mismatch) = match inventory.map(|inv| extract(board, inv)) {
            None => (None, None),
            Some(Ok(found)) => (Some(found), None),
            Some(Err(e)) => (None, Some(e.to_string())),
        };
        Ok(Self {
            side: board.side(),
            root: commitment.root(),
            cells,
            extraction,
            mismatch,
        })
    }

    /// Plain-text rendering, one cell per line.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "root: {}", self.root);
        for cell in &self.cells {
            let mark = if cell.occupied { '#' } else { '.' };
            let _ = writeln!(
                out,
                "[{:2}] {mark} salt={} leaf={}",
                cell.index, cell.salt, cell.leaf
            );
            for node in &cell.proof.0 {
                let _ = writeln!(out, "       proof {node}");
            }
        }
        if let Some(found) = &self.extraction {
            let _ = writeln!(out, "ships:");
            for ship in &found.placements {
                let _ = writeln!(
                    out,
                    "  length {} {:?} at {}",
                    ship.length, ship.orientation, ship.start_index
                );
            }
        }
        if let Some(reason) = &self.mismatch {
            let _ = writeln!(out, "shape mismatch: {reason}");
        }
        out
    }
}
