// broadside_board: the local board and everything derived from it.
//
// A player's fleet stays private for the whole game. The ledger only ever
// sees a Merkle root over salted cells, then individual cell reveals as the
// opponent fires, then (for the winner) a full reveal of every occupied cell
// alongside the ship list. This crate is the pure, I/O-free half of that:
//
// - `salt.rs`:       `SaltSet`, one CSPRNG salt per cell, generated once.
// - `board.rs`:      `Board` and `Cell`, a row-major occupancy grid.
// - `commitment.rs`: Leaf encoding, the Merkle tree (`Commitment`), `Proof`,
//                    `Reveal`, and `verify`. Byte-compatible with the
//                    ledger's verifier.
// - `analyzer.rs`:   Deterministic greedy ship extraction (`extract`).
// - `report.rs`:     `CommitReport` for the `board-commit` tool.

pub mod analyzer;
pub mod board;
pub mod commitment;
pub mod report;
pub mod salt;

pub use analyzer::{Extraction, Orientation, ShapeMismatch, ShipInventory, ShipPlacement, extract};
pub use board::{Board, BoardError, Cell};
pub use commitment::{CommitError, Commitment, Proof, Reveal, leaf_hash, verify, verify_leaf};
pub use salt::{MAX_CELLS, SaltSet};
