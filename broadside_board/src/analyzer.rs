// Ship extraction from an occupancy grid.
//
// The ledger's board validation takes a list of ship placements, not raw
// cells, so after placement the client must decompose its occupied cells into
// ships matching the game's inventory. Extraction is greedy and fully
// deterministic:
//
//   for length in 4, 3, 2, 1:
//     repeat count(length) times:
//       take the first run of `length` unconsumed occupied cells in a row,
//       scanning rows top to bottom and each row left to right;
//       failing that, the first such run in a column, scanning columns left
//       to right and each column top to bottom;
//       mark its cells consumed.
//
// Runs never wrap across a row boundary. A run that cannot be found, or any
// occupied cell left unconsumed at the end, is a `ShapeMismatch`. The scan
// does not search for alternative decompositions, so a board that admits
// several will always be split the same way, and an ambiguous board that the
// greedy order mis-splits is reported as a mismatch.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use broadside_protocol::{SHIP_KINDS, ShipCounts};

use crate::board::Board;

/// Ship counts by length as fixed at game creation.
pub type ShipInventory = ShipCounts;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

/// One ship: `length` cells starting at `start_index`, extending right
/// (horizontal) or down (vertical).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShipPlacement {
    pub length: u8,
    pub orientation: Orientation,
    pub start_index: u8,
}

impl ShipPlacement {
    /// Board indices this ship covers on a board of the given side.
    pub fn covered_indices(&self, side: u8) -> Vec<u8> {
        let step = match self.orientation {
            Orientation::Horizontal => 1,
            Orientation::Vertical => side,
        };
        (0..self.length)
            .map(|k| self.start_index + k * step)
            .collect()
    }
}

/// Successful extraction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extraction {
    /// In extraction order: longest ships first.
    pub placements: Vec<ShipPlacement>,
    /// Every occupied index, ascending.
    pub occupied_indices: Vec<u8>,
}

/// The occupied cells do not decompose into the expected ships.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ShapeMismatch {
    #[error("expected {expected} ships of length {length}, found {found}")]
    MissingShip { length: u8, expected: u8, found: u8 },
    #[error("occupied cells {0:?} are not part of any ship")]
    UnconsumedCells(Vec<u8>),
}

/// Decompose `board`'s occupied cells into ships per `inventory`.
pub fn extract(board: &Board, inventory: &ShipInventory) -> Result<Extraction, ShapeMismatch> {
    let mut grid = ScanGrid::new(board);
    let mut placements = Vec::with_capacity(inventory.total_ships() as usize);

    for length in (1..=SHIP_KINDS as u8).rev() {
        let expected = inventory.count(length);
        for found in 0..expected {
            let Some(placement) = grid
                .find_row_run(length)
                .or_else(|| grid.find_column_run(length))
            else {
                return Err(ShapeMismatch::MissingShip {
                    length,
                    expected,
                    found,
                });
            };
            grid.consume(&placement);
            placements.push(placement);
        }
    }

    let leftover = grid.unconsumed();
    if !leftover.is_empty() {
        return Err(ShapeMismatch::UnconsumedCells(leftover));
    }

    log::debug!(
        "extracted {} ships from {} occupied cells",
        placements.len(),
        board.occupied_count()
    );
    Ok(Extraction {
        placements,
        occupied_indices: board.occupied_indices(),
    })
}

// ---------------------------------------------------------------------------
// Scan state
// ---------------------------------------------------------------------------

/// Occupancy plus consumption marks for one extraction pass.
struct ScanGrid {
    side: u8,
    available: Vec<bool>,
    occupied: Vec<bool>,
}

impl ScanGrid {
    fn new(board: &Board) -> Self {
        let occupied: Vec<bool> = board.cells().iter().map(|c| c.occupied).collect();
        Self {
            side: board.side(),
            available: occupied.clone(),
            occupied,
        }
    }

    fn free(&self, row: u8, col: u8) -> bool {
        self.available[usize::from(row) * usize::from(self.side) + usize::from(col)]
    }

    fn find_row_run(&self, length: u8) -> Option<ShipPlacement> {
        if length > self.side {
            return None;
        }
        for row in 0..self.side {
            for col in 0..=self.side - length {
                if (0..length).all(|k| self.free(row, col + k)) {
                    return Some(ShipPlacement {
                        length,
                        orientation: Orientation::Horizontal,
                        start_index: row * self.side + col,
                    });
                }
            }
        }
        None
    }

    fn find_column_run(&self, length: u8) -> Option<ShipPlacement> {
        if length > self.side {
            return None;
        }
        for col in 0..self.side {
            for row in 0..=self.side - length {
                if (0..length).all(|k| self.free(row + k, col)) {
                    return Some(ShipPlacement {
                        length,
                        orientation: Orientation::Vertical,
                        start_index: row * self.side + col,
                    });
                }
            }
        }
        None
    }

    fn consume(&mut self, placement: &ShipPlacement) {
        for index in placement.covered_indices(self.side) {
            self.available[usize::from(index)] = false;
        }
    }

    fn unconsumed(&self) -> Vec<u8> {
        self.occupied
            .iter()
            .zip(&self.available)
            .enumerate()
            .filter(|&(_, (&occ, &free))| occ && free)
            .map(|(i, _)| i as u8)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::salt::SaltSet;
    use broadside_protocol::BoardSize;

    fn board(side: u8, occupied: &[u8]) -> Board {
        Board::with_occupied(
            BoardSize::from_side(side).unwrap(),
            &SaltSet::generate(),
            occupied,
        )
        .unwrap()
    }

    fn ship(length: u8, orientation: Orientation, start_index: u8) -> ShipPlacement {
        ShipPlacement {
            length,
            orientation,
            start_index,
        }
    }

    #[test]
    fn four_single_cells_on_diagonal() {
        let b = board(4, &[0, 5, 10, 15]);
        let result = extract(&b, &ShipCounts::new([4, 0, 0, 0])).unwrap();
        assert_eq!(result.placements.len(), 4);
        assert!(result.placements.iter().all(|p| p.length == 1));
        assert_eq!(result.occupied_indices, vec![0, 5, 10, 15]);
        let starts: Vec<u8> = result.placements.iter().map(|p| p.start_index).collect();
        assert_eq!(starts, vec![0, 5, 10, 15]);
    }

    #[test]
    fn two_horizontal_pairs_found_by_row_scan() {
        let b = board(8, &[0, 1, 8, 9]);
        let result = extract(&b, &ShipCounts::new([0, 2, 0, 0])).unwrap();
        assert_eq!(
            result.placements,
            vec![
                ship(2, Orientation::Horizontal, 0),
                ship(2, Orientation::Horizontal, 8),
            ]
        );
    }

    #[test]
    fn vertical_ship_found_by_column_scan() {
        // Column 2, rows 1..=3 on a 5x5 board.
        let b = board(5, &[7, 12, 17]);
        let result = extract(&b, &ShipCounts::new([0, 0, 1, 0])).unwrap();
        assert_eq!(result.placements, vec![ship(3, Orientation::Vertical, 7)]);
    }

    #[test]
    fn runs_do_not_wrap_rows() {
        // Cells 3 and 4 sit at the end of row 0 and the start of row 1.
        let b = board(4, &[3, 4]);
        assert_eq!(
            extract(&b, &ShipCounts::new([0, 1, 0, 0])),
            Err(ShapeMismatch::MissingShip {
                length: 2,
                expected: 1,
                found: 0
            })
        );
    }

    #[test]
    fn extra_cell_is_a_mismatch() {
        let b = board(8, &[0, 1, 8, 9, 63]);
        assert_eq!(
            extract(&b, &ShipCounts::new([0, 2, 0, 0])),
            Err(ShapeMismatch::UnconsumedCells(vec![63]))
        );
    }

    #[test]
    fn longest_ships_claimed_first() {
        // A row of four plus a separate single.
        let b = board(6, &[6, 7, 8, 9, 30]);
        let result = extract(&b, &ShipCounts::new([1, 0, 0, 1])).unwrap();
        assert_eq!(
            result.placements,
            vec![
                ship(4, Orientation::Horizontal, 6),
                ship(1, Orientation::Horizontal, 30),
            ]
        );
    }

    #[test]
    fn mixed_fleet_covers_every_occupied_cell() {
        // 8x8: a vertical 4 in column 0, a horizontal 3 in row 2, two 2s, one 1.
        let occupied = [0, 8, 16, 24, 19, 20, 21, 38, 39, 46, 54, 63];
        let b = board(8, &occupied);
        let inventory = ShipCounts::new([1, 2, 1, 1]);
        let result = extract(&b, &inventory).unwrap();

        let side = b.side();
        let mut covered: Vec<u8> = result
            .placements
            .iter()
            .flat_map(|p| p.covered_indices(side))
            .collect();
        covered.sort_unstable();
        assert_eq!(covered, b.occupied_indices());
        assert_eq!(covered.len() as u32, inventory.total_cells());
        for length in 1..=4 {
            let n = result.placements.iter().filter(|p| p.length == length).count();
            assert_eq!(n, usize::from(inventory.count(length)), "length {length}");
        }
    }

    #[test]
    fn greedy_order_is_stable_for_ambiguous_shapes() {
        // An L of three cells: 0, 1, 4 on a 4x4 board. With one 2-ship and
        // one 1-ship the row scan claims 0-1 first, leaving 4 as the single.
        let b = board(4, &[0, 1, 4]);
        let inventory = ShipCounts::new([1, 1, 0, 0]);
        let first = extract(&b, &inventory).unwrap();
        let second = extract(&b, &inventory).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            first.placements,
            vec![
                ship(2, Orientation::Horizontal, 0),
                ship(1, Orientation::Horizontal, 4),
            ]
        );
    }

    #[test]
    fn empty_board_empty_inventory() {
        let b = board(4, &[]);
        let result = extract(&b, &ShipCounts::default()).unwrap();
        assert!(result.placements.is_empty());
        assert!(result.occupied_indices.is_empty());
    }
}
