// The local player's board: one cell per grid square, row-major.
//
// Cell `i` sits at row `i / side`, column `i % side`. Each cell carries its
// fixed index, an occupancy flag toggled during placement, and the salt
// assigned to that index from the session's `SaltSet`. Once the board has
// been committed the session stops handing out `&mut Board`, so occupancy
// is frozen from then on.

use serde::Serialize;
use thiserror::Error;

use broadside_protocol::{BoardSize, Hash32};

use crate::salt::SaltSet;

/// Errors constructing or editing a board.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum BoardError {
    #[error("cell {index} is outside a board of {cells} cells")]
    IndexOutOfRange { index: usize, cells: u16 },
    #[error("board needs {needed} salts but only {available} were generated")]
    NotEnoughSalts { needed: usize, available: usize },
    #[error("salt {0} is the reserved all-zero value")]
    ZeroSalt(usize),
    #[error("salt {0} repeats an earlier salt")]
    DuplicateSalt(usize),
}

/// One grid square.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Cell {
    pub index: u8,
    pub occupied: bool,
    pub salt: Hash32,
}

/// A square board of `size.cells()` cells.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Board {
    size: BoardSize,
    cells: Vec<Cell>,
}

impl Board {
    /// An empty board whose cells take salts `0..size.cells()` from `salts`.
    pub fn new(size: BoardSize, salts: &SaltSet) -> Result<Self, BoardError> {
        let needed = usize::from(size.cells());
        if salts.len() < needed {
            return Err(BoardError::NotEnoughSalts {
                needed,
                available: salts.len(),
            });
        }
        let cells = (0..needed)
            .filter_map(|i| {
                salts.get(i).map(|salt| Cell {
                    index: i as u8,
                    occupied: false,
                    salt,
                })
            })
            .collect();
        Ok(Self { size, cells })
    }

    /// A board with exactly the listed cells occupied.
    pub fn with_occupied(
        size: BoardSize,
        salts: &SaltSet,
        occupied: &[u8],
    ) -> Result<Self, BoardError> {
        let mut board = Self::new(size, salts)?;
        for &index in occupied {
            board.set_occupied(index, true)?;
        }
        Ok(board)
    }

    pub fn size(&self) -> BoardSize {
        self.size
    }

    pub fn side(&self) -> u8 {
        self.size.side()
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn cell(&self, index: u8) -> Option<&Cell> {
        self.cells.get(usize::from(index))
    }

    fn cell_mut(&mut self, index: u8) -> Result<&mut Cell, BoardError> {
        let cells = self.size.cells();
        self.cells
            .get_mut(usize::from(index))
            .ok_or(BoardError::IndexOutOfRange {
                index: usize::from(index),
                cells,
            })
    }

    /// Flip a cell's occupancy; returns the new value.
    pub fn toggle(&mut self, index: u8) -> Result<bool, BoardError> {
        let cell = self.cell_mut(index)?;
        cell.occupied = !cell.occupied;
        Ok(cell.occupied)
    }

    pub fn set_occupied(&mut self, index: u8, occupied: bool) -> Result<(), BoardError> {
        self.cell_mut(index)?.occupied = occupied;
        Ok(())
    }

    pub fn is_occupied(&self, index: u8) -> bool {
        self.cell(index).is_some_and(|c| c.occupied)
    }

    /// Indices of occupied cells, ascending.
    pub fn occupied_indices(&self) -> Vec<u8> {
        self.cells
            .iter()
            .filter(|c| c.occupied)
            .map(|c| c.index)
            .collect()
    }

    pub fn occupied_count(&self) -> usize {
        self.cells.iter().filter(|c| c.occupied).count()
    }

    /// Row-major index of `(row, col)`.
    pub fn index_of(&self, row: u8, col: u8) -> u8 {
        row * self.side() + col
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn salts() -> SaltSet {
        SaltSet::generate()
    }

    #[test]
    fn new_board_is_empty_and_indexed() {
        let board = Board::new(BoardSize::from_side(5).unwrap(), &salts()).unwrap();
        assert_eq!(board.cells().len(), 25);
        for (i, cell) in board.cells().iter().enumerate() {
            assert_eq!(usize::from(cell.index), i);
            assert!(!cell.occupied);
        }
        assert!(board.occupied_indices().is_empty());
    }

    #[test]
    fn cells_take_salts_by_index() {
        let salts = salts();
        let board = Board::new(BoardSize::from_side(4).unwrap(), &salts).unwrap();
        for cell in board.cells() {
            assert_eq!(Some(cell.salt), salts.get(usize::from(cell.index)));
        }
    }

    #[test]
    fn toggle_and_occupied_indices() {
        let mut board = Board::new(BoardSize::from_side(4).unwrap(), &salts()).unwrap();
        assert_eq!(board.toggle(5), Ok(true));
        assert_eq!(board.toggle(0), Ok(true));
        assert_eq!(board.toggle(15), Ok(true));
        assert_eq!(board.toggle(5), Ok(false));
        assert_eq!(board.occupied_indices(), vec![0, 15]);
        assert_eq!(board.occupied_count(), 2);
        assert!(board.is_occupied(15));
        assert!(!board.is_occupied(5));
    }

    #[test]
    fn out_of_range_index_rejected() {
        let mut board = Board::new(BoardSize::from_side(4).unwrap(), &salts()).unwrap();
        assert_eq!(
            board.toggle(16),
            Err(BoardError::IndexOutOfRange {
                index: 16,
                cells: 16
            })
        );
    }

    #[test]
    fn too_few_salts_rejected() {
        let few = SaltSet::from_salts(vec![Hash32([1; 32]), Hash32([2; 32])]).unwrap();
        assert_eq!(
            Board::new(BoardSize::from_side(4).unwrap(), &few),
            Err(BoardError::NotEnoughSalts {
                needed: 16,
                available: 2
            })
        );
    }

    #[test]
    fn index_of_is_row_major() {
        let board = Board::new(BoardSize::from_side(8).unwrap(), &salts()).unwrap();
        assert_eq!(board.index_of(0, 0), 0);
        assert_eq!(board.index_of(1, 0), 8);
        assert_eq!(board.index_of(7, 7), 63);
    }
}
