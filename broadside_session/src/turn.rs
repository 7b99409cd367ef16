// Turn coordination during play.
//
// Each move does two things at once: it fires at a cell on the opponent's
// board, and it reveals what the opponent's previous shot hit on ours (with
// a Merkle proof so the ledger can check it). The very first move of a game
// has nothing to reveal and carries the all-zero sentinel salt with an empty
// proof instead.
//
// The coordinator keeps our view of the opponent's board as `TargetCell`s:
//
//   Whole --prepare_move--> Selected --opponent's next MovePlayed--> Hit | Missed
//                              |
//                          rollback (ledger rejected the move) --> Whole
//
// Our shot's outcome is learned only when the opponent moves, because their
// move is what reveals it. Turn ownership follows the events: our own
// `MovePlayed` hands the turn over, the opponent's hands it back. The host
// always moves first.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use broadside_board::{Board, Commitment};

use crate::error::{IntegrityFailure, LocalValidation, SessionError};
use crate::ledger::MoveReveal;
use crate::phase::LocalRole;

/// Our knowledge of one cell on the opponent's board.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetCell {
    #[default]
    Whole,
    /// Fired at, outcome not yet revealed.
    Selected,
    Missed,
    Hit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Turn {
    Local,
    Opponent,
}

/// Everything `checkAndMove` needs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreparedMove {
    pub reveal: MoveReveal,
    pub target_index: u8,
}

#[derive(Clone, Debug)]
pub struct TurnCoordinator {
    targets: Vec<TargetCell>,
    occupied: BTreeSet<u8>,
    turn: Turn,
    /// Our shot still marked `Selected`.
    pending: Option<u8>,
    last_opponent_move: Option<u8>,
    /// Every cell the opponent has fired at on our board.
    incoming: Vec<u8>,
}

impl TurnCoordinator {
    /// `occupied` is our own committed occupancy; `cells` is the board size.
    pub fn new(role: LocalRole, cells: u16, occupied: &[u8]) -> Self {
        Self {
            targets: vec![TargetCell::Whole; usize::from(cells)],
            occupied: occupied.iter().copied().collect(),
            turn: match role {
                LocalRole::Host => Turn::Local,
                LocalRole::Guest => Turn::Opponent,
            },
            pending: None,
            last_opponent_move: None,
            incoming: Vec::new(),
        }
    }

    /// Whether `index` on our board holds a ship. Local prediction only;
    /// the ledger's check of the revealed leaf is authoritative.
    pub fn is_hit(&self, index: u8) -> bool {
        self.occupied.contains(&index)
    }

    pub fn turn(&self) -> Turn {
        self.turn
    }

    pub fn is_local_turn(&self) -> bool {
        self.turn == Turn::Local
    }

    pub fn target(&self, index: u8) -> Option<TargetCell> {
        self.targets.get(usize::from(index)).copied()
    }

    pub fn targets(&self) -> &[TargetCell] {
        &self.targets
    }

    pub fn pending(&self) -> Option<u8> {
        self.pending
    }

    pub fn last_opponent_move(&self) -> Option<u8> {
        self.last_opponent_move
    }

    pub fn incoming(&self) -> &[u8] {
        &self.incoming
    }

    /// Pre-check a shot at `target_index`, build the reveal of the
    /// opponent's last target, and mark the cell `Selected`.
    pub fn prepare_move(
        &mut self,
        target_index: u8,
        board: &Board,
        commitment: &Commitment,
    ) -> Result<PreparedMove, SessionError> {
        if self.turn != Turn::Local {
            return Err(LocalValidation::NotYourTurn.into());
        }
        // Still our turn with a selection means the move is in flight.
        if self.pending.is_some() {
            return Err(LocalValidation::ShotPending.into());
        }
        match self.target(target_index) {
            None => return Err(LocalValidation::TargetOutOfRange(target_index).into()),
            Some(TargetCell::Whole) => {}
            Some(_) => return Err(LocalValidation::AlreadyTargeted(target_index).into()),
        }

        let reveal = match self.last_opponent_move {
            None => MoveReveal::sentinel(),
            Some(index) => {
                let cell = board
                    .cell(index)
                    .ok_or(IntegrityFailure::MissingSalt(index))?;
                MoveReveal {
                    was_hit: self.is_hit(index),
                    salt: cell.salt,
                    proof: commitment.prove(index).map_err(IntegrityFailure::from)?,
                }
            }
        };

        self.targets[usize::from(target_index)] = TargetCell::Selected;
        self.pending = Some(target_index);
        Ok(PreparedMove {
            reveal,
            target_index,
        })
    }

    /// The ledger refused our move: forget the selection.
    pub fn rollback(&mut self, target_index: u8) {
        if self.pending == Some(target_index) {
            self.targets[usize::from(target_index)] = TargetCell::Whole;
            self.pending = None;
        }
    }

    /// Our own `MovePlayed` arrived: the shot is on the ledger and the turn
    /// passes to the opponent. The cell stays `Selected` until revealed.
    pub fn confirm_own_move(&mut self, target_index: u8) {
        if self.pending != Some(target_index) {
            log::warn!("own move at {target_index} does not match pending shot {:?}", self.pending);
        }
        self.turn = Turn::Opponent;
    }

    /// The opponent moved. `was_hit` is the verdict on our pending shot;
    /// `target_index` is their new shot at our board.
    pub fn apply_opponent_result(&mut self, was_hit: bool, target_index: u8) {
        if let Some(shot) = self.pending.take() {
            self.targets[usize::from(shot)] = if was_hit {
                TargetCell::Hit
            } else {
                TargetCell::Missed
            };
        }
        self.last_opponent_move = Some(target_index);
        self.incoming.push(target_index);
        self.turn = Turn::Local;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use broadside_board::SaltSet;
    use broadside_protocol::BoardSize;

    struct Fixture {
        board: Board,
        commitment: Commitment,
    }

    fn fixture(occupied: &[u8]) -> Fixture {
        let board =
            Board::with_occupied(BoardSize::from_side(4).unwrap(), &SaltSet::generate(), occupied)
                .unwrap();
        let commitment = Commitment::commit(&board);
        Fixture { board, commitment }
    }

    fn host(occupied: &[u8]) -> TurnCoordinator {
        TurnCoordinator::new(LocalRole::Host, 16, occupied)
    }

    #[test]
    fn host_moves_first_guest_waits() {
        assert_eq!(host(&[]).turn(), Turn::Local);
        assert_eq!(
            TurnCoordinator::new(LocalRole::Guest, 16, &[]).turn(),
            Turn::Opponent
        );
    }

    #[test]
    fn first_move_uses_sentinel() {
        let f = fixture(&[0]);
        let mut turns = host(&[0]);
        let prepared = turns.prepare_move(6, &f.board, &f.commitment).unwrap();
        assert!(prepared.reveal.is_sentinel());
        assert_eq!(prepared.target_index, 6);
        assert_eq!(turns.target(6), Some(TargetCell::Selected));
    }

    #[test]
    fn later_moves_reveal_previous_opponent_target() {
        let f = fixture(&[0, 1]);
        let mut turns = host(&[0, 1]);
        turns.prepare_move(6, &f.board, &f.commitment).unwrap();
        turns.confirm_own_move(6);
        turns.apply_opponent_result(true, 1);
        assert_eq!(turns.target(6), Some(TargetCell::Hit));
        assert_eq!(turns.last_opponent_move(), Some(1));

        let prepared = turns.prepare_move(7, &f.board, &f.commitment).unwrap();
        let reveal = prepared.reveal;
        assert!(reveal.was_hit);
        assert!(broadside_board::verify(
            &f.commitment.root(),
            1,
            true,
            &reveal.salt,
            &reveal.proof
        ));
    }

    #[test]
    fn miss_is_recorded_and_turn_returns() {
        let f = fixture(&[]);
        let mut turns = host(&[]);
        turns.prepare_move(3, &f.board, &f.commitment).unwrap();
        turns.confirm_own_move(3);
        assert_eq!(turns.turn(), Turn::Opponent);
        turns.apply_opponent_result(false, 9);
        assert_eq!(turns.target(3), Some(TargetCell::Missed));
        assert_eq!(turns.turn(), Turn::Local);
        assert_eq!(turns.incoming(), &[9]);
        let prepared = turns.prepare_move(4, &f.board, &f.commitment).unwrap();
        assert!(!prepared.reveal.was_hit);
    }

    #[test]
    fn pre_checks_reject_without_mutation() {
        let f = fixture(&[]);
        let mut guest = TurnCoordinator::new(LocalRole::Guest, 16, &[]);
        assert_eq!(
            guest.prepare_move(0, &f.board, &f.commitment),
            Err(SessionError::from(LocalValidation::NotYourTurn))
        );

        let mut turns = host(&[]);
        assert_eq!(
            turns.prepare_move(16, &f.board, &f.commitment),
            Err(SessionError::from(LocalValidation::TargetOutOfRange(16)))
        );
        turns.prepare_move(2, &f.board, &f.commitment).unwrap();
        assert_eq!(
            turns.prepare_move(5, &f.board, &f.commitment),
            Err(SessionError::from(LocalValidation::ShotPending))
        );
        assert_eq!(turns.target(5), Some(TargetCell::Whole));
    }

    #[test]
    fn resolved_cells_cannot_be_retargeted() {
        let f = fixture(&[]);
        let mut turns = host(&[]);
        turns.prepare_move(2, &f.board, &f.commitment).unwrap();
        turns.confirm_own_move(2);
        turns.apply_opponent_result(false, 0);
        assert_eq!(
            turns.prepare_move(2, &f.board, &f.commitment),
            Err(SessionError::from(LocalValidation::AlreadyTargeted(2)))
        );
    }

    #[test]
    fn rollback_restores_cell() {
        let f = fixture(&[]);
        let mut turns = host(&[]);
        turns.prepare_move(8, &f.board, &f.commitment).unwrap();
        turns.rollback(8);
        assert_eq!(turns.target(8), Some(TargetCell::Whole));
        assert_eq!(turns.pending(), None);
        assert_eq!(turns.turn(), Turn::Local);
        // The same cell can be fired at again.
        assert!(turns.prepare_move(8, &f.board, &f.commitment).is_ok());
    }

    #[test]
    fn is_hit_follows_committed_occupancy() {
        let turns = host(&[0, 5, 10, 15]);
        assert!(turns.is_hit(5));
        assert!(!turns.is_hit(6));
    }
}
