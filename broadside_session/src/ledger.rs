// The ledger as seen from one local account.
//
// A `Ledger` is a connection to the external game program, already bound to
// the account that signs its calls (key management is somebody else's job).
// Calls either succeed or revert with a `LedgerRejection`. Success only means
// the ledger accepted the transaction: the session does not change phase
// until the matching event is observed.
//
// Events flow the other way through an `mpsc` channel. `subscribe` registers
// interest in some event classes for one game and returns a
// `SubscriptionId`; every matching event is then pushed onto the receiver
// the session was opened with, tagged with that id. `unsubscribe` cannot
// fail, but a notification already in flight may still arrive afterwards,
// which is why the session filters by id on its side as well.

use serde::{Deserialize, Serialize};

use broadside_board::{Proof, ShipPlacement};
use broadside_protocol::{
    Address, BoardSize, EventClass, GameId, Hash32, LedgerRejection, SessionSnapshot,
    SessionSummary, ShipCounts, SubscriptionId, Wager,
};

/// Disclosure of the opponent's previous target on our board, sent with
/// every move.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveReveal {
    pub was_hit: bool,
    pub salt: Hash32,
    pub proof: Proof,
}

impl MoveReveal {
    /// Sent on the first move of a game, when there is nothing to reveal.
    pub fn sentinel() -> Self {
        Self {
            was_hit: false,
            salt: Hash32::ZERO,
            proof: Proof::empty(),
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.salt.is_zero() && self.proof.is_empty()
    }
}

/// The winner's full board disclosure. `salts[i]` and `proofs[i]` belong to
/// `occupied_indices[i]`, which is ascending.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardValidation {
    pub placements: Vec<ShipPlacement>,
    pub occupied_indices: Vec<u8>,
    pub salts: Vec<Hash32>,
    pub proofs: Vec<Proof>,
}

pub trait Ledger {
    /// The account this connection signs for.
    fn account(&self) -> Address;

    fn create_game(
        &mut self,
        board_size: BoardSize,
        ship_counts: ShipCounts,
    ) -> Result<GameId, LedgerRejection>;
    fn join_game(&mut self, game_id: GameId) -> Result<(), LedgerRejection>;
    fn place_bet(&mut self, game_id: GameId, amount: Wager) -> Result<(), LedgerRejection>;
    fn pay_wager(&mut self, game_id: GameId) -> Result<(), LedgerRejection>;
    fn submit_board(&mut self, game_id: GameId, root: Hash32) -> Result<(), LedgerRejection>;
    fn check_and_move(
        &mut self,
        game_id: GameId,
        reveal: &MoveReveal,
        target_index: u8,
    ) -> Result<(), LedgerRejection>;
    fn ping_opponent(&mut self, game_id: GameId) -> Result<(), LedgerRejection>;
    fn validate_board(
        &mut self,
        game_id: GameId,
        validation: &BoardValidation,
    ) -> Result<(), LedgerRejection>;

    fn get_session(&self, game_id: GameId) -> Result<SessionSnapshot, LedgerRejection>;
    fn list_open_games(&self) -> Result<Vec<SessionSummary>, LedgerRejection>;

    fn subscribe(
        &mut self,
        game_id: GameId,
        classes: &[EventClass],
    ) -> Result<SubscriptionId, LedgerRejection>;
    fn unsubscribe(&mut self, id: SubscriptionId);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_reveal_is_zero_and_empty() {
        let reveal = MoveReveal::sentinel();
        assert!(reveal.is_sentinel());
        assert!(!reveal.was_hit);
        assert_eq!(reveal.salt, Hash32::ZERO);
        assert!(reveal.proof.is_empty());
    }

    #[test]
    fn real_reveal_is_not_sentinel() {
        let reveal = MoveReveal {
            was_hit: true,
            salt: Hash32([3; 32]),
            proof: Proof(vec![Hash32([4; 32])]),
        };
        assert!(!reveal.is_sentinel());
    }
}
