// Ledger events and the subscription envelope they arrive in.
//
// `LedgerEvent` is the full vocabulary of notifications the ledger emits
// about a game. `EventClass` is the fieldless discriminant used to subscribe
// to a subset of them. A `Notification` pairs an event with the id of the
// subscription that delivered it, so the receiving session can tell a live
// notification from one still in flight after its subscription was dropped.

use serde::{Deserialize, Serialize};

use crate::types::{Address, GameId, Wager};

/// Discriminant of `LedgerEvent`, used as a subscription filter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventClass {
    GameCreated,
    GameJoined,
    BetPlaced,
    WagerPaid,
    GameStarted,
    MovePlayed,
    PingSent,
    GameOver,
    RewardPaid,
}

/// An event emitted by the ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    /// A host opened a new game.
    GameCreated { game_id: GameId, host: Address },
    /// A guest joined; betting begins.
    GameJoined {
        game_id: GameId,
        host: Address,
        guest: Address,
    },
    /// A bet was proposed. `is_matched` is true once both bets agree, which
    /// fixes the wager and ends betting.
    BetPlaced {
        game_id: GameId,
        bettor: Address,
        amount: Wager,
        is_matched: bool,
    },
    /// Both players have paid the wager.
    WagerPaid { game_id: GameId },
    /// Both boards are committed; play begins with the host.
    GameStarted { game_id: GameId },
    /// `mover` fired at `target_index`. `was_hit` is the mover's reveal of
    /// whether the opponent's previous shot hit (meaningless on a game's
    /// first move).
    MovePlayed {
        game_id: GameId,
        mover: Address,
        target_index: u8,
        was_hit: bool,
    },
    /// `issuer` asked the opponent to act within the ledger's block window.
    PingSent { game_id: GameId, issuer: Address },
    /// Play ended; the winner must now validate their board.
    GameOver {
        game_id: GameId,
        winner: Address,
        reason: String,
    },
    /// Validation passed and the stake was paid out.
    RewardPaid { game_id: GameId, winner: Address },
}

impl LedgerEvent {
    pub fn class(&self) -> EventClass {
        match self {
            LedgerEvent::GameCreated { .. } => EventClass::GameCreated,
            LedgerEvent::GameJoined { .. } => EventClass::GameJoined,
            LedgerEvent::BetPlaced { .. } => EventClass::BetPlaced,
            LedgerEvent::WagerPaid { .. } => EventClass::WagerPaid,
            LedgerEvent::GameStarted { .. } => EventClass::GameStarted,
            LedgerEvent::MovePlayed { .. } => EventClass::MovePlayed,
            LedgerEvent::PingSent { .. } => EventClass::PingSent,
            LedgerEvent::GameOver { .. } => EventClass::GameOver,
            LedgerEvent::RewardPaid { .. } => EventClass::RewardPaid,
        }
    }

    pub fn game_id(&self) -> GameId {
        match self {
            LedgerEvent::GameCreated { game_id, .. }
            | LedgerEvent::GameJoined { game_id, .. }
            | LedgerEvent::BetPlaced { game_id, .. }
            | LedgerEvent::WagerPaid { game_id }
            | LedgerEvent::GameStarted { game_id }
            | LedgerEvent::MovePlayed { game_id, .. }
            | LedgerEvent::PingSent { game_id, .. }
            | LedgerEvent::GameOver { game_id, .. }
            | LedgerEvent::RewardPaid { game_id, .. } => *game_id,
        }
    }
}

/// Handle for one active event subscription, assigned by the ledger adapter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubscriptionId(pub u64);

/// An event as delivered to a session, tagged with its subscription.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub subscription: SubscriptionId,
    pub event: LedgerEvent,
}
