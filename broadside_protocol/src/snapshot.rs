// Read-side views of ledger game records.
//
// `SessionSnapshot` is what `getSession` returns for one game: everything a
// client needs to decide its role and starting phase. `SessionSummary` is
// the lighter row returned by `listOpenGames`.

use serde::{Deserialize, Serialize};

use crate::phase::Phase;
use crate::types::{Address, BoardSize, GameId, ShipCounts, Wager};

/// Full record of one game as stored by the ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub game_id: GameId,
    pub phase: Phase,
    pub host: Address,
    /// `None` until a guest joins.
    pub guest: Option<Address>,
    pub board_size: BoardSize,
    pub ship_counts: ShipCounts,
    /// Agreed wager; zero until a bet is matched.
    pub wager: Wager,
    /// Set when play ends.
    #[serde(default)]
    pub winner: Option<Address>,
    /// Who was paid out. Differs from `winner` if the winner's board failed
    /// validation.
    #[serde(default)]
    pub rewarded: Option<Address>,
}

impl SessionSnapshot {
    /// True if `address` is the host or the guest of this game.
    pub fn is_player(&self, address: Address) -> bool {
        self.host == address || self.guest == Some(address)
    }

    /// The other player from `address`'s point of view, if both are known.
    pub fn opponent_of(&self, address: Address) -> Option<Address> {
        if self.host == address {
            self.guest
        } else if self.guest == Some(address) {
            Some(self.host)
        } else {
            None
        }
    }
}

/// One row of the open-games listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub game_id: GameId,
    pub host: Address,
    pub phase: Phase,
}
