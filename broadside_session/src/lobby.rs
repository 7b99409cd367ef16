// Open-games listing.

use serde::Serialize;

use broadside_protocol::{Address, GameId, Phase};

use crate::error::SessionError;
use crate::ledger::Ledger;

/// One joinable game as shown in the lobby.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LobbyRow {
    pub game_id: GameId,
    pub host: Address,
    /// `0x123...abcd` form of `host`.
    pub host_short: String,
    pub phase: Phase,
}

/// Games waiting for an opponent, newest first.
pub fn open_games<L: Ledger + ?Sized>(ledger: &L) -> Result<Vec<LobbyRow>, SessionError> {
    let mut rows: Vec<LobbyRow> = ledger
        .list_open_games()?
        .into_iter()
        .map(|summary| LobbyRow {
            game_id: summary.game_id,
            host: summary.host,
            host_short: summary.host.short(),
            phase: summary.phase,
        })
        .collect();
    rows.sort_by(|a, b| b.game_id.cmp(&a.game_id));
    Ok(rows)
}
