// Ledger rejections.
//
// The ledger reverts calls with free-form reason strings. At this boundary
// they are mapped onto a closed `LedgerErrorKind` so callers can branch on
// them; the raw reason is always kept and is what gets shown to the user.
// Reasons that match nothing in `KNOWN_REASONS` become `Other`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Known categories of ledger revert reasons.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LedgerErrorKind {
    GameNotFound,
    OwnGame,
    GameFull,
    NotAPlayer,
    WrongPhase,
    NotYourTurn,
    InvalidBoardSize,
    InvalidShipCounts,
    InvalidBet,
    WrongWagerAmount,
    BoardAlreadySubmitted,
    CellAlreadyTargeted,
    InvalidProof,
    InvalidBoard,
    PingTooEarly,
    /// Anything not recognised; the raw reason is still carried.
    Other,
}

/// Substring (lowercase) to kind. Checked in order; the first match wins,
/// so more specific phrases come before generic ones.
const KNOWN_REASONS: &[(&str, LedgerErrorKind)] = &[
    ("does not exist", LedgerErrorKind::GameNotFound),
    ("not found", LedgerErrorKind::GameNotFound),
    ("own game", LedgerErrorKind::OwnGame),
    ("game is full", LedgerErrorKind::GameFull),
    ("already joined", LedgerErrorKind::GameFull),
    ("not a player", LedgerErrorKind::NotAPlayer),
    ("not your turn", LedgerErrorKind::NotYourTurn),
    ("wrong phase", LedgerErrorKind::WrongPhase),
    ("invalid game status", LedgerErrorKind::WrongPhase),
    ("board size", LedgerErrorKind::InvalidBoardSize),
    ("ship count", LedgerErrorKind::InvalidShipCounts),
    ("wager amount", LedgerErrorKind::WrongWagerAmount),
    ("already paid", LedgerErrorKind::WrongWagerAmount),
    ("bet", LedgerErrorKind::InvalidBet),
    ("already submitted", LedgerErrorKind::BoardAlreadySubmitted),
    ("already targeted", LedgerErrorKind::CellAlreadyTargeted),
    ("already hit", LedgerErrorKind::CellAlreadyTargeted),
    ("proof", LedgerErrorKind::InvalidProof),
    ("salt", LedgerErrorKind::InvalidProof),
    ("invalid board", LedgerErrorKind::InvalidBoard),
    ("board shape", LedgerErrorKind::InvalidBoard),
    ("ping", LedgerErrorKind::PingTooEarly),
];

/// A ledger call that reverted.
#[derive(Clone, Debug, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{reason}")]
pub struct LedgerRejection {
    pub kind: LedgerErrorKind,
    pub reason: String,
}

impl LedgerRejection {
    /// Classify a raw revert reason.
    pub fn from_reason(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        let lowered = reason.to_lowercase();
        let kind = KNOWN_REASONS
            .iter()
            .find(|(needle, _)| lowered.contains(needle))
            .map_or(LedgerErrorKind::Other, |&(_, kind)| kind);
        Self { kind, reason }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_reasons_are_classified() {
        let cases = [
            ("You cannot join your own game", LedgerErrorKind::OwnGame),
            ("Not your turn", LedgerErrorKind::NotYourTurn),
            ("Invalid board size", LedgerErrorKind::InvalidBoardSize),
            ("Bet must be greater than zero", LedgerErrorKind::InvalidBet),
            ("Wrong wager amount", LedgerErrorKind::WrongWagerAmount),
            ("Invalid merkle proof", LedgerErrorKind::InvalidProof),
            ("Cell already targeted", LedgerErrorKind::CellAlreadyTargeted),
            ("Board already submitted", LedgerErrorKind::BoardAlreadySubmitted),
            ("Ping window not elapsed", LedgerErrorKind::PingTooEarly),
        ];
        for (reason, kind) in cases {
            let rejection = LedgerRejection::from_reason(reason);
            assert_eq!(rejection.kind, kind, "reason {reason:?}");
            assert_eq!(rejection.to_string(), reason);
        }
    }

    #[test]
    fn unknown_reason_keeps_raw_message() {
        let rejection = LedgerRejection::from_reason("execution reverted: 0x4e487b71");
        assert_eq!(rejection.kind, LedgerErrorKind::Other);
        assert_eq!(rejection.reason, "execution reverted: 0x4e487b71");
    }
}
