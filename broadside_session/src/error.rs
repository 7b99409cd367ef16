// Session error taxonomy.
//
// Four kinds of failure reach a caller:
// - `Ledger`: the ledger reverted. The raw reason is shown verbatim and the
//   session is left exactly as it was before the call.
// - `Validation`: caught locally before any ledger call.
// - `Integrity`: local data the session relies on is missing (a commitment,
//   a salt, a proof). Aborts the operation; the user only sees a generic
//   internal-error message.
// - `Unauthorized`: the local account is not a player in this game.
//
// Stale notifications are not errors at all. They are dropped by the event
// pump and only counted.

use thiserror::Error;

use broadside_board::{BoardError, CommitError, ShapeMismatch};
use broadside_protocol::{DomainError, LedgerRejection, Phase};

/// Rejected before reaching the ledger.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LocalValidation {
    #[error("{0}")]
    Domain(#[from] DomainError),
    #[error("a game needs at least one ship")]
    NoShips,
    #[error("ships need {cells} cells but the board has only {board}")]
    FleetTooLarge { cells: u32, board: u16 },
    #[error("Bet must be greater than zero")]
    ZeroBet,
    #[error("this action needs the {expected} phase, the game is in {actual}")]
    WrongPhase { expected: Phase, actual: Phase },
    #[error("it is not your turn")]
    NotYourTurn,
    #[error("your last shot has not been confirmed yet")]
    ShotPending,
    #[error("cell {0} is outside the board")]
    TargetOutOfRange(u8),
    #[error("cell {0} has already been targeted")]
    AlreadyTargeted(u8),
    #[error("{0}")]
    Board(#[from] BoardError),
    #[error("ships do not match the game's inventory: {0}")]
    ShapeMismatch(#[from] ShapeMismatch),
    #[error("the board has already been committed")]
    AlreadyCommitted,
    #[error("only the winner validates their board")]
    NotWinner,
}

/// Local state the session depends on is missing or inconsistent.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum IntegrityFailure {
    #[error("no board is held for this session")]
    MissingBoard,
    #[error("no board commitment is held for this session")]
    MissingCommitment,
    #[error("no salt is held for cell {0}")]
    MissingSalt(u8),
    #[error("{0}")]
    Proof(#[from] CommitError),
    #[error("a subscription for this game is still held")]
    SubscriptionHeld,
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error(transparent)]
    Ledger(#[from] LedgerRejection),
    #[error(transparent)]
    Validation(#[from] LocalValidation),
    #[error("internal error: {0}")]
    Integrity(#[from] IntegrityFailure),
    /// Carries the configured text shown to non-players.
    #[error("{0}")]
    Unauthorized(String),
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl SessionError {
    /// The text a user should see for this error.
    pub fn user_message(&self) -> String {
        match self {
            SessionError::Ledger(rejection) => rejection.reason.clone(),
            SessionError::Validation(v) => v.to_string(),
            SessionError::Integrity(_) => "internal error".into(),
            SessionError::Unauthorized(text) => text.clone(),
            SessionError::Config(e) => format!("invalid configuration: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use broadside_protocol::LedgerErrorKind;

    #[test]
    fn ledger_reason_shown_verbatim() {
        let err = SessionError::from(LedgerRejection::from_reason("Not your turn"));
        assert_eq!(err.user_message(), "Not your turn");
        assert!(matches!(
            err,
            SessionError::Ledger(LedgerRejection {
                kind: LedgerErrorKind::NotYourTurn,
                ..
            })
        ));
    }

    #[test]
    fn integrity_failures_stay_generic() {
        let err = SessionError::from(IntegrityFailure::MissingSalt(3));
        assert_eq!(err.user_message(), "internal error");
        assert_eq!(err.to_string(), "internal error: no salt is held for cell 3");
    }

    #[test]
    fn validation_text() {
        let err = SessionError::from(LocalValidation::ZeroBet);
        assert_eq!(err.user_message(), "Bet must be greater than zero");
        let err = SessionError::from(LocalValidation::WrongPhase {
            expected: Phase::Play,
            actual: Phase::Betting,
        });
        assert_eq!(
            err.user_message(),
            "this action needs the play phase, the game is in betting"
        );
    }
}
