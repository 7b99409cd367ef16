// broadside_session: one player's view of one game.
//
// Drives a game from lobby to payout against an external ledger. The
// ledger is authoritative for everything: this crate pre-checks actions so
// obvious mistakes never cost a transaction, and otherwise only follows the
// facts the ledger reports.
//
// Module overview:
// - `session.rs`:       `GameSession`, the orchestrator. Owns all state and
//                       the only subscription registry; applies events
//                       through a reducer.
// - `phase.rs`:         `PhaseMachine`, the monotonic lifecycle tracker.
// - `turn.rs`:          `TurnCoordinator`, shot pre-checks, per-move
//                       reveals, and the opponent-board view.
// - `timeout.rs`:       `TimeoutMonitor`, ping alerts.
// - `subscriptions.rs`: `SubscriptionRegistry`, the stale-event boundary.
// - `ledger.rs`:        The `Ledger` trait and its call payloads.
// - `lobby.rs`:         Open-games listing.
// - `alert.rs`:         User-facing one-shot notices.
// - `config.rs`:        `SessionConfig`, JSON-loadable knobs.
// - `error.rs`:         `SessionError` and its local-validation and
//                       integrity sub-kinds.
//
// Everything is single-threaded. Ledger notifications arrive on an `mpsc`
// receiver that the caller polls via `GameSession::process_events`.

pub mod alert;
pub mod config;
pub mod error;
pub mod ledger;
pub mod lobby;
pub mod phase;
pub mod session;
pub mod subscriptions;
pub mod timeout;
pub mod turn;

pub use alert::Alert;
pub use config::SessionConfig;
pub use error::{IntegrityFailure, LocalValidation, SessionError};
pub use ledger::{BoardValidation, Ledger, MoveReveal};
pub use lobby::{LobbyRow, open_games};
pub use phase::{Advance, LocalRole, PhaseMachine};
pub use session::{GameSession, Outcome, PumpReport};
pub use subscriptions::SubscriptionRegistry;
pub use timeout::TimeoutMonitor;
pub use turn::{PreparedMove, TargetCell, Turn, TurnCoordinator};
