// The session orchestrator.
//
// `GameSession` owns everything one player needs for one game: the ledger
// connection, the notification inbox, the per-session salts, the board and
// its commitment, the phase machine, the turn coordinator, and the only
// subscription registry. Nothing else subscribes to ledger events.
//
// Two paths change state:
//
// - Actions (`place_bet`, `submit_board`, `shoot`, ...) pre-check locally,
//   call the ledger, and on success record only what the caller itself
//   decided (a selected target, a commitment, an alert). They never move
//   the phase; a rejected call leaves the session as it was.
// - `process_events` drains the inbox, drops anything the registry does
//   not admit, and feeds each admitted event through `reduce`, which works
//   on the session's current state rather than anything captured earlier.
//   Phase transitions happen only here (or in `refresh`, from a fetched
//   snapshot). On each transition the old subscription is released and
//   unsubscribed before the next phase's subscription is requested. Each
//   phase also listens for the next phase's opponent-driven traffic, and
//   the registry admits those events from the released subscription, so an
//   opponent acting first across a transition is never lost.
//
// Dropping or closing the session unsubscribes whatever is still held.

use std::sync::mpsc::Receiver;

use serde::{Deserialize, Serialize};

use broadside_board::{Board, Commitment, Extraction, SaltSet, ShipPlacement, extract};
use broadside_protocol::{
    Address, BoardSize, GameId, Hash32, LedgerEvent, LedgerRejection, Notification, Phase,
    SessionSnapshot, ShipCounts, Wager,
};

use crate::alert::Alert;
use crate::config::SessionConfig;
use crate::error::{IntegrityFailure, LocalValidation, SessionError};
use crate::ledger::{BoardValidation, Ledger};
use crate::phase::{Advance, LocalRole, PhaseMachine};
use crate::subscriptions::SubscriptionRegistry;
use crate::timeout::TimeoutMonitor;
use crate::turn::{TargetCell, TurnCoordinator};

/// How the game ended, once `GameOver` has been seen.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub winner: Address,
    pub reason: String,
    /// Set by `RewardPaid`. Differs from `winner` if the winner's board
    /// failed validation.
    pub rewarded: Option<Address>,
}

/// What one `process_events` call did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PumpReport {
    pub applied: usize,
    pub stale: usize,
    pub transitions: usize,
}

pub struct GameSession<L: Ledger> {
    ledger: L,
    inbox: Receiver<Notification>,
    config: SessionConfig,
    local: Address,
    salts: SaltSet,
    snapshot: SessionSnapshot,
    machine: PhaseMachine,
    registry: SubscriptionRegistry,
    board: Option<Board>,
    commitment: Option<Commitment>,
    extraction: Option<Extraction>,
    turns: Option<TurnCoordinator>,
    timeout: TimeoutMonitor,
    alerts: Vec<Alert>,
    outcome: Option<Outcome>,
}

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

impl<L: Ledger> GameSession<L> {
    /// Attach to an existing game. A local account that is not a player
    /// yields a session in the unauthorized state, which holds no
    /// subscription and refuses every action.
    pub fn open(
        ledger: L,
        inbox: Receiver<Notification>,
        config: SessionConfig,
        game_id: GameId,
    ) -> Result<Self, SessionError> {
        let local = ledger.account();
        let snapshot = ledger.get_session(game_id)?;
        let machine = PhaseMachine::initialize(&snapshot, local);
        let timeout = TimeoutMonitor::new(local, config.ping_window_blocks);
        let mut session = Self {
            ledger,
            inbox,
            config,
            local,
            salts: SaltSet::generate(),
            snapshot,
            machine,
            registry: SubscriptionRegistry::new(),
            board: None,
            commitment: None,
            extraction: None,
            turns: None,
            timeout,
            alerts: Vec::new(),
            outcome: None,
        };
        session.adopt_outcome();
        if session.machine.is_unauthorized() {
            return Ok(session);
        }
        log::info!(
            "{game_id}: opened as {:?} in {}",
            session.machine.role(),
            session.machine.current()
        );
        session.enter_phase()?;
        Ok(session)
    }

    /// Check the creation form, create the game, and open it as host.
    pub fn create(
        mut ledger: L,
        inbox: Receiver<Notification>,
        config: SessionConfig,
        board_side: u8,
        ship_counts: ShipCounts,
    ) -> Result<Self, SessionError> {
        let board_size = BoardSize::from_side(board_side).map_err(LocalValidation::from)?;
        ship_counts.validate().map_err(LocalValidation::from)?;
        if ship_counts.total_ships() == 0 {
            return Err(LocalValidation::NoShips.into());
        }
        if ship_counts.total_cells() > u32::from(board_size.cells()) {
            return Err(LocalValidation::FleetTooLarge {
                cells: ship_counts.total_cells(),
                board: board_size.cells(),
            }
            .into());
        }
        let result = ledger.create_game(board_size, ship_counts);
        let game_id = checked("createGame", result)?;
        log::info!("{game_id}: created {board_side}x{board_side} game");
        Self::open(ledger, inbox, config, game_id)
    }

    /// Join an open game as guest and open it.
    pub fn join(
        mut ledger: L,
        inbox: Receiver<Notification>,
        config: SessionConfig,
        game_id: GameId,
    ) -> Result<Self, SessionError> {
        let result = ledger.join_game(game_id);
        checked("joinGame", result)?;
        log::info!("{game_id}: joined");
        Self::open(ledger, inbox, config, game_id)
    }
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

impl<L: Ledger> GameSession<L> {
    pub fn game_id(&self) -> GameId {
        self.snapshot.game_id
    }

    pub fn local(&self) -> Address {
        self.local
    }

    pub fn phase(&self) -> Phase {
        self.machine.current()
    }

    pub fn role(&self) -> Option<LocalRole> {
        self.machine.role()
    }

    pub fn is_unauthorized(&self) -> bool {
        self.machine.is_unauthorized()
    }

    pub fn snapshot(&self) -> &SessionSnapshot {
        &self.snapshot
    }

    pub fn opponent(&self) -> Option<Address> {
        self.snapshot.opponent_of(self.local)
    }

    pub fn wager(&self) -> Wager {
        self.snapshot.wager
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn board(&self) -> Option<&Board> {
        self.board.as_ref()
    }

    pub fn commitment_root(&self) -> Option<Hash32> {
        self.commitment.as_ref().map(Commitment::root)
    }

    pub fn placements(&self) -> Option<&[ShipPlacement]> {
        self.extraction.as_ref().map(|e| e.placements.as_slice())
    }

    pub fn turns(&self) -> Option<&TurnCoordinator> {
        self.turns.as_ref()
    }

    pub fn is_my_turn(&self) -> bool {
        self.phase() == Phase::Play && self.turns.as_ref().is_some_and(|t| t.is_local_turn())
    }

    pub fn target(&self, index: u8) -> Option<TargetCell> {
        self.turns.as_ref().and_then(|t| t.target(index))
    }

    pub fn outcome(&self) -> Option<&Outcome> {
        self.outcome.as_ref()
    }

    pub fn is_winner(&self) -> bool {
        self.outcome.as_ref().is_some_and(|o| o.winner == self.local)
    }

    /// Drain queued alerts, oldest first.
    pub fn take_alerts(&mut self) -> Vec<Alert> {
        std::mem::take(&mut self.alerts)
    }

    /// Whether the registry currently holds a subscription for this game.
    pub fn is_subscribed(&self) -> bool {
        self.registry.held(self.game_id()).is_some()
    }
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

impl<L: Ledger> GameSession<L> {
    pub fn place_bet(&mut self, amount: Wager) -> Result<(), SessionError> {
        self.require(Phase::Betting)?;
        if amount.is_zero() {
            return Err(LocalValidation::ZeroBet.into());
        }
        let result = self.ledger.place_bet(self.game_id(), amount);
        checked("placeBet", result)?;
        log::info!("{}: bet {amount}", self.game_id());
        self.alerts.push(Alert::BetPlaced { amount });
        Ok(())
    }

    pub fn pay_wager(&mut self) -> Result<(), SessionError> {
        self.require(Phase::PayingWager)?;
        let result = self.ledger.pay_wager(self.game_id());
        checked("payWager", result)?;
        log::info!("{}: paid wager {}", self.game_id(), self.snapshot.wager);
        Ok(())
    }

    /// Flip one cell during placement. Returns the cell's new occupancy.
    pub fn toggle_cell(&mut self, index: u8) -> Result<bool, SessionError> {
        self.require(Phase::Placement)?;
        if self.commitment.is_some() {
            return Err(LocalValidation::AlreadyCommitted.into());
        }
        let board = self.board.as_mut().ok_or(IntegrityFailure::MissingBoard)?;
        Ok(board.toggle(index).map_err(LocalValidation::from)?)
    }

    /// Extract ships, commit the board, and submit the root. The commitment
    /// is kept only if the ledger accepts it, and can be made only once.
    pub fn submit_board(&mut self) -> Result<Hash32, SessionError> {
        self.require(Phase::Placement)?;
        if self.commitment.is_some() {
            return Err(LocalValidation::AlreadyCommitted.into());
        }
        let role = self.require_role()?;
        let board = self.board.as_ref().ok_or(IntegrityFailure::MissingBoard)?;

        let extraction = match extract(board, &self.snapshot.ship_counts) {
            Ok(found) => found,
            Err(mismatch) if self.config.reject_mismatched_boards => {
                return Err(LocalValidation::ShapeMismatch(mismatch).into());
            }
            Err(mismatch) => {
                log::warn!("{}: submitting mismatched board: {mismatch}", self.game_id());
                Extraction {
                    placements: Vec::new(),
                    occupied_indices: board.occupied_indices(),
                }
            }
        };
        let commitment = Commitment::commit(board);
        let root = commitment.root();

        let result = self.ledger.submit_board(self.game_id(), root);
        checked("submitBoard", result)?;
        log::info!("{}: submitted board {root}", self.game_id());

        self.turns = Some(TurnCoordinator::new(
            role,
            self.snapshot.board_size.cells(),
            &extraction.occupied_indices,
        ));
        self.commitment = Some(commitment);
        self.extraction = Some(extraction);
        Ok(root)
    }

    /// Fire at `target_index` on the opponent's board.
    pub fn shoot(&mut self, target_index: u8) -> Result<(), SessionError> {
        self.require(Phase::Play)?;
        let game_id = self.game_id();
        let (Some(turns), Some(board), Some(commitment)) = (
            self.turns.as_mut(),
            self.board.as_ref(),
            self.commitment.as_ref(),
        ) else {
            return Err(IntegrityFailure::MissingCommitment.into());
        };
        let prepared = turns.prepare_move(target_index, board, commitment)?;
        let result = self
            .ledger
            .check_and_move(game_id, &prepared.reveal, target_index);
        if let Err(rejection) = result {
            turns.rollback(target_index);
            return checked("checkAndMove", Err(rejection));
        }
        log::info!("{game_id}: fired at {target_index}");
        Ok(())
    }

    pub fn ping(&mut self) -> Result<(), SessionError> {
        self.require(Phase::Play)?;
        let result = self.ledger.ping_opponent(self.game_id());
        checked("pingOpponent", result)?;
        self.alerts.push(self.timeout.send_ping());
        Ok(())
    }

    /// Reveal every occupied cell and the ship list. Winner only.
    pub fn validate_board(&mut self) -> Result<(), SessionError> {
        self.require(Phase::Validation)?;
        if !self.is_winner() {
            return Err(LocalValidation::NotWinner.into());
        }
        let (Some(board), Some(commitment), Some(extraction)) = (
            self.board.as_ref(),
            self.commitment.as_ref(),
            self.extraction.as_ref(),
        ) else {
            return Err(IntegrityFailure::MissingCommitment.into());
        };

        let mut salts = Vec::with_capacity(extraction.occupied_indices.len());
        let mut proofs = Vec::with_capacity(extraction.occupied_indices.len());
        for &index in &extraction.occupied_indices {
            let cell = board
                .cell(index)
                .ok_or(IntegrityFailure::MissingSalt(index))?;
            salts.push(cell.salt);
            proofs.push(commitment.prove(index).map_err(IntegrityFailure::from)?);
        }
        let validation = BoardValidation {
            placements: extraction.placements.clone(),
            occupied_indices: extraction.occupied_indices.clone(),
            salts,
            proofs,
        };

        let result = self.ledger.validate_board(self.game_id(), &validation);
        checked("validateBoard", result)?;
        log::info!(
            "{}: validated {} ships",
            self.game_id(),
            validation.placements.len()
        );
        Ok(())
    }

    /// Re-read the ledger's record and catch up with it.
    pub fn refresh(&mut self) -> Result<Advance, SessionError> {
        self.require_role()?;
        let snapshot = self.ledger.get_session(self.game_id())?;
        let advance = self.machine.sync(&snapshot, self.local);
        self.snapshot.guest = snapshot.guest;
        self.snapshot.wager = snapshot.wager;
        self.snapshot.winner = snapshot.winner;
        self.snapshot.rewarded = snapshot.rewarded;
        self.adopt_outcome();
        if self.machine.is_unauthorized() {
            self.release_subscription();
            return Ok(Advance::Unchanged);
        }
        if let Advance::Advanced { .. } = advance {
            self.snapshot.phase = self.machine.current();
            self.enter_phase()?;
        }
        Ok(advance)
    }

    /// Release the active subscription. Called again by `Drop`.
    pub fn close(&mut self) {
        if self.release_subscription() {
            log::info!("{}: closed", self.game_id());
        }
    }
}

// ---------------------------------------------------------------------------
// Event pump and reducer
// ---------------------------------------------------------------------------

impl<L: Ledger> GameSession<L> {
    /// Drain the inbox and apply every admitted notification in order.
    pub fn process_events(&mut self) -> Result<PumpReport, SessionError> {
        let mut report = PumpReport::default();
        let queued: Vec<Notification> = self.inbox.try_iter().collect();
        for note in queued {
            if !self.registry.admits(&note) {
                log::debug!(
                    "{}: dropped stale {:?} from subscription {}",
                    self.game_id(),
                    note.event.class(),
                    note.subscription.0
                );
                report.stale += 1;
                continue;
            }
            report.applied += 1;
            if self.reduce(&note.event)? {
                report.transitions += 1;
            }
        }
        Ok(report)
    }

    /// Apply one admitted event. Returns whether the phase moved.
    fn reduce(&mut self, event: &LedgerEvent) -> Result<bool, SessionError> {
        match event {
            LedgerEvent::GameJoined { guest, .. } => {
                self.snapshot.guest = Some(*guest);
            }
            LedgerEvent::BetPlaced {
                bettor,
                amount,
                is_matched,
                ..
            } => {
                if *is_matched {
                    self.snapshot.wager = *amount;
                } else if *bettor != self.local {
                    self.alerts.push(Alert::OpponentBet { amount: *amount });
                }
            }
            LedgerEvent::MovePlayed {
                mover,
                target_index,
                was_hit,
                ..
            } => match self.turns.as_mut() {
                Some(turns) if *mover == self.local => turns.confirm_own_move(*target_index),
                Some(turns) => turns.apply_opponent_result(*was_hit, *target_index),
                None => log::warn!("{}: move observed without a board", self.snapshot.game_id),
            },
            LedgerEvent::PingSent { issuer, .. } => {
                if let Some(alert) = self.timeout.on_external_ping(*issuer) {
                    self.alerts.push(alert);
                }
            }
            LedgerEvent::GameOver { winner, reason, .. } => {
                log::info!("{}: game over, winner {winner}: {reason}", self.game_id());
                self.snapshot.winner = Some(*winner);
                self.outcome = Some(Outcome {
                    winner: *winner,
                    reason: reason.clone(),
                    rewarded: None,
                });
                self.alerts.push(Alert::GameOver {
                    winner: *winner,
                    won: *winner == self.local,
                    reason: reason.clone(),
                });
            }
            LedgerEvent::RewardPaid { winner, .. } => {
                self.snapshot.rewarded = Some(*winner);
                let outcome = self.outcome.get_or_insert_with(|| Outcome {
                    winner: *winner,
                    reason: String::new(),
                    rewarded: None,
                });
                outcome.rewarded = Some(*winner);
            }
            LedgerEvent::GameCreated { .. }
            | LedgerEvent::WagerPaid { .. }
            | LedgerEvent::GameStarted { .. } => {}
        }

        match self.machine.advance(event) {
            Advance::Advanced { .. } => {
                self.snapshot.phase = self.machine.current();
                self.enter_phase()?;
                Ok(true)
            }
            Advance::Unchanged => Ok(false),
        }
    }

    /// Set up the current phase: a fresh board on entering placement, and
    /// the phase's subscription in place of the previous one.
    fn enter_phase(&mut self) -> Result<(), SessionError> {
        let phase = self.machine.current();
        if phase == Phase::Placement && self.board.is_none() {
            let board = Board::new(self.snapshot.board_size, &self.salts)
                .map_err(LocalValidation::from)?;
            self.board = Some(board);
        }

        let game_id = self.game_id();
        self.release_subscription();
        let classes = phase.listened_events();
        if classes.is_empty() {
            return Ok(());
        }
        let result = self.ledger.subscribe(game_id, classes);
        let id = checked("subscribe", result)?;
        if let Err(e) = self.registry.acquire(game_id, classes, id) {
            self.ledger.unsubscribe(id);
            return Err(e.into());
        }
        Ok(())
    }

    /// Fill in whatever the snapshot knows about the end of the game that
    /// no event has told us yet.
    fn adopt_outcome(&mut self) {
        let Some(winner) = self.snapshot.winner else {
            return;
        };
        let outcome = self.outcome.get_or_insert_with(|| Outcome {
            winner,
            reason: String::new(),
            rewarded: None,
        });
        if outcome.rewarded.is_none() {
            outcome.rewarded = self.snapshot.rewarded;
        }
    }

    /// Returns whether a subscription was held.
    fn release_subscription(&mut self) -> bool {
        match self.registry.release(self.game_id()) {
            Some(id) => {
                self.ledger.unsubscribe(id);
                true
            }
            None => false,
        }
    }

    fn require_role(&self) -> Result<LocalRole, SessionError> {
        self.machine
            .role()
            .ok_or_else(|| SessionError::Unauthorized(self.config.unauthorized_message.clone()))
    }

    fn require(&self, phase: Phase) -> Result<(), SessionError> {
        self.require_role()?;
        let actual = self.machine.current();
        if actual != phase {
            return Err(LocalValidation::WrongPhase {
                expected: phase,
                actual,
            }
            .into());
        }
        Ok(())
    }
}

impl<L: Ledger> Drop for GameSession<L> {
    fn drop(&mut self) {
        self.close();
    }
}

/// Log and convert a ledger rejection.
fn checked<T>(call: &str, result: Result<T, LedgerRejection>) -> Result<T, SessionError> {
    result.map_err(|rejection| {
        log::warn!("{call} rejected ({:?}): {rejection}", rejection.kind);
        SessionError::Ledger(rejection)
    })
}
