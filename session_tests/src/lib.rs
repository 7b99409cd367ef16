// Test-only in-memory ledger for session integration tests.
//
// `LedgerWorld` stands in for the external game program. It keeps every
// game record, enforces enough of the rules to catch a misbehaving client
// (turn order, sentinel-only-once, Merkle proofs against submitted roots,
// ship inventory at validation), and fans events out to subscriptions over
// the same `mpsc` channels a real adapter would use. Each account gets its
// own `AccountLedger` handle implementing `broadside_session::Ledger`, so
// two real `GameSession`s can play each other in one thread.
//
// Test knobs: `inject` delivers an arbitrary notification (for stale-event
// tests) and `reject_next` makes the next state-changing call revert.
//
// See also: `tests/full_game.rs` for the scenarios.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;
use std::sync::mpsc::{self, Receiver, Sender};

use broadside_board::{ShipPlacement, verify};
use broadside_protocol::{
    Address, BoardSize, EventClass, GameId, Hash32, LedgerEvent, LedgerRejection, Notification,
    Phase, SessionSnapshot, SessionSummary, ShipCounts, SubscriptionId, Wager,
};
use broadside_session::{BoardValidation, GameSession, Ledger, MoveReveal, SessionConfig};

/// Deterministic test address with every byte set to `n`.
pub fn addr(n: u8) -> Address {
    Address([n; 20])
}

fn reject(reason: &str) -> LedgerRejection {
    LedgerRejection::from_reason(reason)
}

// ---------------------------------------------------------------------------
// World state
// ---------------------------------------------------------------------------

struct GameRecord {
    snapshot: SessionSnapshot,
    /// Unmatched bet: (bettor, amount).
    open_bet: Option<(Address, Wager)>,
    paid: BTreeSet<Address>,
    roots: BTreeMap<Address, Hash32>,
    /// Last accepted move: (mover, target).
    last_move: Option<(Address, u8)>,
    targeted: BTreeMap<Address, BTreeSet<u8>>,
    hits_taken: BTreeMap<Address, u32>,
}

impl GameRecord {
    fn require_phase(&self, phase: Phase) -> Result<(), LedgerRejection> {
        if self.snapshot.phase == phase {
            Ok(())
        } else {
            Err(reject("Invalid game status"))
        }
    }

    fn require_player(&self, account: Address) -> Result<Address, LedgerRejection> {
        self.snapshot
            .opponent_of(account)
            .ok_or_else(|| reject("You are not a player"))
    }
}

struct Subscription {
    game_id: GameId,
    classes: Vec<EventClass>,
    account: Address,
}

#[derive(Default)]
struct WorldState {
    next_game: u64,
    next_subscription: u64,
    games: BTreeMap<GameId, GameRecord>,
    subscriptions: BTreeMap<SubscriptionId, Subscription>,
    outboxes: BTreeMap<Address, Sender<Notification>>,
    events: Vec<LedgerEvent>,
    pending_rejection: Option<String>,
    move_calls: usize,
}

impl WorldState {
    fn game_mut(&mut self, game_id: GameId) -> Result<&mut GameRecord, LedgerRejection> {
        self.games
            .get_mut(&game_id)
            .ok_or_else(|| reject("Game does not exist"))
    }

    fn take_injected_rejection(&mut self) -> Result<(), LedgerRejection> {
        match self.pending_rejection.take() {
            Some(reason) => Err(reject(&reason)),
            None => Ok(()),
        }
    }

    fn emit(&mut self, event: LedgerEvent) {
        for (&id, sub) in &self.subscriptions {
            if sub.game_id == event.game_id() && sub.classes.contains(&event.class()) {
                if let Some(outbox) = self.outboxes.get(&sub.account) {
                    let _ = outbox.send(Notification {
                        subscription: id,
                        event: event.clone(),
                    });
                }
            }
        }
        self.events.push(event);
    }
}

/// Shared handle to the simulated ledger.
#[derive(Clone, Default)]
pub struct LedgerWorld {
    state: Rc<RefCell<WorldState>>,
}

impl LedgerWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// A ledger connection for `account` and the inbox its events arrive on.
    pub fn connect(&self, account: Address) -> (AccountLedger, Receiver<Notification>) {
        let (tx, rx) = mpsc::channel();
        self.state.borrow_mut().outboxes.insert(account, tx);
        (
            AccountLedger {
                world: self.clone(),
                account,
            },
            rx,
        )
    }

    /// A second connection for `account` that shares its identity but not
    /// its inbox. For calling the ledger behind a session's back.
    pub fn ledger_for(&self, account: Address) -> AccountLedger {
        AccountLedger {
            world: self.clone(),
            account,
        }
    }

    /// Every event emitted so far, in order.
    pub fn events(&self) -> Vec<LedgerEvent> {
        self.state.borrow().events.clone()
    }

    pub fn subscriptions_of(&self, account: Address) -> usize {
        self.state
            .borrow()
            .subscriptions
            .values()
            .filter(|s| s.account == account)
            .count()
    }

    /// Ids of `account`'s live subscriptions, oldest first.
    pub fn held_subscriptions(&self, account: Address) -> Vec<SubscriptionId> {
        self.state
            .borrow()
            .subscriptions
            .iter()
            .filter(|(_, s)| s.account == account)
            .map(|(&id, _)| id)
            .collect()
    }

    pub fn subscription_count(&self) -> usize {
        self.state.borrow().subscriptions.len()
    }

    pub fn phase_of(&self, game_id: GameId) -> Option<Phase> {
        self.state
            .borrow()
            .games
            .get(&game_id)
            .map(|g| g.snapshot.phase)
    }

    pub fn move_calls(&self) -> usize {
        self.state.borrow().move_calls
    }

    /// Make the next state-changing call revert with `reason`.
    pub fn reject_next(&self, reason: &str) {
        self.state.borrow_mut().pending_rejection = Some(reason.into());
    }

    /// Push a notification straight into `account`'s inbox.
    pub fn inject(&self, account: Address, note: Notification) {
        if let Some(outbox) = self.state.borrow().outboxes.get(&account) {
            let _ = outbox.send(note);
        }
    }
}

/// One account's connection to the world.
pub struct AccountLedger {
    world: LedgerWorld,
    account: Address,
}

impl AccountLedger {
    fn with_game<T>(
        &self,
        game_id: GameId,
        f: impl FnOnce(&mut WorldState, Address) -> Result<T, LedgerRejection>,
    ) -> Result<T, LedgerRejection> {
        let mut state = self.world.state.borrow_mut();
        state.take_injected_rejection()?;
        state.game_mut(game_id)?;
        f(&mut *state, self.account)
    }
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

impl Ledger for AccountLedger {
    fn account(&self) -> Address {
        self.account
    }

    fn create_game(
        &mut self,
        board_size: BoardSize,
        ship_counts: ShipCounts,
    ) -> Result<GameId, LedgerRejection> {
        let mut state = self.world.state.borrow_mut();
        state.take_injected_rejection()?;
        if ship_counts.validate().is_err()
            || ship_counts.total_ships() == 0
            || ship_counts.total_cells() > u32::from(board_size.cells())
        {
            return Err(reject("Invalid ship count"));
        }
        state.next_game += 1;
        let game_id = GameId(state.next_game);
        state.games.insert(
            game_id,
            GameRecord {
                snapshot: SessionSnapshot {
                    game_id,
                    phase: Phase::AwaitingOpponent,
                    host: self.account,
                    guest: None,
                    board_size,
                    ship_counts,
                    wager: Wager(0),
                    winner: None,
                    rewarded: None,
                },
                open_bet: None,
                paid: BTreeSet::new(),
                roots: BTreeMap::new(),
                last_move: None,
                targeted: BTreeMap::new(),
                hits_taken: BTreeMap::new(),
            },
        );
        state.emit(LedgerEvent::GameCreated {
            game_id,
            host: self.account,
        });
        Ok(game_id)
    }

    fn join_game(&mut self, game_id: GameId) -> Result<(), LedgerRejection> {
        self.with_game(game_id, |state, account| {
            let game = state.game_mut(game_id)?;
            if game.snapshot.host == account {
                return Err(reject("You cannot join your own game"));
            }
            if game.snapshot.guest.is_some() {
                return Err(reject("Game is full"));
            }
            game.snapshot.guest = Some(account);
            game.snapshot.phase = Phase::Betting;
            let host = game.snapshot.host;
            state.emit(LedgerEvent::GameJoined {
                game_id,
                host,
                guest: account,
            });
            Ok(())
        })
    }

    fn place_bet(&mut self, game_id: GameId, amount: Wager) -> Result<(), LedgerRejection> {
        self.with_game(game_id, |state, account| {
            let game = state.game_mut(game_id)?;
            game.require_phase(Phase::Betting)?;
            game.require_player(account)?;
            if amount.is_zero() {
                return Err(reject("Bet must be greater than zero"));
            }
            let is_matched = match game.open_bet {
                Some((bettor, open)) if bettor != account && amount == open => true,
                Some((bettor, open)) if bettor != account && amount < open => {
                    return Err(reject("Bet must match or raise the current bet"));
                }
                _ => false,
            };
            if is_matched {
                game.open_bet = None;
                game.snapshot.wager = amount;
                game.snapshot.phase = Phase::PayingWager;
            } else {
                game.open_bet = Some((account, amount));
            }
            state.emit(LedgerEvent::BetPlaced {
                game_id,
                bettor: account,
                amount,
                is_matched,
            });
            Ok(())
        })
    }

    fn pay_wager(&mut self, game_id: GameId) -> Result<(), LedgerRejection> {
        self.with_game(game_id, |state, account| {
            let game = state.game_mut(game_id)?;
            game.require_phase(Phase::PayingWager)?;
            game.require_player(account)?;
            if !game.paid.insert(account) {
                return Err(reject("Wager already paid"));
            }
            if game.paid.len() == 2 {
                game.snapshot.phase = Phase::Placement;
                state.emit(LedgerEvent::WagerPaid { game_id });
            }
            Ok(())
        })
    }

    fn submit_board(&mut self, game_id: GameId, root: Hash32) -> Result<(), LedgerRejection> {
        self.with_game(game_id, |state, account| {
            let game = state.game_mut(game_id)?;
            game.require_phase(Phase::Placement)?;
            game.require_player(account)?;
            if game.roots.contains_key(&account) {
                return Err(reject("Board already submitted"));
            }
            game.roots.insert(account, root);
            if game.roots.len() == 2 {
                game.snapshot.phase = Phase::Play;
                state.emit(LedgerEvent::GameStarted { game_id });
            }
            Ok(())
        })
    }

    fn check_and_move(
        &mut self,
        game_id: GameId,
        reveal: &MoveReveal,
        target_index: u8,
    ) -> Result<(), LedgerRejection> {
        self.with_game(game_id, |state, account| {
            state.move_calls += 1;
            let game = state.game_mut(game_id)?;
            game.require_phase(Phase::Play)?;
            let opponent = game.require_player(account)?;
            let expected_mover = match game.last_move {
                None => game.snapshot.host,
                Some((mover, _)) => game.snapshot.opponent_of(mover).unwrap_or(mover),
            };
            if account != expected_mover {
                return Err(reject("Not your turn"));
            }
            if u16::from(target_index) >= game.snapshot.board_size.cells() {
                return Err(reject("Target outside the board"));
            }
            if game
                .targeted
                .get(&account)
                .is_some_and(|t| t.contains(&target_index))
            {
                return Err(reject("Cell already targeted"));
            }

            // Check the reveal of the opponent's previous shot on our board.
            match game.last_move {
                None => {
                    if !reveal.is_sentinel() || reveal.was_hit {
                        return Err(reject("Invalid merkle proof"));
                    }
                }
                Some((_, their_target)) => {
                    let root = game
                        .roots
                        .get(&account)
                        .copied()
                        .ok_or_else(|| reject("Board not submitted"))?;
                    if reveal.is_sentinel()
                        || !verify(
                            &root,
                            their_target,
                            reveal.was_hit,
                            &reveal.salt,
                            &reveal.proof,
                        )
                    {
                        return Err(reject("Invalid merkle proof"));
                    }
                }
            }

            if reveal.was_hit {
                let hits = game.hits_taken.entry(account).or_insert(0);
                *hits += 1;
                if *hits >= game.snapshot.ship_counts.total_cells() {
                    game.snapshot.winner = Some(opponent);
                    game.snapshot.phase = Phase::Validation;
                    state.emit(LedgerEvent::GameOver {
                        game_id,
                        winner: opponent,
                        reason: "All ships sunk".into(),
                    });
                    return Ok(());
                }
            }

            game.targeted
                .entry(account)
                .or_default()
                .insert(target_index);
            game.last_move = Some((account, target_index));
            state.emit(LedgerEvent::MovePlayed {
                game_id,
                mover: account,
                target_index,
                was_hit: reveal.was_hit,
            });
            Ok(())
        })
    }

    fn ping_opponent(&mut self, game_id: GameId) -> Result<(), LedgerRejection> {
        self.with_game(game_id, |state, account| {
            let game = state.game_mut(game_id)?;
            game.require_phase(Phase::Play)?;
            game.require_player(account)?;
            state.emit(LedgerEvent::PingSent {
                game_id,
                issuer: account,
            });
            Ok(())
        })
    }

    fn validate_board(
        &mut self,
        game_id: GameId,
        validation: &BoardValidation,
    ) -> Result<(), LedgerRejection> {
        self.with_game(game_id, |state, account| {
            let game = state.game_mut(game_id)?;
            game.require_phase(Phase::Validation)?;
            let opponent = game.require_player(account)?;
            if game.snapshot.winner != Some(account) {
                return Err(reject("Only the winner can validate"));
            }
            let root = game
                .roots
                .get(&account)
                .copied()
                .ok_or_else(|| reject("Board not submitted"))?;
            let valid = board_is_valid(&game.snapshot, &root, validation);
            let rewarded = if valid { account } else { opponent };
            game.snapshot.phase = Phase::Complete;
            game.snapshot.rewarded = Some(rewarded);
            state.emit(LedgerEvent::RewardPaid {
                game_id,
                winner: rewarded,
            });
            Ok(())
        })
    }

    fn get_session(&self, game_id: GameId) -> Result<SessionSnapshot, LedgerRejection> {
        self.world
            .state
            .borrow()
            .games
            .get(&game_id)
            .map(|g| g.snapshot.clone())
            .ok_or_else(|| reject("Game does not exist"))
    }

    fn list_open_games(&self) -> Result<Vec<SessionSummary>, LedgerRejection> {
        Ok(self
            .world
            .state
            .borrow()
            .games
            .values()
            .filter(|g| g.snapshot.phase == Phase::AwaitingOpponent)
            .map(|g| SessionSummary {
                game_id: g.snapshot.game_id,
                host: g.snapshot.host,
                phase: g.snapshot.phase,
            })
            .collect())
    }

    fn subscribe(
        &mut self,
        game_id: GameId,
        classes: &[EventClass],
    ) -> Result<SubscriptionId, LedgerRejection> {
        let mut state = self.world.state.borrow_mut();
        if !state.games.contains_key(&game_id) {
            return Err(reject("Game does not exist"));
        }
        state.next_subscription += 1;
        let id = SubscriptionId(state.next_subscription);
        state.subscriptions.insert(
            id,
            Subscription {
                game_id,
                classes: classes.to_vec(),
                account: self.account,
            },
        );
        Ok(id)
    }

    fn unsubscribe(&mut self, id: SubscriptionId) {
        self.world.state.borrow_mut().subscriptions.remove(&id);
    }
}

/// Placements must cover exactly the revealed cells and match the ship
/// counts; every revealed cell must prove as occupied under `root`.
fn board_is_valid(snapshot: &SessionSnapshot, root: &Hash32, v: &BoardValidation) -> bool {
    let n = v.occupied_indices.len();
    if v.salts.len() != n || v.proofs.len() != n {
        return false;
    }
    let proofs_ok = v
        .occupied_indices
        .iter()
        .zip(v.salts.iter().zip(&v.proofs))
        .all(|(&index, (salt, proof))| verify(root, index, true, salt, proof));
    if !proofs_ok {
        return false;
    }

    let side = snapshot.board_size.side();
    let mut covered: Vec<u8> = v
        .placements
        .iter()
        .flat_map(|p: &ShipPlacement| p.covered_indices(side))
        .collect();
    covered.sort_unstable();
    let mut revealed = v.occupied_indices.clone();
    revealed.sort_unstable();
    if covered != revealed {
        return false;
    }
    (1..=4u8).all(|len| {
        let count = v.placements.iter().filter(|p| p.length == len).count();
        count == usize::from(snapshot.ship_counts.count(len))
    })
}

// ---------------------------------------------------------------------------
// Two-player harness
// ---------------------------------------------------------------------------

pub type Session = GameSession<AccountLedger>;

pub const HOST: u8 = 1;
pub const GUEST: u8 = 2;

/// A host and a guest sharing one world.
pub struct Duel {
    pub world: LedgerWorld,
    pub host: Session,
    pub guest: Session,
}

impl Duel {
    /// Create a game as host and join it as guest.
    pub fn start(side: u8, ship_counts: ShipCounts) -> Self {
        Self::start_with(side, ship_counts, SessionConfig::default())
    }

    /// As `start`, with both sessions using `config`.
    pub fn start_with(side: u8, ship_counts: ShipCounts, config: SessionConfig) -> Self {
        let world = LedgerWorld::new();
        let (ledger, inbox) = world.connect(addr(HOST));
        let host = GameSession::create(ledger, inbox, config.clone(), side, ship_counts)
            .expect("create failed");
        let (ledger, inbox) = world.connect(addr(GUEST));
        let guest = GameSession::join(ledger, inbox, config, host.game_id())
            .expect("join failed");
        let mut duel = Self { world, host, guest };
        duel.pump();
        duel
    }

    /// Let both sessions process everything queued for them, host first.
    pub fn pump(&mut self) {
        self.host.process_events().expect("host pump failed");
        self.guest.process_events().expect("guest pump failed");
    }

    /// Bet, match, and pay so both sessions reach placement.
    pub fn into_placement(mut self, wager: u128) -> Self {
        self.host.place_bet(Wager(wager)).expect("host bet");
        self.pump();
        self.guest.place_bet(Wager(wager)).expect("guest match");
        self.pump();
        self.host.pay_wager().expect("host pay");
        self.guest.pay_wager().expect("guest pay");
        self.pump();
        self
    }

    /// Occupy the given cells on each board and submit both, host first.
    /// Nothing is pumped, so neither session has seen `GameStarted` yet.
    pub fn submit_boards(&mut self, host_cells: &[u8], guest_cells: &[u8]) {
        for &i in host_cells {
            self.host.toggle_cell(i).expect("host toggle");
        }
        for &i in guest_cells {
            self.guest.toggle_cell(i).expect("guest toggle");
        }
        self.host.submit_board().expect("host submit");
        self.guest.submit_board().expect("guest submit");
    }

    /// As `submit_boards`, then pump both sessions into play.
    pub fn into_play(mut self, host_cells: &[u8], guest_cells: &[u8]) -> Self {
        self.submit_boards(host_cells, guest_cells);
        self.pump();
        self
    }
}
