// Phase state machine.
//
// Tracks where one session is in the fixed lifecycle. The phase only moves
// on ledger-confirmed facts: an admitted event whose class terminates the
// current phase, or a freshly fetched snapshot that is further along.
// Transitions never go backwards and never skip past `Complete`, so the
// sequence of observed phases is non-decreasing.
//
// A local account that is neither host nor guest puts the machine into the
// unauthorized state. It is terminal: the phase is frozen and the session
// refuses every further action.

use broadside_protocol::{Address, LedgerEvent, Phase, SessionSnapshot};

/// The local account's seat in a game.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LocalRole {
    Host,
    Guest,
}

/// Result of feeding a fact to the machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Advance {
    Advanced { from: Phase, to: Phase },
    Unchanged,
}

#[derive(Clone, Debug)]
pub struct PhaseMachine {
    phase: Phase,
    role: Option<LocalRole>,
}

impl PhaseMachine {
    /// Starting state for `local` given the ledger's record of the game.
    pub fn initialize(snapshot: &SessionSnapshot, local: Address) -> Self {
        let role = role_of(snapshot, local);
        let phase = if snapshot.phase < Phase::Betting
            && role == Some(LocalRole::Host)
            && snapshot.guest.is_none()
        {
            Phase::AwaitingOpponent
        } else {
            snapshot.phase
        };
        if role.is_none() {
            log::warn!("{}: {local} is not a player", snapshot.game_id);
        }
        Self { phase, role }
    }

    pub fn current(&self) -> Phase {
        self.phase
    }

    pub fn role(&self) -> Option<LocalRole> {
        self.role
    }

    pub fn is_unauthorized(&self) -> bool {
        self.role.is_none()
    }

    /// Apply an admitted event. Only the current phase's terminating event
    /// moves the machine, and a `BetPlaced` only when it matched.
    pub fn advance(&mut self, event: &LedgerEvent) -> Advance {
        if self.is_unauthorized() || self.phase.terminating_event() != Some(event.class()) {
            return Advance::Unchanged;
        }
        if let LedgerEvent::BetPlaced {
            is_matched: false, ..
        } = event
        {
            return Advance::Unchanged;
        }
        match self.phase.next() {
            Some(next) => self.move_to(next),
            None => Advance::Unchanged,
        }
    }

    /// Catch up with a freshly fetched snapshot. Moves forward only; a
    /// snapshot behind the current phase is ignored.
    pub fn sync(&mut self, snapshot: &SessionSnapshot, local: Address) -> Advance {
        if self.is_unauthorized() {
            return Advance::Unchanged;
        }
        if role_of(snapshot, local).is_none() {
            log::warn!("{}: {local} is no longer a player", snapshot.game_id);
            self.role = None;
            return Advance::Unchanged;
        }
        if snapshot.phase > self.phase {
            self.move_to(snapshot.phase)
        } else {
            Advance::Unchanged
        }
    }

    fn move_to(&mut self, to: Phase) -> Advance {
        let from = self.phase;
        self.phase = to;
        log::info!("phase {from} -> {to}");
        Advance::Advanced { from, to }
    }
}

fn role_of(snapshot: &SessionSnapshot, local: Address) -> Option<LocalRole> {
    if snapshot.host == local {
        Some(LocalRole::Host)
    } else if snapshot.guest == Some(local) {
        Some(LocalRole::Guest)
    } else {
        None
    }
}
