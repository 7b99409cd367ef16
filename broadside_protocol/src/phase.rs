// Game lifecycle phases as the ledger reports them.
//
// The ledger stores a small integer status per game; `Phase` is the typed
// view of it. Phases are strictly ordered and a game only ever moves to the
// immediate successor (`next()`), each move triggered by exactly one class of
// ledger event (`terminating_event()`). The session crate's phase machine
// enforces that; this module only defines the vocabulary.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::message::EventClass;

/// One stage of the fixed game lifecycle, in ledger order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Phase {
    /// Host created the game; no guest yet.
    AwaitingOpponent,
    /// Both players propose bets until one is matched.
    Betting,
    /// Both players pay the agreed wager.
    PayingWager,
    /// Both players place ships and submit a commitment root.
    Placement,
    /// Players alternate shots.
    Play,
    /// The winner reveals their board for verification.
    Validation,
    /// Reward paid; terminal.
    Complete,
}

impl Phase {
    pub const ALL: [Phase; 7] = [
        Phase::AwaitingOpponent,
        Phase::Betting,
        Phase::PayingWager,
        Phase::Placement,
        Phase::Play,
        Phase::Validation,
        Phase::Complete,
    ];

    /// Decode the ledger's status integer. `0` (no such game) and anything
    /// above `7` yield `None`.
    pub fn from_code(code: u8) -> Option<Phase> {
        match code {
            1..=7 => Some(Self::ALL[usize::from(code) - 1]),
            _ => None,
        }
    }

    /// The ledger's status integer for this phase.
    pub fn code(self) -> u8 {
        self as u8 + 1
    }

    /// The single phase this one may advance to, or `None` for `Complete`.
    pub fn next(self) -> Option<Phase> {
        Phase::from_code(self.code() + 1)
    }

    /// The event class whose arrival ends this phase.
    pub fn terminating_event(self) -> Option<EventClass> {
        match self {
            Phase::AwaitingOpponent => Some(EventClass::GameJoined),
            Phase::Betting => Some(EventClass::BetPlaced),
            Phase::PayingWager => Some(EventClass::WagerPaid),
            Phase::Placement => Some(EventClass::GameStarted),
            Phase::Play => Some(EventClass::GameOver),
            Phase::Validation => Some(EventClass::RewardPaid),
            Phase::Complete => None,
        }
    }

    /// Every event class a session listens to while in this phase: the
    /// terminating class, any in-phase traffic, and the next phase's traffic
    /// that the opponent can trigger before this session has observed the
    /// transition. Without the lookahead, a guest that has not yet handled
    /// `GameStarted` would never hear the host's opening shot.
    pub fn listened_events(self) -> &'static [EventClass] {
        match self {
            Phase::AwaitingOpponent => &[EventClass::GameJoined, EventClass::BetPlaced],
            Phase::Betting => &[EventClass::BetPlaced],
            Phase::PayingWager => &[EventClass::WagerPaid],
            Phase::Placement => &[
                EventClass::GameStarted,
                EventClass::MovePlayed,
                EventClass::PingSent,
            ],
            Phase::Play => &[
                EventClass::MovePlayed,
                EventClass::PingSent,
                EventClass::GameOver,
                EventClass::RewardPaid,
            ],
            Phase::Validation => &[EventClass::RewardPaid],
            Phase::Complete => &[],
        }
    }

    pub fn is_terminal(self) -> bool {
        self == Phase::Complete
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::AwaitingOpponent => "awaiting opponent",
            Phase::Betting => "betting",
            Phase::PayingWager => "paying wager",
            Phase::Placement => "placement",
            Phase::Play => "play",
            Phase::Validation => "validation",
            Phase::Complete => "complete",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_roundtrip() {
        for phase in Phase::ALL {
            assert_eq!(Phase::from_code(phase.code()), Some(phase));
        }
        assert_eq!(Phase::from_code(0), None);
        assert_eq!(Phase::from_code(8), None);
        assert_eq!(Phase::AwaitingOpponent.code(), 1);
        assert_eq!(Phase::Complete.code(), 7);
    }

    #[test]
    fn next_walks_the_fixed_order() {
        let mut walked = vec![Phase::AwaitingOpponent];
        while let Some(next) = walked.last().and_then(|p| p.next()) {
            walked.push(next);
        }
        assert_eq!(walked, Phase::ALL.to_vec());
        assert!(walked.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn every_non_terminal_phase_listens_for_its_terminator() {
        for phase in Phase::ALL {
            match phase.terminating_event() {
                Some(class) => assert!(phase.listened_events().contains(&class)),
                None => {
                    assert!(phase.is_terminal());
                    assert!(phase.listened_events().is_empty());
                }
            }
        }
    }

    #[test]
    fn phases_listen_ahead_for_opponent_driven_traffic() {
        let placement = Phase::Placement.listened_events();
        assert!(placement.contains(&EventClass::MovePlayed));
        assert!(placement.contains(&EventClass::PingSent));
        assert!(Phase::Play.listened_events().contains(&EventClass::RewardPaid));
        assert!(Phase::AwaitingOpponent.listened_events().contains(&EventClass::BetPlaced));
        // Lookahead stops short of the next phase's terminator.
        assert!(!placement.contains(&EventClass::GameOver));
        assert!(!Phase::Betting.listened_events().contains(&EventClass::WagerPaid));
    }
}
