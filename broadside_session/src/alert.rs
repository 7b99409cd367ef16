// One-shot, user-facing notices.
//
// Alerts are queued by the session as side effects of accepted calls or
// admitted events and drained by the UI with `GameSession::take_alerts`.
// They never influence phase or turn state.

use std::fmt;

use serde::{Deserialize, Serialize};

use broadside_protocol::{Address, Wager};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Alert {
    /// The opponent placed a bet we have not matched.
    OpponentBet { amount: Wager },
    /// Our own bet was accepted by the ledger.
    BetPlaced { amount: Wager },
    /// Our ping was accepted.
    PingSent { window_blocks: u32 },
    /// The opponent pinged us.
    Pinged { window_blocks: u32 },
    GameOver {
        winner: Address,
        won: bool,
        reason: String,
    },
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Alert::OpponentBet { amount } => {
                write!(f, "Opponent has bet {amount}. Match the bet or raise.")
            }
            Alert::BetPlaced { amount } => write!(f, "Bet of {amount} placed."),
            Alert::PingSent { window_blocks } => write!(
                f,
                "Ping sent. Ping again in {window_blocks} blocks if the opponent does not make a move"
            ),
            Alert::Pinged { window_blocks } => write!(
                f,
                "You have been pinged! You have a {window_blocks}-blocks time to make your move"
            ),
            Alert::GameOver { won: true, reason, .. } => write!(f, "You won: {reason}"),
            Alert::GameOver { won: false, reason, .. } => write!(f, "You lost: {reason}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alert_texts() {
        assert_eq!(
            Alert::OpponentBet { amount: Wager(50) }.to_string(),
            "Opponent has bet 50. Match the bet or raise."
        );
        assert_eq!(
            Alert::Pinged { window_blocks: 5 }.to_string(),
            "You have been pinged! You have a 5-blocks time to make your move"
        );
        assert_eq!(
            Alert::PingSent { window_blocks: 5 }.to_string(),
            "Ping sent. Ping again in 5 blocks if the opponent does not make a move"
        );
        let over = Alert::GameOver {
            winner: Address([1; 20]),
            won: false,
            reason: "All ships sunk".into(),
        };
        assert_eq!(over.to_string(), "You lost: All ships sunk");
    }
}
