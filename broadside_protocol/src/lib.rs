// broadside_protocol: the ledger surface shared by every Broadside crate.
//
// The ledger is an external, authoritative program: it stores games, enforces
// the rules, and settles wagers. This crate describes what the client sees of
// it and nothing more. No game logic lives here.
//
// Module overview:
// - `types.rs`:    Value types: `GameId`, `Address`, `Hash32`, `Wager`,
//                  `BoardSize`, `ShipCounts`, and the board/ship domain limits.
// - `phase.rs`:    The ordered `Phase` lifecycle, ledger status codes, and
//                  which event class ends each phase.
// - `message.rs`:  `LedgerEvent`, its `EventClass` discriminant, and the
//                  `Notification` envelope tagged with a `SubscriptionId`.
// - `snapshot.rs`: `SessionSnapshot` (one game record) and `SessionSummary`
//                  (one open-games row).
// - `error.rs`:    `LedgerRejection` with the closed `LedgerErrorKind` map.
//
// Everything derives `Serialize`/`Deserialize`; addresses and hashes travel
// as `0x` hex strings.

pub mod error;
pub mod message;
pub mod phase;
pub mod snapshot;
pub mod types;

pub use error::{LedgerErrorKind, LedgerRejection};
pub use message::{EventClass, LedgerEvent, Notification, SubscriptionId};
pub use phase::Phase;
pub use snapshot::{SessionSnapshot, SessionSummary};
pub use types::{
    Address, BoardSize, DomainError, GameId, Hash32, MAX_BOARD_SIDE, MIN_BOARD_SIDE,
    ParseHexError, SHIP_KINDS, ShipCounts, Wager,
};

#[cfg(test)]
mod tests {
    use super::*;

    fn event_roundtrip(event: &LedgerEvent) {
        let json = serde_json::to_vec(event).unwrap();
        let recovered: LedgerEvent = serde_json::from_slice(&json).unwrap();
        assert_eq!(&recovered, event);
    }

    fn addr(byte: u8) -> Address {
        Address([byte; 20])
    }

    #[test]
    fn roundtrip_game_joined() {
        event_roundtrip(&LedgerEvent::GameJoined {
            game_id: GameId(7),
            host: addr(1),
            guest: addr(2),
        });
    }

    #[test]
    fn roundtrip_bet_placed() {
        event_roundtrip(&LedgerEvent::BetPlaced {
            game_id: GameId(7),
            bettor: addr(2),
            amount: Wager(1_000_000_000_000_000_000),
            is_matched: false,
        });
    }

    #[test]
    fn roundtrip_move_played() {
        event_roundtrip(&LedgerEvent::MovePlayed {
            game_id: GameId(7),
            mover: addr(1),
            target_index: 63,
            was_hit: true,
        });
    }

    #[test]
    fn roundtrip_game_over() {
        event_roundtrip(&LedgerEvent::GameOver {
            game_id: GameId(7),
            winner: addr(2),
            reason: "all ships sunk".into(),
        });
    }

    #[test]
    fn event_class_and_game_id() {
        let event = LedgerEvent::PingSent {
            game_id: GameId(3),
            issuer: addr(9),
        };
        assert_eq!(event.class(), EventClass::PingSent);
        assert_eq!(event.game_id(), GameId(3));
        assert_eq!(
            LedgerEvent::WagerPaid { game_id: GameId(4) }.class(),
            EventClass::WagerPaid
        );
    }

    #[test]
    fn roundtrip_notification() {
        let note = Notification {
            subscription: SubscriptionId(11),
            event: LedgerEvent::GameStarted { game_id: GameId(1) },
        };
        let json = serde_json::to_string(&note).unwrap();
        let back: Notification = serde_json::from_str(&json).unwrap();
        assert_eq!(back, note);
    }

    #[test]
    fn roundtrip_snapshot() {
        let snapshot = SessionSnapshot {
            game_id: GameId(5),
            phase: Phase::Betting,
            host: addr(1),
            guest: Some(addr(2)),
            board_size: BoardSize::from_side(5).unwrap(),
            ship_counts: ShipCounts::new([1, 2, 0, 0]),
            wager: Wager(0),
            winner: None,
            rewarded: None,
        };
        let json = serde_json::to_string(&snapshot).unwrap();
        let back: SessionSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snapshot);
        assert!(snapshot.is_player(addr(2)));
        assert!(!snapshot.is_player(addr(3)));
        assert_eq!(snapshot.opponent_of(addr(2)), Some(addr(1)));
        assert_eq!(snapshot.opponent_of(addr(1)), Some(addr(2)));
        assert_eq!(snapshot.opponent_of(addr(3)), None);
    }

    #[test]
    fn snapshot_without_outcome_fields_parses() {
        let snapshot = SessionSnapshot {
            game_id: GameId(9),
            phase: Phase::Play,
            host: addr(1),
            guest: Some(addr(2)),
            board_size: BoardSize::from_side(4).unwrap(),
            ship_counts: ShipCounts::new([1, 0, 0, 0]),
            wager: Wager(3),
            winner: Some(addr(1)),
            rewarded: Some(addr(1)),
        };
        let mut value = serde_json::to_value(&snapshot).unwrap();
        let fields = value.as_object_mut().unwrap();
        fields.remove("winner");
        fields.remove("rewarded");
        let back: SessionSnapshot = serde_json::from_value(value).unwrap();
        assert_eq!(back.winner, None);
        assert_eq!(back.rewarded, None);
        assert_eq!(back.wager, Wager(3));
    }
}
