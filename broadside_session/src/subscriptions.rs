// Event subscription registry.
//
// The single place that knows which ledger subscription a session holds.
// Entries are keyed by `(game, event class)` and point at the subscription
// id covering that class; one subscription spans every class its phase
// listens to. A game has at most one subscription at a time: `acquire`
// refuses while one is held, so the caller must `release` (and unsubscribe)
// the old one first.
//
// `admits` is the stale-event boundary. A notification gets through only
// when the subscription currently held for its game covers its class, and
// it arrived either on that subscription or on the one released just
// before it. The second case is the phase hand-off: the opponent can act
// on the new phase before this session has seen the transition, so the
// event is delivered on the old subscription and still queued behind the
// transition when it is drawn. The two subscriptions never coexist, so an
// event cannot arrive on both. Anything else (older subscriptions, another
// game, a class the current phase does not listen to) is dropped here so
// the reducer never has to re-check staleness.

use std::collections::BTreeMap;

use broadside_protocol::{EventClass, GameId, Notification, SubscriptionId};

use crate::error::IntegrityFailure;

#[derive(Clone, Debug, Default)]
pub struct SubscriptionRegistry {
    entries: BTreeMap<(GameId, EventClass), SubscriptionId>,
    /// The most recently released subscription per game.
    retired: BTreeMap<GameId, SubscriptionId>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `id` as covering `classes` for `game_id`.
    pub fn acquire(
        &mut self,
        game_id: GameId,
        classes: &[EventClass],
        id: SubscriptionId,
    ) -> Result<(), IntegrityFailure> {
        if self.held(game_id).is_some() {
            return Err(IntegrityFailure::SubscriptionHeld);
        }
        for &class in classes {
            self.entries.insert((game_id, class), id);
        }
        log::debug!("{game_id}: holding subscription {} for {classes:?}", id.0);
        Ok(())
    }

    /// Forget the subscription held for `game_id`, returning its id so the
    /// caller can unsubscribe it.
    pub fn release(&mut self, game_id: GameId) -> Option<SubscriptionId> {
        let held = self.held(game_id);
        self.entries.retain(|(game, _), _| *game != game_id);
        if let Some(id) = held {
            log::debug!("{game_id}: released subscription {}", id.0);
            self.retired.insert(game_id, id);
        }
        held
    }

    pub fn held(&self, game_id: GameId) -> Option<SubscriptionId> {
        self.entries
            .iter()
            .find(|((game, _), _)| *game == game_id)
            .map(|(_, &id)| id)
    }

    pub fn covers(&self, game_id: GameId, class: EventClass) -> bool {
        self.entries.contains_key(&(game_id, class))
    }

    pub fn admits(&self, note: &Notification) -> bool {
        let game_id = note.event.game_id();
        match self.entries.get(&(game_id, note.event.class())) {
            Some(&held) => {
                held == note.subscription
                    || self.retired.get(&game_id) == Some(&note.subscription)
            }
            None => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use broadside_protocol::{Address, LedgerEvent};

    const GAME: GameId = GameId(1);

    fn note(id: u64, event: LedgerEvent) -> Notification {
        Notification {
            subscription: SubscriptionId(id),
            event,
        }
    }

    fn ping(game: GameId) -> LedgerEvent {
        LedgerEvent::PingSent {
            game_id: game,
            issuer: Address([2; 20]),
        }
    }

    #[test]
    fn acquire_requires_release_first() {
        let mut reg = SubscriptionRegistry::new();
        reg.acquire(GAME, &[EventClass::GameJoined], SubscriptionId(1))
            .unwrap();
        assert_eq!(
            reg.acquire(GAME, &[EventClass::BetPlaced], SubscriptionId(2)),
            Err(IntegrityFailure::SubscriptionHeld)
        );
        assert_eq!(reg.release(GAME), Some(SubscriptionId(1)));
        assert!(reg.is_empty());
        reg.acquire(GAME, &[EventClass::BetPlaced], SubscriptionId(2))
            .unwrap();
        assert_eq!(reg.held(GAME), Some(SubscriptionId(2)));
    }

    #[test]
    fn one_subscription_covers_several_classes() {
        let mut reg = SubscriptionRegistry::new();
        let classes = [
            EventClass::MovePlayed,
            EventClass::PingSent,
            EventClass::GameOver,
        ];
        reg.acquire(GAME, &classes, SubscriptionId(9)).unwrap();
        for class in classes {
            assert!(reg.covers(GAME, class));
        }
        assert!(!reg.covers(GAME, EventClass::RewardPaid));
        assert!(reg.admits(&note(9, ping(GAME))));
    }

    #[test]
    fn stale_and_foreign_notifications_are_refused() {
        let mut reg = SubscriptionRegistry::new();
        reg.acquire(GAME, &[EventClass::PingSent], SubscriptionId(3))
            .unwrap();
        // Old subscription id.
        assert!(!reg.admits(&note(2, ping(GAME))));
        // Another game.
        assert!(!reg.admits(&note(3, ping(GameId(2)))));
        // Class not covered.
        assert!(!reg.admits(&note(3, LedgerEvent::WagerPaid { game_id: GAME })));
        // After release nothing gets through.
        reg.release(GAME);
        assert!(!reg.admits(&note(3, ping(GAME))));
    }

    #[test]
    fn previous_subscription_admitted_for_covered_classes() {
        let mut reg = SubscriptionRegistry::new();
        reg.acquire(GAME, &[EventClass::GameStarted, EventClass::PingSent], SubscriptionId(4))
            .unwrap();
        reg.release(GAME);
        reg.acquire(GAME, &[EventClass::PingSent, EventClass::GameOver], SubscriptionId(5))
            .unwrap();

        // Delivered on the released subscription, but the new one covers it.
        assert!(reg.admits(&note(4, ping(GAME))));
        // The class the old phase ended on is no longer covered.
        assert!(!reg.admits(&note(4, LedgerEvent::GameStarted { game_id: GAME })));

        // Only one subscription back.
        reg.release(GAME);
        reg.acquire(GAME, &[EventClass::PingSent], SubscriptionId(6))
            .unwrap();
        assert!(reg.admits(&note(5, ping(GAME))));
        assert!(!reg.admits(&note(4, ping(GAME))));

        // Closed: nothing is covered, so nothing gets through.
        reg.release(GAME);
        assert!(!reg.admits(&note(6, ping(GAME))));
    }

    #[test]
    fn release_without_subscription() {
        let mut reg = SubscriptionRegistry::new();
        assert_eq!(reg.release(GAME), None);
    }
}
