// Liveness pings.
//
// Either player may ping once the opponent has sat idle for the ledger's
// block window. A ping never changes phase or turn; forfeits are decided by
// the ledger alone. The monitor only turns pings into one-shot alerts: the
// issuer gets a confirmation when its own call is accepted, the other side
// gets a warning when the `PingSent` event arrives.

use broadside_protocol::Address;

use crate::alert::Alert;

#[derive(Clone, Debug)]
pub struct TimeoutMonitor {
    local: Address,
    window_blocks: u32,
    pings_received: u32,
}

impl TimeoutMonitor {
    pub fn new(local: Address, window_blocks: u32) -> Self {
        Self {
            local,
            window_blocks,
            pings_received: 0,
        }
    }

    /// A `PingSent` event was observed. Alerts only when someone else pinged.
    pub fn on_external_ping(&mut self, issuer: Address) -> Option<Alert> {
        if issuer == self.local {
            return None;
        }
        self.pings_received += 1;
        Some(Alert::Pinged {
            window_blocks: self.window_blocks,
        })
    }

    /// Our own ping was accepted by the ledger.
    pub fn send_ping(&self) -> Alert {
        Alert::PingSent {
            window_blocks: self.window_blocks,
        }
    }

    pub fn pings_received(&self) -> u32 {
        self.pings_received
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issuer_is_not_alerted_by_own_ping() {
        let me = Address([1; 20]);
        let mut monitor = TimeoutMonitor::new(me, 5);
        assert_eq!(monitor.on_external_ping(me), None);
        assert_eq!(monitor.pings_received(), 0);
    }

    #[test]
    fn opponent_ping_alerts_once_per_event() {
        let mut monitor = TimeoutMonitor::new(Address([1; 20]), 5);
        let them = Address([2; 20]);
        assert_eq!(
            monitor.on_external_ping(them),
            Some(Alert::Pinged { window_blocks: 5 })
        );
        assert_eq!(monitor.pings_received(), 1);
        assert_eq!(
            monitor.send_ping(),
            Alert::PingSent { window_blocks: 5 }
        );
    }
}
