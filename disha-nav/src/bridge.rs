//! Web half of the beacon telemetry bridge.
//!
//! Pulls the session's beacon batches from the broker and hands each one to
//! the fusion pipeline; every position the pipeline emits is queued as an
//! [`Event::Location`]. The session comes from the navigation page URL.
//!
//! Broker disconnects are logged and surfaced through
//! [`BridgeStatus::Disconnected`]; the bridge never reconnects on its own.

use crate::error::Result;
use crate::orchestrator::Event;
use crate::queue::EventSender;
use crate::types::Position;
use sanket_io::beacon::BeaconBatch;
use sanket_io::broker::{BeaconPuller, Broker, PullEvent};
use sanket_io::session::SessionToken;
use tracing::{debug, info, warn};
use url::Url;

/// Beacon-to-position fusion.
pub trait FusionPipeline {
    /// Process one batch; returns the positions emitted in order.
    fn locate(&mut self, batch: &BeaconBatch) -> Vec<Position>;
}

/// Pull connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeStatus {
    Connected,
    Disconnected,
}

/// Counters from the last [`TelemetryBridge::pump`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PumpStats {
    pub batches: usize,
    pub locations: usize,
}

pub struct TelemetryBridge<F: FusionPipeline> {
    puller: BeaconPuller,
    fusion: F,
    status: BridgeStatus,
    total_batches: u64,
}

impl<F: FusionPipeline> TelemetryBridge<F> {
    /// Subscribe to the session named in the navigation page URL.
    pub fn connect(broker: &Broker, page_url: &Url, fusion: F) -> Result<Self> {
        let session = SessionToken::from_url(page_url)?;
        Ok(Self::with_session(broker, &session, fusion))
    }

    pub fn with_session(broker: &Broker, session: &SessionToken, fusion: F) -> Self {
        info!("Beacon bridge pulling session {}", session);
        Self {
            puller: broker.puller(session),
            fusion,
            status: BridgeStatus::Connected,
            total_batches: 0,
        }
    }

    /// Drain pending broker events into `events`.
    pub fn pump(&mut self, events: &EventSender) -> PumpStats {
        let mut stats = PumpStats::default();
        while let Some(event) = self.puller.try_next() {
            match event {
                PullEvent::Beacon(batch) => {
                    stats.batches += 1;
                    self.total_batches += 1;
                    for position in self.fusion.locate(&batch) {
                        if events.send(Event::Location(position)) {
                            stats.locations += 1;
                        }
                    }
                }
                PullEvent::Disconnected => {
                    warn!("Beacon broker disconnected session {}", self.puller.session());
                    self.status = BridgeStatus::Disconnected;
                }
                PullEvent::Reconnected => {
                    self.status = BridgeStatus::Connected;
                }
            }
        }
        if stats.batches > 0 {
            debug!(
                "Bridge pumped {} batches, {} locations",
                stats.batches, stats.locations
            );
        }
        stats
    }

    /// Resubscribe after a disconnect.
    pub fn reconnect(&mut self) {
        if let PullEvent::Reconnected = self.puller.reconnect() {
            self.status = BridgeStatus::Connected;
        }
    }

    pub fn status(&self) -> BridgeStatus {
        self.status
    }

    pub fn session(&self) -> &SessionToken {
        self.puller.session()
    }

    pub fn total_batches(&self) -> u64 {
        self.total_batches
    }

    pub fn fusion(&self) -> &F {
        &self.fusion
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::NearestBeaconFusion;
    use crate::queue::EventQueue;
    use sanket_io::beacon::BeaconReading;

    fn fusion() -> NearestBeaconFusion {
        let mut fusion = NearestBeaconFusion::new();
        fusion.add_anchor(10, 1, Position::new(113.0, 23.0, "F1"));
        fusion.add_anchor(10, 2, Position::new(113.001, 23.0, "F2"));
        fusion
    }

    #[test]
    fn test_connect_requires_session() {
        let broker = Broker::new();
        let url = Url::parse("https://indoor.example.com/").unwrap();
        assert!(TelemetryBridge::connect(&broker, &url, fusion()).is_err());
    }

    #[test]
    fn test_batches_become_locations() {
        let broker = Broker::new();
        let url = Url::parse("https://indoor.example.com/?session=abc123").unwrap();
        let mut bridge = TelemetryBridge::connect(&broker, &url, fusion()).unwrap();
        let queue = EventQueue::new();

        let mut pusher = broker.pusher(bridge.session());
        pusher
            .push(&BeaconBatch::new(
                1,
                vec![
                    BeaconReading::new("U", 10, 1, -80),
                    BeaconReading::new("U", 10, 2, -50),
                ],
            ))
            .unwrap();
        // Unknown beacon: no position
        pusher
            .push(&BeaconBatch::new(2, vec![BeaconReading::new("U", 99, 9, -40)]))
            .unwrap();

        let stats = bridge.pump(&queue.sender());
        assert_eq!(stats, PumpStats { batches: 2, locations: 1 });
        match queue.try_next() {
            Some(Event::Location(p)) => assert_eq!(p.floor_id, "F2"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_disconnect_is_reported_not_retried() {
        let broker = Broker::new();
        let session = SessionToken::parse("drop").unwrap();
        let mut bridge = TelemetryBridge::with_session(&broker, &session, fusion());
        let queue = EventQueue::new();

        broker.drop_session(&session);
        bridge.pump(&queue.sender());
        assert_eq!(bridge.status(), BridgeStatus::Disconnected);
        assert_eq!(broker.subscriber_count(&session), 0);

        bridge.reconnect();
        assert_eq!(bridge.status(), BridgeStatus::Connected);
        assert_eq!(broker.subscriber_count(&session), 1);
    }
}
