//! Session-keyed push/pull broker.
//!
//! The mini-program pushes beacon batches, the web page pulls them; the
//! session token is the only routing key. Frames are encoded with
//! [`crate::wire`] on push and decoded on pull, so a pull client sees
//! exactly what a remote broker would deliver.
//!
//! The broker never retries. A dropped session is surfaced to pull clients
//! as [`PullEvent::Disconnected`]; they resume with
//! [`BeaconPuller::reconnect`].

use crate::beacon::BeaconBatch;
use crate::error::{Error, Result};
use crate::session::{BrokerTopic, SessionToken};
use crate::wire;
use crossbeam_channel::{Receiver, Sender, TryRecvError, unbounded};
use log::{debug, info, trace, warn};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

type Frame = Vec<u8>;

/// In-process broker shared by pushers and pullers.
#[derive(Clone, Default)]
pub struct Broker {
    topics: Arc<Mutex<HashMap<String, Vec<Sender<Frame>>>>>,
}

impl Broker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push client for `session`.
    pub fn pusher(&self, session: &SessionToken) -> BeaconPusher {
        BeaconPusher {
            broker: self.clone(),
            topic: BrokerTopic::new(session),
            closed: false,
            pushed: 0,
        }
    }

    /// Pull client subscribed to `session`.
    pub fn puller(&self, session: &SessionToken) -> BeaconPuller {
        let topic = BrokerTopic::new(session);
        let rx = self.subscribe(&topic);
        BeaconPuller {
            broker: self.clone(),
            topic,
            rx,
            connected: true,
        }
    }

    /// Number of live pull subscriptions on `session`.
    pub fn subscriber_count(&self, session: &SessionToken) -> usize {
        self.topics
            .lock()
            .get(BrokerTopic::new(session).key())
            .map(|subs| subs.len())
            .unwrap_or(0)
    }

    /// Number of sessions with at least one pull subscription.
    pub fn topic_count(&self) -> usize {
        self.topics.lock().len()
    }

    /// Drop every subscription on `session` (simulates a broker-side disconnect).
    pub fn drop_session(&self, session: &SessionToken) {
        if let Some(subs) = self.topics.lock().remove(session.as_str()) {
            info!("Broker dropped session {} ({} subscribers)", session, subs.len());
        }
    }

    fn subscribe(&self, topic: &BrokerTopic) -> Receiver<Frame> {
        let (tx, rx) = unbounded();
        self.topics
            .lock()
            .entry(topic.key().to_string())
            .or_default()
            .push(tx);
        debug!("Pull client subscribed to session {}", topic.key());
        rx
    }

    /// Deliver `frame` to every subscriber of `topic`, pruning dead ones.
    fn publish(&self, topic: &BrokerTopic, frame: &[u8]) -> usize {
        let mut topics = self.topics.lock();
        let Some(subs) = topics.get_mut(topic.key()) else {
            trace!("No subscribers on session {}, frame dropped", topic.key());
            return 0;
        };
        subs.retain(|tx| tx.send(frame.to_vec()).is_ok());
        let delivered = subs.len();
        if delivered == 0 {
            topics.remove(topic.key());
            debug!("Session {} has no pull clients left", topic.key());
        }
        delivered
    }
}

/// Push side of a session (mini-program).
pub struct BeaconPusher {
    broker: Broker,
    topic: BrokerTopic,
    closed: bool,
    pushed: u64,
}

impl BeaconPusher {
    /// Encode and publish one batch.
    ///
    /// Returns the number of pull clients that received it.
    pub fn push(&mut self, batch: &BeaconBatch) -> Result<usize> {
        if self.closed {
            return Err(Error::SessionClosed {
                session: self.topic.key().to_string(),
            });
        }
        let frame = wire::encode_batch(batch)?;
        let delivered = self.broker.publish(&self.topic, &frame);
        self.pushed += 1;
        trace!(
            "Pushed batch of {} beacons to {} subscribers",
            batch.len(),
            delivered
        );
        Ok(delivered)
    }

    /// Close the push channel; later pushes fail with `SessionClosed`.
    pub fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            info!(
                "Push client for session {} closed after {} batches",
                self.topic.key(),
                self.pushed
            );
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn pushed(&self) -> u64 {
        self.pushed
    }

    pub fn session(&self) -> &SessionToken {
        self.topic.session()
    }
}

/// Event delivered to a pull client.
#[derive(Debug, Clone, PartialEq)]
pub enum PullEvent {
    /// `beacon(batch)` from the session
    Beacon(BeaconBatch),
    /// The broker dropped the session; no more batches until reconnect
    Disconnected,
    /// Subscription re-established
    Reconnected,
}

/// Pull side of a session (web page).
pub struct BeaconPuller {
    broker: Broker,
    topic: BrokerTopic,
    rx: Receiver<Frame>,
    connected: bool,
}

impl BeaconPuller {
    /// Next pending event, if any. Never blocks.
    ///
    /// Malformed frames are logged and skipped.
    pub fn try_next(&mut self) -> Option<PullEvent> {
        loop {
            match self.rx.try_recv() {
                Ok(frame) => match wire::decode_batch(&frame) {
                    Ok(batch) => return Some(PullEvent::Beacon(batch)),
                    Err(e) => {
                        warn!("Dropping malformed frame on session {}: {}", self.topic.key(), e);
                        continue;
                    }
                },
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Disconnected) => {
                    if self.connected {
                        self.connected = false;
                        warn!("Pull client lost session {}", self.topic.key());
                        return Some(PullEvent::Disconnected);
                    }
                    return None;
                }
            }
        }
    }

    /// All pending events in arrival order.
    pub fn drain(&mut self) -> Vec<PullEvent> {
        std::iter::from_fn(|| self.try_next()).collect()
    }

    /// Subscribe again after a disconnect.
    pub fn reconnect(&mut self) -> PullEvent {
        self.rx = self.broker.subscribe(&self.topic);
        self.connected = true;
        info!("Pull client reconnected to session {}", self.topic.key());
        PullEvent::Reconnected
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn session(&self) -> &SessionToken {
        self.topic.session()
    }
}
