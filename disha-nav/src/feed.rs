//! Location feed.
//!
//! Keeps the latest located position and the set of tasks subscribed to
//! position updates. Unsubscribing is synchronous: once
//! [`LocationFeed::unsubscribe`] returns, the next [`LocationFeed::publish`]
//! no longer lists that task.

use crate::engine::TaskId;
use crate::types::Position;
use tracing::{debug, trace};

/// Handle returned by [`LocationFeed::subscribe`]; not clonable, so one
/// subscription is disposed exactly once.
#[derive(Debug, PartialEq, Eq)]
pub struct FeedSubscription {
    id: u64,
    task: TaskId,
}

impl FeedSubscription {
    pub fn task(&self) -> TaskId {
        self.task
    }
}

#[derive(Debug, Default)]
pub struct LocationFeed {
    latest: Option<Position>,
    subscribers: Vec<(u64, TaskId)>,
    next_id: u64,
    published: u64,
}

impl LocationFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `position` and return the tasks it must be forwarded to, in
    /// subscription order.
    pub fn publish(&mut self, position: Position) -> Vec<TaskId> {
        trace!(
            "Location ({:.6}, {:.6}) on {}",
            position.lng, position.lat, position.floor_id
        );
        self.latest = Some(position);
        self.published += 1;
        self.subscribers.iter().map(|(_, task)| *task).collect()
    }

    pub fn subscribe(&mut self, task: TaskId) -> FeedSubscription {
        let id = self.next_id;
        self.next_id += 1;
        self.subscribers.push((id, task));
        debug!("Task {} subscribed to location feed", task);
        FeedSubscription { id, task }
    }

    pub fn unsubscribe(&mut self, subscription: FeedSubscription) {
        self.subscribers.retain(|(id, _)| *id != subscription.id);
        debug!("Task {} unsubscribed from location feed", subscription.task);
    }

    pub fn latest(&self) -> Option<&Position> {
        self.latest.as_ref()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Number of positions published so far
    pub fn published(&self) -> u64 {
        self.published
    }
}
