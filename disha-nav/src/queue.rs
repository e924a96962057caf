//! Single event queue feeding the orchestrator.
//!
//! Every input (user intents, fused positions, engine callbacks) is an
//! [`Event`] on one FIFO. Handlers run to completion; events a handler
//! causes (e.g. an engine acknowledging a start) are queued behind it.

use crate::engine::RoutingEngine;
use crate::orchestrator::{Event, Orchestrator};
use crate::view::Renderer;
use crossbeam_channel::{Receiver, Sender, unbounded};
use tracing::{trace, warn};

/// Cloneable producer handle.
#[derive(Clone, Debug)]
pub struct EventSender {
    tx: Sender<Event>,
}

impl EventSender {
    /// Queue `event`. Returns `false` once the queue is gone.
    pub fn send(&self, event: Event) -> bool {
        match self.tx.send(event) {
            Ok(()) => true,
            Err(e) => {
                warn!("Event queue closed, dropped {:?}", e.0.kind());
                false
            }
        }
    }
}

#[derive(Debug)]
pub struct EventQueue {
    tx: Sender<Event>,
    rx: Receiver<Event>,
}

impl EventQueue {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    pub fn sender(&self) -> EventSender {
        EventSender {
            tx: self.tx.clone(),
        }
    }

    pub fn push(&self, event: Event) {
        // Cannot fail: the queue holds its own receiver
        let _ = self.tx.send(event);
    }

    pub fn try_next(&self) -> Option<Event> {
        self.rx.try_recv().ok()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Dispatch events until the queue is empty, including events queued
    /// by the handlers themselves. Returns the number dispatched.
    pub fn run_until_idle<R: Renderer, E: RoutingEngine>(
        &self,
        orchestrator: &mut Orchestrator<R, E>,
    ) -> usize {
        let mut handled = 0;
        while let Some(event) = self.try_next() {
            trace!("Dispatching {}", event.kind());
            orchestrator.handle(event);
            handled += 1;
        }
        handled
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}
