//! Argument-free notifications between screens.
//!
//! A [`SignalBus`] is owned by the model and passed around explicitly. Each
//! subscription is keyed by a [`Signal`]; publishing calls back once per
//! handler subscribed under that signal, in the order they subscribed. A
//! signal published with no subscribers is dropped; nothing is queued or
//! replayed.

use serde::{Deserialize, Serialize};
use tracing::trace;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    /// A travel was saved, updated or deleted somewhere in the app.
    SavedTravelsChanged,
    /// The open chat thread has new messages on the server.
    ChatHistoryChanged,
}

/// Handle returned by [`SignalBus::subscribe`]; pass it back to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[must_use = "keep the subscription to be able to unsubscribe"]
pub struct Subscription {
    signal: Signal,
    id: u64,
}

impl Subscription {
    #[must_use]
    pub const fn signal(&self) -> Signal {
        self.signal
    }
}

#[derive(Debug)]
struct Entry<H> {
    id: u64,
    signal: Signal,
    handler: H,
}

#[derive(Debug)]
pub struct SignalBus<H> {
    next_id: u64,
    entries: Vec<Entry<H>>,
}

impl<H> Default for SignalBus<H> {
    fn default() -> Self {
        Self {
            next_id: 0,
            entries: Vec::new(),
        }
    }
}

impl<H> SignalBus<H> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, signal: Signal, handler: H) -> Subscription {
        self.next_id += 1;
        let id = self.next_id;
        self.entries.push(Entry { id, signal, handler });
        Subscription { signal, id }
    }

    /// Returns `false` if the subscription was already gone.
    pub fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != subscription.id);
        self.entries.len() != before
    }

    /// Deliver `signal` to every handler subscribed under it. Returns how many
    /// handlers were called.
    pub fn publish(&self, signal: Signal, mut deliver: impl FnMut(&H)) -> usize {
        let mut delivered = 0;
        for entry in self.entries.iter().filter(|e| e.signal == signal) {
            deliver(&entry.handler);
            delivered += 1;
        }
        trace!(?signal, delivered, "signal published");
        delivered
    }

    #[must_use]
    pub fn subscriber_count(&self, signal: Signal) -> usize {
        self.entries.iter().filter(|e| e.signal == signal).count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<H: PartialEq> SignalBus<H> {
    /// Remove every subscription of `handler` under `signal`.
    pub fn unsubscribe_handler(&mut self, signal: Signal, handler: &H) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|e| !(e.signal == signal && e.handler == *handler));
        before - self.entries.len()
    }
}
