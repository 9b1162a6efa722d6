//! Event bus
//!
//! Topic-based publish/subscribe used for cross-cutting notifications,
//! including the store's global `"state:change"` broadcast.
//!
//! # Example
//!
//! ```rust
//! use argo_core::bus::EventBus;
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! let bus = EventBus::new();
//! let seen = Rc::new(Cell::new(0));
//!
//! let s = seen.clone();
//! let sub = bus.subscribe("trip:finished", move |data| {
//!     s.set(data.as_i64().unwrap_or(0));
//! });
//!
//! bus.publish("trip:finished", 42);
//! assert_eq!(seen.get(), 42);
//!
//! sub.unsubscribe();
//! bus.publish("trip:finished", 7);
//! assert_eq!(seen.get(), 42);
//! ```

use std::rc::Rc;

use serde_json::Value;

use crate::subscription::{SubscriberTable, Subscription};

/// Callback signature for bus subscribers
///
/// Receives the published payload, or `Value::Null` when none was given.
pub type BusCallback = dyn Fn(&Value);

/// Process-wide publish/subscribe primitive
///
/// Single-threaded: callbacks run synchronously inside [`publish`](Self::publish)
/// in registration order. A callback may publish again; the nested publish
/// completes before the outer one moves to its next subscriber.
pub struct EventBus {
    table: Rc<SubscriberTable<BusCallback>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            table: SubscriberTable::new("topic"),
        }
    }

    /// Register `callback` under `topic`
    pub fn subscribe<F>(&self, topic: &str, callback: F) -> Subscription
    where
        F: Fn(&Value) + 'static,
    {
        self.table.insert(topic, Rc::new(callback), false)
    }

    /// Register `callback` for the next publish on `topic` only
    pub fn subscribe_once<F>(&self, topic: &str, callback: F) -> Subscription
    where
        F: Fn(&Value) + 'static,
    {
        self.table.insert(topic, Rc::new(callback), true)
    }

    /// Deliver `data` to every subscriber of `topic`
    ///
    /// Panicking subscribers are logged and skipped. Returns how many
    /// subscribers completed normally; publishing to an unknown topic is a
    /// no-op returning 0.
    pub fn publish(&self, topic: &str, data: impl Into<Value>) -> usize {
        let data = data.into();
        self.table.dispatch(topic, |callback| callback(&data))
    }

    /// Publish on `topic` without a payload
    pub fn emit(&self, topic: &str) -> usize {
        self.publish(topic, Value::Null)
    }

    /// Remove every subscriber of `topic`
    pub fn unsubscribe_topic(&self, topic: &str) -> usize {
        self.table.remove_key(topic)
    }

    /// Drop every topic and subscriber
    pub fn reset(&self) {
        self.table.clear();
        tracing::debug!("event bus reset");
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.table.len(topic)
    }

    pub fn has_topic(&self, topic: &str) -> bool {
        self.table.contains_key(topic)
    }

    /// Topics with at least one subscriber (unordered)
    pub fn topics(&self) -> Vec<String> {
        self.table.keys()
    }

    /// Get statistics about the bus
    pub fn stats(&self) -> BusStats {
        BusStats {
            topic_count: self.table.keys().len(),
            subscriber_count: self.table.total(),
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Statistics about the event bus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusStats {
    pub topic_count: usize,
    pub subscriber_count: usize,
}
