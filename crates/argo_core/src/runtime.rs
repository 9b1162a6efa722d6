//! Argo Runtime
//!
//! The pair of process-wide services every component is built against: one
//! [`EventBus`] and one [`Store`] broadcasting on it. Create it once at
//! startup and hand clones to components; clones share the same services.

use std::rc::Rc;

use serde_json::Value;

use crate::bus::{BusStats, EventBus};
use crate::config::RuntimeConfig;
use crate::store::Store;

/// Shared handle to the event bus and state store
#[derive(Clone)]
pub struct Runtime {
    bus: Rc<EventBus>,
    store: Rc<Store>,
}

impl Runtime {
    /// Create a fresh bus and a store seeded with `initial_state`
    pub fn new(initial_state: Value) -> Self {
        Self::with_config(initial_state, RuntimeConfig::default())
    }

    pub fn with_config(initial_state: Value, config: RuntimeConfig) -> Self {
        let bus = Rc::new(EventBus::new());
        let store = Rc::new(Store::with_config(bus.clone(), initial_state, config));
        tracing::debug!("runtime created");
        Self { bus, store }
    }

    /// Build from an existing store (and the bus it broadcasts on)
    pub fn from_store(store: Rc<Store>) -> Self {
        Self {
            bus: store.bus().clone(),
            store,
        }
    }

    pub fn bus(&self) -> &Rc<EventBus> {
        &self.bus
    }

    pub fn store(&self) -> &Rc<Store> {
        &self.store
    }

    /// Full teardown for test isolation
    ///
    /// Drops every bus and path subscription, then restores the initial tree
    /// (those writes reach nobody).
    pub fn reset(&self) {
        self.bus.reset();
        self.store.clear_subscribers();
        self.store.reset_all();
    }

    /// Get statistics about the runtime
    pub fn stats(&self) -> RuntimeStats {
        RuntimeStats {
            bus: self.bus.stats(),
            state_subscriptions: self.store.subscription_total(),
        }
    }
}

/// Statistics about the runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeStats {
    pub bus: BusStats,
    pub state_subscriptions: usize,
}
