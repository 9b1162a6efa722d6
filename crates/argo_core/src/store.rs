//! Argo Store - centralized, path-addressed application state
//!
//! The store owns a single JSON tree. Every write goes through
//! [`Store::set`], which
//!
//! 1. assigns the value (creating intermediate objects),
//! 2. publishes a global `"state:change"` event on the [`EventBus`] carrying
//!    `{ path, value, oldValue, fullState }`,
//! 3. notifies the subscribers registered for exactly that path with
//!    `(value, old_value, path)`.
//!
//! The global broadcast always happens before the path-specific
//! notification. Subscriptions match exact paths only: a subscriber on
//! `"fuel"` is not told about a write to `"fuel.jarak"`.
//!
//! # Example
//!
//! ```rust
//! use argo_core::bus::EventBus;
//! use argo_core::store::Store;
//! use serde_json::json;
//! use std::rc::Rc;
//!
//! let bus = Rc::new(EventBus::new());
//! let store = Store::new(bus, json!({ "fuel": {} }));
//!
//! let _sub = store.subscribe("fuel.jarak", |value, old, path| {
//!     assert_eq!(path, "fuel.jarak");
//!     assert_eq!(value, &json!(10));
//!     assert!(old.is_none());
//! });
//!
//! store.set("fuel.jarak", 10).unwrap();
//! assert_eq!(store.get("fuel.jarak"), Some(json!(10)));
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::bus::EventBus;
use crate::config::RuntimeConfig;
use crate::error::StoreError;
use crate::path;
use crate::subscription::{SubscriberTable, Subscription};

/// Callback signature for path subscribers: `(value, old_value, path)`
pub type StateCallback = dyn Fn(&Value, Option<&Value>, &str);

/// Payload of the global state-change event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateChange {
    pub path: String,
    pub value: Value,
    #[serde(default)]
    pub old_value: Option<Value>,
    /// Present unless `broadcast_full_state` is disabled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_state: Option<Value>,
}

impl StateChange {
    /// Decode a bus payload published by [`Store::set`]
    pub fn from_payload(payload: &Value) -> Option<Self> {
        Self::deserialize(payload).ok()
    }
}

/// Single source of truth for application data
pub struct Store {
    tree: RefCell<Value>,
    /// Shape the store was created with, used by the reset helpers
    initial: Value,
    subscribers: Rc<SubscriberTable<StateCallback>>,
    bus: Rc<EventBus>,
    config: RuntimeConfig,
}

impl Store {
    /// Create a store broadcasting on `bus`, seeded with `initial`
    pub fn new(bus: Rc<EventBus>, initial: Value) -> Self {
        Self::with_config(bus, initial, RuntimeConfig::default())
    }

    pub fn with_config(bus: Rc<EventBus>, initial: Value, config: RuntimeConfig) -> Self {
        let initial = if initial.is_object() {
            initial
        } else {
            tracing::warn!("store root must be an object, starting empty instead of {}", initial);
            Value::Object(Map::new())
        };
        Self {
            tree: RefCell::new(initial.clone()),
            initial,
            subscribers: SubscriberTable::new("path"),
            bus,
            config,
        }
    }

    /// Read the value at `path` (the empty path is the whole tree)
    ///
    /// Returns a copy; missing segments yield `None`.
    pub fn get(&self, path: &str) -> Option<Value> {
        path::lookup(&self.tree.borrow(), path).cloned()
    }

    /// Copy of the whole tree
    pub fn snapshot(&self) -> Value {
        self.tree.borrow().clone()
    }

    /// Lend the live tree to `f` without copying
    ///
    /// `f` must not write to the store; the tree is borrowed for its duration.
    pub fn with_state<R>(&self, f: impl FnOnce(&Value) -> R) -> R {
        f(&self.tree.borrow())
    }

    /// Write `value` at `path` and notify
    ///
    /// Returns the value previously stored at `path`. Errors are contract
    /// violations (empty path, writing through a scalar, bad array index);
    /// nothing is written or broadcast when one is returned.
    pub fn set(&self, path: &str, value: impl Into<Value>) -> Result<Option<Value>, StoreError> {
        let value = value.into();
        let old = path::assign(&mut self.tree.borrow_mut(), path, value.clone())?;

        tracing::trace!("state `{}` set", path);

        let change = StateChange {
            path: path.to_string(),
            value: value.clone(),
            old_value: old.clone(),
            full_state: self.config.broadcast_full_state.then(|| self.snapshot()),
        };
        match serde_json::to_value(&change) {
            Ok(payload) => {
                self.bus.publish(&self.config.state_change_topic, payload);
            }
            Err(err) => tracing::error!("failed to encode state change for `{}`: {}", path, err),
        }

        self.subscribers
            .dispatch(path, |callback| callback(&value, old.as_ref(), path));

        Ok(old)
    }

    /// Subscribe to writes of exactly `path`
    pub fn subscribe<F>(&self, path: &str, callback: F) -> Subscription
    where
        F: Fn(&Value, Option<&Value>, &str) + 'static,
    {
        self.subscribers.insert(path, Rc::new(callback), false)
    }

    /// Replace the subtree at `path` with `initial_value`, notifying as `set` does
    pub fn reset(
        &self,
        path: &str,
        initial_value: impl Into<Value>,
    ) -> Result<Option<Value>, StoreError> {
        self.set(path, initial_value)
    }

    /// Restore `path` to the value it had when the store was created
    ///
    /// Paths that did not exist initially are set to `null`.
    pub fn reset_to_initial(&self, path: &str) -> Result<Option<Value>, StoreError> {
        let initial = path::lookup(&self.initial, path)
            .cloned()
            .unwrap_or(Value::Null);
        self.set(path, initial)
    }

    /// Restore every top-level key of the initial tree
    ///
    /// Each key goes through `set`, so subscribers and the bus see one change
    /// per key. Top-level keys added after creation are left in place.
    pub fn reset_all(&self) {
        let Some(initial) = self.initial.as_object() else {
            return;
        };
        for (key, value) in initial {
            if let Err(err) = self.set(key, value.clone()) {
                tracing::error!("failed to reset `{}`: {}", key, err);
            }
        }
    }

    pub fn subscriber_count(&self, path: &str) -> usize {
        self.subscribers.len(path)
    }

    /// Paths with at least one subscriber (unordered)
    pub fn subscribed_paths(&self) -> Vec<String> {
        self.subscribers.keys()
    }

    /// Drop every path subscription (the tree is untouched)
    pub fn clear_subscribers(&self) {
        self.subscribers.clear();
    }

    pub fn bus(&self) -> &Rc<EventBus> {
        &self.bus
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub(crate) fn subscription_total(&self) -> usize {
        self.subscribers.total()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::Cell;

    type Calls = Rc<RefCell<Vec<(Value, Option<Value>, String)>>>;

    fn store() -> Store {
        Store::new(
            Rc::new(EventBus::new()),
            json!({
                "fuel": { "jarak": 0, "konsumsi": 35 },
                "ui": { "currentView": "dashboard" }
            }),
        )
    }

    fn record(store: &Store, path: &str) -> (Calls, Subscription) {
        let calls: Calls = Rc::new(RefCell::new(Vec::new()));
        let c = calls.clone();
        let sub = store.subscribe(path, move |value, old, path| {
            c.borrow_mut()
                .push((value.clone(), old.cloned(), path.to_string()));
        });
        (calls, sub)
    }

    #[test]
    fn test_set_then_get() {
        let store = store();
        store.set("fuel.jarak", 10).unwrap();
        assert_eq!(store.get("fuel.jarak"), Some(json!(10)));
        assert_eq!(store.get("fuel.missing"), None);
        assert_eq!(store.get("").unwrap()["fuel"]["konsumsi"], json!(35));
    }

    #[test]
    fn test_subscriber_receives_value_old_and_path() {
        let store = Store::new(Rc::new(EventBus::new()), json!({}));
        let (calls, _sub) = record(&store, "fuel.jarak");

        store.set("fuel.jarak", 10).unwrap();
        store.set("fuel.jarak", 12).unwrap();

        assert_eq!(
            *calls.borrow(),
            vec![
                (json!(10), None, "fuel.jarak".to_string()),
                (json!(12), Some(json!(10)), "fuel.jarak".to_string()),
            ]
        );
    }

    #[test]
    fn test_exact_path_only() {
        let store = store();
        let (parent, _a) = record(&store, "fuel");
        let (child, _b) = record(&store, "fuel.jarak.km");

        store.set("fuel.jarak", 3).unwrap();
        assert!(parent.borrow().is_empty());
        assert!(child.borrow().is_empty());
    }

    #[test]
    fn test_subscribers_fire_in_registration_order() {
        let store = store();
        let order = Rc::new(RefCell::new(Vec::new()));
        let o1 = order.clone();
        let _c1 = store.subscribe("ui.currentView", move |_, _, _| o1.borrow_mut().push("c1"));
        let o2 = order.clone();
        let _c2 = store.subscribe("ui.currentView", move |_, _, _| o2.borrow_mut().push("c2"));

        store.set("ui.currentView", "history").unwrap();
        store.set("ui.currentView", "settings").unwrap();
        assert_eq!(*order.borrow(), vec!["c1", "c2", "c1", "c2"]);
    }

    #[test]
    fn test_global_event_precedes_path_notification() {
        let store = store();
        let order = Rc::new(RefCell::new(Vec::new()));

        let o = order.clone();
        let _global = store.bus().subscribe("state:change", move |payload| {
            let change = StateChange::from_payload(payload).unwrap();
            o.borrow_mut().push(format!("global:{}", change.path));
        });
        let o = order.clone();
        let _path = store.subscribe("fuel.jarak", move |_, _, path| {
            o.borrow_mut().push(format!("path:{path}"));
        });

        store.set("fuel.jarak", 1).unwrap();
        assert_eq!(*order.borrow(), vec!["global:fuel.jarak", "path:fuel.jarak"]);
    }

    #[test]
    fn test_state_change_payload() {
        let store = store();
        let seen = Rc::new(RefCell::new(None));
        let s = seen.clone();
        let _sub = store.bus().subscribe("state:change", move |payload| {
            *s.borrow_mut() = StateChange::from_payload(payload);
        });

        store.set("fuel.jarak", 25).unwrap();
        let change = seen.borrow_mut().take().unwrap();
        assert_eq!(change.path, "fuel.jarak");
        assert_eq!(change.value, json!(25));
        assert_eq!(change.old_value, Some(json!(0)));
        assert_eq!(change.full_state.unwrap()["fuel"]["jarak"], json!(25));
    }

    #[test]
    fn test_full_state_can_be_omitted() {
        let bus = Rc::new(EventBus::new());
        let config = RuntimeConfig {
            broadcast_full_state: false,
            ..RuntimeConfig::default()
        };
        let store = Store::with_config(bus, json!({}), config);
        let seen = Rc::new(RefCell::new(None));
        let s = seen.clone();
        let _sub = store.bus().subscribe("state:change", move |payload| {
            *s.borrow_mut() = Some(payload.clone());
        });

        store.set("a", 1).unwrap();
        let payload = seen.borrow_mut().take().unwrap();
        assert!(payload.get("fullState").is_none());
        assert_eq!(payload["oldValue"], Value::Null);
    }

    #[test]
    fn test_invalid_path_writes_and_broadcasts_nothing() {
        let store = store();
        let events = Rc::new(Cell::new(0));
        let e = events.clone();
        let _sub = store.bus().subscribe("state:change", move |_| e.set(e.get() + 1));

        assert_eq!(store.set("", 1), Err(StoreError::EmptyPath(String::new())));
        assert!(matches!(
            store.set("ui.currentView.deeper", 1),
            Err(StoreError::NotAContainer { .. })
        ));
        assert_eq!(events.get(), 0);
        assert_eq!(store.get("ui.currentView"), Some(json!("dashboard")));
    }

    #[test]
    fn test_panicking_subscriber_is_isolated() {
        let store = store();
        let _bad = store.subscribe("fuel.jarak", |_, _, _| panic!("bad subscriber"));
        let (calls, _good) = record(&store, "fuel.jarak");

        assert!(store.set("fuel.jarak", 4).is_ok());
        assert_eq!(calls.borrow().len(), 1);
        assert_eq!(store.get("fuel.jarak"), Some(json!(4)));
    }

    #[test]
    fn test_reentrant_set_runs_depth_first() {
        let store = Rc::new(store());
        let order = Rc::new(RefCell::new(Vec::new()));

        let weak = Rc::downgrade(&store);
        let o = order.clone();
        let _derive = store.subscribe("fuel.jarak", move |value, _, _| {
            o.borrow_mut().push("jarak:first");
            if let Some(store) = weak.upgrade() {
                let km = value.as_i64().unwrap_or(0);
                store.set("results.distance", km * 1000).unwrap();
            }
        });
        let o = order.clone();
        let _second = store.subscribe("fuel.jarak", move |_, _, _| {
            o.borrow_mut().push("jarak:second");
        });
        let o = order.clone();
        let _results = store.subscribe("results.distance", move |_, _, _| {
            o.borrow_mut().push("results");
        });

        store.set("fuel.jarak", 2).unwrap();
        assert_eq!(
            *order.borrow(),
            vec!["jarak:first", "results", "jarak:second"]
        );
        assert_eq!(store.get("results.distance"), Some(json!(2000)));
    }

    #[test]
    fn test_reset_notifies() {
        let store = store();
        store.set("fuel.jarak", 99).unwrap();
        let (calls, _sub) = record(&store, "fuel");

        store.reset("fuel", json!({ "jarak": 0 })).unwrap();
        assert_eq!(calls.borrow().len(), 1);
        assert_eq!(store.get("fuel"), Some(json!({ "jarak": 0 })));
    }

    #[test]
    fn test_reset_to_initial_and_reset_all() {
        let store = store();
        store.set("fuel.jarak", 99).unwrap();
        store.set("ui.currentView", "history").unwrap();

        store.reset_to_initial("fuel.jarak").unwrap();
        assert_eq!(store.get("fuel.jarak"), Some(json!(0)));

        store.reset_to_initial("nonexistent").unwrap();
        assert_eq!(store.get("nonexistent"), Some(Value::Null));

        store.reset_all();
        assert_eq!(store.get("ui.currentView"), Some(json!("dashboard")));
    }

    #[test]
    fn test_subscription_cleanup() {
        let store = store();
        let (calls, sub) = record(&store, "fuel.jarak");
        assert_eq!(store.subscriber_count("fuel.jarak"), 1);

        sub.unsubscribe();
        sub.unsubscribe();
        assert_eq!(store.subscriber_count("fuel.jarak"), 0);
        assert!(store.subscribed_paths().is_empty());

        store.set("fuel.jarak", 1).unwrap();
        assert!(calls.borrow().is_empty());
    }

    #[test]
    fn test_non_object_root_starts_empty() {
        let store = Store::new(Rc::new(EventBus::new()), json!(5));
        assert_eq!(store.snapshot(), json!({}));
    }
}
