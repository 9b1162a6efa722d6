//! Argo Core Runtime
//!
//! The small runtime the Argo dashboard is built on:
//!
//! - **Event Bus**: topic-based publish/subscribe with idempotent unsubscribe
//! - **State Store**: one JSON tree addressed by dot paths, broadcasting every write
//! - **Components**: a mount / update / unmount lifecycle that owns its
//!   listeners and subscriptions and releases them deterministically
//! - **Nodes**: a retained element tree components render into
//!
//! Everything here is single-threaded (`Rc`/`RefCell`); callbacks run
//! synchronously in registration order, and a panicking subscriber is logged
//! and skipped instead of aborting delivery to the rest.
//!
//! # Example
//!
//! ```rust
//! use argo_core::prelude::*;
//! use serde_json::json;
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let runtime = Runtime::new(json!({ "results": { "bersih": 0 } }));
//! let log = Rc::new(RefCell::new(Vec::new()));
//!
//! let l = log.clone();
//! let _global = runtime.bus().subscribe(STATE_CHANGE_TOPIC, move |event| {
//!     l.borrow_mut().push(format!("bus:{}", event["path"].as_str().unwrap_or("")));
//! });
//! let l = log.clone();
//! let _path = runtime.store().subscribe("results.bersih", move |value, _, _| {
//!     l.borrow_mut().push(format!("path:{}", value));
//! });
//!
//! runtime.store().set("results.bersih", 125000).unwrap();
//! assert_eq!(*log.borrow(), vec!["bus:results.bersih", "path:125000"]);
//! ```

pub mod bus;
pub mod component;
pub mod config;
pub mod error;
pub mod node;
pub mod path;
pub mod props;
pub mod runtime;
pub mod store;
mod subscription;

pub use bus::{BusCallback, BusStats, EventBus};
pub use component::{Component, Instance, InstanceHandle, Mountable, Phase, Scope};
pub use config::{RuntimeConfig, STATE_CHANGE_TOPIC};
pub use error::{ComponentError, Result, StoreError};
pub use node::{ListenerId, Node, NodeEvent, WeakNode};
pub use props::Props;
pub use runtime::{Runtime, RuntimeStats};
pub use store::{StateCallback, StateChange, Store};
pub use subscription::{Subscription, SubscriptionId};

/// Everything a component module usually needs
pub mod prelude {
    pub use crate::bus::EventBus;
    pub use crate::component::{Component, Instance, InstanceHandle, Mountable, Phase, Scope};
    pub use crate::config::{RuntimeConfig, STATE_CHANGE_TOPIC};
    pub use crate::error::{ComponentError, Result, StoreError};
    pub use crate::node::{Node, NodeEvent};
    pub use crate::props;
    pub use crate::props::Props;
    pub use crate::runtime::Runtime;
    pub use crate::store::Store;
    pub use crate::subscription::Subscription;
}
