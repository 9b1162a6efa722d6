//! Subscriber tables and unsubscribe handles
//!
//! Both the [`EventBus`](crate::bus::EventBus) (keyed by topic) and the
//! [`Store`](crate::store::Store) (keyed by exact path) keep their callbacks in
//! a [`SubscriberTable`]. The table owns the callbacks, preserves registration
//! order per key and drops a key as soon as its last subscriber leaves.
//!
//! # Dispatch rules
//!
//! - The list of callbacks visited by one dispatch is fixed when it starts.
//! - A callback removed mid-dispatch is skipped if it has not run yet.
//! - No borrow of the table is held while a callback runs, so callbacks may
//!   subscribe, unsubscribe or dispatch again (depth-first).
//! - A panicking callback is caught and logged; the dispatch continues.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::{Rc, Weak};

use rustc_hash::FxHashMap;
use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;

new_key_type! {
    /// Unique identifier for a single registration
    pub struct SubscriptionId;
}

type IdList = SmallVec<[SubscriptionId; 4]>;

struct Entry<C: ?Sized> {
    key: String,
    callback: Rc<C>,
    once: bool,
}

struct TableState<C: ?Sized> {
    entries: SlotMap<SubscriptionId, Entry<C>>,
    /// Registration order per key
    keys: FxHashMap<String, IdList>,
}

/// Ordered, key-grouped callback storage shared by the bus and the store
pub(crate) struct SubscriberTable<C: ?Sized> {
    state: RefCell<TableState<C>>,
    /// What a key means to this table ("topic" or "path"), for logs
    kind: &'static str,
}

impl<C: ?Sized + 'static> SubscriberTable<C> {
    pub(crate) fn new(kind: &'static str) -> Rc<Self> {
        Rc::new(Self {
            state: RefCell::new(TableState {
                entries: SlotMap::with_key(),
                keys: FxHashMap::default(),
            }),
            kind,
        })
    }

    /// Register a callback under `key`
    pub(crate) fn insert(self: &Rc<Self>, key: &str, callback: Rc<C>, once: bool) -> Subscription {
        let mut state = self.state.borrow_mut();
        let id = state.entries.insert(Entry {
            key: key.to_string(),
            callback,
            once,
        });
        let ids = state.keys.entry(key.to_string()).or_insert_with(|| {
            tracing::debug!("{} `{}` created", self.kind, key);
            IdList::new()
        });
        ids.push(id);
        drop(state);

        let table: Weak<dyn Detach> = Rc::downgrade(self) as Weak<dyn Detach>;
        Subscription {
            table,
            id,
            active: Cell::new(true),
        }
    }

    /// Remove every registration under `key`, returning how many were removed
    pub(crate) fn remove_key(&self, key: &str) -> usize {
        let mut state = self.state.borrow_mut();
        let Some(ids) = state.keys.remove(key) else {
            return 0;
        };
        for id in &ids {
            state.entries.remove(*id);
        }
        tracing::debug!("{} `{}` cleared ({} subscribers)", self.kind, key, ids.len());
        ids.len()
    }

    /// Drop every key and registration
    pub(crate) fn clear(&self) {
        let mut state = self.state.borrow_mut();
        state.entries.clear();
        state.keys.clear();
    }

    pub(crate) fn len(&self, key: &str) -> usize {
        self.state.borrow().keys.get(key).map_or(0, |ids| ids.len())
    }

    pub(crate) fn contains_key(&self, key: &str) -> bool {
        self.state.borrow().keys.contains_key(key)
    }

    pub(crate) fn keys(&self) -> Vec<String> {
        self.state.borrow().keys.keys().cloned().collect()
    }

    /// Total registrations across all keys
    pub(crate) fn total(&self) -> usize {
        self.state.borrow().entries.len()
    }

    /// Invoke every callback registered under `key`, in registration order
    ///
    /// Returns the number of callbacks that completed without panicking.
    pub(crate) fn dispatch(&self, key: &str, mut invoke: impl FnMut(&C)) -> usize {
        let ids: IdList = match self.state.borrow().keys.get(key) {
            Some(ids) => ids.clone(),
            None => return 0,
        };

        tracing::trace!("dispatching {} `{}` to {} subscribers", self.kind, key, ids.len());

        let mut delivered = 0;
        for id in ids {
            let Some(callback) = self.claim(id) else {
                continue;
            };
            match panic::catch_unwind(AssertUnwindSafe(|| invoke(&callback))) {
                Ok(()) => delivered += 1,
                Err(payload) => {
                    tracing::error!(
                        "subscriber on {} `{}` panicked: {}",
                        self.kind,
                        key,
                        panic_message(payload.as_ref())
                    );
                }
            }
        }
        delivered
    }

    /// Fetch a callback for invocation, retiring it first if it is one-shot
    fn claim(&self, id: SubscriptionId) -> Option<Rc<C>> {
        let (callback, once) = {
            let state = self.state.borrow();
            let entry = state.entries.get(id)?;
            (entry.callback.clone(), entry.once)
        };
        if once {
            self.remove(id);
        }
        Some(callback)
    }

    fn remove(&self, id: SubscriptionId) -> bool {
        let mut state = self.state.borrow_mut();
        let Some(entry) = state.entries.remove(id) else {
            return false;
        };
        let now_empty = match state.keys.get_mut(&entry.key) {
            Some(ids) => {
                ids.retain(|other| *other != id);
                ids.is_empty()
            }
            None => false,
        };
        if now_empty {
            state.keys.remove(&entry.key);
            tracing::debug!("{} `{}` removed (no subscribers left)", self.kind, entry.key);
        }
        true
    }
}

/// Type-erased view of a table, so one handle type serves every table
trait Detach {
    fn detach(&self, id: SubscriptionId) -> bool;
    fn is_registered(&self, id: SubscriptionId) -> bool;
}

impl<C: ?Sized + 'static> Detach for SubscriberTable<C> {
    fn detach(&self, id: SubscriptionId) -> bool {
        self.remove(id)
    }

    fn is_registered(&self, id: SubscriptionId) -> bool {
        self.state.borrow().entries.contains_key(id)
    }
}

/// Handle returned by every `subscribe` call
///
/// [`unsubscribe`](Self::unsubscribe) removes exactly the registration that
/// produced this handle. Calling it again, or after the owning bus/store was
/// reset or dropped, does nothing. Dropping the handle does NOT unsubscribe.
pub struct Subscription {
    table: Weak<dyn Detach>,
    id: SubscriptionId,
    active: Cell<bool>,
}

impl Subscription {
    /// Remove this registration
    ///
    /// Returns `true` only for the call that actually removed it.
    pub fn unsubscribe(&self) -> bool {
        if !self.active.replace(false) {
            return false;
        }
        match self.table.upgrade() {
            Some(table) => table.detach(self.id),
            None => false,
        }
    }

    /// Whether the registration is still live
    ///
    /// A one-shot subscription stops being active once it has fired.
    pub fn is_active(&self) -> bool {
        self.active.get()
            && self
                .table
                .upgrade()
                .is_some_and(|table| table.is_registered(self.id))
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.active.get())
            .finish()
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
