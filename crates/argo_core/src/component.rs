//! Component lifecycle
//!
//! A [`Component`] describes how to render a subtree from its props. An
//! [`Instance`] drives one component through its lifecycle:
//!
//! ```text
//! Unmounted ──mount──▶ Mounting ──▶ Mounted ──unmount──▶ Unmounting ──▶ Unmounted
//!                                    │   ▲
//!                              update│   │
//!                                    ▼   │
//!                                   Updating
//! ```
//!
//! Updates replace the whole rendered subtree; there is no diffing.
//!
//! Components attach listeners and subscriptions only through [`Scope`],
//! which records them on the instance:
//!
//! - everything acquired by a render is released when a later render
//!   replaces that subtree, and at unmount;
//! - everything acquired by a lifecycle hook is released at unmount.
//!
//! # Errors
//!
//! Render errors are not caught: they come back from `mount`/`update` as
//! [`ComponentError::Render`] (and a panic in render unwinds to the caller).
//! Either way the instance first gives back what the failed transition
//! acquired. Compare the bus and store, which isolate subscriber failures.
//!
//! # Example
//!
//! ```rust
//! use argo_core::prelude::*;
//! use serde_json::json;
//!
//! props! {
//!     pub struct GreetingProps / GreetingPatch {
//!         text: String = String::new(),
//!     }
//! }
//!
//! struct Greeting;
//!
//! impl Component for Greeting {
//!     type Props = GreetingProps;
//!
//!     fn render(&self, props: &GreetingProps, _scope: &Scope<'_, Self>) -> Result<Node> {
//!         Ok(Node::element("p").with_text(props.text.clone()))
//!     }
//! }
//!
//! let runtime = Runtime::new(json!({}));
//! let root = Node::element("main");
//! let greeting = Instance::new(runtime, Greeting, GreetingPatch::new().text("A"));
//!
//! greeting.mount(Some(&root)).unwrap();
//! greeting.update(GreetingPatch::new().text("B")).unwrap();
//! assert_eq!(root.render_to_string(), "<main><p>B</p></main>");
//!
//! greeting.unmount();
//! assert_eq!(root.child_count(), 0);
//! ```

use std::cell::{Cell, Ref, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use serde_json::Value;

use crate::bus::EventBus;
use crate::error::{ComponentError, Result};
use crate::node::{ListenerId, Node, NodeEvent, WeakNode};
use crate::props::Props;
use crate::runtime::Runtime;
use crate::store::Store;
use crate::subscription::Subscription;

/// A unit of UI
///
/// Only [`render`](Self::render) is required. The hooks default to no-ops.
pub trait Component: Sized + 'static {
    type Props: Props;

    /// Produce a fresh subtree for `props`
    ///
    /// Must succeed for any props value (optional fields have defaults).
    /// Listeners go through [`Scope::bind_external_event`].
    fn render(&self, props: &Self::Props, scope: &Scope<'_, Self>) -> Result<Node>;

    /// Runs before the first render of a mount
    fn before_mount(&self, _scope: &Scope<'_, Self>) {}

    /// Runs once the node is attached and the instance is mounted
    fn after_mount(&self, _scope: &Scope<'_, Self>) {}

    /// Runs before subscriptions and listeners are released
    fn before_unmount(&self, _scope: &Scope<'_, Self>) {}

    /// Name used in logs and errors
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Lifecycle phase of an [`Instance`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Unmounted,
    Mounting,
    Mounted,
    Updating,
    Unmounting,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Unmounted => "unmounted",
            Phase::Mounting => "mounting",
            Phase::Mounted => "mounted",
            Phase::Updating => "updating",
            Phase::Unmounting => "unmounting",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who acquired a tracked resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    /// A lifecycle hook; lives until unmount
    Hook,
    /// The render with this generation; lives until its subtree is replaced
    Render(u64),
}

struct TrackedSubscription {
    subscription: Subscription,
    origin: Origin,
}

struct TrackedListener {
    node: WeakNode,
    event: String,
    id: ListenerId,
    origin: Origin,
}

/// What an unfinished transition undoes
#[derive(Debug, Clone, Copy)]
enum Rollback {
    /// Everything the hooks and the render acquired
    Everything,
    /// What one render acquired
    Render(u64),
    /// Everything, and detach the node
    Teardown,
}

/// Rolls a lifecycle transition back if it returns early or unwinds
/// before committing
struct Transition<'a, C: Component> {
    instance: &'a Instance<C>,
    fallback: Phase,
    rollback: Rollback,
    committed: bool,
}

impl<'a, C: Component> Transition<'a, C> {
    fn enter(
        instance: &'a Instance<C>,
        during: Phase,
        fallback: Phase,
        rollback: Rollback,
    ) -> Self {
        instance.phase.set(during);
        Self {
            instance,
            fallback,
            rollback,
            committed: false,
        }
    }

    fn commit(mut self, phase: Phase) {
        self.committed = true;
        self.instance.phase.set(phase);
    }
}

impl<C: Component> Drop for Transition<'_, C> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        match self.rollback {
            Rollback::Everything => self.instance.release(|_| true),
            Rollback::Render(generation) => self
                .instance
                .release(|origin| origin == Origin::Render(generation)),
            Rollback::Teardown => self.instance.teardown(),
        }
        self.instance.phase.set(self.fallback);
    }
}

/// One live component: props, lifecycle phase, rendered node and the
/// resources it owns
pub struct Instance<C: Component> {
    component: C,
    runtime: Runtime,
    props: RefCell<C::Props>,
    phase: Cell<Phase>,
    node: RefCell<Option<Node>>,
    subscriptions: RefCell<Vec<TrackedSubscription>>,
    listeners: RefCell<Vec<TrackedListener>>,
    generation: Cell<u64>,
    /// `unmount` arrived while mounting or updating
    unmount_pending: Cell<bool>,
    this: Weak<Instance<C>>,
}

impl<C: Component> Instance<C> {
    /// Construct an unmounted instance with `patch` merged over the defaults
    pub fn new(runtime: Runtime, component: C, patch: <C::Props as Props>::Patch) -> Rc<Self> {
        Rc::new_cyclic(|this| Self {
            component,
            runtime,
            props: RefCell::new(C::Props::from_patch(patch)),
            phase: Cell::new(Phase::Unmounted),
            node: RefCell::new(None),
            subscriptions: RefCell::new(Vec::new()),
            listeners: RefCell::new(Vec::new()),
            generation: Cell::new(0),
            unmount_pending: Cell::new(false),
            this: this.clone(),
        })
    }

    /// Render and attach to `parent` (if given)
    ///
    /// Returns the rendered node. Already mounted (or updating): returns the
    /// current node without rendering. A failed or panicking render releases
    /// whatever the hooks and the render acquired and leaves the instance
    /// unmounted. An `unmount` requested while mounting runs as soon as the
    /// node is attached, before `after_mount`.
    pub fn mount(&self, parent: Option<&Node>) -> Result<Node> {
        match self.phase.get() {
            Phase::Unmounted => {}
            phase @ (Phase::Mounted | Phase::Updating) => {
                return self.node().ok_or_else(|| self.reentrant(phase));
            }
            phase => return Err(self.reentrant(phase)),
        }

        self.unmount_pending.set(false);
        let transition =
            Transition::enter(self, Phase::Mounting, Phase::Unmounted, Rollback::Everything);
        tracing::debug!("mounting {}", self.component.name());

        self.component.before_mount(&self.scope(Origin::Hook));

        let generation = self.next_generation();
        let node = self.render(generation)?;

        if let Some(parent) = parent {
            parent.append_child(&node);
        }
        *self.node.borrow_mut() = Some(node.clone());
        transition.commit(Phase::Mounted);

        if self.unmount_pending.replace(false) {
            self.unmount();
            return Ok(node);
        }

        self.component.after_mount(&self.scope(Origin::Hook));
        Ok(node)
    }

    /// Shallow-merge `patch` into the props and re-render if mounted
    ///
    /// The new subtree takes the old one's place in its parent. Resources
    /// acquired by earlier renders are released. When not mounted (or still
    /// mounting, or unmounting) only the props change. An `unmount`
    /// requested during the render runs once the update finishes.
    pub fn update(&self, patch: <C::Props as Props>::Patch) -> Result<()> {
        match self.phase.get() {
            Phase::Mounted => {}
            Phase::Updating => return Err(self.reentrant(Phase::Updating)),
            Phase::Unmounted | Phase::Mounting | Phase::Unmounting => {
                self.props.borrow_mut().merge(patch);
                return Ok(());
            }
        }

        self.props.borrow_mut().merge(patch);
        let result = self.rerender();

        if self.unmount_pending.replace(false) {
            self.unmount();
        }
        result
    }

    fn rerender(&self) -> Result<()> {
        let generation = self.next_generation();
        let transition = Transition::enter(
            self,
            Phase::Updating,
            Phase::Mounted,
            Rollback::Render(generation),
        );
        let fresh = self.render(generation)?;

        let old = self.node.replace(Some(fresh.clone()));
        if let Some(old) = old {
            if let Some(parent) = old.parent() {
                parent.replace_child(&fresh, &old);
            }
        }
        self.release(|origin| matches!(origin, Origin::Render(g) if g != generation));

        tracing::trace!("updated {} (render {})", self.component.name(), generation);
        transition.commit(Phase::Mounted);
        Ok(())
    }

    /// Release everything and detach the node
    ///
    /// Subscriptions are released in registration order, then listeners.
    /// While mounting or updating the request is deferred until that
    /// finishes; otherwise does nothing unless mounted.
    pub fn unmount(&self) {
        match self.phase.get() {
            Phase::Mounted => {}
            phase @ (Phase::Mounting | Phase::Updating) => {
                tracing::debug!("{} unmount deferred while {}", self.component.name(), phase);
                self.unmount_pending.set(true);
                return;
            }
            Phase::Unmounted | Phase::Unmounting => return,
        }

        let transition =
            Transition::enter(self, Phase::Unmounting, Phase::Unmounted, Rollback::Teardown);
        tracing::debug!("unmounting {}", self.component.name());

        self.component.before_unmount(&self.scope(Origin::Hook));
        self.teardown();
        transition.commit(Phase::Unmounted);
    }

    fn teardown(&self) {
        self.release(|_| true);
        let node = self.node.borrow_mut().take();
        if let Some(node) = node {
            node.detach();
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase.get()
    }

    pub fn is_mounted(&self) -> bool {
        matches!(self.phase.get(), Phase::Mounted | Phase::Updating)
    }

    /// Currently rendered node, if mounted
    pub fn node(&self) -> Option<Node> {
        self.node.borrow().clone()
    }

    /// Current props
    ///
    /// Do not hold the borrow across `update`.
    pub fn props(&self) -> Ref<'_, C::Props> {
        self.props.borrow()
    }

    pub fn component(&self) -> &C {
        &self.component
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// Weak handle for use inside callbacks
    pub fn handle(&self) -> InstanceHandle<C> {
        InstanceHandle {
            inner: self.this.clone(),
        }
    }

    /// Number of subscriptions currently held
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.borrow().len()
    }

    /// Number of tracked listeners whose node is still alive
    pub fn listener_count(&self) -> usize {
        self.listeners
            .borrow()
            .iter()
            .filter(|l| l.node.upgrade().is_some())
            .count()
    }

    fn scope(&self, origin: Origin) -> Scope<'_, C> {
        Scope {
            instance: self,
            origin,
        }
    }

    fn next_generation(&self) -> u64 {
        let generation = self.generation.get() + 1;
        self.generation.set(generation);
        generation
    }

    fn render(&self, generation: u64) -> Result<Node> {
        let props = self.props.borrow().clone();
        self.component
            .render(&props, &self.scope(Origin::Render(generation)))
    }

    /// Release tracked resources whose origin matches `which`
    fn release(&self, which: impl Fn(Origin) -> bool) {
        let stale: Vec<TrackedSubscription> = {
            let mut subs = self.subscriptions.borrow_mut();
            let (stale, keep) = std::mem::take(&mut *subs)
                .into_iter()
                .partition(|t| which(t.origin));
            *subs = keep;
            stale
        };
        for tracked in &stale {
            tracked.subscription.unsubscribe();
        }

        let stale: Vec<TrackedListener> = {
            let mut listeners = self.listeners.borrow_mut();
            let (stale, keep) = std::mem::take(&mut *listeners)
                .into_iter()
                .partition(|t| which(t.origin));
            *listeners = keep;
            stale
        };
        for tracked in &stale {
            if let Some(node) = tracked.node.upgrade() {
                node.remove_event_listener(&tracked.event, tracked.id);
            }
        }
    }

    fn reentrant(&self, phase: Phase) -> ComponentError {
        tracing::warn!("{} called while {}", self.component.name(), phase);
        ComponentError::Reentrant {
            component: self.component.name(),
            phase: phase.as_str(),
        }
    }
}

impl<C: Component> Drop for Instance<C> {
    fn drop(&mut self) {
        if self.phase.get() == Phase::Mounted {
            self.unmount();
        }
    }
}

impl<C: Component> fmt::Debug for Instance<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("component", &self.component.name())
            .field("phase", &self.phase.get())
            .field("subscriptions", &self.subscriptions.borrow().len())
            .field("listeners", &self.listeners.borrow().len())
            .field("unmount_pending", &self.unmount_pending.get())
            .finish()
    }
}

/// What render and the lifecycle hooks may do to the world
///
/// Every listener and subscription made through a scope is owned by the
/// instance and released automatically.
pub struct Scope<'a, C: Component> {
    instance: &'a Instance<C>,
    origin: Origin,
}

impl<'a, C: Component> Scope<'a, C> {
    /// Attach `handler` to `node` for `event`
    pub fn bind_external_event<F>(&self, node: &Node, event: &str, handler: F) -> ListenerId
    where
        F: Fn(&NodeEvent) + 'static,
    {
        let id = node.add_event_listener(event, handler);
        self.instance.listeners.borrow_mut().push(TrackedListener {
            node: node.downgrade(),
            event: event.to_string(),
            id,
            origin: self.origin,
        });
        id
    }

    /// Subscribe to writes of exactly `path` in the store
    pub fn subscribe_to_state<F>(&self, path: &str, callback: F)
    where
        F: Fn(&Value, Option<&Value>, &str) + 'static,
    {
        let subscription = self.instance.runtime.store().subscribe(path, callback);
        self.track(subscription);
    }

    /// Subscribe to `topic` on the event bus
    pub fn subscribe_to_bus<F>(&self, topic: &str, callback: F)
    where
        F: Fn(&Value) + 'static,
    {
        let subscription = self.instance.runtime.bus().subscribe(topic, callback);
        self.track(subscription);
    }

    fn track(&self, subscription: Subscription) {
        self.instance
            .subscriptions
            .borrow_mut()
            .push(TrackedSubscription {
                subscription,
                origin: self.origin,
            });
    }

    /// Weak handle to the instance, for callbacks that call `update`
    pub fn handle(&self) -> InstanceHandle<C> {
        self.instance.handle()
    }

    pub fn runtime(&self) -> &Runtime {
        &self.instance.runtime
    }

    pub fn store(&self) -> &Rc<Store> {
        self.instance.runtime.store()
    }

    pub fn bus(&self) -> &Rc<EventBus> {
        self.instance.runtime.bus()
    }

    /// Snapshot of the current props
    pub fn props(&self) -> C::Props {
        self.instance.props.borrow().clone()
    }

    pub fn phase(&self) -> Phase {
        self.instance.phase()
    }
}

/// Non-owning handle to an [`Instance`]
pub struct InstanceHandle<C: Component> {
    inner: Weak<Instance<C>>,
}

impl<C: Component> Clone for InstanceHandle<C> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<C: Component> InstanceHandle<C> {
    pub fn upgrade(&self) -> Option<Rc<Instance<C>>> {
        self.inner.upgrade()
    }

    /// Update the instance if it still exists
    pub fn update(&self, patch: <C::Props as Props>::Patch) -> Result<()> {
        match self.inner.upgrade() {
            Some(instance) => instance.update(patch),
            None => Ok(()),
        }
    }

    /// [`update`](Self::update), logging instead of returning the error
    ///
    /// Meant for bus/store callbacks, which have nowhere to return an error to.
    pub fn update_or_log(&self, patch: <C::Props as Props>::Patch) {
        if let Err(err) = self.update(patch) {
            tracing::error!("update from callback failed: {}", err);
        }
    }
}

/// Type-erased lifecycle, for holding instances of different components
pub trait Mountable {
    fn mount(&self, parent: Option<&Node>) -> Result<Node>;
    fn unmount(&self);
    fn is_mounted(&self) -> bool;
    fn name(&self) -> &'static str;
}

impl<C: Component> Mountable for Instance<C> {
    fn mount(&self, parent: Option<&Node>) -> Result<Node> {
        Instance::mount(self, parent)
    }

    fn unmount(&self) {
        Instance::unmount(self)
    }

    fn is_mounted(&self) -> bool {
        Instance::is_mounted(self)
    }

    fn name(&self) -> &'static str {
        self.component.name()
    }
}
