//! End-to-end behaviour of the bus, store and component lifecycle together

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use argo_core::prelude::*;
use argo_core::StateChange;
use serde_json::{json, Value};

props! {
    struct TextProps / TextPatch {
        text: String = String::new(),
        disabled: bool = false,
    }
}

/// A button whose label comes from props, and which publishes on click
struct Button;

impl Component for Button {
    type Props = TextProps;

    fn render(&self, props: &TextProps, scope: &Scope<'_, Self>) -> Result<Node> {
        let node = Node::element("button").with_text(props.text.clone());
        if props.disabled {
            node.set_attribute("disabled", "true");
        }
        let bus = scope.bus().clone();
        let text = props.text.clone();
        scope.bind_external_event(&node, "click", move |_| {
            bus.publish("button:clicked", text.clone());
        });
        Ok(node)
    }

    fn after_mount(&self, scope: &Scope<'_, Self>) {
        let handle = scope.handle();
        scope.subscribe_to_bus("button:disable", move |_| {
            handle.update_or_log(TextPatch::new().disabled(true));
        });
    }
}

#[test]
fn bus_subscribe_publish_unsubscribe() {
    let bus = EventBus::new();
    let calls = Rc::new(RefCell::new(Vec::new()));

    let c = calls.clone();
    let sub = bus.subscribe("x", move |data| c.borrow_mut().push(data.clone()));

    assert_eq!(bus.publish("x", 42), 1);
    assert_eq!(*calls.borrow(), vec![json!(42)]);

    assert!(sub.unsubscribe());
    assert_eq!(bus.publish("x", 7), 0);
    assert_eq!(calls.borrow().len(), 1);
}

#[test]
fn store_set_notifies_path_subscriber() {
    let runtime = Runtime::new(json!({}));
    let received = Rc::new(RefCell::new(None));

    let r = received.clone();
    let _sub = runtime
        .store()
        .subscribe("fuel.jarak", move |value, old, path| {
            *r.borrow_mut() = Some((value.clone(), old.cloned(), path.to_string()));
        });

    runtime.store().set("fuel.jarak", 10).unwrap();
    assert_eq!(runtime.store().get("fuel.jarak"), Some(json!(10)));
    assert_eq!(
        received.borrow().clone(),
        Some((json!(10), None, "fuel.jarak".to_string()))
    );
    assert!(runtime.store().get("fuel").unwrap().is_object());
}

#[test]
fn global_broadcast_precedes_path_subscribers() {
    let runtime = Runtime::new(json!({ "ui": { "currentView": "home" } }));
    let order = Rc::new(RefCell::new(Vec::new()));

    let o = order.clone();
    let _c1 = runtime
        .store()
        .subscribe("ui.currentView", move |_, _, _| o.borrow_mut().push("c1"));
    let o = order.clone();
    let _c2 = runtime
        .store()
        .subscribe("ui.currentView", move |_, _, _| o.borrow_mut().push("c2"));
    let o = order.clone();
    let _global = runtime.bus().subscribe(STATE_CHANGE_TOPIC, move |payload| {
        let change = StateChange::from_payload(payload).unwrap();
        assert_eq!(change.path, "ui.currentView");
        o.borrow_mut().push("global");
    });

    runtime.store().set("ui.currentView", "history").unwrap();
    runtime.store().set("ui.currentView", "home").unwrap();
    assert_eq!(
        *order.borrow(),
        vec!["global", "c1", "c2", "global", "c1", "c2"]
    );
}

#[test]
fn component_lifecycle_scenario() {
    let runtime = Runtime::new(json!({}));
    let parent = Node::element("section");
    let button = Instance::new(runtime.clone(), Button, TextPatch::new().text("A"));

    button.mount(Some(&parent)).unwrap();
    assert_eq!(parent.child_count(), 1);
    assert_eq!(runtime.bus().subscriber_count("button:disable"), 1);

    button.update(TextPatch::new().text("B")).unwrap();
    assert_eq!(parent.child_count(), 1);
    assert_eq!(parent.children()[0].text_content(), "B");

    button.unmount();
    assert_eq!(parent.child_count(), 0);
    assert_eq!(button.listener_count(), 0);
    assert_eq!(button.subscription_count(), 0);
    assert_eq!(runtime.stats().bus.subscriber_count, 0);
}

#[test]
fn clicks_and_bus_driven_updates() {
    let runtime = Runtime::new(json!({}));
    let parent = Node::element("section");
    let button = Instance::new(runtime.clone(), Button, TextPatch::new().text("Simpan"));
    button.mount(Some(&parent)).unwrap();

    let clicked = Rc::new(RefCell::new(Vec::new()));
    let c = clicked.clone();
    let _sub = runtime
        .bus()
        .subscribe("button:clicked", move |data| c.borrow_mut().push(data.clone()));

    parent.children()[0].dispatch("click", Value::Null);
    runtime.bus().emit("button:disable");
    assert_eq!(
        parent.render_to_string(),
        r#"<section><button disabled="true">Simpan</button></section>"#
    );

    // the freshly rendered button carries the only live listener
    parent.children()[0].dispatch("click", Value::Null);
    assert_eq!(*clicked.borrow(), vec![json!("Simpan"), json!("Simpan")]);
    assert_eq!(parent.subtree_listener_count(), 1);
}

#[test]
fn listeners_do_not_accumulate_over_updates() {
    let runtime = Runtime::new(json!({}));
    let parent = Node::element("section");
    let button = Instance::new(runtime, Button, TextPatch::new());
    button.mount(Some(&parent)).unwrap();

    for n in 0..20 {
        button.update(TextPatch::new().text(n.to_string())).unwrap();
    }
    assert_eq!(button.listener_count(), 1);
    assert_eq!(button.subscription_count(), 1);
    assert_eq!(parent.subtree_listener_count(), 1);
}

#[test]
fn remount_is_a_fresh_lifecycle() {
    let runtime = Runtime::new(json!({}));
    let parent = Node::element("section");
    let button = Instance::new(runtime.clone(), Button, TextPatch::new().text("A"));

    button.mount(Some(&parent)).unwrap();
    button.unmount();
    button.unmount();
    button.mount(Some(&parent)).unwrap();

    assert_eq!(parent.child_count(), 1);
    assert_eq!(runtime.bus().subscriber_count("button:disable"), 1);
    assert_eq!(button.phase(), Phase::Mounted);
}

#[test]
fn reentrant_publish_with_self_unsubscribe() {
    let bus = Rc::new(EventBus::new());
    let first_calls = Rc::new(Cell::new(0));
    let other_calls = Rc::new(Cell::new(0));

    let slot: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
    let (b, s, f) = (bus.clone(), slot.clone(), first_calls.clone());
    let first = bus.subscribe("x", move |_| {
        f.set(f.get() + 1);
        if let Some(sub) = s.borrow().as_ref() {
            sub.unsubscribe();
        }
        b.publish("x", "nested");
    });
    *slot.borrow_mut() = Some(first);

    let o = other_calls.clone();
    let _other = bus.subscribe("x", move |_| o.set(o.get() + 1));

    bus.publish("x", "outer");
    assert_eq!(first_calls.get(), 1);
    // once from the nested publish, once from the outer one
    assert_eq!(other_calls.get(), 2);
}

#[test]
fn failing_subscriber_is_isolated() {
    let runtime = Runtime::new(json!({}));
    let reached = Rc::new(Cell::new(false));

    let _bad = runtime
        .store()
        .subscribe("results.bersih", |_, _, _| panic!("subscriber bug"));
    let r = reached.clone();
    let _good = runtime
        .store()
        .subscribe("results.bersih", move |_, _, _| r.set(true));

    runtime.store().set("results.bersih", 1).unwrap();
    assert!(reached.get());
    assert_eq!(runtime.store().get("results.bersih"), Some(json!(1)));
}

#[test]
fn invalid_path_is_reported() {
    let runtime = Runtime::new(json!({ "settings": { "currency": "IDR" } }));
    assert!(matches!(
        runtime.store().set("", 1),
        Err(StoreError::EmptyPath(_))
    ));
    assert!(matches!(
        runtime.store().set("settings.currency.code", 1),
        Err(StoreError::NotAContainer { .. })
    ));
    assert_eq!(runtime.store().get("settings.missing.deeper"), None);
}
