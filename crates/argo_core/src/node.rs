//! Retained UI node tree
//!
//! Components render into [`Node`]s: reference-counted elements and text
//! nodes with ordered children, string attributes and named event listeners.
//! Children are owned by their parent; the parent link is weak.
//!
//! ```rust
//! use argo_core::node::Node;
//!
//! let root = Node::element("main");
//! let card = Node::element("div")
//!     .with_attr("class", "card")
//!     .with_child(Node::text("Rp 150.000"));
//! root.append_child(&card);
//!
//! assert_eq!(root.child_count(), 1);
//! assert_eq!(
//!     root.render_to_string(),
//!     r#"<main><div class="card">Rp 150.000</div></main>"#
//! );
//! ```

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

use rustc_hash::FxHashMap;
use serde_json::Value;
use smallvec::SmallVec;

/// Identifies one listener registration on one node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Callback for node events
///
/// Uses Rc since UI is single-threaded.
pub type Listener = Rc<dyn Fn(&NodeEvent)>;

/// Event delivered to node listeners
#[derive(Clone, Debug)]
pub struct NodeEvent {
    /// Event name (`"click"`, `"input"`, ...)
    pub name: String,
    /// Node the event was dispatched on
    pub target: Node,
    /// Event data, e.g. the new text of an `input` event
    pub data: Value,
}

enum NodeKind {
    Element { tag: String },
    Text,
}

struct NodeInner {
    kind: NodeKind,
    text: RefCell<String>,
    attributes: RefCell<BTreeMap<String, String>>,
    children: RefCell<Vec<Node>>,
    parent: RefCell<Weak<NodeInner>>,
    listeners: RefCell<FxHashMap<String, SmallVec<[(ListenerId, Listener); 2]>>>,
    next_listener: Cell<u64>,
}

/// A node in the UI tree (cheap to clone, clones share the node)
#[derive(Clone)]
pub struct Node(Rc<NodeInner>);

/// Non-owning reference to a [`Node`]
#[derive(Clone, Default)]
pub struct WeakNode(Weak<NodeInner>);

impl WeakNode {
    pub fn upgrade(&self) -> Option<Node> {
        self.0.upgrade().map(Node)
    }
}

impl Node {
    fn new(kind: NodeKind, text: String) -> Self {
        Node(Rc::new(NodeInner {
            kind,
            text: RefCell::new(text),
            attributes: RefCell::new(BTreeMap::new()),
            children: RefCell::new(Vec::new()),
            parent: RefCell::new(Weak::new()),
            listeners: RefCell::new(FxHashMap::default()),
            next_listener: Cell::new(0),
        }))
    }

    /// Create an element node
    pub fn element(tag: impl Into<String>) -> Self {
        Self::new(NodeKind::Element { tag: tag.into() }, String::new())
    }

    /// Create a text node
    pub fn text(content: impl Into<String>) -> Self {
        Self::new(NodeKind::Text, content.into())
    }

    /// Element tag, `None` for text nodes
    pub fn tag(&self) -> Option<&str> {
        match &self.0.kind {
            NodeKind::Element { tag } => Some(tag),
            NodeKind::Text => None,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self.0.kind, NodeKind::Text)
    }

    pub fn ptr_eq(&self, other: &Node) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn downgrade(&self) -> WeakNode {
        WeakNode(Rc::downgrade(&self.0))
    }

    // =========================================================================
    // Content
    // =========================================================================

    /// Concatenated text of this node and its descendants
    pub fn text_content(&self) -> String {
        if self.is_text() {
            return self.0.text.borrow().clone();
        }
        self.0
            .children
            .borrow()
            .iter()
            .map(Node::text_content)
            .collect()
    }

    /// Replace the text of a text node, or the children of an element with
    /// a single text node
    pub fn set_text(&self, content: impl Into<String>) {
        if self.is_text() {
            *self.0.text.borrow_mut() = content.into();
            return;
        }
        for child in self.children() {
            self.remove_child(&child);
        }
        self.append_child(&Node::text(content));
    }

    pub fn set_attribute(&self, name: impl Into<String>, value: impl Into<String>) {
        self.0
            .attributes
            .borrow_mut()
            .insert(name.into(), value.into());
    }

    pub fn attribute(&self, name: &str) -> Option<String> {
        self.0.attributes.borrow().get(name).cloned()
    }

    pub fn remove_attribute(&self, name: &str) -> Option<String> {
        self.0.attributes.borrow_mut().remove(name)
    }

    /// Builder form of [`set_attribute`](Self::set_attribute)
    pub fn with_attr(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attribute(name, value);
        self
    }

    /// Builder form of [`append_child`](Self::append_child)
    pub fn with_child(self, child: Node) -> Self {
        self.append_child(&child);
        self
    }

    /// Builder that appends a text child
    pub fn with_text(self, content: impl Into<String>) -> Self {
        self.with_child(Node::text(content))
    }

    // =========================================================================
    // Tree structure
    // =========================================================================

    pub fn parent(&self) -> Option<Node> {
        self.0.parent.borrow().upgrade().map(Node)
    }

    pub fn children(&self) -> Vec<Node> {
        self.0.children.borrow().clone()
    }

    pub fn child_count(&self) -> usize {
        self.0.children.borrow().len()
    }

    /// Append `child`, moving it out of its current parent first
    pub fn append_child(&self, child: &Node) {
        child.detach();
        *child.0.parent.borrow_mut() = Rc::downgrade(&self.0);
        self.0.children.borrow_mut().push(child.clone());
    }

    /// Remove `child` if it is a direct child of this node
    pub fn remove_child(&self, child: &Node) -> bool {
        let removed = {
            let mut children = self.0.children.borrow_mut();
            match children.iter().position(|c| c.ptr_eq(child)) {
                Some(index) => {
                    children.remove(index);
                    true
                }
                None => false,
            }
        };
        if removed {
            *child.0.parent.borrow_mut() = Weak::new();
        }
        removed
    }

    /// Put `new` where `old` currently is
    ///
    /// Returns `false` (and changes nothing) if `old` is not a child of this
    /// node.
    pub fn replace_child(&self, new: &Node, old: &Node) -> bool {
        if new.ptr_eq(old) {
            return self.index_of(old).is_some();
        }
        if self.index_of(old).is_none() {
            return false;
        }
        new.detach();
        let mut children = self.0.children.borrow_mut();
        let Some(index) = children.iter().position(|c| c.ptr_eq(old)) else {
            return false;
        };
        children[index] = new.clone();
        drop(children);

        *new.0.parent.borrow_mut() = Rc::downgrade(&self.0);
        *old.0.parent.borrow_mut() = Weak::new();
        true
    }

    /// Remove this node from its parent, if attached
    pub fn detach(&self) -> bool {
        match self.parent() {
            Some(parent) => parent.remove_child(self),
            None => false,
        }
    }

    fn index_of(&self, child: &Node) -> Option<usize> {
        self.0.children.borrow().iter().position(|c| c.ptr_eq(child))
    }

    /// First node in this subtree (including self) matching `predicate`, depth-first
    pub fn find(&self, predicate: &dyn Fn(&Node) -> bool) -> Option<Node> {
        if predicate(self) {
            return Some(self.clone());
        }
        self.children()
            .iter()
            .find_map(|child| child.find(predicate))
    }

    // =========================================================================
    // Events
    // =========================================================================

    /// Register `handler` for `event`
    pub fn add_event_listener<F>(&self, event: &str, handler: F) -> ListenerId
    where
        F: Fn(&NodeEvent) + 'static,
    {
        let id = ListenerId(self.0.next_listener.get());
        self.0.next_listener.set(id.0 + 1);
        self.0
            .listeners
            .borrow_mut()
            .entry(event.to_string())
            .or_default()
            .push((id, Rc::new(handler)));
        id
    }

    /// Remove a listener previously added with [`add_event_listener`](Self::add_event_listener)
    pub fn remove_event_listener(&self, event: &str, id: ListenerId) -> bool {
        let mut listeners = self.0.listeners.borrow_mut();
        let Some(entries) = listeners.get_mut(event) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|(other, _)| *other != id);
        let removed = entries.len() != before;
        if entries.is_empty() {
            listeners.remove(event);
        }
        removed
    }

    /// Number of live listeners on this node (all events)
    pub fn listener_count(&self) -> usize {
        self.0.listeners.borrow().values().map(|v| v.len()).sum()
    }

    /// Number of live listeners in this subtree
    pub fn subtree_listener_count(&self) -> usize {
        self.listener_count()
            + self
                .children()
                .iter()
                .map(Node::subtree_listener_count)
                .sum::<usize>()
    }

    /// Invoke the listeners for `event` on this node, in registration order
    ///
    /// Returns how many listeners ran.
    pub fn dispatch(&self, event: &str, data: impl Into<Value>) -> usize {
        let handlers: SmallVec<[Listener; 2]> = match self.0.listeners.borrow().get(event) {
            Some(entries) => entries.iter().map(|(_, h)| h.clone()).collect(),
            None => return 0,
        };
        let event = NodeEvent {
            name: event.to_string(),
            target: self.clone(),
            data: data.into(),
        };
        for handler in &handlers {
            handler(&event);
        }
        handlers.len()
    }

    // =========================================================================
    // Output
    // =========================================================================

    /// Serialize the subtree as markup (attributes sorted by name)
    pub fn render_to_string(&self) -> String {
        let mut out = String::new();
        self.write_markup(&mut out);
        out
    }

    fn write_markup(&self, out: &mut String) {
        match &self.0.kind {
            NodeKind::Text => escape_into(out, &self.0.text.borrow()),
            NodeKind::Element { tag } => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in self.0.attributes.borrow().iter() {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    escape_into(out, value);
                    out.push('"');
                }
                out.push('>');
                for child in self.0.children.borrow().iter() {
                    child.write_markup(out);
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
        }
    }
}

fn escape_into(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0.kind {
            NodeKind::Text => f.debug_tuple("Text").field(&*self.0.text.borrow()).finish(),
            NodeKind::Element { tag } => f
                .debug_struct("Element")
                .field("tag", tag)
                .field("children", &self.child_count())
                .field("listeners", &self.listener_count())
                .finish(),
        }
    }
}

impl fmt::Debug for WeakNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.upgrade() {
            Some(node) => f.debug_tuple("WeakNode").field(&node).finish(),
            None => f.write_str("WeakNode(dropped)"),
        }
    }
}
