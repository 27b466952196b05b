// ============================================================================
// spark-bind - DOM Nodes
// A small in-memory DOM: elements, text, comments and fragments
// ============================================================================
//
// `Node` is a cheap, clonable handle (`Rc<RefCell<..>>`). Parents own their
// children strongly, children point back weakly. Listener closures that need
// their element must capture a `WeakNode` for the same reason.
//
// Every mutation that changes observable state bumps a thread-local counter
// (`mutation_count`). Setters that would write the current value are no-ops
// and do not count.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use serde_json::Value;

use super::event::Event;

/// Callback registered with `Node::add_event_listener`
pub type EventCallback = Rc<dyn Fn(&Event)>;

/// Identity of a node, stable for as long as the node is alive
pub type NodeKey = usize;

thread_local! {
    static MUTATIONS: Cell<u64> = const { Cell::new(0) };
    static NEXT_LISTENER: Cell<u64> = const { Cell::new(1) };
}

/// Total number of DOM mutations performed on this thread.
///
/// Compare two readings to assert that an operation left the DOM untouched.
pub fn mutation_count() -> u64 {
    MUTATIONS.with(|m| m.get())
}

fn record_mutation() {
    MUTATIONS.with(|m| m.set(m.get() + 1));
}

// =============================================================================
// NODE DATA
// =============================================================================

/// What kind of node a handle points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Element,
    Text,
    Comment,
    Fragment,
}

/// Handle returned by `add_event_listener`, used to remove the listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct Listener {
    id: ListenerId,
    event_type: String,
    callback: EventCallback,
}

struct ElementData {
    tag: String,
    attributes: IndexMap<String, String>,
    properties: IndexMap<String, Value>,
    listeners: Vec<Listener>,
}

enum NodeKind {
    Element(ElementData),
    Text(String),
    Comment(String),
    Fragment,
}

struct NodeData {
    kind: NodeKind,
    parent: Option<Weak<RefCell<NodeData>>>,
    children: Vec<Node>,
}

// =============================================================================
// NODE
// =============================================================================

/// Handle to a DOM node
#[derive(Clone)]
pub struct Node(Rc<RefCell<NodeData>>);

/// Non-owning handle to a DOM node
#[derive(Clone)]
pub struct WeakNode(Weak<RefCell<NodeData>>);

impl WeakNode {
    pub fn upgrade(&self) -> Option<Node> {
        self.0.upgrade().map(Node)
    }
}

impl Node {
    fn from_kind(kind: NodeKind) -> Self {
        Node(Rc::new(RefCell::new(NodeData {
            kind,
            parent: None,
            children: Vec::new(),
        })))
    }

    /// Create a detached element. Tag names are case-insensitive.
    pub fn element(tag: &str) -> Self {
        Self::from_kind(NodeKind::Element(ElementData {
            tag: tag.to_ascii_lowercase(),
            attributes: IndexMap::new(),
            properties: IndexMap::new(),
            listeners: Vec::new(),
        }))
    }

    /// Create a detached text node.
    pub fn text(data: impl Into<String>) -> Self {
        Self::from_kind(NodeKind::Text(data.into()))
    }

    /// Create a detached comment node.
    pub fn comment(data: impl Into<String>) -> Self {
        Self::from_kind(NodeKind::Comment(data.into()))
    }

    /// Create an empty document fragment.
    pub fn fragment() -> Self {
        Self::from_kind(NodeKind::Fragment)
    }

    pub fn node_type(&self) -> NodeType {
        match self.0.borrow().kind {
            NodeKind::Element(_) => NodeType::Element,
            NodeKind::Text(_) => NodeType::Text,
            NodeKind::Comment(_) => NodeType::Comment,
            NodeKind::Fragment => NodeType::Fragment,
        }
    }

    pub fn is_element(&self) -> bool {
        self.node_type() == NodeType::Element
    }

    pub fn is_text(&self) -> bool {
        self.node_type() == NodeType::Text
    }

    pub fn is_comment(&self) -> bool {
        self.node_type() == NodeType::Comment
    }

    /// Lowercase tag name of an element.
    pub fn tag_name(&self) -> Option<String> {
        match &self.0.borrow().kind {
            NodeKind::Element(el) => Some(el.tag.clone()),
            _ => None,
        }
    }

    pub fn key(&self) -> NodeKey {
        Rc::as_ptr(&self.0) as *const () as usize
    }

    pub fn ptr_eq(&self, other: &Node) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn downgrade(&self) -> WeakNode {
        WeakNode(Rc::downgrade(&self.0))
    }

    // =========================================================================
    // CHARACTER DATA
    // =========================================================================

    /// Text of a text or comment node.
    pub fn data(&self) -> Option<String> {
        match &self.0.borrow().kind {
            NodeKind::Text(s) | NodeKind::Comment(s) => Some(s.clone()),
            _ => None,
        }
    }

    /// Replace the text of a text or comment node.
    pub fn set_data(&self, data: &str) {
        let mut node = self.0.borrow_mut();
        if let NodeKind::Text(s) | NodeKind::Comment(s) = &mut node.kind {
            if s != data {
                *s = data.to_string();
                record_mutation();
            }
        }
    }

    /// Concatenated text of this node and all its descendants.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        let node = self.0.borrow();
        match &node.kind {
            NodeKind::Text(s) => out.push_str(s),
            NodeKind::Comment(_) => {}
            _ => {
                for child in &node.children {
                    child.collect_text(out);
                }
            }
        }
    }

    // =========================================================================
    // TREE NAVIGATION
    // =========================================================================

    pub fn parent(&self) -> Option<Node> {
        self.0.borrow().parent.as_ref().and_then(|p| p.upgrade()).map(Node)
    }

    pub fn children(&self) -> Vec<Node> {
        self.0.borrow().children.clone()
    }

    pub fn child_count(&self) -> usize {
        self.0.borrow().children.len()
    }

    pub fn first_child(&self) -> Option<Node> {
        self.0.borrow().children.first().cloned()
    }

    /// Element children only.
    pub fn child_elements(&self) -> Vec<Node> {
        self.children().into_iter().filter(Node::is_element).collect()
    }

    fn index_in_parent(&self) -> Option<(Node, usize)> {
        let parent = self.parent()?;
        let index = parent.0.borrow().children.iter().position(|c| c.ptr_eq(self))?;
        Some((parent, index))
    }

    pub fn next_sibling(&self) -> Option<Node> {
        let (parent, index) = self.index_in_parent()?;
        let sibling = parent.0.borrow().children.get(index + 1).cloned();
        sibling
    }

    pub fn previous_sibling(&self) -> Option<Node> {
        let (parent, index) = self.index_in_parent()?;
        let sibling = index.checked_sub(1).and_then(|i| parent.0.borrow().children.get(i).cloned());
        sibling
    }

    /// Topmost ancestor (the node itself when detached).
    pub fn root(&self) -> Node {
        let mut current = self.clone();
        while let Some(parent) = current.parent() {
            current = parent;
        }
        current
    }

    /// All descendants in document order, excluding the node itself.
    pub fn descendants(&self) -> Vec<Node> {
        let mut out = Vec::new();
        self.collect_descendants(&mut out);
        out
    }

    fn collect_descendants(&self, out: &mut Vec<Node>) {
        for child in self.children() {
            out.push(child.clone());
            child.collect_descendants(out);
        }
    }

    // =========================================================================
    // TREE MUTATION
    // =========================================================================

    /// Detach this node from its parent. Returns false if it had none.
    pub fn remove(&self) -> bool {
        let Some((parent, index)) = self.index_in_parent() else {
            return false;
        };
        parent.0.borrow_mut().children.remove(index);
        self.0.borrow_mut().parent = None;
        record_mutation();
        true
    }

    /// Append a child, moving it out of its current parent.
    ///
    /// Appending a fragment moves the fragment's children instead.
    pub fn append_child(&self, child: &Node) {
        self.insert_before(child, None);
    }

    /// Insert `child` before `reference` (or at the end when `None`).
    pub fn insert_before(&self, child: &Node, reference: Option<&Node>) {
        if child.node_type() == NodeType::Fragment {
            for grandchild in child.children() {
                self.insert_before(&grandchild, reference);
            }
            return;
        }

        child.remove();
        {
            let mut node = self.0.borrow_mut();
            let index = reference
                .and_then(|r| node.children.iter().position(|c| c.ptr_eq(r)))
                .unwrap_or(node.children.len());
            node.children.insert(index, child.clone());
        }
        child.0.borrow_mut().parent = Some(Rc::downgrade(&self.0));
        record_mutation();
    }

    /// Insert `node` right before this one. No-op when detached.
    pub fn before(&self, node: &Node) {
        if let Some(parent) = self.parent() {
            parent.insert_before(node, Some(self));
        }
    }

    /// Insert `node` right after this one. No-op when detached.
    pub fn after(&self, node: &Node) {
        if let Some(parent) = self.parent() {
            let next = self.next_sibling();
            parent.insert_before(node, next.as_ref());
        }
    }

    /// Put `node` where this one is and detach this one.
    pub fn replace_with(&self, node: &Node) {
        if self.parent().is_some() {
            self.before(node);
            self.remove();
        }
    }

    /// Remove every child.
    pub fn clear_children(&self) {
        for child in self.children() {
            child.remove();
        }
    }

    /// Copy this node; `deep` also copies descendants.
    ///
    /// Like the browser's `cloneNode`, attributes are copied but runtime
    /// properties and event listeners are not.
    pub fn clone_node(&self, deep: bool) -> Node {
        let copy = {
            let node = self.0.borrow();
            let kind = match &node.kind {
                NodeKind::Element(el) => NodeKind::Element(ElementData {
                    tag: el.tag.clone(),
                    attributes: el.attributes.clone(),
                    properties: IndexMap::new(),
                    listeners: Vec::new(),
                }),
                NodeKind::Text(s) => NodeKind::Text(s.clone()),
                NodeKind::Comment(s) => NodeKind::Comment(s.clone()),
                NodeKind::Fragment => NodeKind::Fragment,
            };
            Node::from_kind(kind)
        };

        if deep {
            for child in self.children() {
                let child_copy = child.clone_node(true);
                copy.0.borrow_mut().children.push(child_copy.clone());
                child_copy.0.borrow_mut().parent = Some(Rc::downgrade(&copy.0));
            }
        }
        copy
    }

    // =========================================================================
    // ATTRIBUTES
    // =========================================================================

    fn with_element<R>(&self, f: impl FnOnce(&ElementData) -> R) -> Option<R> {
        match &self.0.borrow().kind {
            NodeKind::Element(el) => Some(f(el)),
            _ => None,
        }
    }

    fn with_element_mut<R>(&self, f: impl FnOnce(&mut ElementData) -> R) -> Option<R> {
        match &mut self.0.borrow_mut().kind {
            NodeKind::Element(el) => Some(f(el)),
            _ => None,
        }
    }

    pub fn get_attribute(&self, name: &str) -> Option<String> {
        self.with_element(|el| el.attributes.get(name).cloned()).flatten()
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.with_element(|el| el.attributes.contains_key(name)).unwrap_or(false)
    }

    pub fn set_attribute(&self, name: &str, value: &str) {
        self.with_element_mut(|el| {
            if el.attributes.get(name).map(String::as_str) != Some(value) {
                el.attributes.insert(name.to_string(), value.to_string());
                record_mutation();
            }
        });
    }

    /// Remove an attribute, returning its previous value.
    pub fn remove_attribute(&self, name: &str) -> Option<String> {
        self.with_element_mut(|el| {
            let removed = el.attributes.shift_remove(name);
            if removed.is_some() {
                record_mutation();
            }
            removed
        })
        .flatten()
    }

    /// Attribute names in source order.
    pub fn attribute_names(&self) -> Vec<String> {
        self.with_element(|el| el.attributes.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn attributes(&self) -> Vec<(String, String)> {
        self.with_element(|el| {
            el.attributes
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect()
        })
        .unwrap_or_default()
    }

    // =========================================================================
    // PROPERTIES
    // =========================================================================

    /// Read a runtime property.
    ///
    /// A property that was never assigned reflects its attribute the way the
    /// common browser properties do: `value`, `id` and `className` read the
    /// attribute text (empty when absent), `checked`, `disabled` and `hidden`
    /// read attribute presence, `textContent` reads the descendant text and
    /// `tagName` the uppercase tag. Anything else reads as null.
    pub fn property(&self, name: &str) -> Value {
        let stored = self.with_element(|el| el.properties.get(name).cloned()).flatten();
        if let Some(value) = stored {
            return value;
        }
        if !self.is_element() {
            return Value::Null;
        }

        match name {
            "value" | "id" => Value::String(self.get_attribute(name).unwrap_or_default()),
            "className" => Value::String(self.get_attribute("class").unwrap_or_default()),
            "checked" | "disabled" | "hidden" => Value::Bool(self.has_attribute(name)),
            "textContent" => Value::String(self.text_content()),
            "tagName" => Value::String(self.tag_name().unwrap_or_default().to_ascii_uppercase()),
            _ => Value::Null,
        }
    }

    /// Assign a runtime property.
    ///
    /// `textContent` replaces the children with one text node; every other
    /// name is stored as-is, keeping non-string values intact.
    pub fn set_property(&self, name: &str, value: Value) {
        if !self.is_element() || self.property(name) == value {
            return;
        }

        if name == "textContent" {
            self.clear_children();
            let text = match &value {
                Value::String(s) => s.clone(),
                Value::Null => String::new(),
                other => other.to_string(),
            };
            self.append_child(&Node::text(text));
        }

        self.with_element_mut(|el| {
            el.properties.insert(name.to_string(), value);
        });
        record_mutation();
    }

    // =========================================================================
    // EVENTS
    // =========================================================================

    /// Register a listener for `event_type`.
    pub fn add_event_listener(&self, event_type: &str, callback: EventCallback) -> ListenerId {
        let id = NEXT_LISTENER.with(|n| {
            let id = n.get();
            n.set(id + 1);
            ListenerId(id)
        });
        self.with_element_mut(|el| {
            el.listeners.push(Listener {
                id,
                event_type: event_type.to_string(),
                callback,
            });
        });
        id
    }

    /// Remove a listener. Returns false if it was not registered here.
    pub fn remove_event_listener(&self, id: ListenerId) -> bool {
        self.with_element_mut(|el| {
            let before = el.listeners.len();
            el.listeners.retain(|l| l.id != id);
            el.listeners.len() != before
        })
        .unwrap_or(false)
    }

    /// Number of listeners registered for `event_type`.
    pub fn listener_count(&self, event_type: &str) -> usize {
        self.with_element(|el| {
            el.listeners
                .iter()
                .filter(|l| l.event_type == event_type)
                .count()
        })
        .unwrap_or(0)
    }

    /// Dispatch an event to this node's listeners, returning how many ran.
    ///
    /// Events do not bubble. Listeners run after the node's borrow has been
    /// released, so they may freely mutate the DOM, including this node.
    pub fn dispatch_event(&self, mut event: Event) -> usize {
        let callbacks: Vec<EventCallback> = self
            .with_element(|el| {
                el.listeners
                    .iter()
                    .filter(|l| l.event_type == event.event_type())
                    .map(|l| l.callback.clone())
                    .collect()
            })
            .unwrap_or_default();

        event.set_target(self.clone());
        for callback in &callbacks {
            callback(&event);
        }
        callbacks.len()
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Node {}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.node_type() {
            NodeType::Element => write!(f, "Node(<{}>)", self.tag_name().unwrap_or_default()),
            NodeType::Text => write!(f, "Node(text {:?})", self.data().unwrap_or_default()),
            NodeType::Comment => write!(f, "Node(comment {:?})", self.data().unwrap_or_default()),
            NodeType::Fragment => write!(f, "Node(#fragment, {} children)", self.child_count()),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn list_of(n: usize) -> (Node, Vec<Node>) {
        let ul = Node::element("ul");
        let items: Vec<Node> = (0..n).map(|_| Node::element("li")).collect();
        for item in &items {
            ul.append_child(item);
        }
        (ul, items)
    }

    #[test]
    fn append_and_navigate() {
        let (ul, items) = list_of(3);
        assert_eq!(ul.child_count(), 3);
        assert_eq!(items[1].parent(), Some(ul.clone()));
        assert_eq!(items[0].next_sibling(), Some(items[1].clone()));
        assert_eq!(items[2].previous_sibling(), Some(items[1].clone()));
        assert_eq!(items[2].next_sibling(), None);
        assert_eq!(items[1].root(), ul);
    }

    #[test]
    fn before_after_and_replace() {
        let (ul, items) = list_of(2);
        let marker = Node::comment("m");
        items[0].after(&marker);
        assert_eq!(ul.children()[1], marker);

        let replacement = Node::element("p");
        marker.replace_with(&replacement);
        assert_eq!(ul.child_count(), 3);
        assert_eq!(ul.children()[1], replacement);
        assert_eq!(marker.parent(), None);

        let first = Node::text("x");
        items[0].before(&first);
        assert_eq!(ul.first_child(), Some(first));
    }

    #[test]
    fn appending_moves_between_parents() {
        let (a, items) = list_of(1);
        let b = Node::element("ol");
        b.append_child(&items[0]);
        assert_eq!(a.child_count(), 0);
        assert_eq!(items[0].parent(), Some(b));
    }

    #[test]
    fn fragment_children_are_moved() {
        let frag = Node::fragment();
        frag.append_child(&Node::text("a"));
        frag.append_child(&Node::text("b"));

        let div = Node::element("div");
        div.append_child(&frag);
        assert_eq!(div.text_content(), "ab");
        assert_eq!(frag.child_count(), 0);
    }

    #[test]
    fn attributes_keep_order_and_count_mutations() {
        let el = Node::element("DIV");
        assert_eq!(el.tag_name().as_deref(), Some("div"));

        let before = mutation_count();
        el.set_attribute("id", "x");
        el.set_attribute("class", "y");
        el.set_attribute("class", "y");
        assert_eq!(mutation_count(), before + 2);
        assert_eq!(el.attribute_names(), vec!["id", "class"]);

        assert_eq!(el.remove_attribute("id").as_deref(), Some("x"));
        assert_eq!(el.remove_attribute("id"), None);
        assert!(!el.has_attribute("id"));
    }

    #[test]
    fn properties_reflect_until_assigned() {
        let input = Node::element("input");
        input.set_attribute("value", "initial");
        assert_eq!(input.property("value"), json!("initial"));
        assert_eq!(input.property("checked"), json!(false));
        assert_eq!(input.property("unknown"), json!(null));

        input.set_property("value", json!("typed"));
        assert_eq!(input.property("value"), json!("typed"));
        assert_eq!(input.get_attribute("value").as_deref(), Some("initial"));

        input.set_property("items", json!([1, 2]));
        assert_eq!(input.property("items"), json!([1, 2]));
    }

    #[test]
    fn text_content_property_replaces_children() {
        let p = Node::element("p");
        p.append_child(&Node::element("b"));
        p.set_property("textContent", json!("plain"));
        assert_eq!(p.child_count(), 1);
        assert_eq!(p.text_content(), "plain");
    }

    #[test]
    fn clone_copies_attributes_not_listeners() {
        let (ul, items) = list_of(2);
        ul.set_attribute("class", "list");
        ul.set_property("custom", json!(1));
        ul.add_event_listener("click", Rc::new(|_| {}));
        items[0].append_child(&Node::text("one"));

        let copy = ul.clone_node(true);
        assert_eq!(copy.get_attribute("class").as_deref(), Some("list"));
        assert_eq!(copy.property("custom"), json!(null));
        assert_eq!(copy.listener_count("click"), 0);
        assert_eq!(copy.child_count(), 2);
        assert_eq!(copy.text_content(), "one");
        assert!(!copy.children()[0].ptr_eq(&items[0]));

        let shallow = ul.clone_node(false);
        assert_eq!(shallow.child_count(), 0);
    }

    #[test]
    fn dispatch_runs_matching_listeners() {
        let button = Node::element("button");
        let hits = Rc::new(Cell::new(0));

        let id = button.add_event_listener("click", {
            let hits = hits.clone();
            Rc::new(move |event: &Event| {
                assert_eq!(event.event_type(), "click");
                hits.set(hits.get() + 1);
            })
        });
        button.add_event_listener("input", Rc::new(|_| {}));

        assert_eq!(button.dispatch_event(Event::new("click")), 1);
        assert_eq!(hits.get(), 1);

        assert!(button.remove_event_listener(id));
        assert!(!button.remove_event_listener(id));
        assert_eq!(button.dispatch_event(Event::new("click")), 0);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn listener_may_remove_its_own_node() {
        let (ul, items) = list_of(1);
        let weak = items[0].downgrade();
        items[0].add_event_listener(
            "click",
            Rc::new(move |_| {
                if let Some(node) = weak.upgrade() {
                    node.remove();
                }
            }),
        );
        items[0].dispatch_event(Event::new("click"));
        assert_eq!(ul.child_count(), 0);
    }
}
