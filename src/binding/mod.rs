// ============================================================================
// spark-bind - Bindings
// The plugin contract and the shared pieces every binding kind uses
// ============================================================================
//
// A binding kind is a `BindingPlugin`: it finds its targets in a subtree,
// turns each target's marker into a `Descriptor`, re-applies the descriptor
// on every update pass and releases it on cleanup. The binder never inspects
// markers itself; it only drives plugins from the registry.
//
// Every `update` is an error boundary. A failing expression is logged at
// warn level and the binding falls back to its safe default, so one broken
// binding never stops its siblings from updating.
// ============================================================================

pub mod attribute;
pub mod conditional;
pub mod event;
pub mod interpolation;
pub mod list;
pub mod property;
pub mod registry;
pub mod table;
pub mod two_way;

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use crate::config::BindOptions;
use crate::dom::Node;
use crate::error::EvaluationError;
use crate::expr::Evaluate;
use crate::primitives::scope::Scope;

pub use attribute::{AttributeBinding, AttributePlugin, AttributeState};
pub use conditional::{ConditionalPlugin, ConditionalState};
pub use event::{EventPlugin, EventState};
pub use interpolation::{InterpolationPart, InterpolationPlugin, InterpolationState};
pub use list::{ListPlugin, ListState};
pub use property::{PropertyBinding, PropertyPlugin, PropertyState};
pub use registry::PluginRegistry;
pub use table::{BindingTable, BoundBinding};
pub use two_way::{TwoWayPlugin, TwoWayState};

/// Marker attribute for conditional rendering
pub const IF_MARKER: &str = "@if";

/// Marker attribute for list rendering
pub const FOR_MARKER: &str = "@for";

// =============================================================================
// PLUGIN CONTRACT
// =============================================================================

/// One kind of binding.
pub trait BindingPlugin {
    /// Registry key, e.g. `"interpolation"`.
    fn kind(&self) -> &'static str;

    /// Find every target of this kind in `root` (root included).
    ///
    /// Must not mutate the DOM.
    fn discover(&self, root: &Node) -> Vec<Node>;

    /// Read the target's markers and do first-time setup.
    fn initialize(&self, target: &Node, cx: &BindContext) -> Descriptor;

    /// Re-apply the binding against the current scope. Must be idempotent.
    fn update(&self, target: &Node, cx: &BindContext, descriptor: &mut Descriptor);

    /// Release listeners and rendered content.
    fn cleanup(&self, _target: &Node, _descriptor: &mut Descriptor) {}
}

/// Per-binding state created by `initialize`.
pub enum Descriptor {
    Interpolation(InterpolationState),
    Property(PropertyState),
    Attribute(AttributeState),
    Event(EventState),
    TwoWay(TwoWayState),
    Conditional(ConditionalState),
    List(ListState),
    /// State of a plugin defined outside this crate
    Custom(Box<dyn Any>),
    /// Nothing to keep (a target whose marker turned out unusable)
    Empty,
}

impl fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Descriptor::Interpolation(_) => "Interpolation",
            Descriptor::Property(_) => "Property",
            Descriptor::Attribute(_) => "Attribute",
            Descriptor::Event(_) => "Event",
            Descriptor::TwoWay(_) => "TwoWay",
            Descriptor::Conditional(_) => "Conditional",
            Descriptor::List(_) => "List",
            Descriptor::Custom(_) => "Custom",
            Descriptor::Empty => "Empty",
        };
        write!(f, "Descriptor::{label}")
    }
}

// =============================================================================
// BIND CONTEXT
// =============================================================================

/// Everything a plugin needs to evaluate and to bind nested content.
#[derive(Clone)]
pub struct BindContext {
    pub scope: Scope,
    pub evaluator: Rc<dyn Evaluate>,
    pub registry: Rc<PluginRegistry>,
    pub options: Rc<BindOptions>,
}

impl BindContext {
    pub fn new(
        scope: Scope,
        evaluator: Rc<dyn Evaluate>,
        registry: Rc<PluginRegistry>,
        options: Rc<BindOptions>,
    ) -> Self {
        Self {
            scope,
            evaluator,
            registry,
            options,
        }
    }

    /// The same context evaluating against another scope.
    pub fn with_scope(&self, scope: Scope) -> Self {
        Self {
            scope,
            ..self.clone()
        }
    }

    pub fn evaluate(&self, expression: &str) -> Result<Value, EvaluationError> {
        self.evaluator.evaluate(expression, &self.scope)
    }
}

// =============================================================================
// SHARED HELPERS
// =============================================================================

/// Log a binding failure. Never propagates.
pub(crate) fn report(kind: &'static str, expression: &str, error: &dyn fmt::Display) {
    tracing::warn!(kind, expression, %error, "binding failed");
}

fn is_structural(node: &Node) -> bool {
    node.has_attribute(IF_MARKER) || node.has_attribute(FOR_MARKER)
}

/// `root` and its descendants, minus anything a structural binding owns.
///
/// Elements carrying `@if` or `@for` are skipped together with their
/// subtrees: that content is bound by the conditional or list binding.
pub fn bindable_nodes(root: &Node) -> Vec<Node> {
    fn walk(node: &Node, out: &mut Vec<Node>) {
        if is_structural(node) {
            return;
        }
        out.push(node.clone());
        for child in node.children() {
            walk(&child, out);
        }
    }

    let mut out = Vec::new();
    walk(root, &mut out);
    out
}

/// The outermost elements under `root` (root included) that carry `@if` or
/// `@for`. Structural elements nested inside those are left to them.
pub fn structural_nodes(root: &Node) -> Vec<Node> {
    fn walk(node: &Node, out: &mut Vec<Node>) {
        if is_structural(node) {
            out.push(node.clone());
            return;
        }
        for child in node.children() {
            walk(&child, out);
        }
    }

    let mut out = Vec::new();
    walk(root, &mut out);
    out
}

/// Elements among `bindable_nodes(root)` with an attribute accepted by
/// `is_marker`.
pub(crate) fn elements_with_marker(root: &Node, is_marker: impl Fn(&str) -> bool) -> Vec<Node> {
    bindable_nodes(root)
        .into_iter()
        .filter(|node| node.attribute_names().iter().any(|name| is_marker(name)))
        .collect()
}

// =============================================================================
// TESTS
// =============================================================================
