// ============================================================================
// spark-bind - Two-Way Binding
// `.name:event="place"` / `[name]:event="place"`
// ============================================================================
//
// Forward, the binding behaves like a property or attribute binding. In
// reverse, the named event reads the element's current property (or
// attribute) and assigns it to the expression, which must therefore name a
// place: `name`, `form.email`, `rows[i].done`.
// ============================================================================

use serde_json::Value;

use once_cell::sync::Lazy;
use regex::Regex;

use super::attribute::apply_attribute;
use super::property::apply_property;
use super::{elements_with_marker, report, BindContext, BindingPlugin, Descriptor};
use crate::dom::{Event, ListenerId, Node};
use crate::reactivity::batching::batch;

static TWO_WAY_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:\.([\w-]+)|\[([\w-]+)\]):([\w-]+)$").unwrap());

/// Which side of the element a two-way binding syncs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncTarget {
    Property(String),
    Attribute(String),
}

impl SyncTarget {
    fn read(&self, node: &Node) -> Value {
        match self {
            SyncTarget::Property(name) => node.property(name),
            SyncTarget::Attribute(name) => node.get_attribute(name).map_or(Value::Null, Value::String),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TwoWayBinding {
    pub target: SyncTarget,
    pub event: String,
    pub expression: String,
    /// Pre-binding property value, restored when a forward sync fails
    pub original: Value,
    pub listener: ListenerId,
}

#[derive(Debug, Clone, Default)]
pub struct TwoWayState {
    pub bindings: Vec<TwoWayBinding>,
}

fn parse_marker(marker: &str) -> Option<(SyncTarget, String)> {
    let captures = TWO_WAY_MARKER.captures(marker)?;
    let target = match (captures.get(1), captures.get(2)) {
        (Some(property), _) => SyncTarget::Property(property.as_str().to_string()),
        (None, Some(attribute)) => SyncTarget::Attribute(attribute.as_str().to_string()),
        (None, None) => return None,
    };
    let event = captures.get(3)?.as_str().to_string();
    Some((target, event))
}

pub struct TwoWayPlugin;

impl TwoWayPlugin {
    fn forward(&self, node: &Node, cx: &BindContext, binding: &TwoWayBinding) {
        let result = cx.evaluate(&binding.expression);
        match &binding.target {
            SyncTarget::Property(name) => {
                apply_property(self.kind(), node, name, &binding.expression, result, &binding.original)
            }
            SyncTarget::Attribute(name) => {
                apply_attribute(self.kind(), node, name, &binding.expression, result)
            }
        }
    }
}

impl BindingPlugin for TwoWayPlugin {
    fn kind(&self) -> &'static str {
        "two-way"
    }

    fn discover(&self, root: &Node) -> Vec<Node> {
        elements_with_marker(root, |name| TWO_WAY_MARKER.is_match(name))
    }

    fn initialize(&self, target: &Node, cx: &BindContext) -> Descriptor {
        let mut state = TwoWayState::default();

        for (marker, expression) in target.attributes() {
            let Some((sync, event)) = parse_marker(&marker) else {
                continue;
            };
            target.remove_attribute(&marker);
            let expression = expression.trim().to_string();

            let listener = {
                let kind = self.kind();
                let node = target.downgrade();
                let sync = sync.clone();
                let expression = expression.clone();
                let scope = cx.scope.clone();
                let evaluator = cx.evaluator.clone();

                target.add_event_listener(
                    &event,
                    std::rc::Rc::new(move |_event: &Event| {
                        let Some(node) = node.upgrade() else {
                            return;
                        };
                        let value = sync.read(&node);
                        if let Err(error) = batch(|| evaluator.assign(&expression, value, &scope)) {
                            report(kind, &expression, &error);
                        }
                    }),
                )
            };

            let binding = TwoWayBinding {
                original: match &sync {
                    SyncTarget::Property(name) => target.property(name),
                    SyncTarget::Attribute(_) => Value::Null,
                },
                target: sync,
                event,
                expression,
                listener,
            };
            self.forward(target, cx, &binding);
            state.bindings.push(binding);
        }

        Descriptor::TwoWay(state)
    }

    fn update(&self, target: &Node, cx: &BindContext, descriptor: &mut Descriptor) {
        let Descriptor::TwoWay(state) = descriptor else {
            return;
        };
        for binding in &state.bindings {
            self.forward(target, cx, binding);
        }
    }

    fn cleanup(&self, target: &Node, descriptor: &mut Descriptor) {
        let Descriptor::TwoWay(state) = descriptor else {
            return;
        };
        for binding in state.bindings.drain(..) {
            target.remove_event_listener(binding.listener);
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
