// ============================================================================
// spark-bind - List Rendering
// `@for="item in items"` repeats an element per collection entry
// ============================================================================
//
// The element is taken out of the DOM and kept as a template; a placeholder
// comment marks where items go. Each update throws every rendered item away
// and renders the collection again, in order, right after the placeholder.
//
// Items are bound against a derived scope holding the loop variable and
// `$index`, both read-only. By default only interpolation and attribute
// bindings are applied inside items, once per render; `ListItemMode::Full`
// binds every registered kind and keeps the per-item tables until the next
// render.
// ============================================================================

use std::rc::Rc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use super::table::BindingTable;
use super::{report, structural_nodes, BindContext, BindingPlugin, Descriptor, FOR_MARKER, IF_MARKER};
use crate::config::ListItemMode;
use crate::dom::Node;
use crate::error::CollectionTypeError;
use crate::expr::value::{kind_name, number};
use crate::primitives::scope::Scope;

static FOR_GRAMMAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^\s*([A-Za-z_$][\w$]*)\s+in\s+(.+?)\s*$").unwrap());

/// Loop variable name holding the item's position
pub const INDEX_NAME: &str = "$index";

/// Split `item in expr` into the variable name and the collection expression.
pub fn parse_for(source: &str) -> Option<(String, String)> {
    let captures = FOR_GRAMMAR.captures(source)?;
    Some((captures.get(1)?.as_str().to_string(), captures.get(2)?.as_str().to_string()))
}

/// One rendered item.
pub struct RenderedItem {
    pub node: Node,
    pub scope: Scope,
    /// Live bindings, kept only in `ListItemMode::Full`
    pub bindings: Option<BindingTable>,
}

pub struct ListState {
    pub source: String,
    /// Loop variable and collection expression; `None` when the marker was
    /// malformed, in which case nothing is ever rendered
    pub grammar: Option<(String, String)>,
    /// Pristine copy of the element, without `@for` or `@if`
    pub template: Node,
    pub placeholder: Node,
    pub items: Vec<RenderedItem>,
}

impl ListState {
    fn clear(&mut self) {
        for mut item in self.items.drain(..) {
            if let Some(bindings) = item.bindings.as_mut() {
                bindings.cleanup_all();
            }
            item.node.remove();
        }
    }
}

/// Entries of a collection value: array elements in order, object values in
/// insertion order.
fn entries(value: Value, expression: &str) -> Result<Vec<Value>, CollectionTypeError> {
    match value {
        Value::Array(items) => Ok(items),
        Value::Object(map) => Ok(map.into_iter().map(|(_, v)| v).collect()),
        other => Err(CollectionTypeError {
            expression: expression.to_string(),
            found: kind_name(&other),
        }),
    }
}

pub struct ListPlugin;

impl ListPlugin {
    fn render_item(&self, item: &Node, cx: &BindContext) -> Option<BindingTable> {
        match cx.options.list_items {
            ListItemMode::Substitution => {
                let plugins: Vec<Rc<dyn BindingPlugin>> = ["interpolation", "attribute"]
                    .into_iter()
                    .filter_map(|kind| cx.registry.get(kind))
                    .collect();
                BindingTable::collect_with(item, cx, &plugins).update_all(cx);
                None
            }
            ListItemMode::Full => {
                let mut bindings = BindingTable::collect(item, cx);
                bindings.update_all(cx);
                Some(bindings)
            }
        }
    }
}

impl BindingPlugin for ListPlugin {
    fn kind(&self) -> &'static str {
        "list"
    }

    fn discover(&self, root: &Node) -> Vec<Node> {
        structural_nodes(root)
            .into_iter()
            .filter(|node| node.has_attribute(FOR_MARKER))
            .collect()
    }

    fn initialize(&self, target: &Node, cx: &BindContext) -> Descriptor {
        let source = target.remove_attribute(FOR_MARKER).unwrap_or_default();
        let grammar = parse_for(&source);
        if grammar.is_none() {
            report(
                self.kind(),
                &source,
                &"expected `<name> in <expression>`",
            );
        }

        // The list owns the element outright; an `@if` beside `@for` is dropped
        // so items stay bindable.
        if let Some(condition) = target.remove_attribute(IF_MARKER) {
            report(self.kind(), &condition, &"`@if` is ignored on an element carrying `@for`");
        }

        let template = target.clone_node(true);
        let placeholder = Node::comment(cx.options.placeholder_text(FOR_MARKER, source.trim()));
        target.replace_with(&placeholder);

        Descriptor::List(ListState {
            source,
            grammar,
            template,
            placeholder,
            items: Vec::new(),
        })
    }

    fn update(&self, _target: &Node, cx: &BindContext, descriptor: &mut Descriptor) {
        let Descriptor::List(state) = descriptor else {
            return;
        };
        let Some((variable, expression)) = state.grammar.clone() else {
            return;
        };

        let collection = match cx.evaluate(&expression) {
            Ok(value) => value,
            Err(error) => {
                report(self.kind(), &expression, &error);
                return;
            }
        };
        let entries = match entries(collection, &expression) {
            Ok(entries) => entries,
            Err(error) => {
                report(self.kind(), &expression, &error);
                return;
            }
        };

        state.clear();

        let mut cursor = state.placeholder.clone();
        for (index, value) in entries.into_iter().enumerate() {
            let node = state.template.clone_node(true);
            let scope = cx.scope.child();
            scope.define_readonly(variable.as_str(), value);
            scope.define_readonly(INDEX_NAME, number(index as f64));

            cursor.after(&node);
            cursor = node.clone();

            let bindings = self.render_item(&node, &cx.with_scope(scope.clone()));
            state.items.push(RenderedItem {
                node,
                scope,
                bindings,
            });
        }

        tracing::debug!(expression = %expression, items = state.items.len(), "list rendered");
    }

    fn cleanup(&self, _target: &Node, descriptor: &mut Descriptor) {
        let Descriptor::List(state) = descriptor else {
            return;
        };
        state.clear();
        state.placeholder.remove();
    }
}

// =============================================================================
// TESTS
// =============================================================================
