// ============================================================================
// spark-bind - Property Binding
// `.name="expr"` assigns an element's runtime property
// ============================================================================

use serde_json::Value;

use super::{elements_with_marker, report, BindContext, BindingPlugin, Descriptor};
use crate::dom::Node;
use crate::error::EvaluationError;

/// Property name of a `.name` marker (no `:event` suffix).
pub(crate) fn property_marker(attribute: &str) -> Option<&str> {
    let name = attribute.strip_prefix('.')?;
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_');
    valid.then_some(name)
}

/// Assign an evaluation result, restoring `original` on failure.
pub(crate) fn apply_property(
    kind: &'static str,
    node: &Node,
    property: &str,
    expression: &str,
    result: Result<Value, EvaluationError>,
    original: &Value,
) {
    match result {
        Ok(value) => node.set_property(property, value),
        Err(error) => {
            report(kind, expression, &error);
            node.set_property(property, original.clone());
        }
    }
}

#[derive(Debug, Clone)]
pub struct PropertyBinding {
    pub property: String,
    pub expression: String,
    /// The property's value before binding, restored on failure
    pub original: Value,
}

#[derive(Debug, Clone, Default)]
pub struct PropertyState {
    pub bindings: Vec<PropertyBinding>,
}

pub struct PropertyPlugin;

impl BindingPlugin for PropertyPlugin {
    fn kind(&self) -> &'static str {
        "property"
    }

    fn discover(&self, root: &Node) -> Vec<Node> {
        elements_with_marker(root, |name| property_marker(name).is_some())
    }

    fn initialize(&self, target: &Node, _cx: &BindContext) -> Descriptor {
        let mut state = PropertyState::default();

        for (attribute, expression) in target.attributes() {
            let Some(property) = property_marker(&attribute) else {
                continue;
            };
            target.remove_attribute(&attribute);
            state.bindings.push(PropertyBinding {
                original: target.property(property),
                property: property.to_string(),
                expression: expression.trim().to_string(),
            });
        }

        Descriptor::Property(state)
    }

    fn update(&self, target: &Node, cx: &BindContext, descriptor: &mut Descriptor) {
        let Descriptor::Property(state) = descriptor else {
            return;
        };

        for binding in &state.bindings {
            apply_property(
                self.kind(),
                target,
                &binding.property,
                &binding.expression,
                cx.evaluate(&binding.expression),
                &binding.original,
            );
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::{BindingTable, PluginRegistry};
    use crate::config::BindOptions;
    use crate::dom::{mutation_count, parse_element};
    use crate::expr::Evaluator;
    use crate::primitives::scope::reactive;
    use serde_json::json;
    use std::rc::Rc;

    fn bind(markup: &str, data: Value) -> (Node, BindContext, BindingTable) {
        let cx = BindContext::new(
            reactive(data),
            Rc::new(Evaluator::new()),
            Rc::new(PluginRegistry::standard()),
            Rc::new(BindOptions::default()),
        );
        let el = parse_element(markup).unwrap();
        let table = BindingTable::collect_with(&el, &cx, &[Rc::new(PropertyPlugin) as Rc<dyn BindingPlugin>]);
        (el, cx, table)
    }

    #[test]
    fn marker_grammar() {
        assert_eq!(property_marker(".value"), Some("value"));
        assert_eq!(property_marker(".textContent"), Some("textContent"));
        assert_eq!(property_marker(".value:input"), None);
        assert_eq!(property_marker("."), None);
        assert_eq!(property_marker("value"), None);
    }

    #[test]
    fn values_keep_their_type() {
        let (el, cx, mut table) = bind(
            r#"<my-list .items="items" .open="open" .config="cfg"></my-list>"#,
            json!({ "items": [1, 2], "open": true, "cfg": { "a": 1 } }),
        );
        assert!(!el.has_attribute(".items"));

        table.update_all(&cx);
        assert_eq!(el.property("items"), json!([1, 2]));
        assert_eq!(el.property("open"), json!(true));
        assert_eq!(el.property("config"), json!({ "a": 1 }));
    }

    #[test]
    fn failure_restores_original() {
        let (el, cx, mut table) = bind(r#"<input value="start" .value="text">"#, json!({ "text": "typed" }));
        table.update_all(&cx);
        assert_eq!(el.property("value"), json!("typed"));

        cx.scope.set("text", json!(null)).unwrap();
        table.update_all(&cx);
        assert_eq!(el.property("value"), json!(null));

        // Undefined name: back to the pre-binding value
        let (el, cx, mut table) = bind(r#"<input value="start" .value="nope">"#, json!({}));
        table.update_all(&cx);
        assert_eq!(el.property("value"), json!("start"));
    }

    #[test]
    fn repeated_update_is_silent() {
        let (_el, cx, mut table) = bind(r#"<div .data="d"></div>"#, json!({ "d": { "x": [1] } }));
        table.update_all(&cx);
        let before = mutation_count();
        table.update_all(&cx);
        assert_eq!(mutation_count(), before);
    }
}
