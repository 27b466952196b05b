// ============================================================================
// spark-bind - Attribute Binding
// `[name]="expr"` sets or removes an attribute
// ============================================================================

use serde_json::Value;

use super::{elements_with_marker, report, BindContext, BindingPlugin, Descriptor};
use crate::dom::Node;
use crate::error::EvaluationError;
use crate::expr::to_display;

/// Attribute name of a `[name]` marker (no `:event` suffix).
pub(crate) fn attribute_marker(attribute: &str) -> Option<&str> {
    let name = attribute.strip_prefix('[')?.strip_suffix(']')?;
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_');
    valid.then_some(name)
}

/// Apply an evaluation result: null and false remove the attribute, any
/// other value sets its text. Failures leave the attribute untouched.
pub(crate) fn apply_attribute(
    kind: &'static str,
    node: &Node,
    attribute: &str,
    expression: &str,
    result: Result<Value, EvaluationError>,
) {
    match result {
        Ok(Value::Null | Value::Bool(false)) => {
            node.remove_attribute(attribute);
        }
        Ok(value) => node.set_attribute(attribute, &to_display(&value)),
        Err(error) => report(kind, expression, &error),
    }
}

#[derive(Debug, Clone)]
pub struct AttributeBinding {
    pub attribute: String,
    pub expression: String,
}

#[derive(Debug, Clone, Default)]
pub struct AttributeState {
    pub bindings: Vec<AttributeBinding>,
}

pub struct AttributePlugin;

impl BindingPlugin for AttributePlugin {
    fn kind(&self) -> &'static str {
        "attribute"
    }

    fn discover(&self, root: &Node) -> Vec<Node> {
        elements_with_marker(root, |name| attribute_marker(name).is_some())
    }

    fn initialize(&self, target: &Node, _cx: &BindContext) -> Descriptor {
        let mut state = AttributeState::default();

        for (marker, expression) in target.attributes() {
            let Some(attribute) = attribute_marker(&marker) else {
                continue;
            };
            target.remove_attribute(&marker);
            state.bindings.push(AttributeBinding {
                attribute: attribute.to_string(),
                expression: expression.trim().to_string(),
            });
        }

        Descriptor::Attribute(state)
    }

    fn update(&self, target: &Node, cx: &BindContext, descriptor: &mut Descriptor) {
        let Descriptor::Attribute(state) = descriptor else {
            return;
        };

        for binding in &state.bindings {
            apply_attribute(
                self.kind(),
                target,
                &binding.attribute,
                &binding.expression,
                cx.evaluate(&binding.expression),
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
    use crate::dom::parse_element;
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
        let table = BindingTable::collect_with(&el, &cx, &[Rc::new(AttributePlugin) as Rc<dyn BindingPlugin>]);
        (el, cx, table)
    }

    #[test]
    fn marker_grammar() {
        assert_eq!(attribute_marker("[disabled]"), Some("disabled"));
        assert_eq!(attribute_marker("[aria-label]"), Some("aria-label"));
        assert_eq!(attribute_marker("[value]:input"), None);
        assert_eq!(attribute_marker("[]"), None);
    }

    #[test]
    fn value_table() {
        let (el, cx, mut table) = bind(r#"<button [disabled]="flag"></button>"#, json!({ "flag": true }));
        assert!(!el.has_attribute("[disabled]"));

        let cases = [
            (json!(true), Some("true")),
            (json!(false), None),
            (json!("a"), Some("a")),
            (json!(null), None),
            (json!(0), Some("0")),
        ];
        for (value, expected) in cases {
            cx.scope.set("flag", value.clone()).unwrap();
            table.update_all(&cx);
            assert_eq!(el.get_attribute("disabled").as_deref(), expected, "flag = {value}");
        }
    }

    #[test]
    fn failure_leaves_attribute() {
        let (el, cx, mut table) = bind(r#"<a [href]="link.url"></a>"#, json!({ "link": { "url": "/x" } }));
        table.update_all(&cx);
        assert_eq!(el.get_attribute("href").as_deref(), Some("/x"));

        cx.scope.set("link", json!(null)).unwrap();
        table.update_all(&cx);
        assert_eq!(el.get_attribute("href").as_deref(), Some("/x"));
    }
}
