// ============================================================================
// spark-bind - Interpolation Binding
// `{{ expr }}` inside text
// ============================================================================
//
// A text node such as `Hello {{ name }}!` is split into one text node per
// part: `Hello `, `{{ name }}` and `!`. Only the expression parts are ever
// written again, so the static text around them is left alone.
// ============================================================================

use once_cell::sync::Lazy;
use regex::Regex;

use super::{bindable_nodes, report, BindContext, BindingPlugin, Descriptor};
use crate::dom::Node;
use crate::expr::to_display;

static INTERPOLATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\{\{\s*(.*?)\s*\}\}").unwrap());

/// An expression part and the text node showing it.
#[derive(Debug, Clone)]
pub struct InterpolationPart {
    pub expression: String,
    /// The source text `{{ ... }}`, shown when evaluation fails
    pub marker: String,
    pub node: Node,
}

#[derive(Debug, Clone, Default)]
pub struct InterpolationState {
    pub parts: Vec<InterpolationPart>,
}

pub struct InterpolationPlugin;

impl BindingPlugin for InterpolationPlugin {
    fn kind(&self) -> &'static str {
        "interpolation"
    }

    fn discover(&self, root: &Node) -> Vec<Node> {
        bindable_nodes(root)
            .into_iter()
            .filter(|node| node.is_text() && node.data().is_some_and(|text| INTERPOLATION.is_match(&text)))
            .collect()
    }

    fn initialize(&self, target: &Node, _cx: &BindContext) -> Descriptor {
        let text = target.data().unwrap_or_default();
        let mut state = InterpolationState::default();
        let mut last = 0;

        let insert = |node: &Node| target.before(node);

        for captures in INTERPOLATION.captures_iter(&text) {
            let (Some(whole), Some(expression)) = (captures.get(0), captures.get(1)) else {
                continue;
            };

            if whole.start() > last {
                insert(&Node::text(&text[last..whole.start()]));
            }

            let node = Node::text(whole.as_str());
            insert(&node);
            state.parts.push(InterpolationPart {
                expression: expression.as_str().to_string(),
                marker: whole.as_str().to_string(),
                node,
            });
            last = whole.end();
        }

        if last < text.len() {
            insert(&Node::text(&text[last..]));
        }
        target.remove();

        Descriptor::Interpolation(state)
    }

    fn update(&self, _target: &Node, cx: &BindContext, descriptor: &mut Descriptor) {
        let Descriptor::Interpolation(state) = descriptor else {
            return;
        };

        for part in &state.parts {
            match cx.evaluate(&part.expression) {
                Ok(value) => part.node.set_data(&to_display(&value)),
                Err(error) => {
                    report(self.kind(), &part.expression, &error);
                    part.node.set_data(&part.marker);
                }
            }
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

    fn bind(markup: &str, data: serde_json::Value) -> (Node, BindContext, BindingTable) {
        let cx = BindContext::new(
            reactive(data),
            Rc::new(Evaluator::new()),
            Rc::new(PluginRegistry::standard()),
            Rc::new(BindOptions::default()),
        );
        let el = parse_element(markup).unwrap();
        let plugins = vec![cx.registry.get("interpolation").unwrap()];
        let table = BindingTable::collect_with(&el, &cx, &plugins);
        (el, cx, table)
    }

    #[test]
    fn splits_text_into_parts() {
        let (p, _cx, table) = bind("<p>Hi {{ first }} {{last}}!</p>", json!({}));
        let texts: Vec<String> = p.children().iter().filter_map(Node::data).collect();
        assert_eq!(texts, vec!["Hi ", "{{ first }}", " ", "{{last}}", "!"]);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn updates_only_expression_parts() {
        let (p, cx, mut table) = bind("<p>Count: {{ n }} items</p>", json!({ "n": 1 }));
        table.update_all(&cx);
        assert_eq!(p.text_content(), "Count: 1 items");

        let static_node = p.first_child().unwrap();
        cx.scope.set("n", json!(2)).unwrap();
        table.update_all(&cx);
        assert_eq!(p.text_content(), "Count: 2 items");
        assert!(p.first_child().unwrap().ptr_eq(&static_node));
        assert_eq!(static_node.data().as_deref(), Some("Count: "));
    }

    #[test]
    fn failures_show_the_marker() {
        let (p, cx, mut table) = bind("<p>{{ missing.name }} / {{ ok }}</p>", json!({ "ok": null }));
        table.update_all(&cx);
        assert_eq!(p.text_content(), "{{ missing.name }} / ");
    }

    #[test]
    fn second_update_is_silent() {
        let (_p, cx, mut table) = bind("<p>{{ a }}-{{ b }}</p>", json!({ "a": 1, "b": [1, 2] }));
        table.update_all(&cx);
        let before = mutation_count();
        table.update_all(&cx);
        assert_eq!(mutation_count(), before);
    }
}
