// ============================================================================
// spark-bind - Conditional Rendering
// `@if="expr"` shows or removes an element
// ============================================================================
//
// A comment placeholder is inserted right before the element and stays in
// the DOM for the life of the binding. The element's markup is recorded at
// initialize; hiding drops the element and its nested bindings, showing
// again rebuilds a fresh element from the markup and binds it from scratch,
// so nested content always reflects the current scope.
// ============================================================================

use super::table::BindingTable;
use super::{report, structural_nodes, BindContext, BindingPlugin, Descriptor, FOR_MARKER, IF_MARKER};
use crate::dom::{parse_element, Node};
use crate::expr::truthy;

pub struct ConditionalState {
    pub expression: String,
    /// Serialized element, without the `@if` marker
    pub markup: String,
    pub placeholder: Node,
    /// The live element while present
    pub element: Option<Node>,
    /// Bindings inside the live element
    pub nested: BindingTable,
}

impl ConditionalState {
    pub fn is_present(&self) -> bool {
        self.element.is_some()
    }
}

pub struct ConditionalPlugin;

impl ConditionalPlugin {
    fn hide(&self, state: &mut ConditionalState) {
        if let Some(element) = state.element.take() {
            state.nested.cleanup_all();
            element.remove();
            tracing::debug!(expression = %state.expression, "conditional hidden");
        }
    }

    fn show(&self, state: &mut ConditionalState, cx: &BindContext) {
        let Some(element) = parse_element(&state.markup) else {
            report(self.kind(), &state.expression, &"recorded markup holds no element");
            return;
        };

        state.placeholder.after(&element);
        let mut nested = BindingTable::collect(&element, cx);
        nested.update_all(cx);

        state.nested = nested;
        state.element = Some(element);
        tracing::debug!(expression = %state.expression, "conditional shown");
    }
}

impl BindingPlugin for ConditionalPlugin {
    fn kind(&self) -> &'static str {
        "conditional"
    }

    /// Outermost `@if` elements. An element that also carries `@for` is
    /// left to the list binding.
    fn discover(&self, root: &Node) -> Vec<Node> {
        structural_nodes(root)
            .into_iter()
            .filter(|node| node.has_attribute(IF_MARKER) && !node.has_attribute(FOR_MARKER))
            .collect()
    }

    fn initialize(&self, target: &Node, cx: &BindContext) -> Descriptor {
        let expression = target
            .remove_attribute(IF_MARKER)
            .unwrap_or_default()
            .trim()
            .to_string();
        let markup = target.outer_html();

        let placeholder = Node::comment(cx.options.placeholder_text(IF_MARKER, &expression));
        target.before(&placeholder);

        let nested = BindingTable::collect(target, cx);

        Descriptor::Conditional(ConditionalState {
            expression,
            markup,
            placeholder,
            element: Some(target.clone()),
            nested,
        })
    }

    fn update(&self, _target: &Node, cx: &BindContext, descriptor: &mut Descriptor) {
        let Descriptor::Conditional(state) = descriptor else {
            return;
        };

        let visible = match cx.evaluate(&state.expression) {
            Ok(value) => truthy(&value),
            Err(error) => {
                report(self.kind(), &state.expression, &error);
                return;
            }
        };

        match (state.is_present(), visible) {
            (true, true) => state.nested.update_all(cx),
            (true, false) => self.hide(state),
            (false, true) => self.show(state, cx),
            (false, false) => {}
        }
    }

    fn cleanup(&self, _target: &Node, descriptor: &mut Descriptor) {
        let Descriptor::Conditional(state) = descriptor else {
            return;
        };
        self.hide(state);
        state.placeholder.remove();
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::PluginRegistry;
    use crate::config::BindOptions;
    use crate::dom::{parse_html, Event};
    use crate::expr::Evaluator;
    use crate::primitives::scope::reactive;
    use serde_json::{json, Value};
    use std::rc::Rc;

    fn bind(markup: &str, data: Value) -> (Node, BindContext, BindingTable) {
        let cx = BindContext::new(
            reactive(data),
            Rc::new(Evaluator::new()),
            Rc::new(PluginRegistry::standard()),
            Rc::new(BindOptions::default()),
        );
        let root = parse_html(markup);
        let table = BindingTable::collect(&root, &cx);
        (root, cx, table)
    }

    fn count(root: &Node, f: impl Fn(&Node) -> bool) -> usize {
        root.descendants().iter().filter(|n| f(*n)).count()
    }

    #[test]
    fn placeholder_precedes_element() {
        let (root, _cx, _table) = bind(r#"<p @if="show">hi</p>"#, json!({ "show": true }));
        let children = root.children();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].data().as_deref(), Some("@if: show"));
        assert_eq!(children[1].tag_name().as_deref(), Some("p"));
        assert!(!children[1].has_attribute("@if"));
    }

    #[test]
    fn toggling_keeps_one_placeholder() {
        let (root, cx, mut table) = bind(r#"<p @if="show">{{ label }}</p>"#, json!({ "show": true, "label": "a" }));
        table.update_all(&cx);
        assert_eq!(root.text_content(), "a");

        for (show, elements) in [(false, 0), (true, 1), (false, 0), (true, 1)] {
            cx.scope.set("show", json!(show)).unwrap();
            table.update_all(&cx);
            assert_eq!(count(&root, |n| n.tag_name().as_deref() == Some("p")), elements);
            assert_eq!(count(&root, Node::is_comment), 1);
        }
    }

    #[test]
    fn reshown_content_reflects_current_values() {
        let (root, cx, mut table) = bind(r#"<p @if="show">{{ label }}</p>"#, json!({ "show": true, "label": "old" }));
        table.update_all(&cx);

        cx.scope.set("show", json!(false)).unwrap();
        table.update_all(&cx);
        cx.scope.set("label", json!("new")).unwrap();
        table.update_all(&cx);
        assert_eq!(root.text_content(), "");

        cx.scope.set("show", json!(true)).unwrap();
        table.update_all(&cx);
        assert_eq!(root.text_content(), "new");
    }

    #[test]
    fn nested_conditionals_and_events() {
        let (root, cx, mut table) = bind(
            r#"<div @if="outer"><button @if="inner" on:click="n++">x</button></div>"#,
            json!({ "outer": true, "inner": true, "n": 0 }),
        );
        table.update_all(&cx);

        let button = root.query_selector("button").unwrap();
        button.dispatch_event(Event::new("click"));
        assert_eq!(cx.scope.get("n"), Some(json!(1)));

        cx.scope.set("inner", json!(false)).unwrap();
        table.update_all(&cx);
        assert!(root.query_selector("button").is_none());
        assert_eq!(count(&root, Node::is_comment), 2);

        cx.scope.set("outer", json!(false)).unwrap();
        table.update_all(&cx);
        assert_eq!(count(&root, Node::is_comment), 1);

        cx.scope.set("outer", json!(true)).unwrap();
        cx.scope.set("inner", json!(true)).unwrap();
        table.update_all(&cx);
        let button = root.query_selector("button").unwrap();
        button.dispatch_event(Event::new("click"));
        assert_eq!(cx.scope.get("n"), Some(json!(2)));
    }

    #[test]
    fn evaluation_failure_keeps_state() {
        let (root, cx, mut table) = bind(r#"<p @if="flags.on">x</p>"#, json!({ "flags": { "on": true } }));
        table.update_all(&cx);
        cx.scope.set("flags", json!(null)).unwrap();
        table.update_all(&cx);
        assert!(root.query_selector("p").is_some());
    }

    #[test]
    fn cleanup_removes_everything() {
        let (root, cx, mut table) = bind(r#"<p @if="true">x</p>"#, json!({}));
        table.update_all(&cx);
        table.cleanup_all();
        assert_eq!(root.child_count(), 0);
    }
}
