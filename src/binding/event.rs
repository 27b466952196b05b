// ============================================================================
// spark-bind - Event Binding
// `on:name="expr"` runs an expression when the element receives an event
// ============================================================================

use std::rc::Rc;

use once_cell::sync::Lazy;
use regex::Regex;

use super::{elements_with_marker, report, BindContext, BindingPlugin, Descriptor};
use crate::dom::{Event, ListenerId, Node};
use crate::reactivity::batching::batch;

static EVENT_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^on:([\w-]+)$").unwrap());

/// Build a listener that evaluates `expression` with `event` in scope.
///
/// The handler runs in a batch, so a chain like `a = 1; b = 2` re-renders
/// once.
pub(crate) fn handler(kind: &'static str, expression: String, cx: &BindContext) -> Rc<dyn Fn(&Event)> {
    let scope = cx.scope.clone();
    let evaluator = cx.evaluator.clone();

    Rc::new(move |event: &Event| {
        let local = scope.child();
        local.define_readonly("event", event.to_value());
        let result = batch(|| evaluator.evaluate(&expression, &local));
        if let Err(error) = result {
            report(kind, &expression, &error);
        }
    })
}

#[derive(Debug, Clone)]
pub struct EventListener {
    pub event: String,
    pub expression: String,
    pub id: ListenerId,
}

#[derive(Debug, Clone, Default)]
pub struct EventState {
    pub listeners: Vec<EventListener>,
}

pub struct EventPlugin;

impl BindingPlugin for EventPlugin {
    fn kind(&self) -> &'static str {
        "event"
    }

    fn discover(&self, root: &Node) -> Vec<Node> {
        elements_with_marker(root, |name| EVENT_MARKER.is_match(name))
    }

    fn initialize(&self, target: &Node, cx: &BindContext) -> Descriptor {
        let mut state = EventState::default();

        for (marker, expression) in target.attributes() {
            let Some(event) = EVENT_MARKER.captures(&marker).and_then(|c| c.get(1)) else {
                continue;
            };
            let event = event.as_str().to_string();
            let expression = expression.trim().to_string();
            target.remove_attribute(&marker);

            let id = target.add_event_listener(&event, handler(self.kind(), expression.clone(), cx));
            state.listeners.push(EventListener {
                event,
                expression,
                id,
            });
        }

        Descriptor::Event(state)
    }

    fn update(&self, _target: &Node, _cx: &BindContext, _descriptor: &mut Descriptor) {}

    fn cleanup(&self, target: &Node, descriptor: &mut Descriptor) {
        let Descriptor::Event(state) = descriptor else {
            return;
        };
        for listener in state.listeners.drain(..) {
            target.remove_event_listener(listener.id);
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

    fn bind(markup: &str, data: serde_json::Value) -> (Node, BindContext, BindingTable) {
        let cx = BindContext::new(
            reactive(data),
            Rc::new(Evaluator::new()),
            Rc::new(PluginRegistry::standard()),
            Rc::new(BindOptions::default()),
        );
        let el = parse_element(markup).unwrap();
        let table = BindingTable::collect_with(&el, &cx, &[Rc::new(EventPlugin) as Rc<dyn BindingPlugin>]);
        (el, cx, table)
    }

    #[test]
    fn dispatch_evaluates_once_per_event() {
        let (button, cx, mut table) = bind(r#"<button on:click="clicks++">+</button>"#, json!({ "clicks": 0 }));
        assert!(!button.has_attribute("on:click"));
        assert_eq!(button.listener_count("click"), 1);

        button.dispatch_event(Event::new("click"));
        button.dispatch_event(Event::new("click"));
        assert_eq!(cx.scope.get("clicks"), Some(json!(2)));

        // Updating never adds listeners
        table.update_all(&cx);
        table.update_all(&cx);
        assert_eq!(button.listener_count("click"), 1);
    }

    #[test]
    fn event_is_in_scope() {
        let (input, cx, _table) = bind(
            r#"<input id="name" on:input="last = event.type + ':' + event.target.id + ':' + event.detail">"#,
            json!({ "last": null }),
        );
        input.dispatch_event(Event::with_detail("input", json!("x")));
        assert_eq!(cx.scope.get("last"), Some(json!("input:name:x")));
    }

    #[test]
    fn cleanup_stops_invocations() {
        let (button, cx, mut table) = bind(r#"<button on:click="n++"></button>"#, json!({ "n": 0 }));
        button.dispatch_event(Event::new("click"));
        table.cleanup_all();
        button.dispatch_event(Event::new("click"));
        assert_eq!(cx.scope.get("n"), Some(json!(1)));
        assert_eq!(button.listener_count("click"), 0);
    }

    #[test]
    fn handler_failure_is_contained() {
        let (button, cx, _table) = bind(r#"<button on:click="missing()" on:focus="ok = true"></button>"#, json!({}));
        assert_eq!(button.dispatch_event(Event::new("click")), 1);
        button.dispatch_event(Event::new("focus"));
        assert_eq!(cx.scope.get("ok"), Some(json!(true)));
    }
}
