// ============================================================================
// spark-bind - DOM Events
// ============================================================================

use serde_json::{json, Value};

use super::node::Node;

/// An event dispatched with `Node::dispatch_event`.
#[derive(Debug, Clone)]
pub struct Event {
    event_type: String,
    detail: Value,
    target: Option<Node>,
}

impl Event {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            detail: Value::Null,
            target: None,
        }
    }

    /// An event carrying a payload (like `CustomEvent.detail`).
    pub fn with_detail(event_type: impl Into<String>, detail: Value) -> Self {
        Self {
            detail,
            ..Self::new(event_type)
        }
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn detail(&self) -> &Value {
        &self.detail
    }

    /// The node the event was dispatched on (set by dispatch).
    pub fn target(&self) -> Option<&Node> {
        self.target.as_ref()
    }

    pub(crate) fn set_target(&mut self, target: Node) {
        self.target = Some(target);
    }

    /// The event as an expression value:
    /// `{ type, detail, target: { tagName, id, value, checked } }`.
    pub fn to_value(&self) -> Value {
        let target = match &self.target {
            Some(node) => json!({
                "tagName": node.property("tagName"),
                "id": node.property("id"),
                "value": node.property("value"),
                "checked": node.property("checked"),
            }),
            None => Value::Null,
        };

        json!({
            "type": self.event_type,
            "detail": self.detail,
            "target": target,
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_snapshot_includes_target() {
        let input = Node::element("input");
        input.set_attribute("id", "name");
        input.set_property("value", json!("Ada"));

        let mut event = Event::with_detail("input", json!({ "key": "a" }));
        event.set_target(input);

        assert_eq!(
            event.to_value(),
            json!({
                "type": "input",
                "detail": { "key": "a" },
                "target": { "tagName": "INPUT", "id": "name", "value": "Ada", "checked": false },
            })
        );
    }

    #[test]
    fn undispatched_event_has_no_target() {
        let event = Event::new("click");
        assert!(event.target().is_none());
        assert_eq!(event.to_value()["target"], Value::Null);
    }
}
