use spark_bind::binding::{BindContext, BindingPlugin, Descriptor, PluginRegistry};
use spark_bind::dom::{Event, Node};
use spark_bind::{bind_template, scope, Binder, EvaluationError, Evaluate, Evaluator, Scope, TemplateSource};
use serde_json::{json, Value};
use std::cell::Cell;
use std::rc::Rc;

fn mount(markup: &str, scope: &Scope) -> (Node, spark_bind::Render) {
    let container = Node::element("div");
    let view = bind_template(TemplateSource::markup(markup), &container, scope).unwrap();
    view.render();
    (container, view)
}

// =============================================================================
// INTERPOLATION
// =============================================================================

#[test]
fn test_interpolation_updates_only_its_part() {
    let scope = scope!({ "name": "Ada", "count": 1 });
    let (container, _view) = mount("<p>Hello {{ name }}, you have {{ count }} new</p>", &scope);

    let p = container.query_selector("p").unwrap();
    assert_eq!(p.text_content(), "Hello Ada, you have 1 new");

    let before = p.children();
    assert_eq!(before.len(), 5);

    scope.set("count", json!(2)).unwrap();
    let after = p.children();
    assert_eq!(p.text_content(), "Hello Ada, you have 2 new");

    // Same text nodes, only the `count` part changed
    for (old, new) in before.iter().zip(&after) {
        assert!(old.ptr_eq(new));
    }
    assert_eq!(after[0].data().as_deref(), Some("Hello "));
    assert_eq!(after[1].data().as_deref(), Some("Ada"));
    assert_eq!(after[2].data().as_deref(), Some(", you have "));
    assert_eq!(after[3].data().as_deref(), Some("2"));
    assert_eq!(after[4].data().as_deref(), Some(" new"));
}

#[test]
fn test_interpolation_failure_shows_marker() {
    let scope = scope!({ "user": { "name": "Ada" } });
    let (container, _view) = mount("<p>{{ user.name }}</p>", &scope);
    assert_eq!(container.text_content(), "Ada");

    scope.set("user", Value::Null).unwrap();
    assert_eq!(container.text_content(), "{{ user.name }}");

    scope.set("user", json!({ "name": "Grace" })).unwrap();
    assert_eq!(container.text_content(), "Grace");
}

#[test]
fn test_interpolation_formats_values() {
    let scope = scope!({ "n": 1.5, "nothing": null, "list": [1, 2], "flag": false });
    let (container, _view) = mount(
        "<i>{{ n }}</i><i>{{ nothing }}</i><i>{{ list }}</i><i>{{ flag }}</i><i>{{ n * 2 }}</i>",
        &scope,
    );
    let texts: Vec<String> = container
        .query_selector_all("i")
        .iter()
        .map(Node::text_content)
        .collect();
    assert_eq!(texts, vec!["1.5", "", "1,2", "false", "3"]);
}

// =============================================================================
// PROPERTY / ATTRIBUTE
// =============================================================================

#[test]
fn test_property_binding_keeps_value_types() {
    let scope = scope!({ "x": "text" });
    let (container, _view) = mount(r#"<input .value="x">"#, &scope);
    let input = container.query_selector("input").unwrap();

    for value in [json!(true), json!(42), json!([1, "a"]), json!({ "k": null }), json!("s")] {
        scope.set("x", value.clone()).unwrap();
        assert_eq!(input.property("value"), value);
    }
}

#[test]
fn test_property_failure_restores_original() {
    let scope = scope!({ "data": { "v": "live" } });
    let (container, _view) = mount(r#"<input value="orig" .value="data.v">"#, &scope);
    let input = container.query_selector("input").unwrap();
    assert_eq!(input.property("value"), json!("live"));

    scope.set("data", Value::Null).unwrap();
    assert_eq!(input.property("value"), json!("orig"));
}

#[test]
fn test_attribute_binding_value_table() {
    let scope = scope!({ "flag": true });
    let (container, _view) = mount(r#"<button [disabled]="flag">go</button>"#, &scope);
    let button = container.query_selector("button").unwrap();
    assert_eq!(button.get_attribute("disabled").as_deref(), Some("true"));

    scope.set("flag", json!(false)).unwrap();
    assert!(!button.has_attribute("disabled"));

    scope.set("flag", json!("a")).unwrap();
    assert_eq!(button.get_attribute("disabled").as_deref(), Some("a"));

    scope.set("flag", Value::Null).unwrap();
    assert!(!button.has_attribute("disabled"));
}

// =============================================================================
// EVENTS / TWO-WAY
// =============================================================================

#[test]
fn test_event_runs_once_per_dispatch_with_event_bound() {
    let scope = scope!({ "log": [] });
    let (container, view) = mount(
        r#"<button id="b" on:click="log.push(event.type + '@' + event.target.id)">x</button>"#,
        &scope,
    );
    let button = container.query_selector("button").unwrap();

    assert_eq!(button.dispatch_event(Event::new("click")), 1);
    button.dispatch_event(Event::new("click"));
    assert_eq!(scope.get("log"), Some(json!(["click@b", "click@b"])));

    view.teardown();
    button.dispatch_event(Event::new("click"));
    assert_eq!(scope.get("log").unwrap().as_array().unwrap().len(), 2);
}

#[test]
fn test_event_handler_failure_is_contained() {
    let scope = scope!({ "xs": [] });
    let (container, _view) = mount(
        r#"<button on:click="xs[1e300] = 1">x</button><p>{{ xs.length }}</p>"#,
        &scope,
    );

    let button = container.query_selector("button").unwrap();
    button.dispatch_event(Event::new("click"));
    assert_eq!(scope.get("xs"), Some(json!([])));
    assert_eq!(container.query_selector("p").unwrap().text_content(), "0");
}

#[test]
fn test_event_handler_chain_updates_dependents() {
    let scope = scope!({ "a": 0, "b": 0 });
    let (container, _view) = mount(
        r#"<span>{{ a + b }}</span><button on:click="a = a + 1; b = b + 1">+</button>"#,
        &scope,
    );
    let button = container.query_selector("button").unwrap();

    button.dispatch_event(Event::new("click"));
    assert_eq!(container.query_selector("span").unwrap().text_content(), "2");
}

#[test]
fn test_two_way_binding_end_to_end() {
    let scope = scope!({ "form": { "email": "a@x" } });
    let (container, _view) = mount(r#"<input .value:input="form.email"><p>{{ form.email }}</p>"#, &scope);
    let input = container.query_selector("input").unwrap();
    let p = container.query_selector("p").unwrap();
    assert_eq!(input.property("value"), json!("a@x"));

    // Scope to DOM
    scope.set("form", json!({ "email": "b@x" })).unwrap();
    assert_eq!(input.property("value"), json!("b@x"));

    // DOM to scope
    input.set_property("value", json!("c@x"));
    input.dispatch_event(Event::new("input"));
    assert_eq!(scope.get("form"), Some(json!({ "email": "c@x" })));
    assert_eq!(p.text_content(), "c@x");
}

#[test]
fn test_two_way_through_attribute() {
    let scope = scope!({ "label": "one" });
    let (container, _view) = mount(r#"<div [title]:change="label"></div>"#, &scope);
    let div = container.query_selector("div").unwrap();
    assert_eq!(div.get_attribute("title").as_deref(), Some("one"));

    div.set_attribute("title", "two");
    div.dispatch_event(Event::new("change"));
    assert_eq!(scope.get("label"), Some(json!("two")));
}

// =============================================================================
// REGISTRY / EXTENSION POINTS
// =============================================================================

/// `x-upper="expr"` writes the expression's text, uppercased.
struct UpperPlugin;

impl BindingPlugin for UpperPlugin {
    fn kind(&self) -> &'static str {
        "upper"
    }

    fn discover(&self, root: &Node) -> Vec<Node> {
        std::iter::once(root.clone())
            .chain(root.descendants())
            .filter(|n| n.has_attribute("x-upper"))
            .collect()
    }

    fn initialize(&self, target: &Node, _cx: &BindContext) -> Descriptor {
        let expression = target.remove_attribute("x-upper").unwrap_or_default();
        Descriptor::Custom(Box::new(expression))
    }

    fn update(&self, target: &Node, cx: &BindContext, descriptor: &mut Descriptor) {
        let Descriptor::Custom(state) = descriptor else {
            return;
        };
        let Some(expression) = state.downcast_ref::<String>() else {
            return;
        };
        if let Ok(value) = cx.evaluate(expression) {
            let text = value.as_str().unwrap_or_default().to_uppercase();
            target.set_property("textContent", json!(text));
        }
    }
}

#[test]
fn test_custom_plugin_runs_alongside_builtins() {
    let mut registry = PluginRegistry::standard();
    registry.register(UpperPlugin);
    assert_eq!(registry.kinds().last(), Some(&"upper"));

    let scope = scope!({ "word": "quiet" });
    let container = Node::element("div");
    let view = Binder::new()
        .with_registry(registry)
        .bind_template(
            TemplateSource::markup(r#"<h1 x-upper="word"></h1><p>{{ word }}</p>"#),
            &container,
            &scope,
        )
        .unwrap();
    view.render();

    assert_eq!(container.query_selector("h1").unwrap().text_content(), "QUIET");
    scope.set("word", json!("loud")).unwrap();
    assert_eq!(container.query_selector("h1").unwrap().text_content(), "LOUD");
    assert_eq!(container.query_selector("p").unwrap().text_content(), "loud");
}

#[test]
fn test_unregistered_kind_leaves_markers_alone() {
    let mut registry = PluginRegistry::standard();
    registry.unregister("event");

    let scope = scope!({ "n": 0 });
    let container = Node::element("div");
    let view = Binder::new()
        .with_registry(registry)
        .bind_template(TemplateSource::markup(r#"<button on:click="n++"></button>"#), &container, &scope)
        .unwrap();
    view.render();

    let button = container.query_selector("button").unwrap();
    assert!(button.has_attribute("on:click"));
    assert_eq!(button.listener_count("click"), 0);
}

/// Counts evaluations and delegates to the built-in evaluator.
#[derive(Default)]
struct CountingEvaluator {
    inner: Evaluator,
    calls: Rc<Cell<usize>>,
}

impl Evaluate for CountingEvaluator {
    fn evaluate(&self, expression: &str, scope: &Scope) -> Result<Value, EvaluationError> {
        self.calls.set(self.calls.get() + 1);
        self.inner.evaluate(expression, scope)
    }

    fn assign(&self, target: &str, value: Value, scope: &Scope) -> Result<(), EvaluationError> {
        self.inner.assign(target, value, scope)
    }
}

#[test]
fn test_custom_evaluator_is_used_for_every_binding() {
    let calls = Rc::new(Cell::new(0));
    let evaluator = CountingEvaluator {
        calls: calls.clone(),
        ..CountingEvaluator::default()
    };

    let scope = scope!({ "a": 1 });
    let container = Node::element("div");
    let view = Binder::new()
        .with_evaluator(evaluator)
        .bind_template(TemplateSource::markup(r#"<p [title]="a">{{ a }}</p>"#), &container, &scope)
        .unwrap();

    assert_eq!(calls.get(), 0);
    view.render();
    assert!(calls.get() >= 2);
    assert_eq!(container.text_content(), "1");
}

#[test]
fn test_host_functions_in_bindings() {
    let scope = scope!({ "items": [3, 1, 2] });
    scope.define_fn("total", |scope, _args| {
        let items = scope.get("items").unwrap_or(Value::Null);
        let sum: i64 = items
            .as_array()
            .map(|items| items.iter().filter_map(Value::as_i64).sum())
            .unwrap_or(0);
        Ok(json!(sum))
    });

    let (container, _view) = mount("<b>{{ total() }}</b>", &scope);
    assert_eq!(container.text_content(), "6");

    scope
        .update("items", |items| {
            if let Some(items) = items.as_array_mut() {
                items.push(json!(4));
            }
        })
        .unwrap();
    assert_eq!(container.text_content(), "10");
}
