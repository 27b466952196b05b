//! Benchmarks for spark-bind
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::json;
use spark_bind::dom::{parse_html, Event, Node};
use spark_bind::expr::parse;
use spark_bind::{bind_template, reactive, Evaluate, Evaluator, TemplateSource};

// =============================================================================
// EXPRESSION BENCHMARKS
// =============================================================================

fn bench_expression_parse(c: &mut Criterion) {
    c.bench_function("expression_parse", |b| {
        b.iter(|| black_box(parse("items.length > 0 ? items[0].name.toUpperCase() : 'none'")))
    });
}

fn bench_expression_evaluate_cached(c: &mut Criterion) {
    let scope = reactive(json!({ "items": [{ "name": "a" }], "n": 3 }));
    let evaluator = Evaluator::new();
    c.bench_function("expression_evaluate_cached", |b| {
        b.iter(|| black_box(evaluator.evaluate("n * 2 + items.length", &scope)))
    });
}

// =============================================================================
// DOM BENCHMARKS
// =============================================================================

fn bench_parse_html(c: &mut Criterion) {
    let markup = r#"<ul class="list"><li @for="item in items" [data-id]="item.id">{{ item.name }}</li></ul><p>{{ total }}</p>"#;
    c.bench_function("parse_html", |b| b.iter(|| black_box(parse_html(markup))));
}

// =============================================================================
// BINDING BENCHMARKS
// =============================================================================

fn bench_bind_and_render(c: &mut Criterion) {
    let markup = r#"<p [title]="title">{{ title }}</p><input .value:input="title"><button on:click="n++">{{ n }}</button>"#;
    c.bench_function("bind_and_render", |b| {
        b.iter(|| {
            let scope = reactive(json!({ "title": "t", "n": 0 }));
            let container = Node::element("div");
            let view = bind_template(TemplateSource::markup(markup), &container, &scope).unwrap();
            view.render();
            black_box(view)
        })
    });
}

fn bench_reactive_update(c: &mut Criterion) {
    let scope = reactive(json!({ "n": 0 }));
    let container = Node::element("div");
    let view = bind_template(
        TemplateSource::markup(r#"<button on:click="n++">{{ n }}</button>"#),
        &container,
        &scope,
    )
    .unwrap();
    view.render();
    let button = container.query_selector("button").unwrap();

    c.bench_function("click_rerender", |b| {
        b.iter(|| button.dispatch_event(Event::new("click")))
    });
}

fn bench_list_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("list_render");

    for size in [10usize, 100, 1000] {
        let items: Vec<_> = (0..size).map(|i| json!({ "id": i, "name": format!("item {i}") })).collect();
        let scope = reactive(json!({ "items": items }));
        let container = Node::element("ul");
        let view = bind_template(
            TemplateSource::markup(r#"<li @for="item in items" [data-id]="item.id">{{ item.name }}</li>"#),
            &container,
            &scope,
        )
        .unwrap();
        view.render();

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                scope
                    .update("items", |items| {
                        if let Some(items) = items.as_array_mut() {
                            items.rotate_left(1);
                        }
                    })
                    .unwrap()
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_expression_parse,
    bench_expression_evaluate_cached,
    bench_parse_html,
    bench_bind_and_render,
    bench_reactive_update,
    bench_list_render,
);
criterion_main!(benches);
