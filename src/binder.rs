// ============================================================================
// spark-bind - Template Binder
// Clone a template, bind it, mount it, and keep it in sync with a scope
// ============================================================================
//
// Binding happens in two stages. `bind_template` clones the template's
// content into a detached fragment, runs every registered plugin over it
// (registry order) and appends the result to the container. Nothing is
// evaluated yet beyond what plugins do at initialize.
//
// `Render::render()` then wraps one full update pass in an effect. The
// effect records every scope name the pass reads, so any later write to one
// of them runs the pass again.
// ============================================================================

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::binding::{BindContext, BindingTable, PluginRegistry};
use crate::config::BindOptions;
use crate::dom::{parse_html, Node, Selector};
use crate::error::BindError;
use crate::expr::{Evaluate, Evaluator};
use crate::primitives::effect::{effect, Effect};
use crate::primitives::scope::Scope;
use crate::reactivity::batching::{batch, untrack};

// =============================================================================
// TEMPLATE SOURCE
// =============================================================================

/// Where a template's content comes from.
#[derive(Debug, Clone)]
pub enum TemplateSource {
    /// The children of this node (typically a `<template>` element)
    Node(Node),
    /// The first element matching this selector in the container's document
    Selector(String),
    /// Raw markup
    Markup(String),
}

impl TemplateSource {
    pub fn selector(selector: impl Into<String>) -> Self {
        TemplateSource::Selector(selector.into())
    }

    pub fn markup(markup: impl Into<String>) -> Self {
        TemplateSource::Markup(markup.into())
    }

    /// Produce a detached fragment holding a fresh copy of the content.
    fn resolve(&self, container: &Node) -> Result<Node, BindError> {
        match self {
            TemplateSource::Node(node) => Ok(clone_children(node)),
            TemplateSource::Selector(source) => {
                let selector = Selector::parse(source)
                    .ok_or_else(|| BindError::InvalidSelector(source.clone()))?;
                let root = container.root();
                let template = std::iter::once(root.clone())
                    .chain(root.descendants())
                    .find(|node| selector.matches(node))
                    .ok_or_else(|| BindError::TemplateNotFound(source.clone()))?;
                Ok(clone_children(&template))
            }
            TemplateSource::Markup(markup) => Ok(parse_html(markup)),
        }
    }
}

impl From<Node> for TemplateSource {
    fn from(node: Node) -> Self {
        TemplateSource::Node(node)
    }
}

impl From<&Node> for TemplateSource {
    fn from(node: &Node) -> Self {
        TemplateSource::Node(node.clone())
    }
}

fn clone_children(node: &Node) -> Node {
    let fragment = Node::fragment();
    for child in node.children() {
        fragment.append_child(&child.clone_node(true));
    }
    fragment
}

// =============================================================================
// BINDER
// =============================================================================

/// Binds templates with a chosen registry, evaluator and options.
///
/// # Example
///
/// ```
/// use spark_bind::{reactive, BindOptions, Binder, ListItemMode, TemplateSource};
/// use spark_bind::dom::Node;
/// use serde_json::json;
///
/// let scope = reactive(json!({ "rows": [{ "n": 1 }, { "n": 2 }], "picked": null }));
/// let container = Node::element("ul");
///
/// let binder = Binder::new().with_options(BindOptions {
///     list_items: ListItemMode::Full,
///     ..BindOptions::default()
/// });
/// let view = binder
///     .bind_template(
///         TemplateSource::markup(r#"<li @for="row in rows" on:click="picked = row.n">{{ row.n }}</li>"#),
///         &container,
///         &scope,
///     )
///     .unwrap();
/// view.render();
///
/// assert_eq!(container.text_content(), "12");
/// ```
#[derive(Clone)]
pub struct Binder {
    registry: Rc<PluginRegistry>,
    evaluator: Rc<dyn Evaluate>,
    options: Rc<BindOptions>,
}

impl Binder {
    /// A binder with the standard plugins, the built-in evaluator and
    /// default options.
    pub fn new() -> Self {
        Self {
            registry: Rc::new(PluginRegistry::standard()),
            evaluator: Rc::new(Evaluator::new()),
            options: Rc::new(BindOptions::default()),
        }
    }

    pub fn with_registry(mut self, registry: PluginRegistry) -> Self {
        self.registry = Rc::new(registry);
        self
    }

    pub fn with_evaluator(mut self, evaluator: impl Evaluate + 'static) -> Self {
        self.evaluator = Rc::new(evaluator);
        self
    }

    pub fn with_options(mut self, options: BindOptions) -> Self {
        self.options = Rc::new(options);
        self
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    pub fn options(&self) -> &BindOptions {
        &self.options
    }

    /// Clone the template, initialize every binding in it and append it to
    /// `container`.
    ///
    /// Nothing updates until `render()` is called on the result.
    pub fn bind_template(
        &self,
        source: impl Into<TemplateSource>,
        container: &Node,
        scope: &Scope,
    ) -> Result<Render, BindError> {
        let fragment = source.into().resolve(container)?;

        let cx = BindContext::new(
            scope.clone(),
            self.evaluator.clone(),
            self.registry.clone(),
            self.options.clone(),
        );

        // Plugins read the scope at initialize; that must not subscribe
        // whatever effect happens to be running.
        let table = untrack(|| BindingTable::collect(&fragment, &cx));
        container.append_child(&fragment);

        tracing::debug!(
            nodes = table.node_count(),
            bindings = table.len(),
            "template bound"
        );

        Ok(Render {
            inner: Rc::new(RenderInner {
                table: RefCell::new(table),
                cx,
                effect: RefCell::new(None),
            }),
        })
    }
}

impl Default for Binder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Binder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Binder")
            .field("registry", &self.registry)
            .field("options", &self.options)
            .finish()
    }
}

// =============================================================================
// RENDER HANDLE
// =============================================================================

struct RenderInner {
    table: RefCell<BindingTable>,
    cx: BindContext,
    effect: RefCell<Option<Effect>>,
}

impl RenderInner {
    fn update_pass(&self) {
        // Only the untracked pass forced by `render` can land here while a
        // pass is running (a host function calling `render` mid-pass). Effect
        // runs never nest: writes made during a run are queued until the
        // running flush picks them up, so a tracked run always owns the table
        // and its dependency set is never replaced by an empty one.
        let Ok(mut table) = self.table.try_borrow_mut() else {
            tracing::trace!("update pass already running, skipped");
            return;
        };
        table.update_all(&self.cx);
    }

    fn stop(&self) {
        if let Some(effect) = self.effect.borrow_mut().take() {
            effect.stop();
        }
    }
}

/// A bound template.
///
/// Dropping the handle stops its effect but leaves the DOM and listeners as
/// they are; call `teardown` to release those.
pub struct Render {
    inner: Rc<RenderInner>,
}

impl Render {
    /// Start (or restart) keeping the DOM in sync with the scope.
    ///
    /// Any effect from a previous call is stopped first, so at most one is
    /// ever live per handle.
    pub fn render(&self) {
        self.inner.stop();

        let weak: Weak<RenderInner> = Rc::downgrade(&self.inner);
        let handle = effect(move || {
            if let Some(inner) = weak.upgrade() {
                tracing::trace!("render effect run");
                inner.update_pass();
            }
        });
        // A `render` issued from inside the first run has already replaced
        // this effect with a newer one.
        if !handle.is_stopped() {
            *self.inner.effect.borrow_mut() = Some(handle);
        }

        // The effect may be deferred by an enclosing batch; initial state
        // must be on screen when this returns either way.
        batch(|| untrack(|| self.inner.update_pass()));
    }

    /// Stop reacting to scope changes. The DOM keeps its current state.
    pub fn stop(&self) {
        self.inner.stop();
    }

    /// Stop reacting and release every binding: listeners are detached and
    /// conditional and list content is removed along with its placeholders.
    pub fn teardown(&self) {
        self.inner.stop();
        match self.inner.table.try_borrow_mut() {
            Ok(mut table) => table.cleanup_all(),
            Err(_) => tracing::warn!("teardown requested during an update pass, ignored"),
        }
    }

    /// Whether an effect is currently live.
    pub fn is_active(&self) -> bool {
        self.inner
            .effect
            .borrow()
            .as_ref()
            .is_some_and(|effect| !effect.is_stopped())
    }

    /// Number of bindings in the table.
    pub fn binding_count(&self) -> usize {
        self.inner.table.borrow().len()
    }

    /// The scope this template is bound to.
    pub fn scope(&self) -> &Scope {
        &self.inner.cx.scope
    }
}

impl std::fmt::Debug for Render {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Render")
            .field("active", &self.is_active())
            .field("table", &*self.inner.table.borrow())
            .finish()
    }
}

// =============================================================================
// PUBLIC API
// =============================================================================

/// Bind a template to `scope` with the standard plugins and append it to
/// `container`.
///
/// # Example
///
/// ```
/// use spark_bind::{bind_template, reactive, TemplateSource};
/// use spark_bind::dom::{Event, Node};
/// use serde_json::json;
///
/// let scope = reactive(json!({ "count": 0 }));
/// let container = Node::element("div");
///
/// let view = bind_template(
///     TemplateSource::markup(r#"<button on:click="count++">{{ count }}</button>"#),
///     &container,
///     &scope,
/// )
/// .unwrap();
/// view.render();
/// assert_eq!(container.text_content(), "0");
///
/// let button = container.query_selector("button").unwrap();
/// button.dispatch_event(Event::new("click"));
/// assert_eq!(container.text_content(), "1");
/// ```
pub fn bind_template(
    source: impl Into<TemplateSource>,
    container: &Node,
    scope: &Scope,
) -> Result<Render, BindError> {
    Binder::new().bind_template(source, container, scope)
}

// =============================================================================
// TESTS
// =============================================================================
