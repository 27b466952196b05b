// ============================================================================
// spark-bind - Declarative Template Bindings
// ============================================================================
//
// Markers written into markup (`{{ expr }}`, `.prop`, `[attr]`, `on:event`,
// two-way `.prop:event`, `@if`, `@for`) are bound to a reactive scope and kept
// in sync with it. See `bind_template` for the entry point.
// ============================================================================

pub mod binder;
pub mod binding;
pub mod config;
pub mod core;
pub mod dom;
pub mod error;
pub mod expr;
pub mod primitives;
pub mod reactivity;

mod macros;

// Entry point
pub use binder::{bind_template, Binder, Render, TemplateSource};

// Bindings and options
pub use binding::{BindContext, BindingPlugin, BindingTable, Descriptor, PluginRegistry};
pub use config::{BindOptions, ListItemMode};
pub use error::{BindError, CollectionTypeError, ConfigError, EvaluationError};

// Expressions
pub use expr::{Evaluate, Evaluator};

// Reactive facility
pub use primitives::effect::{effect, Effect};
pub use primitives::scope::{reactive, NativeFn, Scope};
pub use reactivity::batching::{batch, is_untracking, untrack};

// Re-exported for the `scope!` macro
#[doc(hidden)]
pub use serde_json as __json;

// =============================================================================
// TESTS
// =============================================================================
