// ============================================================================
// spark-bind - Errors
// Failure types surfaced by evaluation, list rendering and binding
// ============================================================================

use thiserror::Error;

/// An expression failed to parse or to evaluate.
///
/// Always caught at the plugin boundary: bindings log it at warn level and
/// fall back to their safe default, it never reaches the binder or an effect.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvaluationError {
    #[error("syntax error in `{expression}` at offset {offset}: {message}")]
    Syntax {
        expression: String,
        offset: usize,
        message: String,
    },

    #[error("`{0}` is not defined")]
    Undefined(String),

    #[error("`{0}` is not a function")]
    NotCallable(String),

    #[error("`{0}` is not an assignable reference")]
    NotAssignable(String),

    #[error("`{0}` is read-only in this scope")]
    ReadOnly(String),

    #[error("cannot read `{property}` of {receiver}")]
    InvalidAccess { receiver: &'static str, property: String },

    #[error("type error: {0}")]
    Type(String),

    /// Raised by a host function registered with `Scope::define_fn`
    #[error("{0}")]
    Host(String),
}

impl EvaluationError {
    /// Convenience constructor for host functions
    pub fn host(message: impl Into<String>) -> Self {
        EvaluationError::Host(message.into())
    }
}

/// A list binding's source expression produced neither an array nor an object.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("`{expression}` evaluated to {found}, expected an array or an object")]
pub struct CollectionTypeError {
    pub expression: String,
    pub found: &'static str,
}

/// Failures while setting up a template binding.
#[derive(Debug, Error)]
pub enum BindError {
    #[error("no template matches selector `{0}`")]
    TemplateNotFound(String),

    #[error("unsupported selector `{0}`")]
    InvalidSelector(String),
}

/// Failures while loading `BindOptions`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid binding options: {0}")]
    Parse(#[from] serde_json::Error),
}
