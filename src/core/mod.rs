// ============================================================================
// spark-bind - Core Module
// Fundamental types, traits, and context for the reactive system
// ============================================================================

pub mod constants;
pub mod context;
pub mod types;

// Re-export commonly used items
pub use constants::*;
pub use context::{is_batching, is_tracking, with_context, ReactiveContext};
pub use types::{AnyReaction, AnySource, SourceInner};
