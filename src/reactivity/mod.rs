// ============================================================================
// spark-bind - Reactivity Module
// Dependency tracking, scheduling and batching
// ============================================================================

pub mod batching;
pub mod tracking;

pub use batching::{batch, is_untracking, untrack};
pub use tracking::{flush_pending_reactions, notify_write, remove_reactions, track_read};
