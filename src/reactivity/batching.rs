// ============================================================================
// spark-bind - Batching
// Group multiple scope writes into a single effect run
// ============================================================================

use crate::core::context::with_context;
use crate::reactivity::tracking::flush_pending_reactions;

// =============================================================================
// BATCH
// =============================================================================

/// Batch multiple scope writes into a single reaction cycle.
///
/// Without batching, each write re-runs dependent effects immediately.
/// With batching, effects only run once after all writes complete.
///
/// # Example
///
/// ```
/// use spark_bind::{batch, effect, reactive};
/// use serde_json::json;
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let scope = reactive(json!({ "a": 1, "b": 2 }));
/// let runs = Rc::new(Cell::new(0));
///
/// let _effect = effect({
///     let scope = scope.clone();
///     let runs = runs.clone();
///     move || {
///         let _ = (scope.get("a"), scope.get("b"));
///         runs.set(runs.get() + 1);
///     }
/// });
/// assert_eq!(runs.get(), 1);
///
/// batch(|| {
///     scope.set("a", json!(10)).unwrap();
///     scope.set("b", json!(20)).unwrap();
/// });
/// assert_eq!(runs.get(), 2);
/// ```
pub fn batch<T>(f: impl FnOnce() -> T) -> T {
    with_context(|ctx| ctx.enter_batch());

    // Guard so we exit the batch even on panic
    struct BatchGuard;

    impl Drop for BatchGuard {
        fn drop(&mut self) {
            let depth = with_context(|ctx| ctx.exit_batch());

            // When outermost batch completes, flush pending reactions
            if depth == 0 {
                flush_pending_reactions();
            }
        }
    }

    let _guard = BatchGuard;
    f()
}

// =============================================================================
// UNTRACK
// =============================================================================

/// Read scope values without creating dependencies.
///
/// # Example
///
/// ```
/// use spark_bind::{effect, reactive, untrack};
/// use serde_json::json;
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let scope = reactive(json!({ "a": 1, "b": 2 }));
/// let runs = Rc::new(Cell::new(0));
///
/// let _effect = effect({
///     let scope = scope.clone();
///     let runs = runs.clone();
///     move || {
///         let _ = scope.get("a");
///         let _ = untrack(|| scope.get("b"));
///         runs.set(runs.get() + 1);
///     }
/// });
///
/// scope.set("b", json!(20)).unwrap();
/// assert_eq!(runs.get(), 1);
///
/// scope.set("a", json!(10)).unwrap();
/// assert_eq!(runs.get(), 2);
/// ```
pub fn untrack<T>(f: impl FnOnce() -> T) -> T {
    let prev = with_context(|ctx| ctx.set_untracking(true));

    struct UntrackGuard {
        prev: bool,
    }

    impl Drop for UntrackGuard {
        fn drop(&mut self) {
            with_context(|ctx| ctx.set_untracking(self.prev));
        }
    }

    let _guard = UntrackGuard { prev };
    f()
}

/// Check if currently in untrack mode.
pub fn is_untracking() -> bool {
    with_context(|ctx| ctx.is_untracking())
}

// =============================================================================
// TESTS
// =============================================================================
