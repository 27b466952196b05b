// ============================================================================
// spark-bind - Ergonomic Macros
// ============================================================================

/// Clone variables into a move closure.
///
/// Saves the `let x = x.clone();` boilerplate before handing a `Scope` or
/// `Rc` to an effect, a host function or an event listener.
///
/// # Usage
///
/// ```rust
/// use spark_bind::{cloned, effect, reactive};
/// use serde_json::json;
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let scope = reactive(json!({ "n": 1 }));
/// let seen = Rc::new(Cell::new(0));
///
/// let _effect = effect(cloned!(scope, seen => move || {
///     seen.set(scope.get("n").and_then(|v| v.as_i64()).unwrap_or(0));
/// }));
///
/// scope.set("n", json!(3)).unwrap();
/// assert_eq!(seen.get(), 3);
/// ```
#[macro_export]
macro_rules! cloned {
    ($($n:ident),+ => $e:expr) => {
        {
            $( let $n = $n.clone(); )+
            $e
        }
    };
}

/// Build a reactive scope from a JSON literal.
///
/// Wraps `reactive(json!({ ... }))`.
///
/// # Usage
///
/// ```rust
/// use spark_bind::scope;
/// use serde_json::json;
///
/// let user = "Ada";
/// let scope = scope!({ "name": user, "tags": ["a", "b"] });
/// assert_eq!(scope.get("name"), Some(json!("Ada")));
/// assert_eq!(scope.names(), vec!["name", "tags"]);
/// ```
#[macro_export]
macro_rules! scope {
    ({ $($body:tt)* }) => {
        $crate::reactive($crate::__json::json!({ $($body)* }))
    };
}
