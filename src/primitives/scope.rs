// ============================================================================
// spark-bind - Scope
// The reactive data object that binding expressions are evaluated against
// ============================================================================
//
// Every name in a scope is backed by its own tracked source, so an effect
// only re-runs when a name it actually read is written. Values are whole
// `serde_json::Value`s: changing a nested field or pushing onto an array
// rewrites the top-level name, which is what notifies readers.
//
// A derived scope (`Scope::child`) has a parent link. Lookups of names it
// does not define fall through to the parent, and so do writes, unless the
// name is one of its read-only locals (loop variables).
// ============================================================================

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::core::types::{AnySource, SourceInner};
use crate::error::EvaluationError;
use crate::reactivity::batching::untrack;
use crate::reactivity::tracking::{notify_write, track_read};

/// Host function callable from expressions: `name(args...)`.
pub type NativeFn = Rc<dyn Fn(&Scope, &[Value]) -> Result<Value, EvaluationError>>;

// =============================================================================
// SCOPE
// =============================================================================

/// A reactive mapping from names to values, optionally chained to a parent.
///
/// Cloning a `Scope` is cheap and yields a handle to the same data.
#[derive(Clone)]
pub struct Scope {
    inner: Rc<ScopeInner>,
}

struct ScopeInner {
    /// One tracked source per locally defined name
    slots: RefCell<IndexMap<String, Rc<SourceInner<Value>>>>,

    /// Bumped whenever a name is added, so lookups that missed can re-run
    shape: Rc<SourceInner<u64>>,

    /// Locals that expressions may read but not assign
    read_only: RefCell<HashSet<String>>,

    /// Host functions
    functions: RefCell<HashMap<String, NativeFn>>,

    parent: Option<Scope>,
}

impl Scope {
    /// Create an empty root scope.
    pub fn new() -> Self {
        Self::with_parent(None)
    }

    fn with_parent(parent: Option<Scope>) -> Self {
        Self {
            inner: Rc::new(ScopeInner {
                slots: RefCell::new(IndexMap::new()),
                shape: Rc::new(SourceInner::new(0)),
                read_only: RefCell::new(HashSet::new()),
                functions: RefCell::new(HashMap::new()),
                parent,
            }),
        }
    }

    /// Create a root scope holding the entries of a JSON object.
    pub fn from_map(map: Map<String, Value>) -> Self {
        let scope = Self::new();
        {
            let mut slots = scope.inner.slots.borrow_mut();
            for (name, value) in map {
                slots.insert(name, Rc::new(SourceInner::new(value)));
            }
        }
        scope
    }

    /// Create a derived scope whose lookups fall through to `self`.
    pub fn child(&self) -> Scope {
        Self::with_parent(Some(self.clone()))
    }

    /// The parent of a derived scope.
    pub fn parent(&self) -> Option<&Scope> {
        self.inner.parent.as_ref()
    }

    /// Whether two handles point at the same scope.
    pub fn ptr_eq(&self, other: &Scope) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    fn slot(&self, name: &str) -> Option<Rc<SourceInner<Value>>> {
        self.inner.slots.borrow().get(name).cloned()
    }

    // =========================================================================
    // READ
    // =========================================================================

    /// Look a name up through the scope chain.
    ///
    /// Inside an effect this registers a dependency on the name. A miss
    /// depends on the root's shape, so defining the name later re-runs the
    /// reader.
    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(slot) = self.slot(name) {
            track_read(slot.clone() as Rc<dyn AnySource>);
            return Some(slot.get());
        }

        match &self.inner.parent {
            Some(parent) => parent.get(name),
            None => {
                track_read(self.inner.shape.clone() as Rc<dyn AnySource>);
                None
            }
        }
    }

    /// Whether the name resolves anywhere in the chain (untracked).
    pub fn contains(&self, name: &str) -> bool {
        self.inner.slots.borrow().contains_key(name)
            || self.inner.functions.borrow().contains_key(name)
            || self.inner.parent.as_ref().is_some_and(|p| p.contains(name))
    }

    /// Whether the name is defined in this scope itself.
    pub fn is_local(&self, name: &str) -> bool {
        self.inner.slots.borrow().contains_key(name)
    }

    /// Names defined in this scope, in definition order.
    pub fn names(&self) -> Vec<String> {
        self.inner.slots.borrow().keys().cloned().collect()
    }

    /// The local values as a JSON object (untracked).
    pub fn snapshot(&self) -> Value {
        untrack(|| {
            let slots = self.inner.slots.borrow();
            let map: Map<String, Value> = slots
                .iter()
                .map(|(name, slot)| (name.clone(), slot.get()))
                .collect();
            Value::Object(map)
        })
    }

    // =========================================================================
    // WRITE
    // =========================================================================

    /// Define (or overwrite) a name in this scope itself.
    pub fn define(&self, name: impl Into<String>, value: Value) {
        let name = name.into();
        match self.slot(&name) {
            Some(slot) => write_slot(&slot, value),
            None => {
                self.inner
                    .slots
                    .borrow_mut()
                    .insert(name, Rc::new(SourceInner::new(value)));
                self.bump_shape();
            }
        }
    }

    /// Define a local that expressions cannot assign.
    pub fn define_readonly(&self, name: impl Into<String>, value: Value) {
        let name = name.into();
        self.inner.read_only.borrow_mut().insert(name.clone());
        self.define(name, value);
    }

    /// Assign a name.
    ///
    /// Writes the local slot when the name is defined here, otherwise the
    /// nearest ancestor that defines it; a name defined nowhere is created in
    /// the root scope.
    pub fn set(&self, name: &str, value: Value) -> Result<(), EvaluationError> {
        if self.inner.read_only.borrow().contains(name) {
            return Err(EvaluationError::ReadOnly(name.to_string()));
        }

        if let Some(slot) = self.slot(name) {
            write_slot(&slot, value);
            return Ok(());
        }

        match &self.inner.parent {
            Some(parent) => parent.set(name, value),
            None => {
                self.define(name, value);
                Ok(())
            }
        }
    }

    /// Modify a value in place; missing names start out as null.
    ///
    /// # Example
    ///
    /// ```
    /// use spark_bind::reactive;
    /// use serde_json::json;
    ///
    /// let scope = reactive(json!({ "items": [1, 2] }));
    /// scope
    ///     .update("items", |items| {
    ///         if let Some(items) = items.as_array_mut() {
    ///             items.push(json!(3));
    ///         }
    ///     })
    ///     .unwrap();
    /// assert_eq!(scope.get("items"), Some(json!([1, 2, 3])));
    /// ```
    pub fn update(&self, name: &str, f: impl FnOnce(&mut Value)) -> Result<(), EvaluationError> {
        let mut value = untrack(|| self.get(name)).unwrap_or(Value::Null);
        f(&mut value);
        self.set(name, value)
    }

    fn bump_shape(&self) {
        let next = self.inner.shape.with(|v| v + 1);
        self.inner.shape.set(next);
        notify_write(self.inner.shape.clone() as Rc<dyn AnySource>);
    }

    // =========================================================================
    // HOST FUNCTIONS
    // =========================================================================

    /// Register a host function callable from expressions.
    ///
    /// # Example
    ///
    /// ```
    /// use spark_bind::{reactive, Evaluate, Evaluator};
    /// use serde_json::json;
    ///
    /// let scope = reactive(json!({ "count": 1 }));
    /// scope.define_fn("reset", |scope, _args| {
    ///     scope.set("count", json!(0))?;
    ///     Ok(json!(null))
    /// });
    ///
    /// Evaluator::new().evaluate("reset()", &scope).unwrap();
    /// assert_eq!(scope.get("count"), Some(json!(0)));
    /// ```
    pub fn define_fn<F>(&self, name: impl Into<String>, f: F)
    where
        F: Fn(&Scope, &[Value]) -> Result<Value, EvaluationError> + 'static,
    {
        self.inner.functions.borrow_mut().insert(name.into(), Rc::new(f));
    }

    /// Resolve a host function through the scope chain.
    pub fn function(&self, name: &str) -> Option<NativeFn> {
        if let Some(f) = self.inner.functions.borrow().get(name) {
            return Some(f.clone());
        }
        self.inner.parent.as_ref().and_then(|p| p.function(name))
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("values", &self.snapshot())
            .field("derived", &self.inner.parent.is_some())
            .finish()
    }
}

fn write_slot(slot: &Rc<SourceInner<Value>>, value: Value) {
    if slot.set(value) {
        notify_write(slot.clone() as Rc<dyn AnySource>);
    }
}

// =============================================================================
// PUBLIC API
// =============================================================================

/// Make a reactive scope out of a JSON object.
///
/// Each top-level key becomes a tracked name. Anything other than an object
/// yields an empty scope.
pub fn reactive(value: Value) -> Scope {
    match value {
        Value::Object(map) => Scope::from_map(map),
        other => {
            tracing::warn!(value = %other, "reactive() expects an object, starting from an empty scope");
            Scope::new()
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::effect::effect;
    use serde_json::json;
    use std::cell::Cell;

    #[test]
    fn get_and_set_root_values() {
        let scope = reactive(json!({ "count": 1, "name": "a" }));
        assert_eq!(scope.get("count"), Some(json!(1)));
        assert_eq!(scope.get("missing"), None);

        scope.set("count", json!(2)).unwrap();
        assert_eq!(scope.get("count"), Some(json!(2)));

        // Unknown names are created at the root
        scope.set("fresh", json!(true)).unwrap();
        assert_eq!(scope.names(), vec!["count", "name", "fresh"]);
    }

    #[test]
    fn derived_scope_falls_through_to_parent() {
        let parent = reactive(json!({ "total": 3 }));
        let child = parent.child();
        child.define_readonly("item", json!({ "name": "a" }));

        assert_eq!(child.get("total"), Some(json!(3)));
        assert_eq!(child.get("item"), Some(json!({ "name": "a" })));
        assert_eq!(parent.get("item"), None);
        assert!(child.contains("total"));
        assert!(!child.is_local("total"));
    }

    #[test]
    fn derived_scope_routes_writes() {
        let parent = reactive(json!({ "selected": null }));
        let child = parent.child();
        child.define_readonly("item", json!(1));

        child.set("selected", json!(1)).unwrap();
        assert_eq!(parent.get("selected"), Some(json!(1)));

        assert_eq!(
            child.set("item", json!(2)),
            Err(EvaluationError::ReadOnly("item".into()))
        );

        // Names defined nowhere land in the root
        child.set("created", json!("x")).unwrap();
        assert_eq!(parent.get("created"), Some(json!("x")));
        assert!(!child.is_local("created"));
    }

    #[test]
    fn reading_a_missing_name_reruns_when_it_appears() {
        let scope = Scope::new();
        let seen = Rc::new(RefCell::new(None));

        let _effect = effect({
            let scope = scope.clone();
            let seen = seen.clone();
            move || *seen.borrow_mut() = scope.get("late")
        });
        assert_eq!(*seen.borrow(), None);

        scope.define("late", json!(7));
        assert_eq!(*seen.borrow(), Some(json!(7)));
    }

    #[test]
    fn writes_only_rerun_readers_of_that_name() {
        let scope = reactive(json!({ "a": 1, "b": 1 }));
        let runs = Rc::new(Cell::new(0));

        let _effect = effect({
            let scope = scope.clone();
            let runs = runs.clone();
            move || {
                let _ = scope.get("a");
                runs.set(runs.get() + 1);
            }
        });

        scope.set("b", json!(2)).unwrap();
        assert_eq!(runs.get(), 1);

        scope.update("a", |v| *v = json!(5)).unwrap();
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn host_functions_resolve_through_parents() {
        let parent = Scope::new();
        parent.define_fn("double", |_, args| {
            let n = args.first().and_then(Value::as_i64).unwrap_or(0);
            Ok(json!(n * 2))
        });

        let child = parent.child();
        let f = child.function("double").unwrap();
        assert_eq!(f(&child, &[json!(4)]).unwrap(), json!(8));
        assert!(child.contains("double"));
    }

    #[test]
    fn non_object_reactive_is_empty() {
        let scope = reactive(json!([1, 2]));
        assert_eq!(scope.snapshot(), json!({}));
    }
}
