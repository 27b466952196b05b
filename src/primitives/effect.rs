// ============================================================================
// spark-bind - Effect System
// Side effects that re-run when the scope values they read change
// ============================================================================
//
// The template binder wraps each full update pass in one of these. An effect
// records every scope slot read while it runs; a write to any of those slots
// marks it dirty and runs it again. `stop()` detaches it from the graph.
// ============================================================================

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::core::constants::*;
use crate::core::context::with_context;
use crate::core::types::{AnyReaction, AnySource};
use crate::reactivity::tracking::{install_dependencies, remove_reactions, schedule_reaction};

// =============================================================================
// TYPE ALIASES
// =============================================================================

/// Effect function signature
pub type EffectFn = Box<dyn FnMut()>;

// =============================================================================
// EFFECT INNER
// =============================================================================

/// The inner effect implementation.
///
/// Implements `AnyReaction` (effects are reactions only, never sources).
pub struct EffectInner {
    /// Flags bitmask for state tracking
    flags: Cell<u32>,

    /// The effect function
    func: RefCell<Option<EffectFn>>,

    /// Dependencies (slots this effect read during its last run)
    deps: RefCell<Vec<Rc<dyn AnySource>>>,

    /// Number of completed runs
    runs: Cell<u64>,

    /// Weak reference to self (set after Rc creation)
    self_weak: RefCell<Weak<EffectInner>>,
}

impl EffectInner {
    /// Create a new, dirty effect that has not run yet
    pub fn new(func: EffectFn) -> Rc<Self> {
        let effect = Rc::new(Self {
            flags: Cell::new(EFFECT | DIRTY),
            func: RefCell::new(Some(func)),
            deps: RefCell::new(Vec::new()),
            runs: Cell::new(0),
            self_weak: RefCell::new(Weak::new()),
        });

        *effect.self_weak.borrow_mut() = Rc::downgrade(&effect);

        effect
    }

    /// Get this effect as a weak reference to AnyReaction
    fn as_weak_reaction(&self) -> Weak<dyn AnyReaction> {
        match self.self_weak.borrow().upgrade() {
            Some(rc) => Rc::downgrade(&(rc as Rc<dyn AnyReaction>)),
            None => Weak::<EffectInner>::new() as Weak<dyn AnyReaction>,
        }
    }

    /// Number of times the effect function has run
    pub fn run_count(&self) -> u64 {
        self.runs.get()
    }
}

impl AnyReaction for EffectInner {
    fn flags(&self) -> u32 {
        self.flags.get()
    }

    fn set_flags(&self, flags: u32) {
        self.flags.set(flags);
    }

    fn dep_count(&self) -> usize {
        self.deps.borrow().len()
    }

    fn add_dep(&self, source: Rc<dyn AnySource>) {
        self.deps.borrow_mut().push(source);
    }

    fn remove_deps_from(&self, start: usize) {
        self.deps.borrow_mut().truncate(start);
    }

    fn for_each_dep(&self, f: &mut dyn FnMut(&Rc<dyn AnySource>) -> bool) {
        for dep in self.deps.borrow().iter() {
            if !f(dep) {
                break;
            }
        }
    }

    fn update(&self) {
        if self.is_destroyed() {
            return;
        }

        let rc_self = self.self_weak.borrow().upgrade();
        if let Some(rc_self) = rc_self {
            update_effect(&rc_self);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// =============================================================================
// EFFECT HANDLE
// =============================================================================

/// Handle to a running effect.
///
/// Dropping the last handle stops the effect, so keep it alive for as long
/// as the effect should keep reacting.
pub struct Effect {
    inner: Rc<EffectInner>,
}

impl Effect {
    /// Get access to the inner effect
    pub fn inner(&self) -> &Rc<EffectInner> {
        &self.inner
    }

    /// Check if this effect has been stopped
    pub fn is_stopped(&self) -> bool {
        self.inner.is_destroyed()
    }

    /// Stop the effect: unsubscribe from every dependency and never run again.
    ///
    /// Whatever the effect already did stays done.
    pub fn stop(&self) {
        destroy_effect(&self.inner);
    }
}

impl Drop for Effect {
    fn drop(&mut self) {
        if Rc::strong_count(&self.inner) == 1 {
            self.stop();
        }
    }
}

impl std::fmt::Debug for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Effect")
            .field("stopped", &self.is_stopped())
            .field("deps", &self.inner.dep_count())
            .field("runs", &self.inner.run_count())
            .finish()
    }
}

// =============================================================================
// DESTROY / UPDATE
// =============================================================================

/// Stop an effect and release its function.
pub fn destroy_effect(effect: &Rc<EffectInner>) {
    if effect.is_destroyed() {
        return;
    }

    remove_reactions(effect.clone() as Rc<dyn AnyReaction>, 0);
    effect.set_flags(effect.flags() | DESTROYED);

    // The function may currently be running (an effect stopping itself), in
    // which case it is released when that run returns.
    if let Ok(mut func) = effect.func.try_borrow_mut() {
        *func = None;
    }
}

/// Run an effect and re-collect its dependencies.
pub fn update_effect(effect: &Rc<EffectInner>) {
    if effect.is_destroyed() {
        return;
    }

    effect.mark_clean();

    let (prev_reaction, prev_deps) = with_context(|ctx| {
        let prev_reaction = ctx.set_active_reaction(Some(effect.as_weak_reaction()));
        ctx.increment_read_version();
        let prev_deps = ctx.swap_new_deps(Vec::new());
        effect.set_flags(effect.flags() | REACTION_IS_UPDATING);
        (prev_reaction, prev_deps)
    });

    {
        let mut func = effect.func.borrow_mut();
        if let Some(func) = func.as_mut() {
            func();
        }
    }

    let new_deps = with_context(|ctx| {
        effect.set_flags(effect.flags() & !REACTION_IS_UPDATING);
        ctx.set_active_reaction(prev_reaction);
        ctx.swap_new_deps(prev_deps)
    });

    effect.runs.set(effect.runs.get() + 1);
    effect.set_flags(effect.flags() | EFFECT_RAN);

    if effect.is_destroyed() {
        // Stopped from inside its own run
        *effect.func.borrow_mut() = None;
        return;
    }

    install_dependencies(effect.clone() as Rc<dyn AnyReaction>, new_deps);
}

// =============================================================================
// PUBLIC API
// =============================================================================

/// Create an effect that re-runs when the scope values it reads change.
///
/// The function runs right away (or when the enclosing `batch` ends).
///
/// # Example
///
/// ```
/// use spark_bind::{effect, reactive};
/// use serde_json::json;
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let scope = reactive(json!({ "count": 0 }));
/// let seen = Rc::new(Cell::new(0));
///
/// let handle = effect({
///     let scope = scope.clone();
///     let seen = seen.clone();
///     move || seen.set(scope.get("count").and_then(|v| v.as_i64()).unwrap_or(-1))
/// });
///
/// scope.set("count", json!(2)).unwrap();
/// assert_eq!(seen.get(), 2);
///
/// handle.stop();
/// scope.set("count", json!(3)).unwrap();
/// assert_eq!(seen.get(), 2);
/// ```
pub fn effect<F>(f: F) -> Effect
where
    F: FnMut() + 'static,
{
    let inner = EffectInner::new(Box::new(f));
    schedule_reaction(inner.clone() as Rc<dyn AnyReaction>);
    Effect { inner }
}

/// Check if we're currently inside a running effect.
pub fn effect_tracking() -> bool {
    with_context(|ctx| ctx.has_active_reaction())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::scope::reactive;
    use crate::reactivity::batching::batch;
    use serde_json::json;

    #[test]
    fn effect_runs_on_creation_and_on_change() {
        let scope = reactive(json!({ "count": 0 }));
        let runs = Rc::new(Cell::new(0));

        let _effect = effect({
            let scope = scope.clone();
            let runs = runs.clone();
            move || {
                let _ = scope.get("count");
                runs.set(runs.get() + 1);
            }
        });
        assert_eq!(runs.get(), 1, "Effect should run on creation");

        scope.set("count", json!(1)).unwrap();
        assert_eq!(runs.get(), 2, "Effect should run when dependency changes");

        // Same value is not a change
        scope.set("count", json!(1)).unwrap();
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn stopped_effect_never_runs_again() {
        let scope = reactive(json!({ "count": 0 }));
        let runs = Rc::new(Cell::new(0));

        let handle = effect({
            let scope = scope.clone();
            let runs = runs.clone();
            move || {
                let _ = scope.get("count");
                runs.set(runs.get() + 1);
            }
        });

        handle.stop();
        assert!(handle.is_stopped());
        assert_eq!(handle.inner().dep_count(), 0);

        scope.set("count", json!(5)).unwrap();
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn dropping_handle_stops_effect() {
        let scope = reactive(json!({ "count": 0 }));
        let runs = Rc::new(Cell::new(0));

        {
            let _handle = effect({
                let scope = scope.clone();
                let runs = runs.clone();
                move || {
                    let _ = scope.get("count");
                    runs.set(runs.get() + 1);
                }
            });
        }

        scope.set("count", json!(1)).unwrap();
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn effect_created_in_batch_runs_at_batch_end() {
        let runs = Rc::new(Cell::new(0));
        let handle = batch(|| {
            let handle = effect({
                let runs = runs.clone();
                move || runs.set(runs.get() + 1)
            });
            assert_eq!(runs.get(), 0);
            handle
        });
        assert_eq!(runs.get(), 1);
        assert_eq!(handle.inner().run_count(), 1);
    }

    #[test]
    fn dependencies_follow_the_last_run() {
        let scope = reactive(json!({ "flag": true, "a": 1, "b": 2 }));
        let runs = Rc::new(Cell::new(0));

        let _effect = effect({
            let scope = scope.clone();
            let runs = runs.clone();
            move || {
                runs.set(runs.get() + 1);
                if scope.get("flag") == Some(json!(true)) {
                    let _ = scope.get("a");
                } else {
                    let _ = scope.get("b");
                }
            }
        });

        scope.set("flag", json!(false)).unwrap();
        assert_eq!(runs.get(), 2);

        // `a` is no longer read
        scope.set("a", json!(10)).unwrap();
        assert_eq!(runs.get(), 2);

        scope.set("b", json!(20)).unwrap();
        assert_eq!(runs.get(), 3);
    }

    #[test]
    fn effect_tracking_only_inside_effect() {
        assert!(!effect_tracking());
        let inside = Rc::new(Cell::new(false));
        let _effect = effect({
            let inside = inside.clone();
            move || inside.set(effect_tracking())
        });
        assert!(inside.get());
    }
}
