// ============================================================================
// spark-bind - Dependency Tracking
// Tracking reads and propagating writes between scope slots and effects
// ============================================================================
//
// The key challenge in Rust is borrow scoping: RefCell borrows must be
// released before anything that can re-enter the graph runs, so every walk
// here uses the "collect-then-mutate" pattern.
// ============================================================================

use std::rc::Rc;

use crate::core::constants::*;
use crate::core::context::with_context;
use crate::core::types::{AnyReaction, AnySource};

/// Flush iterations before we consider an effect to be invalidating itself forever
const MAX_FLUSH_ITERATIONS: u32 = 1000;

// =============================================================================
// TRACK READ - Register dependency when reading a source
// =============================================================================

/// Track a read of a source, registering it as a dependency if inside an effect.
///
/// Called by `Scope::get` before handing out the value.
pub fn track_read(source: Rc<dyn AnySource>) {
    with_context(|ctx| {
        if !ctx.has_active_reaction() || ctx.is_untracking() {
            return;
        }

        let Some(reaction) = ctx.get_active_reaction().and_then(|w| w.upgrade()) else {
            return;
        };

        if (reaction.flags() & REACTION_IS_UPDATING) != 0 {
            // Only the first read of this source in this run counts
            let read_version = ctx.get_read_version();
            if source.read_version() < read_version {
                source.set_read_version(read_version);
                ctx.add_new_dep(source.clone());
            }
        } else {
            reaction.add_dep(source.clone());
            source.add_reaction(Rc::downgrade(&reaction));
        }
    });
}

// =============================================================================
// NOTIFY WRITE - Called when a source's value changes
// =============================================================================

/// Notify the reactive system that a source's value has changed.
///
/// Every effect that read the source during its last run is marked dirty and
/// scheduled.
pub fn notify_write(source: Rc<dyn AnySource>) {
    with_context(|ctx| {
        ctx.increment_write_version();
    });
    mark_reactions(source);
}

/// Mark all reactions of a source dirty and schedule the effects among them.
pub fn mark_reactions(source: Rc<dyn AnySource>) {
    source.cleanup_dead_reactions();

    // BORROW SAFETY: collect first so the source's reaction list is released
    // before any effect can run and subscribe again.
    let reactions: Vec<Rc<dyn AnyReaction>> = {
        let mut collected = Vec::new();
        source.for_each_reaction(&mut |reaction| {
            collected.push(reaction);
            true
        });
        collected
    };

    let mut to_schedule = Vec::new();
    for reaction in reactions {
        if reaction.is_destroyed() || reaction.is_dirty() {
            continue;
        }
        reaction.mark_dirty();
        if reaction.is_effect() {
            to_schedule.push(reaction);
        }
    }

    for reaction in to_schedule {
        schedule_reaction(reaction);
    }
}

// =============================================================================
// SCHEDULING
// =============================================================================

/// Queue a reaction and flush unless a batch or a flush is already in progress.
///
/// Rust has no microtask queue, so outside a batch effects run synchronously
/// right after the write that invalidated them.
pub fn schedule_reaction(reaction: Rc<dyn AnyReaction>) {
    let should_flush = with_context(|ctx| {
        ctx.add_pending_reaction(Rc::downgrade(&reaction));
        !ctx.is_batching() && !ctx.is_flushing()
    });

    if should_flush {
        flush_pending_reactions();
    }
}

/// Run every pending dirty reaction until the queue is empty.
///
/// # Panics
///
/// Panics when effects keep invalidating each other for more than
/// `MAX_FLUSH_ITERATIONS` rounds; that is a programming error.
pub fn flush_pending_reactions() {
    let was_flushing = with_context(|ctx| ctx.set_flushing(true));
    if was_flushing {
        return;
    }

    let mut iterations = 0;
    loop {
        let pending = with_context(|ctx| ctx.take_pending_reactions());
        if pending.is_empty() {
            break;
        }

        iterations += 1;
        if iterations > MAX_FLUSH_ITERATIONS {
            with_context(|ctx| ctx.set_flushing(false));
            panic!(
                "Maximum update depth exceeded. This can happen when a binding \
                 expression writes to a value it also reads."
            );
        }

        for reaction in pending.into_iter().filter_map(|weak| weak.upgrade()) {
            if reaction.is_destroyed() || !reaction.is_dirty() {
                continue;
            }
            reaction.update();
        }
    }

    with_context(|ctx| ctx.set_flushing(false));
}

// =============================================================================
// REMOVE REACTIONS - Clean up stale dependencies
// =============================================================================

/// Unsubscribe a reaction from its dependencies, starting at the given index.
pub fn remove_reactions(reaction: Rc<dyn AnyReaction>, start: usize) {
    let deps_to_remove: Vec<Rc<dyn AnySource>> = {
        let mut collected = Vec::new();
        let mut idx = 0;
        reaction.for_each_dep(&mut |dep| {
            if idx >= start {
                collected.push(dep.clone());
            }
            idx += 1;
            true
        });
        collected
    };

    for dep in deps_to_remove {
        dep.remove_reaction(&reaction);
    }

    reaction.remove_deps_from(start);
}

/// Subscribe a reaction to the dependencies collected during its last run.
pub fn install_dependencies(reaction: Rc<dyn AnyReaction>, new_deps: Vec<Rc<dyn AnySource>>) {
    remove_reactions(reaction.clone(), 0);
    for dep in new_deps {
        reaction.add_dep(dep.clone());
        dep.add_reaction(Rc::downgrade(&reaction));
    }
}

// =============================================================================
// TESTS
// =============================================================================
