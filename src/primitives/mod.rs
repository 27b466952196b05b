// ============================================================================
// spark-bind - Primitives
// Effects and the reactive scope
// ============================================================================

pub mod effect;
pub mod scope;

pub use effect::{effect, effect_tracking, Effect, EffectFn, EffectInner};
pub use scope::{reactive, NativeFn, Scope};
