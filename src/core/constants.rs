// ============================================================================
// spark-bind - Constants
// Flag constants for tracked sources and effects
// ============================================================================

// =============================================================================
// TYPE FLAGS
// =============================================================================

/// Tracked source (a scope slot or any other reactive value)
pub const SOURCE: u32 = 1 << 0;

/// Reaction is an effect
pub const EFFECT: u32 = 1 << 2;

// =============================================================================
// STATE FLAGS
// =============================================================================

/// Source/reaction is clean (up-to-date)
pub const CLEAN: u32 = 1 << 10;

/// Source/reaction is dirty (needs to run again)
pub const DIRTY: u32 = 1 << 11;

/// Reaction is currently running and collecting dependencies
pub const REACTION_IS_UPDATING: u32 = 1 << 13;

/// Effect has been stopped
pub const DESTROYED: u32 = 1 << 14;

/// Effect has run at least once
pub const EFFECT_RAN: u32 = 1 << 16;

// =============================================================================
// STATUS MASK (for clearing status bits)
// =============================================================================

/// Mask to clear the status bits (CLEAN, DIRTY)
pub const STATUS_MASK: u32 = !(DIRTY | CLEAN);

// =============================================================================
// TESTS
// =============================================================================
