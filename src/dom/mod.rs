// ============================================================================
// spark-bind - DOM
// In-memory document model the binding engine operates on
// ============================================================================

pub mod event;
pub mod node;
pub mod parser;
pub mod selector;
mod serialize;

pub use event::Event;
pub use node::{mutation_count, EventCallback, ListenerId, Node, NodeKey, NodeType, WeakNode};
pub use parser::{parse_element, parse_html};
pub use selector::Selector;
