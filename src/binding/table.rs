// ============================================================================
// spark-bind - Binding Table
// Bound nodes and the (plugin, descriptor) pairs attached to each
// ============================================================================

use std::rc::Rc;

use indexmap::IndexMap;

use super::{BindContext, BindingPlugin, Descriptor};
use crate::dom::{Node, NodeKey};

/// One initialized binding.
pub struct BoundBinding {
    pub plugin: Rc<dyn BindingPlugin>,
    pub descriptor: Descriptor,
}

/// Insertion-ordered table of bound nodes.
///
/// A node can carry several bindings of different kinds; they update in the
/// order they were initialized.
#[derive(Default)]
pub struct BindingTable {
    entries: IndexMap<NodeKey, (Node, Vec<BoundBinding>)>,
}

impl BindingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discover and initialize every registered kind over `root`.
    pub fn collect(root: &Node, cx: &BindContext) -> Self {
        Self::collect_with(root, cx, &cx.registry.plugins())
    }

    /// Discover and initialize the given plugins over `root`, in order.
    pub fn collect_with(root: &Node, cx: &BindContext, plugins: &[Rc<dyn BindingPlugin>]) -> Self {
        let mut table = Self::new();
        for plugin in plugins {
            for target in plugin.discover(root) {
                let descriptor = plugin.initialize(&target, cx);
                table.insert(target, plugin.clone(), descriptor);
            }
        }
        tracing::debug!(
            nodes = table.node_count(),
            bindings = table.len(),
            "collected bindings"
        );
        table
    }

    pub fn insert(&mut self, node: Node, plugin: Rc<dyn BindingPlugin>, descriptor: Descriptor) {
        let (_, bindings) = self
            .entries
            .entry(node.key())
            .or_insert_with(|| (node, Vec::new()));
        bindings.push(BoundBinding { plugin, descriptor });
    }

    /// Run one update pass over every binding.
    pub fn update_all(&mut self, cx: &BindContext) {
        for (node, bindings) in self.entries.values_mut() {
            for binding in bindings.iter_mut() {
                binding.plugin.update(node, cx, &mut binding.descriptor);
            }
        }
    }

    /// Clean up every binding and empty the table.
    pub fn cleanup_all(&mut self) {
        for (_, (node, mut bindings)) in self.entries.drain(..) {
            for binding in bindings.iter_mut() {
                binding.plugin.cleanup(&node, &mut binding.descriptor);
            }
        }
    }

    /// Number of bindings.
    pub fn len(&self) -> usize {
        self.entries.values().map(|(_, bindings)| bindings.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of distinct bound nodes.
    pub fn node_count(&self) -> usize {
        self.entries.len()
    }

    /// Bindings attached to `node`.
    pub fn bindings_for(&self, node: &Node) -> Option<&[BoundBinding]> {
        self.entries
            .get(&node.key())
            .map(|(_, bindings)| bindings.as_slice())
    }

    /// Bound nodes in table order.
    pub fn nodes(&self) -> Vec<Node> {
        self.entries.values().map(|(node, _)| node.clone()).collect()
    }
}

impl std::fmt::Debug for BindingTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindingTable")
            .field("nodes", &self.node_count())
            .field("bindings", &self.len())
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::PluginRegistry;
    use crate::config::BindOptions;
    use crate::dom::parse_html;
    use crate::expr::Evaluator;
    use crate::primitives::scope::reactive;
    use serde_json::json;

    fn context(data: serde_json::Value) -> BindContext {
        BindContext::new(
            reactive(data),
            Rc::new(Evaluator::new()),
            Rc::new(PluginRegistry::standard()),
            Rc::new(BindOptions::default()),
        )
    }

    #[test]
    fn several_kinds_share_one_node() {
        let cx = context(json!({ "v": "x", "on": true }));
        let root = parse_html(r#"<input .value="v" [data-on]="on" on:input="v = 'y'">"#);
        let input = root.first_child().unwrap();

        let mut table = BindingTable::collect(&root, &cx);
        assert_eq!(table.node_count(), 1);
        assert_eq!(table.len(), 3);

        let kinds: Vec<&str> = table
            .bindings_for(&input)
            .unwrap()
            .iter()
            .map(|b| b.plugin.kind())
            .collect();
        assert_eq!(kinds, vec!["property", "event", "attribute"]);

        table.update_all(&cx);
        assert_eq!(input.property("value"), json!("x"));
        assert_eq!(input.get_attribute("data-on").as_deref(), Some("true"));

        table.cleanup_all();
        assert!(table.is_empty());
        assert_eq!(input.listener_count("input"), 0);
    }
}
