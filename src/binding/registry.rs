// ============================================================================
// spark-bind - Plugin Registry
// ============================================================================

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use super::attribute::AttributePlugin;
use super::conditional::ConditionalPlugin;
use super::event::EventPlugin;
use super::interpolation::InterpolationPlugin;
use super::list::ListPlugin;
use super::property::PropertyPlugin;
use super::two_way::TwoWayPlugin;
use super::BindingPlugin;

/// Ordered mapping from kind name to plugin.
///
/// The binder runs discovery and initialization in registration order.
#[derive(Clone, Default)]
pub struct PluginRegistry {
    plugins: IndexMap<&'static str, Rc<dyn BindingPlugin>>,
}

impl PluginRegistry {
    /// A registry with no plugins.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in kinds: interpolation, property, event, attribute,
    /// conditional, two-way, list.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register(InterpolationPlugin);
        registry.register(PropertyPlugin);
        registry.register(EventPlugin);
        registry.register(AttributePlugin);
        registry.register(ConditionalPlugin);
        registry.register(TwoWayPlugin);
        registry.register(ListPlugin);
        registry
    }

    /// Add a plugin. A plugin of the same kind is replaced in place and
    /// returned.
    pub fn register<P>(&mut self, plugin: P) -> Option<Rc<dyn BindingPlugin>>
    where
        P: BindingPlugin + 'static,
    {
        self.plugins.insert(plugin.kind(), Rc::new(plugin))
    }

    pub fn unregister(&mut self, kind: &str) -> Option<Rc<dyn BindingPlugin>> {
        self.plugins.shift_remove(kind)
    }

    pub fn get(&self, kind: &str) -> Option<Rc<dyn BindingPlugin>> {
        self.plugins.get(kind).cloned()
    }

    /// Plugins in registration order.
    pub fn plugins(&self) -> Vec<Rc<dyn BindingPlugin>> {
        self.plugins.values().cloned().collect()
    }

    pub fn kinds(&self) -> Vec<&'static str> {
        self.plugins.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.kinds()).finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::{BindContext, Descriptor};
    use crate::dom::Node;

    struct Noop;

    impl BindingPlugin for Noop {
        fn kind(&self) -> &'static str {
            "attribute"
        }
        fn discover(&self, _root: &Node) -> Vec<Node> {
            Vec::new()
        }
        fn initialize(&self, _target: &Node, _cx: &BindContext) -> Descriptor {
            Descriptor::Empty
        }
        fn update(&self, _target: &Node, _cx: &BindContext, _descriptor: &mut Descriptor) {}
    }

    #[test]
    fn standard_order() {
        assert_eq!(
            PluginRegistry::standard().kinds(),
            vec![
                "interpolation",
                "property",
                "event",
                "attribute",
                "conditional",
                "two-way",
                "list"
            ]
        );
    }

    #[test]
    fn replacing_a_kind_keeps_its_position() {
        let mut registry = PluginRegistry::standard();
        assert!(registry.register(Noop).is_some());
        assert_eq!(registry.len(), 7);
        assert_eq!(registry.kinds()[3], "attribute");

        assert!(registry.unregister("list").is_some());
        assert!(registry.get("list").is_none());
        assert_eq!(registry.len(), 6);
    }
}
