//! Grammar extension registry.

use crate::extension::ExtensionDescriptor;

/// Ordered, append-only list of extensions for one compile.
///
/// Registering the same name twice keeps both descriptors; the conflict rule
/// decides which one fires. Descriptors are tried in descending priority,
/// ties in registration order, and the first match wins.
#[derive(Debug, Default, Clone)]
pub struct ExtensionRegistry {
    extensions: Vec<ExtensionDescriptor>,
}

impl ExtensionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one descriptor.
    pub fn register(&mut self, descriptor: ExtensionDescriptor) -> &mut Self {
        tracing::debug!(
            name = descriptor.name(),
            level = ?descriptor.level(),
            priority = descriptor.priority(),
            "Registered extension"
        );
        self.extensions.push(descriptor);
        self
    }

    /// Append several descriptors in order.
    pub fn register_many(
        &mut self,
        descriptors: impl IntoIterator<Item = ExtensionDescriptor>,
    ) -> &mut Self {
        for descriptor in descriptors {
            self.register(descriptor);
        }
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }

    /// Descriptors in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &ExtensionDescriptor> {
        self.extensions.iter()
    }

    /// Descriptors matching `filter`, in dispatch order.
    pub fn dispatch_order(
        &self,
        filter: impl Fn(&ExtensionDescriptor) -> bool,
    ) -> Vec<&ExtensionDescriptor> {
        let mut ordered: Vec<_> = self.extensions.iter().filter(|d| filter(d)).collect();
        // Stable: equal priorities keep registration order.
        ordered.sort_by_key(|d| std::cmp::Reverse(d.priority()));
        ordered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extension::Rendered;
    use crate::token::Level;

    fn descriptor(name: &str, priority: i32) -> ExtensionDescriptor {
        ExtensionDescriptor::new(
            name,
            Level::Inline,
            |_| None,
            |_, _| Ok(None),
            |_, _| Ok(Rendered::Skip),
        )
        .with_priority(priority)
    }

    #[test]
    fn test_register_keeps_duplicates() {
        let mut registry = ExtensionRegistry::new();
        registry.register(descriptor("a", 0)).register(descriptor("a", 0));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_dispatch_order_priority_then_registration() {
        let mut registry = ExtensionRegistry::new();
        registry.register_many([
            descriptor("first", 0),
            descriptor("second", 0),
            descriptor("urgent", 1),
        ]);

        let names: Vec<_> = registry
            .dispatch_order(|_| true)
            .iter()
            .map(|d| d.name())
            .collect();
        assert_eq!(names, vec!["urgent", "first", "second"]);
    }

    #[test]
    fn test_dispatch_order_filter() {
        let mut registry = ExtensionRegistry::new();
        registry.register(descriptor("a", 0)).register(descriptor("b", 0));
        let only_b = registry.dispatch_order(|d| d.name() == "b");
        assert_eq!(only_b.len(), 1);
    }
}
