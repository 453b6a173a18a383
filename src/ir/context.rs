use super::{Context, NodeId};
use indexmap::IndexMap;

impl Context {
    pub fn new(scope: Option<NodeId>) -> Self {
        Self {
            scope,
            children: IndexMap::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<NodeId> {
        self.children.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.children.contains_key(name)
    }

    /// Insert or overwrite a binding. Ownership of the child is managed by
    /// the arena helpers, not here.
    pub fn insert(&mut self, name: String, child: NodeId) {
        self.children.insert(name, child);
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Bindings in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, NodeId)> {
        self.children.iter().map(|(name, id)| (name.as_str(), *id))
    }

    /// Bound children in insertion order.
    pub fn values(&self) -> Vec<NodeId> {
        self.children.values().copied().collect()
    }
}
