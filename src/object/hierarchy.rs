//! Parent/child links between game objects
//!
//! Both directions are stored as arena components: a child carries a
//! [`Parent`] handle and its parent lists it in [`Children`]. Handles are
//! non-owning, so removing a subtree never leaves a dangling pointer, only a
//! stale handle that lookups reject.

use smallvec::SmallVec;

use super::ObjectId;

/// Parent component - present only on objects that have a parent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parent(pub ObjectId);

impl Parent {
    /// Get the parent object
    #[must_use]
    pub const fn id(&self) -> ObjectId {
        self.0
    }
}

/// Ordered children of an object. Order is dispatch order.
#[derive(Debug, Clone, Default)]
pub struct Children(pub SmallVec<[ObjectId; 8]>);

impl Children {
    /// Create an empty children list
    #[must_use]
    pub fn new() -> Self {
        Self(SmallVec::new())
    }

    /// Append a child, ignoring duplicates
    pub fn add(&mut self, child: ObjectId) {
        if !self.0.contains(&child) {
            self.0.push(child);
        }
    }

    /// Remove a child
    pub fn remove(&mut self, child: ObjectId) -> bool {
        if let Some(pos) = self.0.iter().position(|&e| e == child) {
            self.0.remove(pos);
            true
        } else {
            false
        }
    }

    /// Whether `child` is a direct child
    #[must_use]
    pub fn contains(&self, child: ObjectId) -> bool {
        self.0.contains(&child)
    }

    /// Check if this object has children
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Get the number of children
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate over children
    pub fn iter(&self) -> impl Iterator<Item = &ObjectId> {
        self.0.iter()
    }

    /// Copy the child list, so the tree can be mutated while iterating
    #[must_use]
    pub fn snapshot(&self) -> SmallVec<[ObjectId; 8]> {
        self.0.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_children_add_remove() {
        let mut world = hecs::World::new();
        let a = ObjectId(world.spawn(()));
        let b = ObjectId(world.spawn(()));

        let mut children = Children::new();

        children.add(a);
        children.add(b);
        assert_eq!(children.len(), 2);

        // No duplicates
        children.add(a);
        assert_eq!(children.len(), 2);

        assert!(children.remove(a));
        assert!(!children.remove(a));
        assert_eq!(children.snapshot().as_slice(), &[b]);
    }
}
