//! Per-object arena components

use std::fmt;

use crate::component::GameComponent;

use super::collection::CollectionId;

/// Name of a game object, unique within the collection it is registered in
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Name(pub String);

impl Name {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Activity, visibility and opacity of a game object
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjectFlags {
    /// Inactive objects skip the update phases, with their whole subtree
    pub active: bool,
    /// Invisible objects skip the draw phases, with their whole subtree
    pub visible: bool,
    /// Opacity in `[0, 1]`, multiplied down the tree while drawing
    pub alpha: f32,
}

impl Default for ObjectFlags {
    fn default() -> Self {
        Self {
            active: true,
            visible: true,
            alpha: 1.0,
        }
    }
}

/// Behaviour units attached to an object, in dispatch order
#[derive(Default)]
pub struct ComponentList(pub Vec<Box<dyn GameComponent>>);

impl fmt::Debug for ComponentList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.0.iter().map(|c| c.type_name()))
            .finish()
    }
}

/// Back-reference to the collection an object is registered in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Membership(pub CollectionId);
