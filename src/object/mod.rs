//! Scene graph of game objects
//!
//! Game objects live in a [`World`] arena built on top of the hecs ECS
//! library. Each object is an arena entry carrying a name, flags, a local
//! [`Transform2D`], an ordered component list and parent/child links.
//! [`GameObject`] is the owned, detached description of a subtree that gets
//! spawned into a world.

mod collection;
mod components;
mod dispatch;
mod game_object;
mod hierarchy;
mod transform;
mod world;

use std::fmt;

pub use collection::{CollectionId, GameObjectCollection};
pub use components::{ComponentList, Membership, Name, ObjectFlags};
pub use dispatch::{ContentPhase, DrawPhase, DrawTarget, UpdatePhase};
pub use game_object::GameObject;
pub use hierarchy::{Children, Parent};
pub use transform::{Pose2D, Transform2D, rotate, rotate_about};
pub use world::{HierarchyError, World};

/// Handle to a game object stored in a [`World`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub hecs::Entity);

impl ObjectId {
    /// Get the underlying arena entity
    #[must_use]
    pub const fn entity(&self) -> hecs::Entity {
        self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0.id())
    }
}
