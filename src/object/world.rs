//! Arena owning every game object
//!
//! [`World`] wraps a `hecs::World` and enforces the tree rules on top of it:
//! an object has at most one parent, never parents itself or an ancestor, and
//! keeps its global pose when it is reparented.

use std::fmt;

use glam::Vec2;
use smallvec::SmallVec;

use crate::component::GameComponent;

use super::ObjectId;
use super::collection::CollectionId;
use super::components::{ComponentList, Membership, Name, ObjectFlags};
use super::game_object::GameObject;
use super::hierarchy::{Children, Parent};
use super::transform::{Pose2D, Transform2D};

// ============================================================================
// Errors
// ============================================================================

/// Structural errors on the object tree
#[derive(Debug, Clone, PartialEq)]
pub enum HierarchyError {
    /// The handle does not refer to a live object
    NoSuchObject(ObjectId),
    /// An object cannot be its own parent
    SelfParenting(ObjectId),
    /// The child is an ancestor of the requested parent
    CyclicParenting { parent: ObjectId, child: ObjectId },
    /// The child already sits somewhere under the requested parent
    AlreadyDescendant { parent: ObjectId, child: ObjectId },
    /// The object is not a direct child of the given parent
    NotAChild { parent: ObjectId, child: ObjectId },
    /// A collection already holds an object with this name
    DuplicateName(String),
    /// The object is not registered in the collection
    NotRegistered(ObjectId),
    /// Component index past the end of the object's component list
    ComponentIndexOutOfRange { object: ObjectId, index: usize },
}

impl fmt::Display for HierarchyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoSuchObject(id) => write!(f, "No such object: {id}"),
            Self::SelfParenting(id) => write!(f, "Object {id} cannot parent itself"),
            Self::CyclicParenting { parent, child } => {
                write!(f, "Object {child} is an ancestor of {parent}")
            }
            Self::AlreadyDescendant { parent, child } => {
                write!(f, "Object {child} is already a descendant of {parent}")
            }
            Self::NotAChild { parent, child } => {
                write!(f, "Object {child} is not a child of {parent}")
            }
            Self::DuplicateName(name) => write!(f, "Duplicate object name: {name}"),
            Self::NotRegistered(id) => write!(f, "Object {id} is not registered"),
            Self::ComponentIndexOutOfRange { object, index } => {
                write!(f, "Object {object} has no component at index {index}")
            }
        }
    }
}

impl std::error::Error for HierarchyError {}

// ============================================================================
// World
// ============================================================================

/// Arena of game objects and their links
pub struct World {
    inner: hecs::World,
}

impl World {
    /// Create a new empty world
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: hecs::World::new(),
        }
    }

    /// Spawn a game object and its whole subtree.
    ///
    /// Children keep the local transforms they were described with.
    pub fn spawn(&mut self, object: GameObject) -> ObjectId {
        let GameObject {
            name,
            flags,
            transform,
            components,
            children,
        } = object;

        let flags = ObjectFlags {
            alpha: flags.alpha.clamp(0.0, 1.0),
            ..flags
        };
        let id = ObjectId(self.inner.spawn((
            Name(name),
            flags,
            transform,
            Children::new(),
            ComponentList::default(),
        )));

        for component in components {
            self.attach(id, component);
        }
        for child in children {
            let child_id = self.spawn(child);
            self.link(id, child_id);
        }
        id
    }

    /// Remove an object together with its descendants.
    ///
    /// Components are dropped without their unload hooks; unload content
    /// before despawning anything that holds resources.
    pub fn despawn(&mut self, id: ObjectId) -> Result<(), HierarchyError> {
        self.ensure(id)?;
        self.unlink(id);
        let mut doomed = self.descendants(id);
        doomed.push(id);
        for object in doomed {
            // Already checked above; descendants are live by construction
            let _ = self.inner.despawn(object.0);
        }
        Ok(())
    }

    /// Check if an object is alive
    #[must_use]
    pub fn contains(&self, id: ObjectId) -> bool {
        self.inner.contains(id.0)
    }

    /// Get the number of live objects
    #[must_use]
    pub fn len(&self) -> u32 {
        self.inner.len()
    }

    /// Check if the world is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Remove every object
    pub fn clear(&mut self) {
        self.inner.clear();
    }

    fn ensure(&self, id: ObjectId) -> Result<(), HierarchyError> {
        if self.contains(id) {
            Ok(())
        } else {
            Err(HierarchyError::NoSuchObject(id))
        }
    }

    // ------------------------------------------------------------------------
    // Attributes
    // ------------------------------------------------------------------------

    /// Get an object's name
    pub fn name(&self, id: ObjectId) -> Result<String, HierarchyError> {
        self.inner
            .get::<&Name>(id.0)
            .map(|name| name.0.clone())
            .map_err(|_| HierarchyError::NoSuchObject(id))
    }

    /// Find the first live object with the given name, in arena order
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<ObjectId> {
        self.inner
            .query::<&Name>()
            .iter()
            .find(|(_, n)| n.as_str() == name)
            .map(|(entity, _)| ObjectId(entity))
    }

    /// Get an object's flags
    pub fn flags(&self, id: ObjectId) -> Result<ObjectFlags, HierarchyError> {
        self.inner
            .get::<&ObjectFlags>(id.0)
            .map(|flags| *flags)
            .map_err(|_| HierarchyError::NoSuchObject(id))
    }

    fn flags_mut(&mut self, id: ObjectId) -> Result<hecs::RefMut<'_, ObjectFlags>, HierarchyError> {
        self.inner
            .get::<&mut ObjectFlags>(id.0)
            .map_err(|_| HierarchyError::NoSuchObject(id))
    }

    /// Enable or disable updates for an object and its subtree
    pub fn set_active(&mut self, id: ObjectId, active: bool) -> Result<(), HierarchyError> {
        self.flags_mut(id)?.active = active;
        Ok(())
    }

    /// Show or hide an object and its subtree
    pub fn set_visible(&mut self, id: ObjectId, visible: bool) -> Result<(), HierarchyError> {
        self.flags_mut(id)?.visible = visible;
        Ok(())
    }

    /// Set an object's opacity, clamped to `[0, 1]`
    pub fn set_alpha(&mut self, id: ObjectId, alpha: f32) -> Result<(), HierarchyError> {
        self.flags_mut(id)?.alpha = alpha.clamp(0.0, 1.0);
        Ok(())
    }

    /// Get a copy of an object's local transform
    pub fn transform(&self, id: ObjectId) -> Result<Transform2D, HierarchyError> {
        self.inner
            .get::<&Transform2D>(id.0)
            .map(|t| *t)
            .map_err(|_| HierarchyError::NoSuchObject(id))
    }

    /// Borrow an object's local transform mutably
    pub fn transform_mut(
        &mut self,
        id: ObjectId,
    ) -> Result<hecs::RefMut<'_, Transform2D>, HierarchyError> {
        self.inner
            .get::<&mut Transform2D>(id.0)
            .map_err(|_| HierarchyError::NoSuchObject(id))
    }

    /// Collection the object is registered in, if any
    #[must_use]
    pub fn membership(&self, id: ObjectId) -> Option<CollectionId> {
        self.inner.get::<&Membership>(id.0).ok().map(|m| m.0)
    }

    pub(crate) fn set_membership(&mut self, id: ObjectId, collection: Option<CollectionId>) {
        match collection {
            Some(collection) => {
                let _ = self.inner.insert_one(id.0, Membership(collection));
            }
            None => {
                let _ = self.inner.remove_one::<Membership>(id.0);
            }
        }
    }

    // ------------------------------------------------------------------------
    // Tree
    // ------------------------------------------------------------------------

    /// Get an object's parent
    #[must_use]
    pub fn parent(&self, id: ObjectId) -> Option<ObjectId> {
        self.inner.get::<&Parent>(id.0).ok().map(|p| p.id())
    }

    /// Get a snapshot of an object's children, in order
    #[must_use]
    pub fn children(&self, id: ObjectId) -> SmallVec<[ObjectId; 8]> {
        self.inner
            .get::<&Children>(id.0)
            .map(|children| children.snapshot())
            .unwrap_or_default()
    }

    /// Every descendant of an object, depth first in child order
    #[must_use]
    pub fn descendants(&self, id: ObjectId) -> Vec<ObjectId> {
        let mut out = Vec::new();
        let mut stack: Vec<ObjectId> = self.children(id).into_iter().rev().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).into_iter().rev());
        }
        out
    }

    /// Whether `ancestor` appears on the parent chain of `id`
    #[must_use]
    pub fn is_ancestor(&self, ancestor: ObjectId, id: ObjectId) -> bool {
        let mut current = self.parent(id);
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            current = self.parent(parent);
        }
        false
    }

    /// Whether `descendant` sits anywhere under `id`
    #[must_use]
    pub fn has_descendant(&self, id: ObjectId, descendant: ObjectId) -> bool {
        self.is_ancestor(id, descendant)
    }

    /// Topmost ancestor of an object, or the object itself
    #[must_use]
    pub fn root_of(&self, id: ObjectId) -> ObjectId {
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            current = parent;
        }
        current
    }

    fn link(&mut self, parent: ObjectId, child: ObjectId) {
        let _ = self.inner.insert_one(child.0, Parent(parent));
        if let Ok(mut children) = self.inner.get::<&mut Children>(parent.0) {
            children.add(child);
        }
    }

    fn unlink(&mut self, child: ObjectId) -> Option<ObjectId> {
        let parent = self.inner.remove_one::<Parent>(child.0).ok()?.id();
        if let Ok(mut children) = self.inner.get::<&mut Children>(parent.0) {
            children.remove(child);
        }
        Some(parent)
    }

    /// Attach `child` under `parent`, preserving the child's global pose.
    ///
    /// A child that already has another parent is moved. Fails when the link
    /// would create a cycle or the child is already inside `parent`'s subtree.
    pub fn add_child(&mut self, parent: ObjectId, child: ObjectId) -> Result<(), HierarchyError> {
        self.ensure(parent)?;
        self.ensure(child)?;
        if parent == child {
            return Err(HierarchyError::SelfParenting(child));
        }
        if self.is_ancestor(child, parent) {
            return Err(HierarchyError::CyclicParenting { parent, child });
        }
        if self.is_ancestor(parent, child) {
            return Err(HierarchyError::AlreadyDescendant { parent, child });
        }

        let pose = self.global_pose(child)?;
        let parent_pose = self.global_pose(parent)?;
        self.unlink(child);
        self.link(parent, child);
        self.transform_mut(child)?
            .solve_from_global(&pose, Some(&parent_pose));

        log::trace!("Attached {child} under {parent}");
        Ok(())
    }

    /// Detach a direct child, making it a root with the same global pose
    pub fn remove_child(
        &mut self,
        parent: ObjectId,
        child: ObjectId,
    ) -> Result<(), HierarchyError> {
        self.ensure(parent)?;
        self.ensure(child)?;
        if self.parent(child) != Some(parent) {
            return Err(HierarchyError::NotAChild { parent, child });
        }
        self.detach(child)
    }

    /// Detach an object from its parent, if it has one, keeping its global pose
    pub fn detach(&mut self, id: ObjectId) -> Result<(), HierarchyError> {
        let pose = self.global_pose(id)?;
        if self.unlink(id).is_some() {
            self.transform_mut(id)?.solve_from_global(&pose, None);
            log::trace!("Detached {id}");
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Global pose
    // ------------------------------------------------------------------------

    /// Compose the local transforms from the root down to `id`
    pub fn global_pose(&self, id: ObjectId) -> Result<Pose2D, HierarchyError> {
        let mut chain: SmallVec<[Transform2D; 8]> = SmallVec::new();
        let mut current = Some(id);
        while let Some(object) = current {
            chain.push(self.transform(object)?);
            current = self.parent(object);
        }

        let mut pose: Option<Pose2D> = None;
        for transform in chain.iter().rev() {
            pose = Some(transform.compose(pose.as_ref()));
        }
        pose.ok_or(HierarchyError::NoSuchObject(id))
    }

    fn parent_pose(&self, id: ObjectId) -> Result<Option<Pose2D>, HierarchyError> {
        self.parent(id).map(|p| self.global_pose(p)).transpose()
    }

    fn set_global(
        &mut self,
        id: ObjectId,
        edit: impl FnOnce(&mut Pose2D),
    ) -> Result<(), HierarchyError> {
        let mut pose = self.global_pose(id)?;
        let parent = self.parent_pose(id)?;
        edit(&mut pose);
        self.transform_mut(id)?
            .solve_from_global(&pose, parent.as_ref());
        Ok(())
    }

    /// Global position of an object
    pub fn global_position(&self, id: ObjectId) -> Result<Vec2, HierarchyError> {
        Ok(self.global_pose(id)?.position)
    }

    /// Move an object so its global position becomes `position`
    pub fn set_global_position(
        &mut self,
        id: ObjectId,
        position: Vec2,
    ) -> Result<(), HierarchyError> {
        self.set_global(id, |pose| pose.position = position)
    }

    /// Rotate an object so its global rotation becomes `rotation`
    pub fn set_global_rotation(
        &mut self,
        id: ObjectId,
        rotation: f32,
    ) -> Result<(), HierarchyError> {
        self.set_global(id, |pose| pose.rotation = rotation)
    }

    /// Scale an object so its global scale becomes `scale`
    pub fn set_global_scale(&mut self, id: ObjectId, scale: f32) -> Result<(), HierarchyError> {
        self.set_global(id, |pose| {
            if pose.scale != 0.0 {
                let ratio = scale / pose.scale;
                pose.dimensions *= ratio;
                pose.origin *= ratio;
            }
            pose.scale = scale;
        })
    }

    /// Resize an object so its scaled dimensions become `dimensions`. Has no
    /// effect at a global scale of zero.
    pub fn set_global_dimensions(
        &mut self,
        id: ObjectId,
        dimensions: Vec2,
    ) -> Result<(), HierarchyError> {
        self.set_global(id, |pose| pose.dimensions = dimensions)
    }

    /// Move the pivot so its scaled offset becomes `origin`. Has no effect at
    /// a global scale of zero.
    pub fn set_global_origin(&mut self, id: ObjectId, origin: Vec2) -> Result<(), HierarchyError> {
        self.set_global(id, |pose| pose.origin = origin)
    }

    // ------------------------------------------------------------------------
    // Components
    // ------------------------------------------------------------------------

    fn attach(&mut self, id: ObjectId, mut component: Box<dyn GameComponent>) -> usize {
        component.state_mut().set_owner(Some(id));
        match self.inner.get::<&mut ComponentList>(id.0) {
            Ok(mut list) => {
                list.0.push(component);
                list.0.len() - 1
            }
            Err(_) => 0,
        }
    }

    /// Append a component and make the object its owner. Returns its index.
    pub fn add_component(
        &mut self,
        id: ObjectId,
        component: Box<dyn GameComponent>,
    ) -> Result<usize, HierarchyError> {
        self.ensure(id)?;
        Ok(self.attach(id, component))
    }

    /// Remove a component by index, clearing its owner
    pub fn remove_component(
        &mut self,
        id: ObjectId,
        index: usize,
    ) -> Result<Box<dyn GameComponent>, HierarchyError> {
        let mut list = self
            .inner
            .get::<&mut ComponentList>(id.0)
            .map_err(|_| HierarchyError::NoSuchObject(id))?;
        if index >= list.0.len() {
            return Err(HierarchyError::ComponentIndexOutOfRange { object: id, index });
        }
        let mut component = list.0.remove(index);
        component.state_mut().set_owner(None);
        Ok(component)
    }

    /// Move a component from one object to another. Returns the new index.
    pub fn transfer_component(
        &mut self,
        from: ObjectId,
        index: usize,
        to: ObjectId,
    ) -> Result<usize, HierarchyError> {
        self.ensure(to)?;
        let component = self.remove_component(from, index)?;
        Ok(self.attach(to, component))
    }

    /// Number of components on an object
    #[must_use]
    pub fn component_count(&self, id: ObjectId) -> usize {
        self.inner
            .get::<&ComponentList>(id.0)
            .map(|list| list.0.len())
            .unwrap_or(0)
    }

    /// Index of the first component of type `T`
    #[must_use]
    pub fn component_index<T: GameComponent>(&self, id: ObjectId) -> Option<usize> {
        let list = self.inner.get::<&ComponentList>(id.0).ok()?;
        list.0.iter().position(|c| c.is::<T>())
    }

    /// Run `f` against the first component of type `T`
    pub fn with_component<T: GameComponent, R>(
        &self,
        id: ObjectId,
        f: impl FnOnce(&T) -> R,
    ) -> Option<R> {
        let list = self.inner.get::<&ComponentList>(id.0).ok()?;
        list.0.iter().find_map(|c| c.downcast_ref::<T>()).map(f)
    }

    /// Run `f` against the first component of type `T`, mutably
    pub fn with_component_mut<T: GameComponent, R>(
        &mut self,
        id: ObjectId,
        f: impl FnOnce(&mut T) -> R,
    ) -> Option<R> {
        let mut list = self.inner.get::<&mut ComponentList>(id.0).ok()?;
        list.0.iter_mut().find_map(|c| c.downcast_mut::<T>()).map(f)
    }

    /// Take the component list out so components can borrow the world
    pub(crate) fn take_components(&mut self, id: ObjectId) -> Option<Vec<Box<dyn GameComponent>>> {
        let mut list = self.inner.get::<&mut ComponentList>(id.0).ok()?;
        Some(std::mem::take(&mut list.0))
    }

    /// Put a taken list back, keeping anything added in the meantime after it
    pub(crate) fn restore_components(
        &mut self,
        id: ObjectId,
        components: Vec<Box<dyn GameComponent>>,
    ) {
        match self.inner.get::<&mut ComponentList>(id.0) {
            Ok(mut list) => {
                let added = std::mem::replace(&mut list.0, components);
                list.0.extend(added);
            }
            Err(_) => {
                log::debug!(
                    "Object {id} was removed during dispatch, dropping {} components",
                    components.len()
                );
            }
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("World").field("objects", &self.len()).finish()
    }
}
