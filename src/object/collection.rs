//! Name index over the objects of a scene

use std::sync::atomic::{AtomicU64, Ordering};

use rustc_hash::{FxHashMap, FxHashSet};

use super::ObjectId;
use super::game_object::GameObject;
use super::world::{HierarchyError, World};

static NEXT_COLLECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies a [`GameObjectCollection`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CollectionId(u64);

impl CollectionId {
    fn next() -> Self {
        Self(NEXT_COLLECTION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Registry of the objects in a scene, indexed by name.
///
/// Names are unique within a collection. Roots are the registered objects
/// without a parent; they are recomputed by [`refresh_roots`] so tree edits
/// made through the [`World`] are picked up before the next dispatch.
///
/// [`refresh_roots`]: GameObjectCollection::refresh_roots
#[derive(Debug)]
pub struct GameObjectCollection {
    id: CollectionId,
    objects: Vec<ObjectId>,
    roots: Vec<ObjectId>,
    by_name: FxHashMap<String, ObjectId>,
}

impl GameObjectCollection {
    /// Create an empty collection
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: CollectionId::next(),
            objects: Vec::new(),
            roots: Vec::new(),
            by_name: FxHashMap::default(),
        }
    }

    #[must_use]
    pub fn id(&self) -> CollectionId {
        self.id
    }

    /// Register an object and every descendant.
    ///
    /// All or nothing: if any name in the subtree is already taken, or
    /// repeats within the subtree, nothing is registered.
    pub fn add_object(
        &mut self,
        world: &mut World,
        object: ObjectId,
    ) -> Result<(), HierarchyError> {
        if !world.contains(object) {
            return Err(HierarchyError::NoSuchObject(object));
        }

        let mut subtree = vec![object];
        subtree.extend(world.descendants(object));

        let mut named = Vec::with_capacity(subtree.len());
        let mut seen = FxHashSet::default();
        for id in subtree {
            let name = world.name(id)?;
            if self.by_name.contains_key(&name) || !seen.insert(name.clone()) {
                return Err(HierarchyError::DuplicateName(name));
            }
            named.push((id, name));
        }

        for (id, name) in named {
            log::debug!("Registered object '{name}' ({id})");
            self.objects.push(id);
            self.by_name.insert(name, id);
            world.set_membership(id, Some(self.id));
            if world.parent(id).is_none() {
                self.roots.push(id);
            }
        }
        Ok(())
    }

    /// Spawn a detached object into `world` and register its subtree.
    ///
    /// On a name clash the spawned objects are removed again.
    pub fn spawn(
        &mut self,
        world: &mut World,
        object: GameObject,
    ) -> Result<ObjectId, HierarchyError> {
        let id = world.spawn(object);
        if let Err(e) = self.add_object(world, id) {
            let _ = world.despawn(id);
            return Err(e);
        }
        Ok(id)
    }

    /// Unregister a single object. Its descendants stay registered and the
    /// object stays in the world.
    pub fn remove_object(
        &mut self,
        world: &mut World,
        object: ObjectId,
    ) -> Result<(), HierarchyError> {
        let Some(index) = self.objects.iter().position(|&o| o == object) else {
            return Err(HierarchyError::NotRegistered(object));
        };
        self.objects.remove(index);
        self.roots.retain(|&r| r != object);
        self.by_name.retain(|_, id| *id != object);
        world.set_membership(object, None);
        log::debug!("Unregistered object {object}");
        Ok(())
    }

    /// Look up a registered object by name
    #[must_use]
    pub fn get_object(&self, name: &str) -> Option<ObjectId> {
        self.by_name.get(name).copied()
    }

    #[must_use]
    pub fn contains(&self, object: ObjectId) -> bool {
        self.objects.contains(&object)
    }

    /// Registered objects in registration order
    #[must_use]
    pub fn objects(&self) -> &[ObjectId] {
        &self.objects
    }

    /// Registered objects without a parent, as of the last refresh
    #[must_use]
    pub fn roots(&self) -> &[ObjectId] {
        &self.roots
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Drop despawned objects and recompute the root list
    pub fn refresh_roots(&mut self, world: &World) {
        let before = self.objects.len();
        self.objects.retain(|&o| world.contains(o));
        if self.objects.len() != before {
            self.by_name.retain(|_, id| world.contains(*id));
            log::debug!("Dropped {} despawned objects", before - self.objects.len());
        }

        self.roots.retain(|&r| world.contains(r) && world.parent(r).is_none());
        for &object in &self.objects {
            if world.parent(object).is_none() && !self.roots.contains(&object) {
                self.roots.push(object);
            }
        }
    }

    /// Forget every object
    pub fn clear(&mut self, world: &mut World) {
        for &object in &self.objects {
            world.set_membership(object, None);
        }
        self.objects.clear();
        self.roots.clear();
        self.by_name.clear();
    }
}

impl Default for GameObjectCollection {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_registers_subtree() {
        let mut world = World::new();
        let mut objects = GameObjectCollection::new();
        let root = objects
            .spawn(
                &mut world,
                GameObject::new("player").with_child(GameObject::new("weapon")),
            )
            .unwrap();

        assert_eq!(objects.len(), 2);
        assert_eq!(objects.roots(), &[root]);
        assert_eq!(objects.get_object("player"), Some(root));
        let weapon = objects.get_object("weapon").unwrap();
        assert_eq!(world.parent(weapon), Some(root));
        assert_eq!(world.membership(weapon), Some(objects.id()));
    }

    #[test]
    fn test_duplicate_name_registers_nothing() {
        let mut world = World::new();
        let mut objects = GameObjectCollection::new();
        objects.spawn(&mut world, GameObject::new("enemy")).unwrap();

        let result = objects.spawn(
            &mut world,
            GameObject::new("squad").with_child(GameObject::new("enemy")),
        );

        assert_eq!(result, Err(HierarchyError::DuplicateName("enemy".to_string())));
        assert_eq!(objects.len(), 1);
        assert_eq!(objects.get_object("squad"), None);
        assert_eq!(world.len(), 1);
    }

    #[test]
    fn test_remove_leaves_descendants() {
        let mut world = World::new();
        let mut objects = GameObjectCollection::new();
        let root = objects
            .spawn(&mut world, GameObject::new("root").with_child(GameObject::new("leaf")))
            .unwrap();

        objects.remove_object(&mut world, root).unwrap();

        assert_eq!(objects.get_object("root"), None);
        assert!(objects.get_object("leaf").is_some());
        assert_eq!(world.membership(root), None);
        assert!(world.contains(root));
        assert_eq!(
            objects.remove_object(&mut world, root),
            Err(HierarchyError::NotRegistered(root))
        );
    }

    #[test]
    fn test_refresh_roots_tracks_tree_edits() {
        let mut world = World::new();
        let mut objects = GameObjectCollection::new();
        let a = objects.spawn(&mut world, GameObject::new("a")).unwrap();
        let b = objects.spawn(&mut world, GameObject::new("b")).unwrap();
        assert_eq!(objects.roots(), &[a, b]);

        world.add_child(a, b).unwrap();
        objects.refresh_roots(&world);
        assert_eq!(objects.roots(), &[a]);

        world.detach(b).unwrap();
        world.despawn(a).unwrap();
        objects.refresh_roots(&world);
        assert_eq!(objects.roots(), &[b]);
        assert_eq!(objects.get_object("a"), None);
    }
}
