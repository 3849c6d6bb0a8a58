//! Scene serialization and deserialization
//!
//! Supports saving and loading scene documents in RON (Rusty Object Notation)
//! and JSON. A document is a list of object trees; components are described
//! by a type tag and free-form parameters resolved through a
//! [`ComponentRegistry`].

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::assets::ContentError;
use crate::component::ComponentRegistry;
use crate::object::{GameObject, GameObjectCollection, HierarchyError, ObjectId, Transform2D, World};

/// One component in a scene document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentDocument {
    /// Registry tag of the component type
    #[serde(rename = "type")]
    pub type_name: String,
    /// Factory parameters
    #[serde(default)]
    pub params: Value,
    #[serde(default = "yes")]
    pub active: bool,
    #[serde(default = "yes")]
    pub visible: bool,
    #[serde(default = "opaque")]
    pub alpha: f32,
}

impl ComponentDocument {
    pub fn new(type_name: impl Into<String>, params: Value) -> Self {
        Self {
            type_name: type_name.into(),
            params,
            active: true,
            visible: true,
            alpha: 1.0,
        }
    }
}

fn yes() -> bool {
    true
}

fn opaque() -> f32 {
    1.0
}

/// One game object and its subtree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectDocument {
    pub name: String,
    #[serde(default = "yes")]
    pub active: bool,
    #[serde(default = "yes")]
    pub visible: bool,
    #[serde(default = "opaque")]
    pub alpha: f32,
    #[serde(default)]
    pub transform: Transform2D,
    #[serde(default)]
    pub components: Vec<ComponentDocument>,
    #[serde(default)]
    pub children: Vec<ObjectDocument>,
}

impl ObjectDocument {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            active: true,
            visible: true,
            alpha: 1.0,
            transform: Transform2D::default(),
            components: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Build the object tree, constructing components through `registry`
    pub fn build(&self, registry: &ComponentRegistry) -> Result<GameObject, SceneError> {
        let mut object = GameObject::new(self.name.clone())
            .with_transform(self.transform)
            .with_active(self.active)
            .with_visible(self.visible)
            .with_alpha(self.alpha);

        for doc in &self.components {
            let mut component = registry.create(&doc.type_name, &doc.params)?;
            let state = component.state_mut();
            state.active = doc.active;
            state.visible = doc.visible;
            state.alpha = doc.alpha.clamp(0.0, 1.0);
            object.push_component(component);
        }
        for child in &self.children {
            object.push_child(child.build(registry)?);
        }
        Ok(object)
    }

    /// Number of objects in this subtree, itself included
    #[must_use]
    pub fn object_count(&self) -> usize {
        1 + self.children.iter().map(Self::object_count).sum::<usize>()
    }
}

/// A serializable scene containing object trees
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneDocument {
    /// Scene name
    pub name: String,
    /// Scene version for compatibility
    #[serde(default = "first_version")]
    pub version: u32,
    /// Root objects
    #[serde(default)]
    pub objects: Vec<ObjectDocument>,
}

fn first_version() -> u32 {
    1
}

impl SceneDocument {
    /// Create a new empty scene document
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: 1,
            objects: Vec::new(),
        }
    }

    /// Add a root object, returning its index
    pub fn add_object(&mut self, object: ObjectDocument) -> usize {
        let index = self.objects.len();
        self.objects.push(object);
        index
    }

    /// Parse a RON document
    pub fn from_ron_str(source: &str) -> Result<Self, SceneError> {
        ron::from_str(source).map_err(|e| SceneError::Deserialize(e.to_string()))
    }

    /// Parse a JSON document
    pub fn from_json_str(source: &str) -> Result<Self, SceneError> {
        serde_json::from_str(source).map_err(|e| SceneError::Deserialize(e.to_string()))
    }

    /// Save the scene to a RON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or serialization fails
    pub fn save_ron(&self, path: impl AsRef<Path>) -> Result<(), SceneError> {
        let ron_string = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| SceneError::Serialize(e.to_string()))?;
        fs::write(path, ron_string).map_err(|e| SceneError::Io(e.to_string()))?;
        Ok(())
    }

    /// Load a scene from a RON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or deserialization fails
    pub fn load_ron(path: impl AsRef<Path>) -> Result<Self, SceneError> {
        let content = fs::read_to_string(path).map_err(|e| SceneError::Io(e.to_string()))?;
        Self::from_ron_str(&content)
    }

    /// Save the scene to a JSON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or serialization fails
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<(), SceneError> {
        let json_string =
            serde_json::to_string_pretty(self).map_err(|e| SceneError::Serialize(e.to_string()))?;
        fs::write(path, json_string).map_err(|e| SceneError::Io(e.to_string()))?;
        Ok(())
    }

    /// Load a scene from a JSON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or deserialization fails
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, SceneError> {
        let content = fs::read_to_string(path).map_err(|e| SceneError::Io(e.to_string()))?;
        Self::from_json_str(&content)
    }

    /// Spawn every object tree into `world` and register it with `collection`.
    ///
    /// Components are all built before anything is spawned, so an unknown
    /// component type leaves the world untouched.
    pub fn instantiate(
        &self,
        registry: &ComponentRegistry,
        world: &mut World,
        collection: &mut GameObjectCollection,
    ) -> Result<Vec<ObjectId>, SceneError> {
        let objects = self
            .objects
            .iter()
            .map(|doc| doc.build(registry))
            .collect::<Result<Vec<_>, _>>()?;

        let mut roots = Vec::with_capacity(objects.len());
        for object in objects {
            roots.push(collection.spawn(world, object)?);
        }
        log::debug!("Instantiated scene '{}' with {} roots", self.name, roots.len());
        Ok(roots)
    }

    /// Get the number of objects, descendants included
    #[must_use]
    pub fn object_count(&self) -> usize {
        self.objects.iter().map(ObjectDocument::object_count).sum()
    }

    /// Check if the scene is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl Default for SceneDocument {
    fn default() -> Self {
        Self::new("Untitled")
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Errors that can occur while loading, building or switching scenes
#[derive(Debug, Clone, PartialEq)]
pub enum SceneError {
    /// IO error
    Io(String),
    /// Serialization error
    Serialize(String),
    /// Deserialization error
    Deserialize(String),
    /// No factory registered for a component tag
    UnknownComponentType(String),
    /// A factory rejected its parameters
    InvalidComponent { type_name: String, reason: String },
    /// No creator registered for a scene key
    UnknownScene(String),
    /// A scene change was requested while another was still running
    ChangeInProgress(String),
    /// Building the object tree failed
    Hierarchy(HierarchyError),
    /// Loading scene content failed
    Content(ContentError),
    /// The background scene builder panicked
    WorkerPanicked,
    /// Services were handed to a builder that has not returned them yet
    ServicesUnavailable,
}

impl std::fmt::Display for SceneError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "IO error: {e}"),
            Self::Serialize(e) => write!(f, "Serialization error: {e}"),
            Self::Deserialize(e) => write!(f, "Deserialization error: {e}"),
            Self::UnknownComponentType(name) => write!(f, "Unknown component type '{name}'"),
            Self::InvalidComponent { type_name, reason } => {
                write!(f, "Invalid parameters for {type_name}: {reason}")
            }
            Self::UnknownScene(key) => write!(f, "No scene registered as '{key}'"),
            Self::ChangeInProgress(key) => write!(f, "Already changing to scene '{key}'"),
            Self::Hierarchy(e) => write!(f, "Hierarchy error: {e}"),
            Self::Content(e) => write!(f, "Content error: {e}"),
            Self::WorkerPanicked => write!(f, "Scene builder thread panicked"),
            Self::ServicesUnavailable => write!(f, "Services are in use by a scene builder"),
        }
    }
}

impl std::error::Error for SceneError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Hierarchy(e) => Some(e),
            Self::Content(e) => Some(e),
            _ => None,
        }
    }
}

impl From<HierarchyError> for SceneError {
    fn from(e: HierarchyError) -> Self {
        Self::Hierarchy(e)
    }
}

impl From<ContentError> for SceneError {
    fn from(e: ContentError) -> Self {
        Self::Content(e)
    }
}
