//! Detached game object description

use glam::Vec2;

use crate::component::GameComponent;

use super::components::ObjectFlags;
use super::transform::Transform2D;

/// A game object and its subtree before it is spawned into a [`World`].
///
/// Transforms given here are local to the eventual parent.
///
/// [`World`]: super::World
pub struct GameObject {
    pub(crate) name: String,
    pub(crate) flags: ObjectFlags,
    pub(crate) transform: Transform2D,
    pub(crate) components: Vec<Box<dyn GameComponent>>,
    pub(crate) children: Vec<GameObject>,
}

impl GameObject {
    /// Create an active, visible, opaque object at the origin
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            flags: ObjectFlags::default(),
            transform: Transform2D::default(),
            components: Vec::new(),
            children: Vec::new(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn transform(&self) -> &Transform2D {
        &self.transform
    }

    /// Replace the whole local transform
    #[must_use]
    pub fn with_transform(mut self, transform: Transform2D) -> Self {
        self.transform = transform;
        self
    }

    #[must_use]
    pub fn with_position(mut self, position: Vec2) -> Self {
        self.transform.position = position;
        self
    }

    #[must_use]
    pub fn with_dimensions(mut self, dimensions: Vec2) -> Self {
        self.transform.dimensions = dimensions;
        self
    }

    #[must_use]
    pub fn with_origin(mut self, origin: Vec2) -> Self {
        self.transform.origin = origin;
        self
    }

    #[must_use]
    pub fn with_rotation(mut self, rotation: f32) -> Self {
        self.transform.rotation = rotation;
        self
    }

    #[must_use]
    pub fn with_scale(mut self, scale: f32) -> Self {
        self.transform.scale = scale;
        self
    }

    #[must_use]
    pub fn with_active(mut self, active: bool) -> Self {
        self.flags.active = active;
        self
    }

    #[must_use]
    pub fn with_visible(mut self, visible: bool) -> Self {
        self.flags.visible = visible;
        self
    }

    /// Set opacity; clamped to `[0, 1]` on spawn
    #[must_use]
    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.flags.alpha = alpha;
        self
    }

    /// Append a component
    #[must_use]
    pub fn with_component(mut self, component: impl GameComponent) -> Self {
        self.components.push(Box::new(component));
        self
    }

    /// Append an already boxed component
    #[must_use]
    pub fn with_boxed_component(mut self, component: Box<dyn GameComponent>) -> Self {
        self.components.push(component);
        self
    }

    /// Append a child
    #[must_use]
    pub fn with_child(mut self, child: GameObject) -> Self {
        self.children.push(child);
        self
    }

    /// Append a child in place
    pub fn push_child(&mut self, child: GameObject) {
        self.children.push(child);
    }

    /// Append a component in place
    pub fn push_component(&mut self, component: Box<dyn GameComponent>) {
        self.components.push(component);
    }
}
