//! Game components: units of behaviour attached to game objects
//!
//! A component implements [`GameComponent`] and overrides the lifecycle hooks
//! it cares about. During dispatch the owning object's component list is
//! taken out of the world, so every hook receives the world itself plus its
//! [`Siblings`] on the same object through a context:
//!
//! | Hooks                                   | Context              |
//! |-----------------------------------------|----------------------|
//! | `awake`, `sleep`, `load_content`, `unload_content` | [`ContentContext`] |
//! | `early_update`, `update`, `late_update` | [`UpdateContext`]    |
//! | `early_draw`, `draw`, `late_draw`       | [`DrawContext`]      |

pub mod animator;
pub mod camera;
pub mod registry;
pub mod scrolling;
pub mod sprite;
pub mod text;
pub mod tileset;
pub mod transition;

use std::any::Any;

use glam::Vec2;

use crate::assets::{ContentError, Services};
use crate::core::events::EventQueue;
use crate::core::time::FrameTime;
use crate::object::{ObjectId, World};
use crate::render::{DrawSurface, Rect};

pub use animator::{
    AnimationFrame, AnimationProgress, FrameAnimation, FrameAnimator, SpriteAnimator,
};
pub use camera::Camera;
pub use registry::{ComponentFactory, ComponentRegistry};
pub use scrolling::ScrollingSprite;
pub use sprite::GameSprite;
pub use text::{TextCentering, TextComponent};
pub use tileset::Tileset;
pub use transition::{ObjectTransition, TransitionDelta, TransitionOptions, TransitionState};

// ============================================================================
// Component State
// ============================================================================

/// Flags and bookkeeping every component carries
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentState {
    owner: Option<ObjectId>,
    /// Inactive components skip the update hooks
    pub active: bool,
    /// Invisible components skip the draw hooks
    pub visible: bool,
    /// Opacity multiplied into the alpha handed to draw hooks
    pub alpha: f32,
    /// Resource keys this component loads
    pub content_paths: Vec<String>,
}

impl Default for ComponentState {
    fn default() -> Self {
        Self {
            owner: None,
            active: true,
            visible: true,
            alpha: 1.0,
            content_paths: Vec::new(),
        }
    }
}

impl ComponentState {
    /// Object this component is attached to
    #[must_use]
    pub fn owner(&self) -> Option<ObjectId> {
        self.owner
    }

    pub(crate) fn set_owner(&mut self, owner: Option<ObjectId>) {
        self.owner = owner;
    }

    /// Set the resource keys
    #[must_use]
    pub fn with_content_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.content_paths = paths.into_iter().map(Into::into).collect();
        self
    }
}

// ============================================================================
// Trait
// ============================================================================

/// Behaviour attached to a game object.
///
/// Every hook defaults to a no-op.
pub trait GameComponent: Any + Send + Sync {
    /// Stable name used in logs and scene documents
    fn type_name(&self) -> &'static str;

    fn state(&self) -> &ComponentState;

    fn state_mut(&mut self) -> &mut ComponentState;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Called when the scene wakes up, after content is loaded
    fn awake(&mut self, _ctx: &mut ContentContext<'_>) {}

    /// Called when the scene goes to sleep, after content is unloaded
    fn sleep(&mut self, _ctx: &mut ContentContext<'_>) {}

    /// Acquire resources
    fn load_content(&mut self, _ctx: &mut ContentContext<'_>) -> Result<(), ContentError> {
        Ok(())
    }

    /// Release resources acquired in `load_content`
    fn unload_content(&mut self, _ctx: &mut ContentContext<'_>) -> Result<(), ContentError> {
        Ok(())
    }

    fn early_update(&mut self, _ctx: &mut UpdateContext<'_>) {}

    fn update(&mut self, _ctx: &mut UpdateContext<'_>) {}

    fn late_update(&mut self, _ctx: &mut UpdateContext<'_>) {}

    fn early_draw(&mut self, _ctx: &mut DrawContext<'_>) {}

    fn draw(&mut self, _ctx: &mut DrawContext<'_>) {}

    fn late_draw(&mut self, _ctx: &mut DrawContext<'_>) {}
}

impl dyn GameComponent {
    /// Whether the component is a `T`
    #[must_use]
    pub fn is<T: GameComponent>(&self) -> bool {
        self.as_any().is::<T>()
    }

    #[must_use]
    pub fn downcast_ref<T: GameComponent>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn downcast_mut<T: GameComponent>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }
}

// ============================================================================
// Contexts
// ============================================================================

/// The other components on the object being dispatched
pub struct Siblings<'a> {
    before: &'a mut [Box<dyn GameComponent>],
    after: &'a mut [Box<dyn GameComponent>],
}

impl<'a> Siblings<'a> {
    /// Components before and after the one being dispatched
    pub fn new(
        before: &'a mut [Box<dyn GameComponent>],
        after: &'a mut [Box<dyn GameComponent>],
    ) -> Self {
        Self { before, after }
    }

    /// No siblings
    #[must_use]
    pub fn empty() -> Self {
        Self {
            before: &mut [],
            after: &mut [],
        }
    }

    /// First sibling of type `T`, in list order
    #[must_use]
    pub fn get<T: GameComponent>(&self) -> Option<&T> {
        self.before
            .iter()
            .chain(self.after.iter())
            .find_map(|c| c.downcast_ref::<T>())
    }

    /// First sibling of type `T`, mutably
    pub fn get_mut<T: GameComponent>(&mut self) -> Option<&mut T> {
        self.before
            .iter_mut()
            .chain(self.after.iter_mut())
            .find_map(|c| c.downcast_mut::<T>())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.before.len() + self.after.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Handed to the update hooks
pub struct UpdateContext<'a> {
    pub world: &'a mut World,
    /// Object the component is attached to
    pub object: ObjectId,
    pub siblings: Siblings<'a>,
    /// Scene-level requests, read by the scene manager after the frame
    pub events: &'a mut EventQueue,
    pub time: FrameTime,
}

/// Handed to the draw hooks
pub struct DrawContext<'a> {
    pub world: &'a World,
    /// Object the component is attached to
    pub object: ObjectId,
    pub siblings: Siblings<'a>,
    pub surface: &'a mut dyn DrawSurface,
    /// Visible world rectangle
    pub camera: Rect,
    /// Screen offset added after the camera transform
    pub offset: Vec2,
    /// World units to screen pixels
    pub viewport_scale: f32,
    /// Accumulated opacity, already multiplied by the component's own alpha
    pub alpha: f32,
}

impl DrawContext<'_> {
    /// Map a world position to screen space
    #[must_use]
    pub fn to_screen(&self, world: Vec2) -> Vec2 {
        (world - self.camera.position()) * self.viewport_scale + self.offset
    }
}

/// Handed to the lifecycle and content hooks
pub struct ContentContext<'a> {
    pub world: &'a mut World,
    /// Object the component is attached to
    pub object: ObjectId,
    pub siblings: Siblings<'a>,
    pub services: &'a mut Services,
}
