//! A 2D scene-graph game engine core
//!
//! This engine provides:
//! - Game object trees with 2D transforms, stored in a hecs arena
//! - Components with awake/load/update/draw lifecycles dispatched depth-first
//! - Reference-counted content loading for textures, atlases, bitmap fonts and
//!   sound effects
//! - Sprites, scrolling sprites, tile grids and text components
//! - Named input actions over a raw control snapshot
//! - Timers, easing curves, frame animation, transform tweens and cameras
//! - Scenes built from RON/JSON documents and swapped behind screen transitions
//!
//! Drawing goes through the [`render::DrawSurface`] trait, so the crate never
//! touches a window or GPU.

pub mod assets;
pub mod component;
pub mod core;
pub mod input;
pub mod object;
pub mod render;
pub mod scene;
pub mod timing;

// Re-exports for convenience
pub use glam;
pub use hecs;

/// Prelude module for common imports
pub mod prelude {
    pub use crate::assets::{
        AssetHandle, ContentError, Services, SharedAtlasLoader, SharedTextureLoader, TextureAtlas,
        TextureFont, TextureFontLoader, TextureFrame, TextureLoader, TextureProvider, lock_loader,
    };
    pub use crate::component::{
        AnimationFrame, Camera, ComponentRegistry, ComponentState, ContentContext, DrawContext,
        FrameAnimation, GameComponent, GameSprite, ObjectTransition, ScrollingSprite,
        SpriteAnimator, TextCentering, TextComponent, Tileset, TransitionDelta, TransitionOptions,
        UpdateContext,
    };
    pub use crate::core::{EngineConfig, Event, EventQueue, FrameClock, FrameTime, SceneEvent};
    pub use crate::input::{Control, InputHandler, InputState};
    pub use crate::object::{
        GameObject, GameObjectCollection, HierarchyError, ObjectId, Transform2D, World,
    };
    pub use crate::render::{Color, DrawCall, DrawSurface, FlipMode, RecordingSurface, Rect};
    pub use crate::scene::{
        FadeEffect, Scene, SceneDocument, SceneError, SceneManager, ScreenTransition,
    };
    pub use crate::timing::{Easing, EasingDirection, EasingFunction, Timer};
    pub use glam::Vec2;
}
