//! Scenes, scene documents and scene switching

pub mod document;
pub mod manager;
#[allow(clippy::module_inception)]
pub mod scene;
pub mod transition;

pub use document::{ComponentDocument, ObjectDocument, SceneDocument, SceneError};
pub use manager::{SceneBuild, SceneCreator, SceneManager};
pub use scene::{DEFAULT_VIEWPORT, Scene};
pub use transition::{FadeEffect, ScreenTransition, TransitionEffect, TransitionPhase};
