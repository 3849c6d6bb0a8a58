//! String-keyed component factories
//!
//! Scene documents name components by type tag and carry their settings as a
//! free-form parameter value. The registry maps each tag to a constructor so
//! games can add their own components without touching scene loading.

use glam::Vec2;
use rustc_hash::FxHashMap;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::render::{Color, FlipMode};
use crate::scene::SceneError;
use crate::timing::Easing;

use super::animator::{FrameAnimation, SpriteAnimator};
use super::camera::{Camera, DEFAULT_TWEEN_MS};
use super::scrolling::ScrollingSprite;
use super::sprite::GameSprite;
use super::text::{TextCentering, TextComponent};
use super::tileset::Tileset;
use super::transition::{ObjectTransition, TransitionDelta, TransitionOptions};
use super::GameComponent;

/// Builds a component from its document parameters
pub type ComponentFactory = fn(&Value) -> Result<Box<dyn GameComponent>, SceneError>;

/// Table of component factories keyed by type tag
#[derive(Debug, Clone, Default)]
pub struct ComponentRegistry {
    factories: FxHashMap<String, ComponentFactory>,
}

impl ComponentRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in components
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("GameSprite", sprite_factory);
        registry.register("SpriteAnimator", animator_factory);
        registry.register("ObjectTransition", transition_factory);
        registry.register("Camera", camera_factory);
        registry.register("ScrollingSprite", scrolling_factory);
        registry.register("TextComponent", text_factory);
        registry.register("Tileset", tileset_factory);
        registry
    }

    /// Add or replace a factory, returning the one it replaces
    pub fn register(
        &mut self,
        type_name: impl Into<String>,
        factory: ComponentFactory,
    ) -> Option<ComponentFactory> {
        self.factories.insert(type_name.into(), factory)
    }

    /// Build a component of the named type
    pub fn create(
        &self,
        type_name: &str,
        params: &Value,
    ) -> Result<Box<dyn GameComponent>, SceneError> {
        let factory = self
            .factories
            .get(type_name)
            .ok_or_else(|| SceneError::UnknownComponentType(type_name.to_string()))?;
        factory(params)
    }

    #[must_use]
    pub fn contains(&self, type_name: &str) -> bool {
        self.factories.contains_key(type_name)
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

/// Decode factory parameters; a missing value reads as an empty map
pub fn parse_params<T: DeserializeOwned>(type_name: &str, params: &Value) -> Result<T, SceneError> {
    let value = match params {
        Value::Null => Value::Object(serde_json::Map::new()),
        other => other.clone(),
    };
    serde_json::from_value(value).map_err(|e| SceneError::InvalidComponent {
        type_name: type_name.to_string(),
        reason: e.to_string(),
    })
}

// ============================================================================
// Built-in factories
// ============================================================================

#[derive(Deserialize)]
#[serde(default)]
struct SpriteParams {
    atlas: Option<String>,
    frame: usize,
    tint: Color,
    depth: f32,
    flip: FlipMode,
}

impl Default for SpriteParams {
    fn default() -> Self {
        Self {
            atlas: None,
            frame: 0,
            tint: Color::WHITE,
            depth: 0.0,
            flip: FlipMode::None,
        }
    }
}

fn sprite_factory(params: &Value) -> Result<Box<dyn GameComponent>, SceneError> {
    let p: SpriteParams = parse_params("GameSprite", params)?;
    let sprite = match p.atlas {
        Some(key) => GameSprite::new(key),
        None => GameSprite::empty(),
    };
    Ok(Box::new(
        sprite.with_frame(p.frame).with_tint(p.tint).with_depth(p.depth).with_flip(p.flip),
    ))
}

#[derive(Deserialize)]
struct AnimatorParams {
    animations: Vec<FrameAnimation>,
    #[serde(default)]
    start: Option<String>,
    #[serde(default = "one")]
    speed: f32,
}

fn one() -> f32 {
    1.0
}

fn animator_factory(params: &Value) -> Result<Box<dyn GameComponent>, SceneError> {
    let p: AnimatorParams = parse_params("SpriteAnimator", params)?;
    let index = match &p.start {
        Some(name) => p
            .animations
            .iter()
            .position(|a| &a.name == name)
            .ok_or_else(|| SceneError::InvalidComponent {
                type_name: "SpriteAnimator".to_string(),
                reason: format!("no animation named '{name}'"),
            })?,
        None => 0,
    };
    Ok(Box::new(SpriteAnimator::new(p.animations, index).with_speed(p.speed)))
}

#[derive(Deserialize)]
struct TransitionParams {
    duration_ms: u32,
    delta: TransitionDelta,
    #[serde(default)]
    options: TransitionOptions,
    #[serde(default)]
    easing: Easing,
    #[serde(default = "one")]
    speed: f32,
}

fn transition_factory(params: &Value) -> Result<Box<dyn GameComponent>, SceneError> {
    let p: TransitionParams = parse_params("ObjectTransition", params)?;
    Ok(Box::new(
        ObjectTransition::new(p.duration_ms, p.delta, p.options, p.easing).with_speed(p.speed),
    ))
}

#[derive(Deserialize)]
#[serde(default)]
struct CameraParams {
    focus: Option<String>,
    focus_offset: Vec2,
    tween_ms: u32,
    easing: Easing,
}

impl Default for CameraParams {
    fn default() -> Self {
        Self {
            focus: None,
            focus_offset: Vec2::ZERO,
            tween_ms: DEFAULT_TWEEN_MS,
            easing: Easing::LINEAR,
        }
    }
}

fn camera_factory(params: &Value) -> Result<Box<dyn GameComponent>, SceneError> {
    let p: CameraParams = parse_params("Camera", params)?;
    let mut camera = Camera::new()
        .with_tween_ms(p.tween_ms)
        .with_easing(p.easing)
        .with_focus_offset(p.focus_offset);
    if let Some(name) = p.focus {
        camera = camera.with_focus_name(name);
    }
    Ok(Box::new(camera))
}

#[derive(Deserialize)]
#[serde(default)]
struct ScrollingParams {
    atlas: Option<String>,
    frame: usize,
    scroll_speed: Vec2,
    tint: Color,
    depth: f32,
}

impl Default for ScrollingParams {
    fn default() -> Self {
        Self {
            atlas: None,
            frame: 0,
            scroll_speed: Vec2::ZERO,
            tint: Color::WHITE,
            depth: 0.0,
        }
    }
}

fn scrolling_factory(params: &Value) -> Result<Box<dyn GameComponent>, SceneError> {
    let p: ScrollingParams = parse_params("ScrollingSprite", params)?;
    let sprite = match p.atlas {
        Some(key) => ScrollingSprite::new(key, p.scroll_speed),
        None => ScrollingSprite::empty(p.scroll_speed),
    };
    Ok(Box::new(sprite.with_frame(p.frame).with_tint(p.tint).with_depth(p.depth)))
}

#[derive(Deserialize)]
#[serde(default)]
struct TextParams {
    font: Option<String>,
    text: String,
    color: Color,
    centering: TextCentering,
    depth: f32,
}

impl Default for TextParams {
    fn default() -> Self {
        Self {
            font: None,
            text: String::new(),
            color: Color::WHITE,
            centering: TextCentering::None,
            depth: 0.0,
        }
    }
}

fn text_factory(params: &Value) -> Result<Box<dyn GameComponent>, SceneError> {
    let p: TextParams = parse_params("TextComponent", params)?;
    let text = match p.font {
        Some(key) => TextComponent::new(key, p.text, p.color, p.centering),
        None => TextComponent::without_font(p.text, p.color, p.centering),
    };
    Ok(Box::new(text.with_depth(p.depth)))
}

#[derive(Deserialize)]
struct TilesetParams {
    #[serde(default)]
    atlas: Option<String>,
    width: usize,
    height: usize,
    tile_size: Vec2,
    #[serde(default)]
    animations: Vec<FrameAnimation>,
    /// Row-major cells; empty leaves the grid blank
    #[serde(default)]
    tiles: Vec<Option<usize>>,
    #[serde(default)]
    depth: f32,
}

fn tileset_factory(params: &Value) -> Result<Box<dyn GameComponent>, SceneError> {
    let p: TilesetParams = parse_params("Tileset", params)?;
    let mut tileset = match p.atlas {
        Some(key) => Tileset::new(key, p.width, p.height, p.tile_size, p.animations),
        None => Tileset::empty(p.width, p.height, p.tile_size, p.animations),
    };
    if !p.tiles.is_empty() && !tileset.set_tiles(p.tiles) {
        return Err(SceneError::InvalidComponent {
            type_name: "Tileset".to_string(),
            reason: format!(
                "tiles must hold {} cells naming one of the animations",
                p.width * p.height
            ),
        });
    }
    tileset.depth = p.depth;
    Ok(Box::new(tileset))
}
