//! Draws one atlas frame at the owner's transform

use std::any::Any;

use glam::Vec2;

use crate::assets::{
    AssetHandle, ContentError, Services, SharedAtlasLoader, TextureAtlas, TextureFrame, lock_loader,
};
use crate::render::{Color, DrawCall, FlipMode, Rect};

use super::{ComponentState, ContentContext, DrawContext, GameComponent};

/// Take `key` from the shared atlas cache
pub(crate) fn acquire_atlas(
    services: &mut Services,
    key: &str,
) -> Result<AssetHandle<TextureAtlas>, ContentError> {
    lock_loader(services.require::<SharedAtlasLoader>()?)?.load_content(key)
}

/// Give an atlas back to the shared atlas cache
pub(crate) fn release_atlas(
    services: &mut Services,
    atlas: &AssetHandle<TextureAtlas>,
) -> Result<(), ContentError> {
    lock_loader(services.require::<SharedAtlasLoader>()?)?
        .unload_content(atlas)
        .map(|_| ())
}

/// Sprite component.
///
/// The atlas is loaded from the first content path. The sprite covers the
/// owner's scaled dimensions with its top-left at the owner's top-left.
#[derive(Debug)]
pub struct GameSprite {
    state: ComponentState,
    atlas: Option<AssetHandle<TextureAtlas>>,
    /// Whether `atlas` came from the atlas loader and must be given back
    loaded: bool,
    frame_id: usize,
    /// Multiplied by the effective alpha at draw time
    pub tint: Color,
    /// Layer depth
    pub depth: f32,
    /// Mirroring; `FlipMode::None` uses the frame's own flip
    pub flip: FlipMode,
    /// Offset of the current animation frame, in unscaled units
    pub frame_offset: Vec2,
}

impl GameSprite {
    /// Sprite drawing from the atlas at `atlas_key`
    pub fn new(atlas_key: impl Into<String>) -> Self {
        Self {
            state: ComponentState::default().with_content_paths([atlas_key.into()]),
            ..Self::empty()
        }
    }

    /// Sprite with no atlas yet
    #[must_use]
    pub fn empty() -> Self {
        Self {
            state: ComponentState::default(),
            atlas: None,
            loaded: false,
            frame_id: 0,
            tint: Color::WHITE,
            depth: 0.0,
            flip: FlipMode::None,
            frame_offset: Vec2::ZERO,
        }
    }

    #[must_use]
    pub fn with_frame(mut self, frame_id: usize) -> Self {
        self.set_frame(frame_id);
        self
    }

    #[must_use]
    pub fn with_tint(mut self, tint: Color) -> Self {
        self.tint = tint;
        self
    }

    #[must_use]
    pub fn with_depth(mut self, depth: f32) -> Self {
        self.depth = depth;
        self
    }

    #[must_use]
    pub fn with_flip(mut self, flip: FlipMode) -> Self {
        self.flip = flip;
        self
    }

    /// Use an atlas obtained elsewhere. It is not returned on unload.
    pub fn set_atlas(&mut self, atlas: AssetHandle<TextureAtlas>) {
        self.atlas = Some(atlas);
        self.loaded = false;
        self.set_frame(self.frame_id);
    }

    #[must_use]
    pub fn atlas(&self) -> Option<&AssetHandle<TextureAtlas>> {
        self.atlas.as_ref()
    }

    #[must_use]
    pub fn frame_id(&self) -> usize {
        self.frame_id
    }

    /// Select a frame. Ids past the atlas end select frame 0.
    pub fn set_frame(&mut self, frame_id: usize) {
        self.frame_id = match &self.atlas {
            Some(atlas) if frame_id >= atlas.len() => 0,
            _ => frame_id,
        };
    }

    /// The frame that will be drawn
    #[must_use]
    pub fn current_frame(&self) -> Option<&TextureFrame> {
        self.atlas.as_ref().map(|atlas| atlas.frame(self.frame_id))
    }
}

impl Default for GameSprite {
    fn default() -> Self {
        Self::empty()
    }
}

impl GameComponent for GameSprite {
    fn type_name(&self) -> &'static str {
        "GameSprite"
    }

    fn state(&self) -> &ComponentState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ComponentState {
        &mut self.state
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn load_content(&mut self, ctx: &mut ContentContext<'_>) -> Result<(), ContentError> {
        if self.loaded {
            return Ok(());
        }
        let Some(key) = self.state.content_paths.first() else {
            return Ok(());
        };
        self.atlas = Some(acquire_atlas(ctx.services, key)?);
        self.loaded = true;
        self.set_frame(self.frame_id);
        Ok(())
    }

    fn unload_content(&mut self, ctx: &mut ContentContext<'_>) -> Result<(), ContentError> {
        if !self.loaded {
            return Ok(());
        }
        if let Some(atlas) = self.atlas.take() {
            self.loaded = false;
            release_atlas(ctx.services, &atlas)?;
        }
        Ok(())
    }

    fn draw(&mut self, ctx: &mut DrawContext<'_>) {
        let Some(atlas) = &self.atlas else {
            return;
        };
        let Ok(pose) = ctx.world.global_pose(ctx.object) else {
            return;
        };

        let top_left = pose.top_left() + self.frame_offset * pose.scale;
        if !Rect::from_position_size(top_left, pose.dimensions).intersects(&ctx.camera) {
            return;
        }

        let frame = atlas.frame(self.frame_id);
        let flip = if self.flip == FlipMode::None {
            frame.flip
        } else {
            self.flip
        };

        ctx.surface.draw(DrawCall {
            texture: Some(atlas.texture().handle),
            destination: Rect::from_position_size(
                ctx.to_screen(top_left),
                pose.dimensions * ctx.viewport_scale,
            ),
            source: frame.bounds,
            tint: self.tint.faded(ctx.alpha),
            rotation: pose.rotation,
            origin: Vec2::ZERO,
            flip,
            depth: self.depth,
            alpha: ctx.alpha,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{Texture, TextureFrame};
    use crate::object::{DrawTarget, GameObject, World};
    use crate::render::{RecordingSurface, TextureHandle};

    fn atlas() -> AssetHandle<TextureAtlas> {
        let texture = AssetHandle::new(Texture {
            handle: TextureHandle(3),
            width: 32,
            height: 16,
        });
        AssetHandle::new(TextureAtlas::new(
            texture,
            vec![TextureFrame::new(Rect::new(16, 0, 16, 16), FlipMode::Vertical)],
        ))
    }

    fn sprite_object(position: Vec2, sprite: GameSprite) -> GameObject {
        GameObject::new("sprite")
            .with_position(position)
            .with_dimensions(Vec2::new(16.0, 16.0))
            .with_component(sprite)
    }

    #[test]
    fn test_out_of_range_frame_falls_back() {
        let mut sprite = GameSprite::empty().with_frame(5);
        assert_eq!(sprite.frame_id(), 5);

        sprite.set_atlas(atlas());
        assert_eq!(sprite.frame_id(), 0);

        sprite.set_frame(1);
        assert_eq!(sprite.current_frame().map(|f| f.bounds), Some(Rect::new(16, 0, 16, 16)));
    }

    #[test]
    fn test_draw_maps_to_screen() {
        let mut sprite = GameSprite::empty().with_tint(Color::WHITE);
        sprite.set_atlas(atlas());
        sprite.set_frame(1);

        let mut world = World::new();
        let id = world.spawn(sprite_object(Vec2::new(40.0, 20.0), sprite).with_alpha(0.5));

        let mut surface = RecordingSurface::new();
        let mut target =
            DrawTarget::new(&mut surface, Rect::new(10, 10, 320, 180)).with_viewport_scale(2.0);
        world.draw(id, &mut target);

        let call = &surface.calls[0];
        assert_eq!(call.texture, Some(TextureHandle(3)));
        assert_eq!(call.destination, Rect::new(60, 20, 32, 32));
        assert_eq!(call.source, Rect::new(16, 0, 16, 16));
        assert_eq!(call.flip, FlipMode::Vertical);
        assert_eq!(call.tint, Color::WHITE.faded(0.5));
    }

    #[test]
    fn test_offscreen_sprite_is_culled() {
        let mut sprite = GameSprite::empty();
        sprite.set_atlas(atlas());

        let mut world = World::new();
        let id = world.spawn(sprite_object(Vec2::new(1000.0, 1000.0), sprite));

        let mut surface = RecordingSurface::new();
        let mut target = DrawTarget::new(&mut surface, Rect::new(0, 0, 320, 180));
        world.draw(id, &mut target);

        assert!(surface.calls.is_empty());
    }
}
