//! Tiles one atlas frame across the owner's area and scrolls it

use std::any::Any;

use glam::Vec2;

use crate::assets::{AssetHandle, ContentError, TextureAtlas};
use crate::object::rotate;
use crate::render::{Color, DrawCall, Rect};

use super::sprite::{acquire_atlas, release_atlas};
use super::{ComponentState, ContentContext, DrawContext, GameComponent, UpdateContext};

/// Scrolling, repeating sprite.
///
/// The frame repeats to fill the owner's unscaled dimensions. The scroll
/// offset is where inside the frame the top-left tile starts, and always
/// stays within `[0, frame size)` on both axes.
#[derive(Debug)]
pub struct ScrollingSprite {
    state: ComponentState,
    atlas: Option<AssetHandle<TextureAtlas>>,
    loaded: bool,
    frame_id: usize,
    scroll_offset: Vec2,
    /// Pixels per second on each axis; negative scrolls the other way
    pub scroll_speed: Vec2,
    pub tint: Color,
    pub depth: f32,
}

impl ScrollingSprite {
    /// Scroll the atlas at `atlas_key`
    pub fn new(atlas_key: impl Into<String>, scroll_speed: Vec2) -> Self {
        Self {
            state: ComponentState::default().with_content_paths([atlas_key.into()]),
            ..Self::empty(scroll_speed)
        }
    }

    #[must_use]
    pub fn empty(scroll_speed: Vec2) -> Self {
        Self {
            state: ComponentState::default(),
            atlas: None,
            loaded: false,
            frame_id: 0,
            scroll_offset: Vec2::ZERO,
            scroll_speed,
            tint: Color::WHITE,
            depth: 0.0,
        }
    }

    #[must_use]
    pub fn with_frame(mut self, frame_id: usize) -> Self {
        self.frame_id = frame_id;
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

    /// Use an atlas obtained elsewhere. It is not returned on unload.
    pub fn set_atlas(&mut self, atlas: AssetHandle<TextureAtlas>) {
        self.atlas = Some(atlas);
        self.loaded = false;
    }

    #[must_use]
    pub fn frame_id(&self) -> usize {
        self.frame_id
    }

    pub fn set_frame(&mut self, frame_id: usize) {
        self.frame_id = frame_id;
        self.scroll_offset = self.wrapped(self.scroll_offset);
    }

    #[must_use]
    pub fn scroll_offset(&self) -> Vec2 {
        self.scroll_offset
    }

    fn frame_bounds(&self) -> Option<Rect> {
        self.atlas.as_ref().map(|atlas| atlas.frame(self.frame_id).bounds)
    }

    fn wrapped(&self, offset: Vec2) -> Vec2 {
        let Some(bounds) = self.frame_bounds() else {
            return offset;
        };
        let wrap = |value: f32, size: i32| {
            if size > 0 {
                value.rem_euclid(size as f32)
            } else {
                0.0
            }
        };
        Vec2::new(wrap(offset.x, bounds.width), wrap(offset.y, bounds.height))
    }
}

impl GameComponent for ScrollingSprite {
    fn type_name(&self) -> &'static str {
        "ScrollingSprite"
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

    fn update(&mut self, ctx: &mut UpdateContext<'_>) {
        let step = self.scroll_speed * (ctx.time.elapsed() / 1000.0);
        self.scroll_offset = self.wrapped(self.scroll_offset + step);
    }

    fn draw(&mut self, ctx: &mut DrawContext<'_>) {
        let Some(atlas) = &self.atlas else {
            return;
        };
        let Ok(pose) = ctx.world.global_pose(ctx.object) else {
            return;
        };
        if pose.scale <= 0.0 || !pose.bounds().intersects(&ctx.camera) {
            return;
        }

        let frame = atlas.frame(self.frame_id);
        let bounds = frame.bounds;
        let area = pose.dimensions / pose.scale;
        let top_left = pose.top_left();
        let texture = atlas.texture().handle;

        let mut y = 0.0;
        let mut source_y = bounds.y + self.scroll_offset.y as i32;
        while y < area.y {
            let mut x = 0.0;
            let mut source_x = bounds.x + self.scroll_offset.x as i32;
            let mut row_height = 0;

            while x < area.x {
                let shifted = Rect::new(source_x, source_y, bounds.width, bounds.height);
                let Some(mut source) = shifted.intersection(&bounds) else {
                    break;
                };
                source.width = source.width.min((area.x - x).ceil() as i32);
                source.height = source.height.min((area.y - y).ceil() as i32);

                let position = top_left + rotate(Vec2::new(x, y) * pose.scale, pose.rotation);
                ctx.surface.draw(DrawCall {
                    texture: Some(texture),
                    destination: Rect::from_position_size(
                        ctx.to_screen(position),
                        source.size() * pose.scale * ctx.viewport_scale,
                    ),
                    source,
                    tint: self.tint.faded(ctx.alpha),
                    rotation: pose.rotation,
                    origin: Vec2::ZERO,
                    flip: frame.flip,
                    depth: self.depth,
                    alpha: ctx.alpha,
                });

                x += source.width as f32;
                row_height = source.height;
                source_x = bounds.x;
            }

            if row_height == 0 {
                break;
            }
            y += row_height as f32;
            source_y = bounds.y;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{Texture, TextureFrame};
    use crate::core::events::EventQueue;
    use crate::core::time::FrameTime;
    use crate::object::{DrawTarget, GameObject, ObjectId, World};
    use crate::render::{FlipMode, RecordingSurface, TextureHandle};

    fn strip() -> AssetHandle<TextureAtlas> {
        let texture = AssetHandle::new(Texture {
            handle: TextureHandle(4),
            width: 64,
            height: 16,
        });
        AssetHandle::new(TextureAtlas::new(
            texture,
            vec![TextureFrame::new(Rect::new(16, 0, 16, 16), FlipMode::None)],
        ))
    }

    fn scrolling_world(speed: Vec2, dimensions: Vec2) -> (World, ObjectId) {
        let mut sprite = ScrollingSprite::empty(speed).with_frame(1);
        sprite.set_atlas(strip());
        let mut world = World::new();
        let id = world.spawn(
            GameObject::new("sky")
                .with_dimensions(dimensions)
                .with_component(sprite),
        );
        (world, id)
    }

    fn offset(world: &World, id: ObjectId) -> Vec2 {
        world
            .with_component::<ScrollingSprite, _>(id, ScrollingSprite::scroll_offset)
            .unwrap()
    }

    #[test]
    fn test_offset_wraps_within_frame() {
        let (mut world, id) = scrolling_world(Vec2::new(-40.0, 200.0), Vec2::new(16.0, 16.0));

        world.update(id, &mut EventQueue::new(), FrameTime::from_millis(100.0));

        // -4 wraps to 12, 20 wraps to 4
        assert!(offset(&world, id).abs_diff_eq(Vec2::new(12.0, 4.0), 1e-4));
    }

    #[test]
    fn test_draw_tiles_scrolled_frame() {
        let (mut world, id) = scrolling_world(Vec2::new(40.0, 0.0), Vec2::new(40.0, 16.0));
        world.update(id, &mut EventQueue::new(), FrameTime::from_millis(100.0));

        let mut surface = RecordingSurface::new();
        world.draw(id, &mut DrawTarget::new(&mut surface, Rect::new(0, 0, 320, 180)));

        let tiles: Vec<(Rect, Rect)> =
            surface.calls.iter().map(|c| (c.source, c.destination)).collect();
        assert_eq!(
            tiles,
            vec![
                (Rect::new(20, 0, 12, 16), Rect::new(0, 0, 12, 16)),
                (Rect::new(16, 0, 16, 16), Rect::new(12, 0, 16, 16)),
                (Rect::new(16, 0, 12, 16), Rect::new(28, 0, 12, 16)),
            ]
        );
    }

    #[test]
    fn test_rows_wrap_vertically() {
        let (mut world, id) = scrolling_world(Vec2::new(0.0, 80.0), Vec2::new(16.0, 24.0));
        world.update(id, &mut EventQueue::new(), FrameTime::from_millis(100.0));

        let mut surface = RecordingSurface::new();
        let mut target =
            DrawTarget::new(&mut surface, Rect::new(0, 0, 320, 180)).with_viewport_scale(2.0);
        world.draw(id, &mut target);

        let tiles: Vec<(Rect, Rect)> =
            surface.calls.iter().map(|c| (c.source, c.destination)).collect();
        assert_eq!(
            tiles,
            vec![
                (Rect::new(16, 8, 16, 8), Rect::new(0, 0, 32, 16)),
                (Rect::new(16, 0, 16, 16), Rect::new(0, 16, 32, 32)),
            ]
        );
    }
}
