//! A grid of tiles drawn from one atlas, each cell showing an animation

use std::any::Any;

use glam::Vec2;

use crate::assets::{AssetHandle, ContentError, TextureAtlas};
use crate::object::rotate;
use crate::render::{Color, DrawCall, Rect};

use super::animator::{FrameAnimation, FrameAnimator};
use super::sprite::{acquire_atlas, release_atlas};
use super::{ComponentState, ContentContext, DrawContext, GameComponent, UpdateContext};

/// Tile grid component.
///
/// Cells hold an index into the animation list, or `None` for an empty cell.
/// Every animation has one shared animator, so all cells showing the same
/// animation stay in step. The grid starts at the owner's top-left and cells
/// are `tile_size` unscaled pixels apart.
#[derive(Debug)]
pub struct Tileset {
    state: ComponentState,
    atlas: Option<AssetHandle<TextureAtlas>>,
    loaded: bool,
    width: usize,
    height: usize,
    tile_size: Vec2,
    tiles: Vec<Option<usize>>,
    animators: Vec<FrameAnimator>,
    pub tint: Color,
    pub depth: f32,
}

impl Tileset {
    /// Empty grid drawing from the atlas at `atlas_key`
    pub fn new(
        atlas_key: impl Into<String>,
        width: usize,
        height: usize,
        tile_size: Vec2,
        animations: Vec<FrameAnimation>,
    ) -> Self {
        Self {
            state: ComponentState::default().with_content_paths([atlas_key.into()]),
            ..Self::empty(width, height, tile_size, animations)
        }
    }

    /// Empty grid with no atlas yet
    #[must_use]
    pub fn empty(
        width: usize,
        height: usize,
        tile_size: Vec2,
        animations: Vec<FrameAnimation>,
    ) -> Self {
        Self {
            state: ComponentState::default(),
            atlas: None,
            loaded: false,
            width,
            height,
            tile_size,
            tiles: vec![None; width * height],
            animators: animations.into_iter().map(FrameAnimator::with_animation).collect(),
            tint: Color::WHITE,
            depth: 0.0,
        }
    }

    /// Use an atlas obtained elsewhere. It is not returned on unload.
    pub fn set_atlas(&mut self, atlas: AssetHandle<TextureAtlas>) {
        self.atlas = Some(atlas);
        self.loaded = false;
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    #[must_use]
    pub fn tile_size(&self) -> Vec2 {
        self.tile_size
    }

    fn index(&self, x: usize, y: usize) -> Option<usize> {
        (x < self.width && y < self.height).then_some(y * self.width + x)
    }

    /// Animation shown at a cell; `None` when empty or out of range
    #[must_use]
    pub fn tile(&self, x: usize, y: usize) -> Option<usize> {
        self.tiles[self.index(x, y)?]
    }

    /// Set a cell. Returns false, changing nothing, when the cell is out of
    /// range or the animation does not exist.
    pub fn set_tile(&mut self, x: usize, y: usize, animation: Option<usize>) -> bool {
        let Some(index) = self.index(x, y) else {
            return false;
        };
        if animation.is_some_and(|a| a >= self.animators.len()) {
            return false;
        }
        self.tiles[index] = animation;
        true
    }

    /// Fill the grid row by row. Returns false, changing nothing, when the
    /// length does not match the grid or a cell names a missing animation.
    pub fn set_tiles(&mut self, tiles: Vec<Option<usize>>) -> bool {
        let valid = tiles.len() == self.tiles.len()
            && tiles.iter().flatten().all(|&a| a < self.animators.len());
        if valid {
            self.tiles = tiles;
        }
        valid
    }

    #[must_use]
    pub fn animator(&self, animation: usize) -> Option<&FrameAnimator> {
        self.animators.get(animation)
    }

    fn frame_id(&self, animation: usize) -> usize {
        self.animators
            .get(animation)
            .and_then(FrameAnimator::current_frame)
            .map_or(0, |frame| frame.frame_id)
    }
}

impl GameComponent for Tileset {
    fn type_name(&self) -> &'static str {
        "Tileset"
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
        for animator in &mut self.animators {
            animator.update(ctx.time);
        }
    }

    fn draw(&mut self, ctx: &mut DrawContext<'_>) {
        let Some(atlas) = &self.atlas else {
            return;
        };
        let Ok(pose) = ctx.world.global_pose(ctx.object) else {
            return;
        };

        let top_left = pose.top_left();
        let cell = self.tile_size * pose.scale;
        let texture = atlas.texture().handle;

        for (index, animation) in self.tiles.iter().enumerate() {
            let Some(animation) = *animation else {
                continue;
            };
            let grid = Vec2::new((index % self.width) as f32, (index / self.width) as f32);
            let position = top_left + rotate(grid * cell, pose.rotation);
            if !Rect::from_position_size(position, cell).intersects(&ctx.camera) {
                continue;
            }

            let frame = atlas.frame(self.frame_id(animation));
            ctx.surface.draw(DrawCall {
                texture: Some(texture),
                destination: Rect::from_position_size(
                    ctx.to_screen(position),
                    cell * ctx.viewport_scale,
                ),
                source: frame.bounds,
                tint: self.tint.faded(ctx.alpha),
                rotation: pose.rotation,
                origin: Vec2::ZERO,
                flip: frame.flip,
                depth: self.depth,
                alpha: ctx.alpha,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{Texture, TextureFrame};
    use crate::component::AnimationFrame;
    use crate::core::events::EventQueue;
    use crate::core::time::FrameTime;
    use crate::object::{DrawTarget, GameObject, World};
    use crate::render::{FlipMode, RecordingSurface, TextureHandle};

    fn tiles_atlas() -> AssetHandle<TextureAtlas> {
        let texture = AssetHandle::new(Texture {
            handle: TextureHandle(5),
            width: 24,
            height: 8,
        });
        let frames = (0..3)
            .map(|i| TextureFrame::new(Rect::new(i * 8, 0, 8, 8), FlipMode::None))
            .collect();
        AssetHandle::new(TextureAtlas::new(texture, frames))
    }

    fn water_and_grass() -> Tileset {
        let water = FrameAnimation::new(
            "water",
            -1,
            vec![AnimationFrame::new(1, 100), AnimationFrame::new(2, 100)],
        );
        let grass = FrameAnimation::new("grass", -1, vec![AnimationFrame::new(3, 1000)]);
        let mut tileset = Tileset::empty(2, 2, Vec2::new(8.0, 8.0), vec![water, grass]);
        tileset.set_atlas(tiles_atlas());
        tileset
    }

    #[test]
    fn test_set_tile_checks_bounds_and_animation() {
        let mut tileset = water_and_grass();

        assert!(tileset.set_tile(1, 0, Some(1)));
        assert_eq!(tileset.tile(1, 0), Some(1));
        assert!(!tileset.set_tile(2, 0, Some(0)));
        assert!(!tileset.set_tile(0, 0, Some(2)));
        assert_eq!(tileset.tile(0, 0), None);
        assert_eq!(tileset.tile(5, 5), None);

        assert!(!tileset.set_tiles(vec![Some(0); 3]));
        assert!(tileset.set_tiles(vec![Some(0), None, None, Some(1)]));
        assert_eq!(tileset.tile(1, 1), Some(1));
    }

    #[test]
    fn test_cells_follow_their_animation() {
        let mut tileset = water_and_grass();
        tileset.set_tiles(vec![Some(0), None, None, Some(1)]);

        let mut world = World::new();
        let id = world.spawn(
            GameObject::new("map")
                .with_position(Vec2::new(10.0, 10.0))
                .with_scale(2.0)
                .with_component(tileset),
        );
        world.update(id, &mut EventQueue::new(), FrameTime::from_millis(100.0));

        let mut surface = RecordingSurface::new();
        world.draw(id, &mut DrawTarget::new(&mut surface, Rect::new(0, 0, 320, 180)));

        let cells: Vec<(Rect, Rect)> =
            surface.calls.iter().map(|c| (c.source, c.destination)).collect();
        assert_eq!(
            cells,
            vec![
                // Water moved on to its second frame
                (Rect::new(8, 0, 8, 8), Rect::new(10, 10, 16, 16)),
                (Rect::new(16, 0, 8, 8), Rect::new(26, 26, 16, 16)),
            ]
        );
    }

    #[test]
    fn test_offscreen_cells_are_culled() {
        let mut tileset = water_and_grass();
        tileset.set_tiles(vec![Some(0), Some(0), Some(1), Some(1)]);

        let mut world = World::new();
        let id = world.spawn(
            GameObject::new("map")
                .with_position(Vec2::new(-8.0, 0.0))
                .with_component(tileset),
        );

        let mut surface = RecordingSurface::new();
        world.draw(id, &mut DrawTarget::new(&mut surface, Rect::new(0, 0, 320, 180)));

        assert_eq!(surface.calls.len(), 2);
        assert!(surface.calls.iter().all(|c| c.destination.x == 0));
    }
}
