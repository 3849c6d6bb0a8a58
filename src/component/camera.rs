//! Focus-following camera
//!
//! The camera tracks its focus one-to-one and, over the tween duration,
//! closes whatever gap existed when the focus was assigned. Once the tween
//! timer runs out the owner is locked to `focus + focus_offset`.

use std::any::Any;

use glam::Vec2;

use crate::object::{HierarchyError, ObjectId, World};
use crate::render::Rect;
use crate::timing::{Easing, Timer};

use super::{ComponentState, ContentContext, GameComponent, UpdateContext};

/// Default tween duration (ms)
pub const DEFAULT_TWEEN_MS: u32 = 500;

/// Camera component; its owner's bounds are the view rectangle
#[derive(Debug)]
pub struct Camera {
    state: ComponentState,
    focus: Option<ObjectId>,
    /// Resolved against the world on awake
    focus_name: Option<String>,
    /// Kept between the camera position and the focus
    pub focus_offset: Vec2,
    pub easing: Easing,
    tween_timer: Timer,
    tween_distance: Vec2,
    last_focus_position: Vec2,
}

impl Camera {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: ComponentState::default(),
            focus: None,
            focus_name: None,
            focus_offset: Vec2::ZERO,
            easing: Easing::LINEAR,
            tween_timer: Timer::new(DEFAULT_TWEEN_MS),
            tween_distance: Vec2::ZERO,
            last_focus_position: Vec2::ZERO,
        }
    }

    #[must_use]
    pub fn with_tween_ms(mut self, tween_ms: u32) -> Self {
        self.tween_timer.set_target_time(tween_ms);
        self
    }

    #[must_use]
    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    #[must_use]
    pub fn with_focus_offset(mut self, offset: Vec2) -> Self {
        self.focus_offset = offset;
        self
    }

    /// Focus the object with this name once the camera wakes
    #[must_use]
    pub fn with_focus_name(mut self, name: impl Into<String>) -> Self {
        self.focus_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn focus(&self) -> Option<ObjectId> {
        self.focus
    }

    #[must_use]
    pub fn tween_ms(&self) -> u32 {
        self.tween_timer.target_time()
    }

    #[must_use]
    pub fn is_tweening(&self) -> bool {
        self.focus.is_some() && !self.tween_timer.is_exceeded()
    }

    /// Start following `focus` from `camera_position`
    pub fn assign_focus(&mut self, focus: Option<(ObjectId, Vec2)>, camera_position: Vec2) {
        self.tween_timer.reset();
        match focus {
            Some((id, focus_position)) => {
                self.focus = Some(id);
                self.last_focus_position = focus_position;
                self.tween_distance = focus_position + self.focus_offset - camera_position;
            }
            None => {
                self.focus = None;
                self.tween_distance = Vec2::ZERO;
            }
        }
    }

    /// Point the camera component on `camera` at `focus`
    pub fn focus_on(
        world: &mut World,
        camera: ObjectId,
        focus: Option<ObjectId>,
    ) -> Result<(), HierarchyError> {
        let camera_position = world.global_position(camera)?;
        let focus = match focus {
            Some(id) => Some((id, world.global_position(id)?)),
            None => None,
        };
        world
            .with_component_mut::<Camera, _>(camera, |cam| cam.assign_focus(focus, camera_position))
            .ok_or(HierarchyError::NoSuchObject(camera))
    }

    /// View rectangle of the camera object in world units
    pub fn bounds(world: &World, camera: ObjectId) -> Result<Rect, HierarchyError> {
        Ok(world.global_pose(camera)?.bounds())
    }

    /// Follow the focus for one frame
    pub fn track(
        &mut self,
        world: &mut World,
        owner: ObjectId,
        elapsed_ms: f32,
    ) -> Result<(), HierarchyError> {
        let before = self.easing.apply(self.tween_timer.proportion());
        self.tween_timer.advance(elapsed_ms);
        let tween_delta = self.easing.apply(self.tween_timer.proportion()) - before;

        let Some(focus) = self.focus else {
            return Ok(());
        };
        let focus_position = match world.global_position(focus) {
            Ok(position) => position,
            Err(HierarchyError::NoSuchObject(_)) => {
                log::debug!("camera focus {focus} is gone");
                self.focus = None;
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let target = if self.tween_timer.is_exceeded() {
            focus_position + self.focus_offset
        } else {
            world.global_position(owner)?
                + (focus_position - self.last_focus_position)
                + self.tween_distance * tween_delta
        };
        world.set_global_position(owner, target)?;
        self.last_focus_position = focus_position;
        Ok(())
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}

impl GameComponent for Camera {
    fn type_name(&self) -> &'static str {
        "Camera"
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

    fn awake(&mut self, ctx: &mut ContentContext<'_>) {
        let Some(name) = self.focus_name.take() else {
            return;
        };
        let Some(target) = ctx.world.find_by_name(&name) else {
            log::warn!("camera focus '{name}' not found");
            return;
        };
        let (Ok(camera_position), Ok(focus_position)) =
            (ctx.world.global_position(ctx.object), ctx.world.global_position(target))
        else {
            return;
        };
        self.assign_focus(Some((target, focus_position)), camera_position);
    }

    fn update(&mut self, ctx: &mut UpdateContext<'_>) {
        if let Err(e) = self.track(ctx.world, ctx.object, ctx.time.elapsed()) {
            log::debug!("camera update skipped: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::events::EventQueue;
    use crate::core::time::FrameTime;
    use crate::object::GameObject;

    const EPSILON: f32 = 1e-3;

    fn setup(tween_ms: u32) -> (World, ObjectId, ObjectId) {
        let mut world = World::new();
        let camera = world.spawn(
            GameObject::new("camera")
                .with_dimensions(Vec2::new(320.0, 180.0))
                .with_component(Camera::new().with_tween_ms(tween_ms)),
        );
        let player = world.spawn(GameObject::new("player").with_position(Vec2::new(100.0, 50.0)));
        (world, camera, player)
    }

    fn step(world: &mut World, camera: ObjectId, ms: f32) {
        let mut events = EventQueue::new();
        world.update(camera, &mut events, FrameTime::from_millis(ms));
    }

    #[test]
    fn test_tween_closes_gap_then_locks() {
        let (mut world, camera, player) = setup(400);
        Camera::focus_on(&mut world, camera, Some(player)).unwrap();

        step(&mut world, camera, 200.0);
        let halfway = world.global_position(camera).unwrap();
        assert!(halfway.abs_diff_eq(Vec2::new(50.0, 25.0), EPSILON));

        step(&mut world, camera, 200.0);
        let position = world.global_position(camera).unwrap();
        assert!(position.abs_diff_eq(Vec2::new(100.0, 50.0), EPSILON));

        world.set_global_position(player, Vec2::new(130.0, 50.0)).unwrap();
        step(&mut world, camera, 16.0);
        let position = world.global_position(camera).unwrap();
        assert!(position.abs_diff_eq(Vec2::new(130.0, 50.0), EPSILON));
    }

    #[test]
    fn test_tracks_focus_movement_while_tweening() {
        let (mut world, camera, player) = setup(1000);
        Camera::focus_on(&mut world, camera, Some(player)).unwrap();

        world.set_global_position(player, Vec2::new(110.0, 50.0)).unwrap();
        step(&mut world, camera, 100.0);

        // 10 from the focus moving plus a tenth of the original gap
        let position = world.global_position(camera).unwrap();
        assert!(position.abs_diff_eq(Vec2::new(20.0, 5.0), EPSILON));
    }

    #[test]
    fn test_focus_offset_and_bounds() {
        let (mut world, camera, player) = setup(100);
        world
            .with_component_mut::<Camera, _>(camera, |c| c.focus_offset = Vec2::new(-160.0, -90.0))
            .unwrap();
        Camera::focus_on(&mut world, camera, Some(player)).unwrap();

        step(&mut world, camera, 150.0);

        assert_eq!(Camera::bounds(&world, camera).unwrap(), Rect::new(-60, -40, 320, 180));
    }

    #[test]
    fn test_despawned_focus_is_dropped() {
        let (mut world, camera, player) = setup(100);
        Camera::focus_on(&mut world, camera, Some(player)).unwrap();
        world.despawn(player).unwrap();

        step(&mut world, camera, 50.0);

        assert_eq!(world.with_component::<Camera, _>(camera, Camera::focus), Some(None));
    }
}
