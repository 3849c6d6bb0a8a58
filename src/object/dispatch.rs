//! Depth-first dispatch of the component lifecycle through the tree
//!
//! Each phase visits an object's components in list order, then its children
//! in child order. The component list and the child list are both taken as
//! snapshots, so hooks may restructure the tree freely: objects added
//! mid-dispatch wait for the next frame, objects removed mid-dispatch are
//! skipped.
//!
//! - Update phases skip inactive objects with their subtree.
//! - Draw phases skip invisible objects, and anything whose accumulated
//!   alpha (inherited times local) is zero, with their subtree.
//! - Content phases visit everything.

use glam::Vec2;

use crate::assets::{ContentError, Services};
use crate::component::{ContentContext, DrawContext, GameComponent, Siblings, UpdateContext};
use crate::core::events::EventQueue;
use crate::core::time::FrameTime;
use crate::render::{DrawSurface, Rect};

use super::ObjectId;
use super::world::World;

/// Which update hook to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdatePhase {
    Early,
    Main,
    Late,
}

/// Which draw hook to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawPhase {
    Early,
    Main,
    Late,
}

/// Which lifecycle hook to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentPhase {
    Awake,
    Sleep,
    Load,
    Unload,
}

/// Where and how a draw pass renders
pub struct DrawTarget<'s> {
    pub surface: &'s mut dyn DrawSurface,
    /// Visible world rectangle
    pub camera: Rect,
    /// Screen offset added after the camera transform
    pub offset: Vec2,
    /// World units to screen pixels
    pub viewport_scale: f32,
}

impl<'s> DrawTarget<'s> {
    /// Draw with an unscaled camera at `camera`
    pub fn new(surface: &'s mut dyn DrawSurface, camera: Rect) -> Self {
        Self {
            surface,
            camera,
            offset: Vec2::ZERO,
            viewport_scale: 1.0,
        }
    }

    #[must_use]
    pub fn with_offset(mut self, offset: Vec2) -> Self {
        self.offset = offset;
        self
    }

    #[must_use]
    pub fn with_viewport_scale(mut self, scale: f32) -> Self {
        self.viewport_scale = scale;
        self
    }
}

type ComponentVec = Vec<Box<dyn GameComponent>>;

/// Run `visit` on every component with a view of the rest of the list
fn for_each_split(
    list: &mut ComponentVec,
    mut visit: impl FnMut(&mut Box<dyn GameComponent>, Siblings<'_>),
) {
    for index in 0..list.len() {
        let (before, rest) = list.split_at_mut(index);
        let Some((current, after)) = rest.split_first_mut() else {
            break;
        };
        visit(current, Siblings::new(before, after));
    }
}

impl World {
    // ========================================================================
    // Update
    // ========================================================================

    /// Run one update phase on `id` and its subtree
    pub fn dispatch_update(
        &mut self,
        id: ObjectId,
        phase: UpdatePhase,
        events: &mut EventQueue,
        time: FrameTime,
    ) {
        let Ok(flags) = self.flags(id) else {
            return;
        };
        if !flags.active {
            return;
        }

        if let Some(mut list) = self.take_components(id) {
            for_each_split(&mut list, |component, siblings| {
                if !component.state().active {
                    return;
                }
                let mut ctx = UpdateContext {
                    world: &mut *self,
                    object: id,
                    siblings,
                    events: &mut *events,
                    time,
                };
                match phase {
                    UpdatePhase::Early => component.early_update(&mut ctx),
                    UpdatePhase::Main => component.update(&mut ctx),
                    UpdatePhase::Late => component.late_update(&mut ctx),
                }
            });
            self.restore_components(id, list);
        }

        for child in self.children(id) {
            self.dispatch_update(child, phase, events, time);
        }
    }

    pub fn early_update(&mut self, id: ObjectId, events: &mut EventQueue, time: FrameTime) {
        self.dispatch_update(id, UpdatePhase::Early, events, time);
    }

    pub fn update(&mut self, id: ObjectId, events: &mut EventQueue, time: FrameTime) {
        self.dispatch_update(id, UpdatePhase::Main, events, time);
    }

    pub fn late_update(&mut self, id: ObjectId, events: &mut EventQueue, time: FrameTime) {
        self.dispatch_update(id, UpdatePhase::Late, events, time);
    }

    // ========================================================================
    // Draw
    // ========================================================================

    /// Run one draw phase on `id` and its subtree, given the inherited alpha
    pub fn dispatch_draw(
        &mut self,
        id: ObjectId,
        phase: DrawPhase,
        target: &mut DrawTarget<'_>,
        inherited_alpha: f32,
    ) {
        let Ok(flags) = self.flags(id) else {
            return;
        };
        let alpha = inherited_alpha * flags.alpha;
        if !flags.visible || alpha == 0.0 {
            return;
        }

        if let Some(mut list) = self.take_components(id) {
            let world: &World = self;
            for_each_split(&mut list, |component, siblings| {
                let state = component.state();
                let component_alpha = alpha * state.alpha;
                if !state.visible || component_alpha == 0.0 {
                    return;
                }
                let mut ctx = DrawContext {
                    world,
                    object: id,
                    siblings,
                    surface: &mut *target.surface,
                    camera: target.camera,
                    offset: target.offset,
                    viewport_scale: target.viewport_scale,
                    alpha: component_alpha,
                };
                match phase {
                    DrawPhase::Early => component.early_draw(&mut ctx),
                    DrawPhase::Main => component.draw(&mut ctx),
                    DrawPhase::Late => component.late_draw(&mut ctx),
                }
            });
            self.restore_components(id, list);
        }

        for child in self.children(id) {
            self.dispatch_draw(child, phase, target, alpha);
        }
    }

    pub fn early_draw(&mut self, id: ObjectId, target: &mut DrawTarget<'_>) {
        self.dispatch_draw(id, DrawPhase::Early, target, 1.0);
    }

    pub fn draw(&mut self, id: ObjectId, target: &mut DrawTarget<'_>) {
        self.dispatch_draw(id, DrawPhase::Main, target, 1.0);
    }

    pub fn late_draw(&mut self, id: ObjectId, target: &mut DrawTarget<'_>) {
        self.dispatch_draw(id, DrawPhase::Late, target, 1.0);
    }

    // ========================================================================
    // Lifecycle and content
    // ========================================================================

    /// Run one lifecycle phase on `id` and its subtree, regardless of flags.
    ///
    /// Loading stops at the first error. The other phases keep going and
    /// report the first error they saw.
    pub fn dispatch_content(
        &mut self,
        id: ObjectId,
        phase: ContentPhase,
        services: &mut Services,
    ) -> Result<(), ContentError> {
        let mut first_error: Option<ContentError> = None;

        if let Some(mut list) = self.take_components(id) {
            for_each_split(&mut list, |component, siblings| {
                if phase == ContentPhase::Load && first_error.is_some() {
                    return;
                }
                let mut ctx = ContentContext {
                    world: &mut *self,
                    object: id,
                    siblings,
                    services: &mut *services,
                };
                let result = match phase {
                    ContentPhase::Awake => {
                        component.awake(&mut ctx);
                        Ok(())
                    }
                    ContentPhase::Sleep => {
                        component.sleep(&mut ctx);
                        Ok(())
                    }
                    ContentPhase::Load => component.load_content(&mut ctx),
                    ContentPhase::Unload => component.unload_content(&mut ctx),
                };
                if let Err(e) = result {
                    log::warn!("{} on {id} failed during {phase:?}: {e}", component.type_name());
                    first_error.get_or_insert(e);
                }
            });
            self.restore_components(id, list);
        }

        for child in self.children(id) {
            if phase == ContentPhase::Load && first_error.is_some() {
                break;
            }
            if let Err(e) = self.dispatch_content(child, phase, services) {
                first_error.get_or_insert(e);
            }
        }

        first_error.map_or(Ok(()), Err)
    }

    pub fn awake(&mut self, id: ObjectId, services: &mut Services) {
        // Awake hooks are infallible
        let _ = self.dispatch_content(id, ContentPhase::Awake, services);
    }

    pub fn sleep(&mut self, id: ObjectId, services: &mut Services) {
        let _ = self.dispatch_content(id, ContentPhase::Sleep, services);
    }

    pub fn load_content(
        &mut self,
        id: ObjectId,
        services: &mut Services,
    ) -> Result<(), ContentError> {
        self.dispatch_content(id, ContentPhase::Load, services)
    }

    pub fn unload_content(
        &mut self,
        id: ObjectId,
        services: &mut Services,
    ) -> Result<(), ContentError> {
        self.dispatch_content(id, ContentPhase::Unload, services)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{ComponentState, GameComponent};
    use crate::object::GameObject;
    use crate::render::{Color, DrawCall, RecordingSurface};
    use std::any::Any;
    use std::sync::{Arc, Mutex};

    /// Records hook calls into a shared log and draws a tagged call
    struct Tracer {
        state: ComponentState,
        tag: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Tracer {
        fn new(tag: &'static str, log: &Arc<Mutex<Vec<String>>>) -> Self {
            Self {
                state: ComponentState::default(),
                tag,
                log: Arc::clone(log),
            }
        }

        fn record(&self, hook: &str) {
            self.log.lock().unwrap().push(format!("{}:{hook}", self.tag));
        }
    }

    impl GameComponent for Tracer {
        fn type_name(&self) -> &'static str {
            "Tracer"
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
        fn update(&mut self, _ctx: &mut UpdateContext<'_>) {
            self.record("update");
        }
        fn draw(&mut self, ctx: &mut DrawContext<'_>) {
            self.record("draw");
            ctx.surface.draw(DrawCall {
                tint: Color::WHITE,
                alpha: ctx.alpha,
                ..DrawCall::default()
            });
        }
        fn load_content(&mut self, _ctx: &mut ContentContext<'_>) -> Result<(), ContentError> {
            self.record("load");
            if self.tag == "broken" {
                return Err(ContentError::UnknownResourceKey(self.tag.to_string()));
            }
            Ok(())
        }
    }

    /// Spawns a child during update
    struct Spawner {
        state: ComponentState,
    }

    impl GameComponent for Spawner {
        fn type_name(&self) -> &'static str {
            "Spawner"
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
        fn update(&mut self, ctx: &mut UpdateContext<'_>) {
            let child = ctx.world.spawn(GameObject::new("spawned"));
            let _ = ctx.world.add_child(ctx.object, child);
        }
    }

    fn new_log() -> Arc<Mutex<Vec<String>>> {
        Arc::new(Mutex::new(Vec::new()))
    }

    #[test]
    fn test_update_order_is_depth_first() {
        let log = new_log();
        let mut world = World::new();
        let root = world.spawn(
            GameObject::new("root")
                .with_component(Tracer::new("root", &log))
                .with_child(GameObject::new("a").with_component(Tracer::new("a", &log)))
                .with_child(GameObject::new("b").with_component(Tracer::new("b", &log))),
        );

        world.update(root, &mut EventQueue::new(), FrameTime::from_millis(16.0));

        assert_eq!(*log.lock().unwrap(), ["root:update", "a:update", "b:update"]);
    }

    #[test]
    fn test_inactive_subtree_skips_update() {
        let log = new_log();
        let mut world = World::new();
        let root = world.spawn(
            GameObject::new("root")
                .with_component(Tracer::new("root", &log))
                .with_child(
                    GameObject::new("off")
                        .with_active(false)
                        .with_component(Tracer::new("off", &log))
                        .with_child(
                            GameObject::new("deep").with_component(Tracer::new("deep", &log)),
                        ),
                ),
        );

        world.update(root, &mut EventQueue::new(), FrameTime::from_millis(16.0));

        assert_eq!(*log.lock().unwrap(), ["root:update"]);
    }

    #[test]
    fn test_inactive_component_skips_update() {
        let log = new_log();
        let mut tracer = Tracer::new("idle", &log);
        tracer.state.active = false;
        let mut world = World::new();
        let root = world.spawn(GameObject::new("root").with_component(tracer));

        world.update(root, &mut EventQueue::new(), FrameTime::from_millis(16.0));

        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_draw_multiplies_alpha_down_the_tree() {
        let log = new_log();
        let mut world = World::new();
        let root = world.spawn(
            GameObject::new("root")
                .with_alpha(0.5)
                .with_component(Tracer::new("root", &log))
                .with_child(
                    GameObject::new("child")
                        .with_alpha(0.5)
                        .with_component(Tracer::new("child", &log)),
                ),
        );

        let mut surface = RecordingSurface::new();
        let mut target = DrawTarget::new(&mut surface, Rect::new(0, 0, 320, 180));
        world.draw(root, &mut target);

        let alphas: Vec<f32> = surface.calls.iter().map(|c| c.alpha).collect();
        assert_eq!(alphas, [0.5, 0.25]);
    }

    #[test]
    fn test_zero_alpha_or_invisible_prunes_subtree() {
        let log = new_log();
        let mut world = World::new();
        let root = world.spawn(
            GameObject::new("root")
                .with_child(
                    GameObject::new("clear")
                        .with_alpha(0.0)
                        .with_child(
                            GameObject::new("under_clear").with_component(Tracer::new("a", &log)),
                        ),
                )
                .with_child(
                    GameObject::new("hidden")
                        .with_visible(false)
                        .with_child(
                            GameObject::new("under_hidden").with_component(Tracer::new("b", &log)),
                        ),
                )
                .with_child(GameObject::new("shown").with_component(Tracer::new("c", &log))),
        );

        let mut surface = RecordingSurface::new();
        let mut target = DrawTarget::new(&mut surface, Rect::new(0, 0, 320, 180));
        world.draw(root, &mut target);

        assert_eq!(*log.lock().unwrap(), ["c:draw"]);
        assert_eq!(surface.calls.len(), 1);
    }

    #[test]
    fn test_component_alpha_applies_to_draw() {
        let log = new_log();
        let mut tracer = Tracer::new("faded", &log);
        tracer.state.alpha = 0.4;
        let mut world = World::new();
        let root = world.spawn(GameObject::new("root").with_alpha(0.5).with_component(tracer));

        let mut surface = RecordingSurface::new();
        let mut target = DrawTarget::new(&mut surface, Rect::new(0, 0, 320, 180));
        world.draw(root, &mut target);

        assert!((surface.calls[0].alpha - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_children_added_during_update_wait_a_frame() {
        let mut world = World::new();
        let root = world.spawn(GameObject::new("root").with_component(Spawner {
            state: ComponentState::default(),
        }));

        let mut events = EventQueue::new();
        world.update(root, &mut events, FrameTime::from_millis(16.0));
        assert_eq!(world.children(root).len(), 1);

        world.update(root, &mut events, FrameTime::from_millis(16.0));
        assert_eq!(world.children(root).len(), 2);
        assert_eq!(world.component_count(root), 1);
    }

    #[test]
    fn test_load_stops_at_first_error() {
        let log = new_log();
        let mut world = World::new();
        let root = world.spawn(
            GameObject::new("root")
                .with_component(Tracer::new("broken", &log))
                .with_component(Tracer::new("after", &log))
                .with_child(GameObject::new("child").with_component(Tracer::new("child", &log))),
        );

        let mut services = Services::new();
        let result = world.load_content(root, &mut services);

        assert!(matches!(result, Err(ContentError::UnknownResourceKey(_))));
        assert_eq!(*log.lock().unwrap(), ["broken:load"]);
    }

    #[test]
    fn test_content_phases_ignore_flags() {
        let log = new_log();
        let mut world = World::new();
        let root = world.spawn(
            GameObject::new("root")
                .with_active(false)
                .with_visible(false)
                .with_component(Tracer::new("root", &log)),
        );

        world.load_content(root, &mut Services::new()).unwrap();

        assert_eq!(*log.lock().unwrap(), ["root:load"]);
    }
}
