//! A running scene: one world, its registered objects and its event queue

use crate::assets::{ContentError, Services};
use crate::component::{Camera, ComponentRegistry};
use crate::core::events::{EventQueue, SceneEvent};
use crate::core::time::FrameTime;
use crate::object::{
    ContentPhase, DrawPhase, DrawTarget, GameObject, GameObjectCollection, HierarchyError, ObjectId,
    UpdatePhase, World,
};
use crate::render::{DrawSurface, Rect};

use super::document::{SceneDocument, SceneError};

/// Default visible rectangle when no camera object is set
pub const DEFAULT_VIEWPORT: Rect = Rect::new(0, 0, 320, 180);

const UPDATE_PHASES: [UpdatePhase; 3] = [UpdatePhase::Early, UpdatePhase::Main, UpdatePhase::Late];
const DRAW_PHASES: [DrawPhase; 3] = [DrawPhase::Early, DrawPhase::Main, DrawPhase::Late];

/// Scene
#[derive(Debug)]
pub struct Scene {
    name: String,
    world: World,
    objects: GameObjectCollection,
    events: EventQueue,
    camera: Option<ObjectId>,
    viewport: Rect,
    awake: bool,
    loaded: bool,
}

impl Scene {
    /// Create a new empty scene
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            world: World::new(),
            objects: GameObjectCollection::new(),
            events: EventQueue::new(),
            camera: None,
            viewport: DEFAULT_VIEWPORT,
            awake: false,
            loaded: false,
        }
    }

    /// Build a scene from a document
    pub fn from_document(
        document: &SceneDocument,
        registry: &ComponentRegistry,
    ) -> Result<Self, SceneError> {
        let mut scene = Self::new(document.name.clone());
        document.instantiate(registry, &mut scene.world, &mut scene.objects)?;
        Ok(scene)
    }

    /// Rectangle drawn when no camera is set
    #[must_use]
    pub fn with_viewport(mut self, viewport: Rect) -> Self {
        self.viewport = viewport;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    #[must_use]
    pub fn objects(&self) -> &GameObjectCollection {
        &self.objects
    }

    pub fn events_mut(&mut self) -> &mut EventQueue {
        &mut self.events
    }

    /// Spawn an object tree and register it with the scene
    pub fn spawn(&mut self, object: GameObject) -> Result<ObjectId, HierarchyError> {
        self.objects.spawn(&mut self.world, object)
    }

    /// Register an already spawned object and its subtree
    pub fn add_object(&mut self, id: ObjectId) -> Result<(), HierarchyError> {
        self.objects.add_object(&mut self.world, id)
    }

    pub fn remove_object(&mut self, id: ObjectId) -> Result<(), HierarchyError> {
        self.objects.remove_object(&mut self.world, id)
    }

    /// Look up a registered object by name
    #[must_use]
    pub fn get_object(&self, name: &str) -> Option<ObjectId> {
        self.objects.get_object(name)
    }

    /// Draw through the bounds of this object instead of the viewport
    pub fn set_camera(&mut self, camera: Option<ObjectId>) {
        self.camera = camera;
    }

    #[must_use]
    pub fn camera(&self) -> Option<ObjectId> {
        self.camera
    }

    /// Visible world rectangle
    #[must_use]
    pub fn camera_rect(&self) -> Rect {
        self.camera
            .and_then(|id| Camera::bounds(&self.world, id).ok())
            .filter(|rect| rect.width > 0 && rect.height > 0)
            .unwrap_or(self.viewport)
    }

    /// Ask the host to switch scenes after this frame
    pub fn request_change(&mut self, key: impl Into<String>, args: Vec<String>) {
        self.events.push(SceneEvent::ChangeRequested { key: key.into(), args });
    }

    #[must_use]
    pub fn is_awake(&self) -> bool {
        self.awake
    }

    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    // ========================================================================
    // Frame
    // ========================================================================

    /// Run the three update phases over every root, then publish the events
    /// raised during them
    pub fn update(&mut self, time: FrameTime) {
        self.objects.refresh_roots(&self.world);
        let roots = self.objects.roots().to_vec();
        for phase in UPDATE_PHASES {
            for &root in &roots {
                self.world.dispatch_update(root, phase, &mut self.events, time);
            }
        }
        self.events.swap();
    }

    /// Events raised during the last update
    pub fn drain_events(&mut self) -> Vec<SceneEvent> {
        self.events.drain().collect()
    }

    /// Run the three draw phases over every root
    pub fn draw(&mut self, surface: &mut dyn DrawSurface, viewport_scale: f32) {
        let camera = self.camera_rect();
        let mut target = DrawTarget::new(surface, camera).with_viewport_scale(viewport_scale);
        let roots = self.objects.roots().to_vec();
        for phase in DRAW_PHASES {
            for &root in &roots {
                self.world.dispatch_draw(root, phase, &mut target, 1.0);
            }
        }
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    fn dispatch_roots(
        &mut self,
        phase: ContentPhase,
        services: &mut Services,
    ) -> Result<(), ContentError> {
        let roots = self.objects.roots().to_vec();
        let mut first_error = None;
        for root in roots {
            if let Err(e) = self.world.dispatch_content(root, phase, services) {
                if phase == ContentPhase::Load {
                    return Err(e);
                }
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    pub fn awake(&mut self, services: &mut Services) {
        let _ = self.dispatch_roots(ContentPhase::Awake, services);
        self.awake = true;
    }

    /// Unload content, then put every component to sleep
    pub fn sleep(&mut self, services: &mut Services) -> Result<(), ContentError> {
        let unloaded = self.unload_content(services);
        let _ = self.dispatch_roots(ContentPhase::Sleep, services);
        self.awake = false;
        unloaded
    }

    /// Load every component's content, stopping at the first failure.
    ///
    /// A failed load gives back whatever the earlier components took, so the
    /// caches hold nothing for a scene that never became loaded. Loading an
    /// already loaded scene does nothing.
    pub fn load_content(&mut self, services: &mut Services) -> Result<(), ContentError> {
        if self.loaded {
            return Ok(());
        }
        if let Err(e) = self.dispatch_roots(ContentPhase::Load, services) {
            log::warn!("Loading scene '{}' failed: {e}", self.name);
            if let Err(unload) = self.dispatch_roots(ContentPhase::Unload, services) {
                log::warn!("Rolling back scene '{}' failed: {unload}", self.name);
            }
            return Err(e);
        }
        self.loaded = true;
        log::debug!("Loaded content for scene '{}'", self.name);
        Ok(())
    }

    /// Give back loaded content; does nothing if nothing was loaded
    pub fn unload_content(&mut self, services: &mut Services) -> Result<(), ContentError> {
        if !self.loaded {
            return Ok(());
        }
        self.loaded = false;
        log::debug!("Unloading content for scene '{}'", self.name);
        self.dispatch_roots(ContentPhase::Unload, services)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::any::Any;
    use std::sync::{Arc, Mutex};

    use glam::Vec2;

    use crate::assets::testing::FakeTextures;
    use crate::assets::{SharedAtlasLoader, SharedTextureLoader};
    use crate::component::{
        ComponentState, ContentContext, DrawContext, GameComponent, GameSprite, UpdateContext,
    };
    use crate::core::config::EngineConfig;
    use crate::render::{DrawCall, RecordingSurface};

    type Log = Arc<Mutex<Vec<String>>>;

    #[derive(Debug)]
    struct Tracer {
        state: ComponentState,
        tag: &'static str,
        log: Log,
        fail_load: bool,
        change_to: Option<&'static str>,
    }

    impl Tracer {
        fn new(tag: &'static str, log: &Log) -> Self {
            Self {
                state: ComponentState::default(),
                tag,
                log: Arc::clone(log),
                fail_load: false,
                change_to: None,
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
        fn awake(&mut self, _ctx: &mut ContentContext<'_>) {
            self.record("awake");
        }
        fn sleep(&mut self, _ctx: &mut ContentContext<'_>) {
            self.record("sleep");
        }
        fn load_content(&mut self, _ctx: &mut ContentContext<'_>) -> Result<(), ContentError> {
            self.record("load");
            if self.fail_load {
                return Err(ContentError::UnknownResourceKey(self.tag.to_string()));
            }
            Ok(())
        }
        fn unload_content(&mut self, _ctx: &mut ContentContext<'_>) -> Result<(), ContentError> {
            self.record("unload");
            Ok(())
        }
        fn update(&mut self, ctx: &mut UpdateContext<'_>) {
            self.record("update");
            if let Some(key) = self.change_to.take() {
                ctx.events.push(SceneEvent::ChangeRequested {
                    key: key.to_string(),
                    args: vec!["from".into(), self.tag.to_string()],
                });
            }
        }
        fn draw(&mut self, ctx: &mut DrawContext<'_>) {
            self.record("draw");
            ctx.surface.draw(DrawCall {
                alpha: ctx.alpha,
                destination: Rect::from_position_size(ctx.to_screen(Vec2::ZERO), Vec2::ONE),
                ..DrawCall::default()
            });
        }
    }

    fn entries(log: &Log) -> Vec<String> {
        log.lock().unwrap().clone()
    }

    #[test]
    fn test_update_visits_roots_and_children() {
        let log = Log::default();
        let mut scene = Scene::new("test");
        scene
            .spawn(
                GameObject::new("a")
                    .with_component(Tracer::new("a", &log))
                    .with_child(GameObject::new("a1").with_component(Tracer::new("a1", &log))),
            )
            .unwrap();
        scene.spawn(GameObject::new("b").with_component(Tracer::new("b", &log))).unwrap();

        scene.update(FrameTime::from_millis(16.0));

        assert_eq!(entries(&log), vec!["a:update", "a1:update", "b:update"]);
    }

    #[test]
    fn test_change_requests_surface_after_update() {
        let log = Log::default();
        let mut tracer = Tracer::new("menu", &log);
        tracer.change_to = Some("level");
        let mut scene = Scene::new("menu");
        scene.spawn(GameObject::new("button").with_component(tracer)).unwrap();

        scene.update(FrameTime::from_millis(16.0));
        let events = scene.drain_events();

        assert_eq!(
            events,
            vec![SceneEvent::ChangeRequested {
                key: "level".into(),
                args: vec!["from".into(), "menu".into()],
            }]
        );
        assert!(scene.drain_events().is_empty());
    }

    #[test]
    fn test_draw_uses_camera_object() {
        let log = Log::default();
        let mut scene = Scene::new("test");
        let camera = scene
            .spawn(
                GameObject::new("camera")
                    .with_position(Vec2::new(100.0, 40.0))
                    .with_dimensions(Vec2::new(160.0, 90.0)),
            )
            .unwrap();
        scene
            .spawn(GameObject::new("faded").with_alpha(0.5).with_component(Tracer::new("p", &log)))
            .unwrap();

        assert_eq!(scene.camera_rect(), DEFAULT_VIEWPORT);
        scene.set_camera(Some(camera));
        assert_eq!(scene.camera_rect(), Rect::new(100, 40, 160, 90));

        let mut surface = RecordingSurface::new();
        scene.draw(&mut surface, 2.0);

        assert_eq!(surface.calls.len(), 1);
        assert_eq!(surface.calls[0].alpha, 0.5);
        assert_eq!(surface.calls[0].destination, Rect::new(-200, -80, 1, 1));
    }

    #[test]
    fn test_sleep_unloads_before_sleeping() {
        let log = Log::default();
        let mut scene = Scene::new("test");
        scene.spawn(GameObject::new("a").with_component(Tracer::new("a", &log))).unwrap();
        let mut services = Services::new();

        scene.awake(&mut services);
        scene.load_content(&mut services).unwrap();
        assert!(scene.is_awake() && scene.is_loaded());

        scene.sleep(&mut services).unwrap();
        // Already unloaded, nothing to do
        scene.unload_content(&mut services).unwrap();

        assert_eq!(entries(&log), vec!["a:awake", "a:load", "a:unload", "a:sleep"]);
        assert!(!scene.is_awake() && !scene.is_loaded());
    }

    #[test]
    fn test_load_stops_at_first_failing_root() {
        let log = Log::default();
        let mut failing = Tracer::new("bad", &log);
        failing.fail_load = true;
        let mut scene = Scene::new("test");
        scene.spawn(GameObject::new("bad").with_component(failing)).unwrap();
        scene.spawn(GameObject::new("good").with_component(Tracer::new("good", &log))).unwrap();

        let result = scene.load_content(&mut Services::new());

        assert_eq!(result, Err(ContentError::UnknownResourceKey("bad".into())));
        assert!(!scene.is_loaded());
        assert_eq!(entries(&log), vec!["bad:load", "bad:unload", "good:unload"]);
    }

    #[test]
    fn test_failed_load_releases_earlier_content() {
        let dir = tempfile::tempdir().unwrap();
        let atlases = dir.path().join("Graphics/Atlases");
        std::fs::create_dir_all(&atlases).unwrap();
        std::fs::write(atlases.join("hero.ron"), r#"(texture_path: "hero.png")"#).unwrap();
        let config = EngineConfig::default().with_content_root(dir.path());
        let mut services = Services::standard(&config, Arc::new(FakeTextures::default()));

        let log = Log::default();
        let mut failing = Tracer::new("bad", &log);
        failing.fail_load = true;
        let mut scene = Scene::new("test");
        scene.spawn(GameObject::new("hero").with_component(GameSprite::new("hero"))).unwrap();
        scene.spawn(GameObject::new("bad").with_component(failing)).unwrap();

        assert!(scene.load_content(&mut services).is_err());

        let atlases = services.require::<SharedAtlasLoader>().unwrap().lock().unwrap();
        assert_eq!(atlases.reference_count("hero"), None);
        assert!(atlases.is_empty());
        drop(atlases);
        let textures = services.require::<SharedTextureLoader>().unwrap();
        assert!(textures.lock().unwrap().is_empty());
    }

    #[test]
    fn test_second_load_is_ignored() {
        let log = Log::default();
        let mut scene = Scene::new("test");
        scene.spawn(GameObject::new("a").with_component(Tracer::new("a", &log))).unwrap();
        let mut services = Services::new();

        scene.load_content(&mut services).unwrap();
        scene.load_content(&mut services).unwrap();

        assert_eq!(entries(&log), vec!["a:load"]);
    }

    #[test]
    fn test_despawned_root_is_skipped() {
        let log = Log::default();
        let mut scene = Scene::new("test");
        let a = scene.spawn(GameObject::new("a").with_component(Tracer::new("a", &log))).unwrap();
        scene.world_mut().despawn(a).unwrap();

        scene.update(FrameTime::from_millis(16.0));

        assert!(entries(&log).is_empty());
        assert!(scene.objects().is_empty());
    }
}
