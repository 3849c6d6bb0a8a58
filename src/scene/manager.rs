//! Scene switching
//!
//! The [`SceneManager`] owns the current scene and the shared [`Services`].
//! A scene change looks the key up in the creator table, then either builds
//! the new scene immediately or, with a [`ScreenTransition`] installed, hands
//! the build (and the services it needs) to the transition's worker. The
//! current scene keeps updating while the screen covers, is frozen while the
//! screen is held covered, and is replaced on the main thread once the worker
//! returns.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::assets::Services;
use crate::core::events::SceneEvent;
use crate::core::time::FrameTime;
use crate::render::{DrawSurface, Rect};

use super::document::SceneError;
use super::scene::{DEFAULT_VIEWPORT, Scene};
use super::transition::ScreenTransition;

/// Builds a scene from its arguments
pub type SceneCreator =
    Arc<dyn Fn(&mut Services, &[String]) -> Result<Scene, SceneError> + Send + Sync>;

/// What a transition worker hands back: the borrowed services and the new scene
pub type SceneBuild = (Services, Result<Scene, SceneError>);

/// Owns the active scene and swaps it on request
pub struct SceneManager {
    services: Option<Services>,
    creators: FxHashMap<String, SceneCreator>,
    transition: Option<ScreenTransition<SceneBuild>>,
    current: Option<Scene>,
    current_key: Option<String>,
    queued_key: Option<String>,
    viewport: Rect,
}

/// Create, load and wake a scene
fn build_scene(
    creator: &SceneCreator,
    services: &mut Services,
    key: &str,
    args: &[String],
) -> Result<Scene, SceneError> {
    let mut scene = creator(services, args)?;
    scene.load_content(services)?;
    scene.awake(services);
    log::debug!("Built scene '{key}'");
    Ok(scene)
}

impl SceneManager {
    pub fn new(services: Services) -> Self {
        Self {
            services: Some(services),
            creators: FxHashMap::default(),
            transition: None,
            current: None,
            current_key: None,
            queued_key: None,
            viewport: DEFAULT_VIEWPORT,
        }
    }

    /// Cover scene changes with `transition`
    #[must_use]
    pub fn with_transition(mut self, transition: ScreenTransition<SceneBuild>) -> Self {
        self.transition = Some(transition);
        self
    }

    /// Rectangle the transition effect covers, in unscaled pixels
    #[must_use]
    pub fn with_viewport(mut self, viewport: Rect) -> Self {
        self.viewport = viewport;
        self
    }

    /// Replace the transition. Refused while a change is running.
    pub fn set_transition(&mut self, transition: Option<ScreenTransition<SceneBuild>>) -> bool {
        if self.is_changing_scene() {
            return false;
        }
        self.transition = transition;
        true
    }

    #[must_use]
    pub fn transition(&self) -> Option<&ScreenTransition<SceneBuild>> {
        self.transition.as_ref()
    }

    pub fn transition_mut(&mut self) -> Option<&mut ScreenTransition<SceneBuild>> {
        self.transition.as_mut()
    }

    /// Register a scene creator, returning the one it replaces
    pub fn register<F>(&mut self, key: impl Into<String>, creator: F) -> Option<SceneCreator>
    where
        F: Fn(&mut Services, &[String]) -> Result<Scene, SceneError> + Send + Sync + 'static,
    {
        self.creators.insert(key.into(), Arc::new(creator))
    }

    #[must_use]
    pub fn has_creator(&self, key: &str) -> bool {
        self.creators.contains_key(key)
    }

    #[must_use]
    pub fn current_scene(&self) -> Option<&Scene> {
        self.current.as_ref()
    }

    pub fn current_scene_mut(&mut self) -> Option<&mut Scene> {
        self.current.as_mut()
    }

    #[must_use]
    pub fn current_key(&self) -> Option<&str> {
        self.current_key.as_deref()
    }

    /// Key of the scene being built
    #[must_use]
    pub fn queued_key(&self) -> Option<&str> {
        self.queued_key.as_deref()
    }

    /// Shared services; `None` while a worker holds them
    #[must_use]
    pub fn services(&self) -> Option<&Services> {
        self.services.as_ref()
    }

    pub fn services_mut(&mut self) -> Option<&mut Services> {
        self.services.as_mut()
    }

    #[must_use]
    pub fn is_changing_scene(&self) -> bool {
        self.queued_key.is_some()
            || self.transition.as_ref().is_some_and(ScreenTransition::is_active)
    }

    /// Whether the current scene is drawn this frame
    #[must_use]
    pub fn is_scene_visible(&self) -> bool {
        match &self.transition {
            Some(transition) => !transition.is_holding(),
            None => self.queued_key.is_none(),
        }
    }

    // ========================================================================
    // Changing scenes
    // ========================================================================

    fn creator(&self, key: &str) -> Result<SceneCreator, SceneError> {
        self.creators
            .get(key)
            .cloned()
            .ok_or_else(|| SceneError::UnknownScene(key.to_string()))
    }

    /// Switch to the scene registered as `key`, through the transition if
    /// one is installed
    pub fn change_scene(&mut self, key: &str, args: Vec<String>) -> Result<(), SceneError> {
        if self.transition.is_none() {
            return self.change_scene_now(key, &args);
        }
        if self.is_changing_scene() {
            let running = self.queued_key.as_deref().or(self.current_key.as_deref()).unwrap_or(key);
            return Err(SceneError::ChangeInProgress(running.to_string()));
        }
        let creator = self.creator(key)?;
        let Some(transition) = self.transition.as_mut() else {
            return Err(SceneError::ServicesUnavailable);
        };
        let mut services = self.services.take().ok_or(SceneError::ServicesUnavailable)?;

        log::info!("Changing scene to '{key}'");
        let owned_key = key.to_string();
        transition.activate(Some(Box::new(move || {
            // The services go back to the manager even if the creator panics
            let result = panic::catch_unwind(AssertUnwindSafe(|| {
                build_scene(&creator, &mut services, &owned_key, &args)
            }))
            .unwrap_or_else(|_| {
                log::error!("Building scene '{owned_key}' panicked");
                Err(SceneError::WorkerPanicked)
            });
            (services, result)
        })));
        self.queued_key = Some(key.to_string());
        Ok(())
    }

    /// Build `key` on this thread and swap it in immediately
    pub fn change_scene_now(&mut self, key: &str, args: &[String]) -> Result<(), SceneError> {
        if let Some(queued) = &self.queued_key {
            return Err(SceneError::ChangeInProgress(queued.clone()));
        }
        let creator = self.creator(key)?;
        let services = self.services.as_mut().ok_or(SceneError::ServicesUnavailable)?;

        log::info!("Changing scene to '{key}'");
        self.queued_key = Some(key.to_string());
        let result = build_scene(&creator, services, key, args);
        self.finish_change(result)
    }

    /// Make the built scene current and put the old one to sleep
    fn finish_change(&mut self, result: Result<Scene, SceneError>) -> Result<(), SceneError> {
        let key = self.queued_key.take();
        let scene = match result {
            Ok(scene) => scene,
            Err(e) => {
                log::error!("Failed to build scene '{}': {e}", key.as_deref().unwrap_or_default());
                return Err(e);
            }
        };

        if let Some(mut old) = self.current.replace(scene)
            && let Some(services) = self.services.as_mut()
            && let Err(e) = old.sleep(services)
        {
            log::warn!("Unloading scene '{}' failed: {e}", old.name());
        }
        log::info!("Scene '{}' is now current", key.as_deref().unwrap_or_default());
        self.current_key = key;
        Ok(())
    }

    // ========================================================================
    // Frame
    // ========================================================================

    /// Advance the transition and the current scene, then act on the
    /// scene's change requests
    pub fn update(&mut self, time: FrameTime) {
        let output = self.transition.as_mut().and_then(|t| t.update(time));
        match output {
            Some(Ok((services, result))) => {
                self.services = Some(services);
                // Already logged
                let _ = self.finish_change(result);
            }
            Some(Err(e)) => {
                self.queued_key = None;
                log::error!("Scene change failed, services were lost: {e}");
            }
            None => {}
        }

        if self.transition.as_ref().is_some_and(ScreenTransition::is_holding) {
            return;
        }
        let Some(scene) = self.current.as_mut() else {
            return;
        };
        scene.update(time);

        for event in scene.drain_events() {
            match event {
                SceneEvent::ChangeRequested { key, args } => {
                    if let Err(e) = self.change_scene(&key, args) {
                        log::warn!("Scene change to '{key}' rejected: {e}");
                    }
                }
            }
        }
    }

    /// Draw the current scene, if visible, then the transition over it
    pub fn draw(&mut self, surface: &mut dyn DrawSurface, viewport_scale: f32) {
        if self.is_scene_visible()
            && let Some(scene) = self.current.as_mut()
        {
            scene.draw(surface, viewport_scale);
        }
        if let Some(transition) = self.transition.as_mut() {
            transition.draw(surface, self.viewport, viewport_scale);
        }
    }

    /// Put the current scene to sleep and drop it
    pub fn shutdown(&mut self) {
        if let Some(mut scene) = self.current.take()
            && let Some(services) = self.services.as_mut()
            && let Err(e) = scene.sleep(services)
        {
            log::warn!("Unloading scene '{}' failed: {e}", scene.name());
        }
        self.current_key = None;
    }
}

impl fmt::Debug for SceneManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SceneManager")
            .field("current_key", &self.current_key)
            .field("queued_key", &self.queued_key)
            .field("creators", &self.creators.len())
            .field("transition", &self.transition)
            .finish()
    }
}
