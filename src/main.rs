//! Headless demo: a title scene built from a document hands over to a level
//! scene behind a fade, with draw calls recorded instead of rendered. A
//! scripted press of the skip key cuts the title short.

use std::any::Any;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use cryosis::assets::{Texture, TextureFont, TextureFontChar};
use cryosis::component::registry::parse_params;
use cryosis::input::{Control, InputHandler, InputState};
use cryosis::prelude::*;
use cryosis::render::TextureHandle;
use rustc_hash::FxHashMap;

const FRAMES: u32 = 180;
const VIEWPORT_SCALE: f32 = 2.0;
const ESCAPE: Control = Control::Key(27);
/// Frame at which the demo "presses" escape
const SKIP_FRAME: u32 = 45;

const TITLE_SCENE: &str = r#"(
    name: "title",
    objects: [
        (
            name: "Logo",
            transform: (position: (160.0, 60.0), dimensions: (96.0, 32.0), origin: (48.0, 16.0)),
            components: [
                (
                    type: "ObjectTransition",
                    params: {
                        "duration_ms": 800,
                        "delta": { "Position": [0.0, 8.0] },
                        "options": 2,
                        "easing": { "function": "Sinusoidal", "direction": "InOut" },
                    },
                ),
            ],
        ),
        (
            name: "Director",
            components: [
                (type: "Director", params: { "target": "level", "after_ms": 1200 }),
            ],
        ),
    ],
)"#;

/// Hands out texture ids without decoding anything
#[derive(Debug, Default)]
struct HeadlessTextures {
    next: AtomicU64,
}

impl TextureProvider for HeadlessTextures {
    fn load_texture(&self, path: &Path) -> Result<Texture, ContentError> {
        let id = self.next.fetch_add(1, Ordering::Relaxed);
        log::debug!("Texture {id} for {}", path.display());
        Ok(Texture {
            handle: TextureHandle(id),
            width: 128,
            height: 32,
        })
    }
}

/// Requests a scene change once enough time has passed
#[derive(Debug)]
struct Director {
    state: ComponentState,
    target: String,
    remaining: Timer,
    requested: bool,
}

#[derive(Deserialize)]
struct DirectorParams {
    target: String,
    after_ms: u32,
}

impl GameComponent for Director {
    fn type_name(&self) -> &'static str {
        "Director"
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
        if self.requested || self.remaining.update(ctx.time).is_none() {
            return;
        }
        self.requested = true;
        ctx.events.push(SceneEvent::ChangeRequested {
            key: self.target.clone(),
            args: vec!["from-title".to_string()],
        });
    }
}

fn director_factory(params: &Value) -> Result<Box<dyn GameComponent>, SceneError> {
    let p: DirectorParams = parse_params("Director", params)?;
    Ok(Box::new(Director {
        state: ComponentState::default(),
        target: p.target,
        remaining: Timer::new(p.after_ms),
        requested: false,
    }))
}

fn title_scene(_services: &mut Services, _args: &[String]) -> Result<Scene, SceneError> {
    let mut registry = ComponentRegistry::with_defaults();
    registry.register("Director", director_factory);
    let document = SceneDocument::from_ron_str(TITLE_SCENE)?;
    Scene::from_document(&document, &registry)
}

fn level_scene(services: &mut Services, args: &[String]) -> Result<Scene, SceneError> {
    log::info!("Building level with {args:?}");
    let texture =
        lock_loader(services.require::<SharedTextureLoader>()?)?.load_content("Player.png")?;
    let frames = (0..4)
        .map(|i| TextureFrame::new(Rect::new(i * 32, 0, 32, 32), FlipMode::None))
        .collect();
    let atlas = AssetHandle::new(TextureAtlas::new(texture, frames));

    let mut sprite = GameSprite::empty();
    sprite.set_atlas(atlas.clone());
    let run = FrameAnimation::new(
        "run",
        -1,
        (1..=4).map(|frame| AnimationFrame::new(frame, 120)).collect(),
    );

    // Digits 0-9 are frames 1..=10 of a second atlas over the same texture
    let digits = (0..10)
        .map(|i| TextureFrame::new(Rect::new(i * 8, 0, 8, 8), FlipMode::None))
        .collect();
    let glyphs = AssetHandle::new(TextureAtlas::new(atlas.texture().clone(), digits));
    let characters: FxHashMap<char, TextureFontChar> = ('0'..='9')
        .enumerate()
        .map(|(i, c)| (c, TextureFontChar::new(i + 1, 7)))
        .collect();
    let mut score =
        TextComponent::without_font("§4278255360000\n0", Color::WHITE, TextCentering::Block);
    score.set_font(AssetHandle::new(TextureFont::new(glyphs, characters, 1, 4, 9)));

    let mut sky = ScrollingSprite::empty(Vec2::new(-12.0, 0.0)).with_frame(1).with_depth(1.0);
    sky.set_atlas(atlas);

    let mut scene = Scene::new("level");
    scene.spawn(
        GameObject::new("Sky")
            .with_dimensions(Vec2::new(320.0, 32.0))
            .with_component(sky),
    )?;
    scene.spawn(GameObject::new("Score").with_position(Vec2::new(8.0, 8.0)).with_component(score))?;
    let player = scene.spawn(
        GameObject::new("Player")
            .with_position(Vec2::new(40.0, 120.0))
            .with_dimensions(Vec2::new(32.0, 32.0))
            .with_origin(Vec2::new(16.0, 16.0))
            .with_component(sprite)
            .with_component(SpriteAnimator::new(vec![run], 0))
            .with_component(ObjectTransition::new(
                3000,
                TransitionDelta::Position(Vec2::new(240.0, 0.0)),
                TransitionOptions::SNAPPING,
                Easing::new(EasingFunction::Quadratic, EasingDirection::InOut),
            )),
    )?;
    let camera = scene.spawn(
        GameObject::new("Camera")
            .with_dimensions(Vec2::new(320.0, 180.0))
            .with_component(Camera::new().with_focus_offset(Vec2::new(-160.0, -90.0))),
    )?;
    Camera::focus_on(scene.world_mut(), camera, Some(player))?;
    scene.set_camera(Some(camera));
    Ok(scene)
}

fn load_config() -> EngineConfig {
    let Some(path) = std::env::args().nth(1) else {
        return EngineConfig::default();
    };
    match EngineConfig::load_ron(&path) {
        Ok(config) => config,
        Err(e) => {
            log::warn!("Using default config, could not load {path}: {e}");
            EngineConfig::default()
        }
    }
}

fn main() {
    env_logger::init();

    let config = load_config();
    let services = Services::standard(&config, Arc::new(HeadlessTextures::default()));
    let mut manager = SceneManager::new(services)
        .with_transition(ScreenTransition::from_config(&config))
        .with_viewport(config.viewport);
    manager.register("title", title_scene);
    manager.register("level", level_scene);

    if let Err(e) = manager.change_scene_now("title", &[]) {
        log::error!("Could not start: {e}");
        return;
    }

    let mut input = InputHandler::new();
    input.bind("skip", ESCAPE);
    let mut keys = InputState::new();

    let mut surface = RecordingSurface::new();
    let mut clock = FrameClock::new();
    for frame in 0..FRAMES {
        let time = clock.tick();
        keys.update();
        match frame {
            SKIP_FRAME => keys.press(ESCAPE),
            f if f == SKIP_FRAME + 3 => keys.release(ESCAPE),
            _ => {}
        }
        input.update(&keys, time);

        let on_title = manager.current_key() == Some("title");
        if input.is_new_press("skip") && on_title && !manager.is_changing_scene() {
            log::info!("Skipping title");
            if let Err(e) = manager.change_scene("level", vec!["skipped".to_string()]) {
                log::warn!("Could not skip: {e}");
            }
        }

        manager.update(time);
        manager.draw(&mut surface, VIEWPORT_SCALE);
        surface.present();

        if frame % 30 == 0 {
            log::info!(
                "frame {frame}: scene {:?}, {} draw calls",
                manager.current_key(),
                surface.last_frame.len()
            );
        }
        thread::sleep(Duration::from_millis(16));
    }

    manager.shutdown();
    log::info!("Presented {} frames", surface.frames_presented);
}
