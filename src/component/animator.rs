//! Frame-based sprite animation
//!
//! A [`FrameAnimator`] walks the frames of a [`FrameAnimation`], holding each
//! for its duration. Time left over when a frame ends is carried into the next
//! frame, so playback does not drift with uneven frame steps; one long step
//! can pass several frames.
//!
//! Looping: `loops < 0` repeats forever and reports `animation_finished` on
//! every wrap. Otherwise the animation plays `loops` times (at least once),
//! reports `animation_finished` once and holds on its last frame.

use std::any::Any;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::core::events::Event;
use crate::core::time::FrameTime;
use crate::timing::Timer;

use super::sprite::GameSprite;
use super::{ComponentState, ContentContext, GameComponent, UpdateContext};

// ============================================================================
// Animation data
// ============================================================================

/// One step of an animation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationFrame {
    /// Atlas frame to show
    pub frame_id: usize,
    /// How long to show it, in milliseconds
    pub duration: u32,
    /// Draw offset while this frame shows
    #[serde(default)]
    pub offset: Vec2,
}

impl AnimationFrame {
    #[must_use]
    pub const fn new(frame_id: usize, duration: u32) -> Self {
        Self {
            frame_id,
            duration,
            offset: Vec2::ZERO,
        }
    }

    #[must_use]
    pub fn with_offset(mut self, offset: Vec2) -> Self {
        self.offset = offset;
        self
    }
}

/// Named frame sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameAnimation {
    pub name: String,
    /// Number of plays; negative loops forever
    #[serde(default)]
    pub loops: i32,
    pub frames: Vec<AnimationFrame>,
}

impl FrameAnimation {
    pub fn new(name: impl Into<String>, loops: i32, frames: Vec<AnimationFrame>) -> Self {
        Self {
            name: name.into(),
            loops,
            frames,
        }
    }

    /// Check if the animation loops forever
    #[must_use]
    pub const fn is_infinite(&self) -> bool {
        self.loops < 0
    }

    /// Total length of one play, in milliseconds
    #[must_use]
    pub fn duration(&self) -> u32 {
        self.frames.iter().map(|f| f.duration).sum()
    }
}

// ============================================================================
// Animator
// ============================================================================

/// What one update did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnimationProgress {
    /// Frame changes during the update
    pub frames_advanced: usize,
    /// Whether the animation finished (or wrapped, when infinite)
    pub finished: bool,
}

/// Outcome of passing one frame boundary
enum Advance {
    Next,
    /// An infinite animation went back to frame 0
    Wrapped,
    /// A finite animation played its last loop
    Finished,
}

/// Plays a [`FrameAnimation`]
pub struct FrameAnimator {
    animation: Option<FrameAnimation>,
    frame_index: usize,
    current_loop: u32,
    timer: Timer,
    speed: f32,
    frozen: bool,
    /// Fired with the new atlas frame id whenever the frame changes
    pub frame_updated: Event<usize>,
    /// Fired when the animation finishes, or on every wrap when infinite
    pub animation_finished: Event<()>,
}

impl FrameAnimator {
    /// Create an animator with nothing to play
    #[must_use]
    pub fn new() -> Self {
        Self {
            animation: None,
            frame_index: 0,
            current_loop: 0,
            timer: Timer::new(1),
            speed: 1.0,
            frozen: false,
            frame_updated: Event::new(),
            animation_finished: Event::new(),
        }
    }

    /// Create an animator playing `animation` from its first frame
    #[must_use]
    pub fn with_animation(animation: FrameAnimation) -> Self {
        let mut animator = Self::new();
        animator.set_animation(animation);
        animator
    }

    /// Swap the animation, restarting at frame 0 and loop 0
    pub fn set_animation(&mut self, animation: FrameAnimation) {
        self.animation = Some(animation);
        self.current_loop = 0;
        self.frozen = false;
        self.start_frame(0);
    }

    #[must_use]
    pub fn animation(&self) -> Option<&FrameAnimation> {
        self.animation.as_ref()
    }

    #[must_use]
    pub const fn frame_index(&self) -> usize {
        self.frame_index
    }

    /// Jump to a frame, restarting its timer. Indices past the end select 0.
    pub fn set_frame_index(&mut self, index: usize) {
        let len = self.frame_count();
        self.start_frame(if index < len { index } else { 0 });
    }

    #[must_use]
    pub fn current_frame(&self) -> Option<&AnimationFrame> {
        self.animation.as_ref()?.frames.get(self.frame_index)
    }

    #[must_use]
    pub const fn current_loop(&self) -> u32 {
        self.current_loop
    }

    /// Get playback speed
    #[must_use]
    pub const fn speed(&self) -> f32 {
        self.speed
    }

    /// Set playback speed; negative values are treated as zero
    pub fn set_speed(&mut self, speed: f32) {
        self.speed = speed.max(0.0);
        self.timer.set_speed(self.speed);
    }

    /// Check if a finite animation has played out
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.frozen
    }

    fn frame_count(&self) -> usize {
        self.animation.as_ref().map_or(0, |a| a.frames.len())
    }

    fn start_frame(&mut self, index: usize) {
        self.frame_index = index;
        let duration = self.current_frame().map_or(1, |f| f.duration);
        self.timer = Timer::new(duration).with_speed(self.speed);
    }

    /// Advance playback by one frame step
    pub fn update(&mut self, time: FrameTime) -> AnimationProgress {
        let mut progress = AnimationProgress::default();
        if self.frozen || self.frame_count() == 0 {
            return progress;
        }

        let mut overflow = self.timer.update(time);
        while let Some(carry) = overflow {
            match self.advance_frame() {
                Advance::Next => {}
                Advance::Wrapped => progress.finished = true,
                Advance::Finished => {
                    progress.finished = true;
                    break;
                }
            }
            progress.frames_advanced += 1;
            overflow = self.timer.set_current_time(carry);
        }
        progress
    }

    /// Move to the next frame, handling wrap and loop counting
    fn advance_frame(&mut self) -> Advance {
        let Some(animation) = &self.animation else {
            return Advance::Finished;
        };
        let len = animation.frames.len();
        let loops = animation.loops;

        let next = self.frame_index + 1;
        if next < len {
            self.start_frame(next);
            self.emit_frame();
            return Advance::Next;
        }

        if loops < 0 {
            self.start_frame(0);
            self.animation_finished.emit(&());
            self.emit_frame();
            return Advance::Wrapped;
        }

        self.current_loop += 1;
        if self.current_loop >= loops.max(1).unsigned_abs() {
            self.frozen = true;
            self.animation_finished.emit(&());
            return Advance::Finished;
        }

        self.start_frame(0);
        self.emit_frame();
        Advance::Next
    }

    fn emit_frame(&mut self) {
        if let Some(frame_id) = self.current_frame().map(|f| f.frame_id) {
            self.frame_updated.emit(&frame_id);
        }
    }
}

impl Default for FrameAnimator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FrameAnimator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameAnimator")
            .field("animation", &self.animation.as_ref().map(|a| a.name.as_str()))
            .field("frame_index", &self.frame_index)
            .field("current_loop", &self.current_loop)
            .field("speed", &self.speed)
            .field("finished", &self.frozen)
            .finish()
    }
}

// ============================================================================
// Sprite animator
// ============================================================================

/// Drives the sibling [`GameSprite`]'s frame from a set of named animations
#[derive(Debug)]
pub struct SpriteAnimator {
    state: ComponentState,
    animations: Vec<FrameAnimation>,
    animation_index: usize,
    queued: Option<usize>,
    animator: FrameAnimator,
}

impl SpriteAnimator {
    /// Start playing `animations[index]`
    pub fn new(animations: Vec<FrameAnimation>, index: usize) -> Self {
        let mut animator = FrameAnimator::new();
        let index = if index < animations.len() { index } else { 0 };
        if let Some(animation) = animations.get(index) {
            animator.set_animation(animation.clone());
        }
        Self {
            state: ComponentState::default(),
            animations,
            animation_index: index,
            queued: None,
            animator,
        }
    }

    #[must_use]
    pub fn with_speed(mut self, speed: f32) -> Self {
        self.set_speed(speed);
        self
    }

    #[must_use]
    pub fn animations(&self) -> &[FrameAnimation] {
        &self.animations
    }

    #[must_use]
    pub fn current_animation(&self) -> Option<&FrameAnimation> {
        self.animations.get(self.animation_index)
    }

    #[must_use]
    pub fn animator(&self) -> &FrameAnimator {
        &self.animator
    }

    /// Mutable access, for subscribing to the animator's events
    pub fn animator_mut(&mut self) -> &mut FrameAnimator {
        &mut self.animator
    }

    #[must_use]
    pub fn speed(&self) -> f32 {
        self.animator.speed()
    }

    pub fn set_speed(&mut self, speed: f32) {
        self.animator.set_speed(speed);
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.animations.iter().position(|a| a.name == name)
    }

    /// Switch animation by name. With `continuing`, the frame index carries
    /// over when the new animation is long enough. Returns false for an
    /// unknown name.
    pub fn set_animation(&mut self, name: &str, continuing: bool) -> bool {
        let Some(index) = self.index_of(name) else {
            log::debug!("SpriteAnimator has no animation '{name}'");
            return false;
        };
        self.apply(index, continuing);
        true
    }

    /// Play `name` once the current animation finishes
    pub fn queue_animation(&mut self, name: &str) -> bool {
        match self.index_of(name) {
            Some(index) => {
                self.queued = Some(index);
                true
            }
            None => false,
        }
    }

    fn apply(&mut self, index: usize, continuing: bool) {
        let Some(animation) = self.animations.get(index) else {
            return;
        };
        let frame = self.animator.frame_index();
        self.animation_index = index;
        self.animator.set_animation(animation.clone());
        if continuing {
            self.animator.set_frame_index(frame);
        }
    }

    fn sync_sprite(&self, sprite: &mut GameSprite) {
        if let Some(frame) = self.animator.current_frame() {
            sprite.set_frame(frame.frame_id);
            sprite.frame_offset = frame.offset;
        }
    }
}

impl GameComponent for SpriteAnimator {
    fn type_name(&self) -> &'static str {
        "SpriteAnimator"
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
        match ctx.siblings.get_mut::<GameSprite>() {
            Some(sprite) => self.sync_sprite(sprite),
            None => log::warn!("SpriteAnimator on {} has no GameSprite to drive", ctx.object),
        }
    }

    fn update(&mut self, ctx: &mut UpdateContext<'_>) {
        let progress = self.animator.update(ctx.time);
        if progress.finished
            && let Some(queued) = self.queued.take()
        {
            self.apply(queued, false);
        }
        if let Some(sprite) = ctx.siblings.get_mut::<GameSprite>() {
            self.sync_sprite(sprite);
        }
    }
}
