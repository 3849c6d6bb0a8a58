//! Eased, timed changes to the owner's transform
//!
//! An [`ObjectTransition`] adds `delta × (eased(now) − eased(before))` to one
//! transform field every update, so over a full run the field moves by exactly
//! `delta`. On completion the options decide what happens next:
//!
//! - `CYCLIC` restarts the timer. Without `CONTINUOUS` the change is rewound
//!   first, so the field oscillates around its baseline instead of drifting.
//! - `SNAPPING` rounds the field to the nearest integer when it is within
//!   [`SNAPPING_TOLERANCE`] of one.
//!
//! A transition without `CYCLIC` runs once and then stays completed.

use std::any::Any;
use std::ops::BitOr;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::core::events::Event;
use crate::core::time::FrameTime;
use crate::object::Transform2D;
use crate::timing::{Easing, Timer};

use super::{ComponentState, GameComponent, UpdateContext};

/// Distance from an integer within which snapping rounds
pub const SNAPPING_TOLERANCE: f32 = 0.00625;

/// Completion behaviour flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransitionOptions(u8);

impl TransitionOptions {
    pub const NONE: Self = Self(0);
    /// Keep the change when a cycle restarts
    pub const CONTINUOUS: Self = Self(1);
    /// Restart on completion
    pub const CYCLIC: Self = Self(2);
    /// Round to whole numbers on completion
    pub const SNAPPING: Self = Self(4);

    const ALL_BITS: u8 = 1 | 2 | 4;

    /// Build from raw bits, dropping unknown ones
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & Self::ALL_BITS)
    }

    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }

    pub fn set(&mut self, other: Self, enabled: bool) {
        if enabled {
            self.insert(other);
        } else {
            self.remove(other);
        }
    }
}

impl BitOr for TransitionOptions {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Which field moves, and by how much over one full run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TransitionDelta {
    Position(Vec2),
    Origin(Vec2),
    Dimensions(Vec2),
    Rotation(f32),
    Scale(f32),
}

fn snap(value: f32) -> f32 {
    let rounded = value.round();
    if (value - rounded).abs() < SNAPPING_TOLERANCE {
        rounded
    } else {
        value
    }
}

fn snap_vec(value: Vec2) -> Vec2 {
    Vec2::new(snap(value.x), snap(value.y))
}

impl TransitionDelta {
    /// Add `amount` times the delta to the field
    pub fn apply(&self, transform: &mut Transform2D, amount: f32) {
        match *self {
            Self::Position(d) => transform.position += d * amount,
            Self::Origin(d) => transform.origin += d * amount,
            Self::Dimensions(d) => transform.dimensions += d * amount,
            Self::Rotation(d) => transform.rotation += d * amount,
            Self::Scale(d) => transform.scale += d * amount,
        }
    }

    /// Round the field to whole numbers where it is within tolerance
    pub fn snap(&self, transform: &mut Transform2D) {
        match self {
            Self::Position(_) => transform.position = snap_vec(transform.position),
            Self::Origin(_) => transform.origin = snap_vec(transform.origin),
            Self::Dimensions(_) => transform.dimensions = snap_vec(transform.dimensions),
            Self::Rotation(_) => transform.rotation = snap(transform.rotation),
            Self::Scale(_) => transform.scale = snap(transform.scale),
        }
    }
}

/// Whether a transition still has work to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransitionState {
    #[default]
    Running,
    /// A non-cyclic transition that has run its course
    Completed,
}

/// Tweens one transform field of the owner
#[derive(Debug)]
pub struct ObjectTransition {
    state: ComponentState,
    delta: TransitionDelta,
    options: TransitionOptions,
    easing: Easing,
    timer: Timer,
    status: TransitionState,
}

impl ObjectTransition {
    /// Move by `delta` over `duration_ms`
    #[must_use]
    pub fn new(
        duration_ms: u32,
        delta: TransitionDelta,
        options: TransitionOptions,
        easing: Easing,
    ) -> Self {
        Self {
            state: ComponentState::default(),
            delta,
            options,
            easing,
            timer: Timer::new(duration_ms),
            status: TransitionState::Running,
        }
    }

    /// Set the playback speed and rewind; negative speeds play backwards
    #[must_use]
    pub fn with_speed(mut self, speed: f32) -> Self {
        self.timer.set_speed(speed);
        self.timer.reset();
        self
    }

    #[must_use]
    pub fn delta(&self) -> TransitionDelta {
        self.delta
    }

    pub fn set_delta(&mut self, delta: TransitionDelta) {
        self.delta = delta;
    }

    #[must_use]
    pub fn options(&self) -> TransitionOptions {
        self.options
    }

    pub fn options_mut(&mut self) -> &mut TransitionOptions {
        &mut self.options
    }

    #[must_use]
    pub fn easing(&self) -> Easing {
        self.easing
    }

    #[must_use]
    pub fn speed(&self) -> f32 {
        self.timer.speed()
    }

    pub fn set_speed(&mut self, speed: f32) {
        self.timer.set_speed(speed);
    }

    #[must_use]
    pub fn status(&self) -> TransitionState {
        self.status
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.status == TransitionState::Completed
    }

    /// Fired with the overflow each time a run completes
    pub fn transition_complete(&mut self) -> &mut Event<f32> {
        &mut self.timer.time_exceeded
    }

    /// Rewind and run again
    pub fn restart(&mut self) {
        self.timer.reset();
        self.status = TransitionState::Running;
    }

    fn eased(&self) -> f32 {
        self.easing.apply(self.timer.proportion())
    }

    /// Advance by one frame step, editing `transform`
    pub fn step(&mut self, transform: &mut Transform2D, time: FrameTime) {
        if self.status == TransitionState::Completed {
            return;
        }

        let before = self.eased();
        let completed = self.timer.update(time).is_some();
        self.delta.apply(transform, self.eased() - before);

        if !completed {
            return;
        }
        if self.options.contains(TransitionOptions::CYCLIC) {
            self.timer.reset();
            if !self.options.contains(TransitionOptions::CONTINUOUS) {
                let rewind = if self.timer.speed() >= 0.0 { -1.0 } else { 1.0 };
                self.delta.apply(transform, rewind);
            }
        } else {
            self.status = TransitionState::Completed;
        }
        if self.options.contains(TransitionOptions::SNAPPING) {
            self.delta.snap(transform);
        }
    }
}

impl GameComponent for ObjectTransition {
    fn type_name(&self) -> &'static str {
        "ObjectTransition"
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
        if let Ok(mut transform) = ctx.world.transform_mut(ctx.object) {
            self.step(&mut transform, ctx.time);
        }
    }
}
