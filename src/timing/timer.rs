//! Millisecond countdown clock
//!
//! A [`Timer`] accumulates `speed × elapsed` into its current time, clamped to
//! `[0, target_time]`. It completes once per run: when moving forward it
//! completes on reaching `target_time`, when moving backward (negative speed)
//! on reaching zero. Completion is reported both as the return value of
//! [`Timer::update`] and through the `time_exceeded` observer list, carrying
//! the overflow (how far past the boundary the raw time went).

use std::fmt;

use crate::core::events::Event;
use crate::core::time::FrameTime;

/// Smallest allowed target time, keeps `proportion` finite
pub const MIN_TARGET_TIME: u32 = 1;

/// Millisecond timer with signed speed and a single-fire completion event
pub struct Timer {
    target_time: u32,
    current_time: f32,
    speed: f32,
    /// Fired with the overflow amount when the timer completes
    pub time_exceeded: Event<f32>,
}

impl Timer {
    /// Create a timer targeting `target_time` milliseconds, starting at zero
    #[must_use]
    pub fn new(target_time: u32) -> Self {
        Self {
            target_time: target_time.max(MIN_TARGET_TIME),
            current_time: 0.0,
            speed: 1.0,
            time_exceeded: Event::new(),
        }
    }

    /// Create a timer with an initial speed
    #[must_use]
    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    /// Target duration in milliseconds
    #[must_use]
    pub const fn target_time(&self) -> u32 {
        self.target_time
    }

    /// Change the target duration. Values below 1 are raised to 1.
    pub fn set_target_time(&mut self, target_time: u32) {
        self.target_time = target_time.max(MIN_TARGET_TIME);
        self.current_time = self.current_time.min(self.target_f32());
    }

    /// Current accumulated time in milliseconds
    #[must_use]
    pub const fn current_time(&self) -> f32 {
        self.current_time
    }

    /// Playback speed multiplier (negative plays backward)
    #[must_use]
    pub const fn speed(&self) -> f32 {
        self.speed
    }

    /// Set the playback speed multiplier
    pub fn set_speed(&mut self, speed: f32) {
        self.speed = speed;
    }

    /// `current_time / target_time`, in `[0, 1]`
    #[must_use]
    pub fn proportion(&self) -> f32 {
        self.current_time / self.target_f32()
    }

    /// Whether the current time has reached the target
    #[must_use]
    pub fn is_exceeded(&self) -> bool {
        self.current_time >= self.target_f32()
    }

    /// Whether the timer sits at the end of its direction of travel
    #[must_use]
    pub fn is_complete(&self) -> bool {
        if self.speed >= 0.0 {
            self.is_exceeded()
        } else {
            self.current_time <= 0.0
        }
    }

    /// Advance by one frame. Returns the overflow if the timer completed.
    pub fn update(&mut self, time: FrameTime) -> Option<f32> {
        self.advance(time.elapsed())
    }

    /// Advance by raw milliseconds. Negative steps are ignored.
    pub fn advance(&mut self, elapsed_ms: f32) -> Option<f32> {
        let elapsed_ms = elapsed_ms.max(0.0);
        if elapsed_ms == 0.0 || self.speed == 0.0 {
            return None;
        }
        self.set_current_time(self.current_time + self.speed * elapsed_ms)
    }

    /// Set the current time, clamping to `[0, target_time]`.
    ///
    /// Fires `time_exceeded` if this assignment crosses the boundary the timer
    /// is travelling toward. Returns the overflow when it fires.
    pub fn set_current_time(&mut self, value: f32) -> Option<f32> {
        let target = self.target_f32();
        let previous = self.current_time;
        self.current_time = value.clamp(0.0, target);

        let overflow = if self.speed >= 0.0 {
            (previous < target && self.current_time >= target).then(|| value - target)
        } else {
            (previous > 0.0 && self.current_time <= 0.0).then(|| -value)
        };

        if let Some(amount) = overflow {
            self.time_exceeded.emit(&amount);
        }
        overflow
    }

    /// Rewind to the start of the direction of travel: zero when moving
    /// forward, `target_time` when moving backward.
    pub fn reset(&mut self) {
        self.current_time = if self.speed >= 0.0 {
            0.0
        } else {
            self.target_f32()
        };
    }

    fn target_f32(&self) -> f32 {
        self.target_time as f32
    }
}

impl fmt::Debug for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timer")
            .field("target_time", &self.target_time)
            .field("current_time", &self.current_time)
            .field("speed", &self.speed)
            .finish()
    }
}
