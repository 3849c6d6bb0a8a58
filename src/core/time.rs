//! Frame clock
//!
//! Every `update` call in the scene graph receives the elapsed time of the
//! current frame in milliseconds.

use std::time::{Duration, Instant};

/// Elapsed time for a single frame
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameTime {
    /// Milliseconds elapsed since the previous frame
    pub elapsed_ms: f32,
}

impl FrameTime {
    /// Create a frame time from milliseconds
    #[must_use]
    pub const fn from_millis(elapsed_ms: f32) -> Self {
        Self { elapsed_ms }
    }

    /// Create a frame time from a `Duration`
    #[must_use]
    pub fn from_duration(elapsed: Duration) -> Self {
        Self {
            elapsed_ms: elapsed.as_secs_f32() * 1000.0,
        }
    }

    /// Elapsed milliseconds, never negative
    #[must_use]
    pub fn elapsed(&self) -> f32 {
        self.elapsed_ms.max(0.0)
    }
}

/// Wall-clock source that produces a `FrameTime` per tick
#[derive(Debug)]
pub struct FrameClock {
    last: Instant,
    /// Upper bound on a single frame step, so a stall does not teleport timers
    max_step_ms: f32,
}

impl FrameClock {
    /// Create a new clock starting now
    #[must_use]
    pub fn new() -> Self {
        Self {
            last: Instant::now(),
            max_step_ms: 250.0,
        }
    }

    /// Set the largest step a single tick may report
    #[must_use]
    pub fn with_max_step(mut self, max_step_ms: f32) -> Self {
        self.max_step_ms = max_step_ms.max(0.0);
        self
    }

    /// Advance the clock and return the time since the previous tick
    pub fn tick(&mut self) -> FrameTime {
        let now = Instant::now();
        let elapsed = FrameTime::from_duration(now - self.last);
        self.last = now;
        FrameTime::from_millis(elapsed.elapsed_ms.min(self.max_step_ms))
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_time_from_duration() {
        let time = FrameTime::from_duration(Duration::from_millis(16));
        assert!((time.elapsed_ms - 16.0).abs() < 0.001);
    }

    #[test]
    fn test_negative_elapsed_is_clamped() {
        let time = FrameTime::from_millis(-5.0);
        assert_eq!(time.elapsed(), 0.0);
    }

    #[test]
    fn test_clock_respects_max_step() {
        let mut clock = FrameClock::new().with_max_step(0.0);
        let time = clock.tick();
        assert_eq!(time.elapsed_ms, 0.0);
    }
}
