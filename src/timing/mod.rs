//! Time-driven primitives: timers and easing curves

pub mod easing;
pub mod timer;

pub use easing::{Easing, EasingDirection, EasingFunction, ease};
pub use timer::Timer;
