//! Core engine module
//!
//! Frame timing, notifications and configuration

pub mod config;
pub mod events;
pub mod time;

pub use config::{ConfigError, EngineConfig};
pub use events::{Event, EventQueue, ListenerId, SceneEvent};
pub use time::{FrameClock, FrameTime};
