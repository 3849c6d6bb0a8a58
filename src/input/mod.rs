//! Input handling
//!
//! The host feeds raw presses and releases into an [`InputState`] snapshot.
//! An [`InputHandler`] maps named actions onto controls and tracks, per
//! action, the press edges and how long the action has been held.

mod handler;
mod state;

pub use handler::{InputAction, InputHandler};
pub use state::{Control, InputState};
