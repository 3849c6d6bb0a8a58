//! Raw control state

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

/// A physical control, identified by the host's own codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Control {
    Key(u32),
    Button(u32),
}

/// Which controls are down, and which changed this frame
#[derive(Debug, Default, Clone)]
pub struct InputState {
    /// Currently held controls
    pressed: FxHashSet<Control>,
    /// Controls that went down this frame
    just_pressed: FxHashSet<Control>,
    /// Controls that went up this frame
    just_released: FxHashSet<Control>,
}

impl InputState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Call at the start of each frame to clear per-frame state
    pub fn update(&mut self) {
        self.just_pressed.clear();
        self.just_released.clear();
    }

    /// Record a control going down. Repeats while held are ignored.
    pub fn press(&mut self, control: Control) {
        if self.pressed.insert(control) {
            self.just_pressed.insert(control);
        }
    }

    /// Record a control going up
    pub fn release(&mut self, control: Control) {
        if self.pressed.remove(&control) {
            self.just_released.insert(control);
        }
    }

    /// Release everything, e.g. when the window loses focus
    pub fn release_all(&mut self) {
        self.just_released.extend(self.pressed.drain());
    }

    #[must_use]
    pub fn is_down(&self, control: Control) -> bool {
        self.pressed.contains(&control)
    }

    #[must_use]
    pub fn is_just_pressed(&self, control: Control) -> bool {
        self.just_pressed.contains(&control)
    }

    #[must_use]
    pub fn is_just_released(&self, control: Control) -> bool {
        self.just_released.contains(&control)
    }
}
