//! Named actions bound to controls
//!
//! ```ignore
//! let mut input = InputHandler::new();
//! input.bind("jump", Control::Key(32));
//! input.bind("jump", Control::Button(0));
//!
//! // Once per frame, after the host fed its events into `state`
//! input.update(&state, time);
//! if input.is_new_press("jump") { ... }
//! ```

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::core::time::FrameTime;

use super::state::{Control, InputState};

/// One action and how it has been held.
///
/// An action is pressed while any of its controls is down.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputAction {
    controls: SmallVec<[Control; 2]>,
    #[serde(skip)]
    pressed: bool,
    #[serde(skip)]
    new_press: bool,
    #[serde(skip)]
    released: bool,
    #[serde(skip)]
    held_ms: f32,
    #[serde(skip)]
    held_frames: u32,
}

impl InputAction {
    pub fn new(controls: impl IntoIterator<Item = Control>) -> Self {
        Self {
            controls: controls.into_iter().collect(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn controls(&self) -> &[Control] {
        &self.controls
    }

    /// Add a control; binding one twice has no effect
    pub fn bind(&mut self, control: Control) {
        if !self.controls.contains(&control) {
            self.controls.push(control);
        }
    }

    pub fn unbind(&mut self, control: Control) {
        self.controls.retain(|c| *c != control);
    }

    /// Sample the controls for this frame.
    ///
    /// A new press starts the hold at this frame's step and one frame. Each
    /// held frame adds its step, and a frame up resets both to zero.
    pub fn update(&mut self, state: &InputState, time: FrameTime) {
        let was_pressed = self.pressed;
        self.pressed = self.controls.iter().any(|c| state.is_down(*c));
        self.new_press = self.pressed && !was_pressed;
        self.released = was_pressed && !self.pressed;

        if self.new_press {
            self.held_ms = time.elapsed();
            self.held_frames = 1;
        } else if self.pressed {
            self.held_ms += time.elapsed();
            self.held_frames += 1;
        } else {
            self.held_ms = 0.0;
            self.held_frames = 0;
        }
    }

    #[must_use]
    pub fn is_pressed(&self) -> bool {
        self.pressed
    }

    /// Pressed this frame but not the one before
    #[must_use]
    pub fn is_new_press(&self) -> bool {
        self.new_press
    }

    /// Up this frame after being pressed the one before
    #[must_use]
    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Milliseconds the current press has lasted
    #[must_use]
    pub fn held_ms(&self) -> f32 {
        self.held_ms
    }

    /// Frames the current press has lasted
    #[must_use]
    pub fn held_frames(&self) -> u32 {
        self.held_frames
    }
}

/// Table of named actions.
///
/// Queries for an action that was never bound answer as if it were up.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InputHandler {
    actions: FxHashMap<String, InputAction>,
}

impl InputHandler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `control` to the named action, creating the action if needed
    pub fn bind(&mut self, action: impl Into<String>, control: Control) {
        self.actions.entry(action.into()).or_default().bind(control);
    }

    /// Remove a control from an action
    pub fn unbind(&mut self, action: &str, control: Control) {
        if let Some(entry) = self.actions.get_mut(action) {
            entry.unbind(control);
        }
    }

    /// Drop an action and all its bindings
    pub fn remove(&mut self, action: &str) -> Option<InputAction> {
        self.actions.remove(action)
    }

    /// Sample every action for this frame
    pub fn update(&mut self, state: &InputState, time: FrameTime) {
        for action in self.actions.values_mut() {
            action.update(state, time);
        }
    }

    #[must_use]
    pub fn action(&self, name: &str) -> Option<&InputAction> {
        self.actions.get(name)
    }

    #[must_use]
    pub fn is_pressed(&self, action: &str) -> bool {
        self.action(action).is_some_and(InputAction::is_pressed)
    }

    #[must_use]
    pub fn is_new_press(&self, action: &str) -> bool {
        self.action(action).is_some_and(InputAction::is_new_press)
    }

    #[must_use]
    pub fn is_released(&self, action: &str) -> bool {
        self.action(action).is_some_and(InputAction::is_released)
    }

    pub fn action_names(&self) -> impl Iterator<Item = &str> {
        self.actions.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENTER: Control = Control::Key(13);
    const PAD_A: Control = Control::Button(0);

    fn frame() -> FrameTime {
        FrameTime::from_millis(16.0)
    }

    fn confirm_handler() -> InputHandler {
        let mut input = InputHandler::new();
        input.bind("confirm", ENTER);
        input.bind("confirm", PAD_A);
        input
    }

    #[test]
    fn test_press_hold_release() {
        let mut input = confirm_handler();
        let mut state = InputState::new();

        state.press(ENTER);
        input.update(&state, frame());
        assert!(input.is_pressed("confirm"));
        assert!(input.is_new_press("confirm"));

        state.update();
        input.update(&state, frame());
        assert!(input.is_pressed("confirm"));
        assert!(!input.is_new_press("confirm"));
        let action = input.action("confirm").unwrap();
        assert_eq!(action.held_frames(), 2);
        assert_eq!(action.held_ms(), 32.0);

        state.update();
        state.release(ENTER);
        input.update(&state, frame());
        assert!(!input.is_pressed("confirm"));
        assert!(input.is_released("confirm"));
        assert_eq!(input.action("confirm").map(InputAction::held_frames), Some(0));

        state.update();
        input.update(&state, frame());
        assert!(!input.is_released("confirm"));
    }

    #[test]
    fn test_any_control_holds_the_action() {
        let mut input = confirm_handler();
        let mut state = InputState::new();

        state.press(ENTER);
        input.update(&state, frame());
        state.press(PAD_A);
        state.release(ENTER);
        input.update(&state, frame());

        // Switching controls mid-hold is not a new press
        assert!(input.is_pressed("confirm"));
        assert!(!input.is_new_press("confirm"));
        assert_eq!(input.action("confirm").map(InputAction::held_frames), Some(2));
    }

    #[test]
    fn test_unknown_action_reads_as_up() {
        let input = confirm_handler();
        assert!(!input.is_pressed("jump"));
        assert!(!input.is_new_press("jump"));
    }

    #[test]
    fn test_bindings_from_ron() {
        let input: InputHandler =
            ron::from_str(r#"{ "skip": (controls: [Key(27), Button(7)]) }"#).unwrap();
        assert_eq!(
            input.action("skip").map(InputAction::controls),
            Some(&[Control::Key(27), Control::Button(7)][..])
        );
    }
}
