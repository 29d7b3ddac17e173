//! Keyboard and mouse handling for the walking camera.
//!
//! Key presses are folded into held-key state and mouse motion is summed
//! between frames. Once per frame the controller hands out a [`Controls`]
//! snapshot for [`Camera::update`](crate::camera::Camera::update).

use winit::event::ElementState;
use winit::keyboard::KeyCode;

use crate::camera::Controls;

/// Key bindings for movement.
#[derive(Debug, Clone)]
pub struct InputConfig {
    pub forward: KeyCode,
    pub back: KeyCode,
    pub left: KeyCode,
    pub right: KeyCode,
    pub jump: KeyCode,
    pub ascend: KeyCode,
    pub descend: KeyCode,
    pub toggle_grab: KeyCode,
    pub toggle_panel: KeyCode,
    pub exit: KeyCode,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            forward: KeyCode::KeyW,
            back: KeyCode::KeyS,
            left: KeyCode::KeyA,
            right: KeyCode::KeyD,
            jump: KeyCode::Space,
            ascend: KeyCode::KeyE,
            descend: KeyCode::KeyQ,
            toggle_grab: KeyCode::KeyG,
            toggle_panel: KeyCode::Tab,
            exit: KeyCode::Escape,
        }
    }
}

/// One-shot commands triggered by a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Exit,
    ToggleGrab,
    TogglePanel,
}

/// Held keys and mouse travel since the last snapshot.
#[derive(Debug, Default)]
pub struct InputState {
    pub forward: bool,
    pub back: bool,
    pub left: bool,
    pub right: bool,
    pub jump: bool,
    pub ascend: bool,
    pub descend: bool,
    /// Pixels moved since the last `take_controls`
    pub mouse_delta: (f32, f32),
    /// Mouse motion only steers the camera while the cursor is captured
    pub cursor_grabbed: bool,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether any movement key is down.
    pub fn is_moving(&self) -> bool {
        self.forward || self.back || self.left || self.right
    }
}

#[derive(Debug, Default)]
pub struct InputController {
    pub config: InputConfig,
    pub state: InputState,
}

impl InputController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle keyboard key press/release. Returns a command for keys that
    /// act once per press.
    pub fn handle_keyboard(
        &mut self,
        key: KeyCode,
        state: ElementState,
        repeat: bool,
    ) -> Option<Action> {
        let pressed = state == ElementState::Pressed;
        let c = &self.config;

        let held = if key == c.forward {
            &mut self.state.forward
        } else if key == c.back {
            &mut self.state.back
        } else if key == c.left {
            &mut self.state.left
        } else if key == c.right {
            &mut self.state.right
        } else if key == c.jump {
            &mut self.state.jump
        } else if key == c.ascend {
            &mut self.state.ascend
        } else if key == c.descend {
            &mut self.state.descend
        } else {
            if !pressed || repeat {
                return None;
            }
            return if key == c.exit {
                Some(Action::Exit)
            } else if key == c.toggle_grab {
                self.state.cursor_grabbed = !self.state.cursor_grabbed;
                self.state.mouse_delta = (0.0, 0.0);
                Some(Action::ToggleGrab)
            } else if key == c.toggle_panel {
                Some(Action::TogglePanel)
            } else {
                None
            };
        };
        *held = pressed;
        None
    }

    /// Accumulate raw mouse motion.
    pub fn handle_mouse_motion(&mut self, dx: f64, dy: f64) {
        if !self.state.cursor_grabbed {
            return;
        }
        self.state.mouse_delta.0 += dx as f32;
        self.state.mouse_delta.1 += dy as f32;
    }

    /// Release everything, e.g. when the window loses focus.
    pub fn release_all(&mut self) {
        let grabbed = self.state.cursor_grabbed;
        self.state = InputState {
            cursor_grabbed: grabbed,
            ..InputState::default()
        };
    }

    /// Snapshot the held keys and drain the accumulated mouse motion.
    pub fn take_controls(&mut self) -> Controls {
        let (mouse_dx, mouse_dy) = std::mem::take(&mut self.state.mouse_delta);
        let s = &self.state;
        Controls {
            forward: s.forward,
            back: s.back,
            left: s.left,
            right: s.right,
            jump: s.jump,
            ascend: s.ascend,
            descend: s.descend,
            mouse_dx,
            mouse_dy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(c: &mut InputController, key: KeyCode) -> Option<Action> {
        c.handle_keyboard(key, ElementState::Pressed, false)
    }

    #[test]
    fn test_input_state_default() {
        let state = InputState::new();
        assert!(!state.is_moving());
        assert!(!state.cursor_grabbed);
        assert_eq!(state.mouse_delta, (0.0, 0.0));
    }

    #[test]
    fn test_held_keys() {
        let mut controller = InputController::new();
        assert_eq!(press(&mut controller, KeyCode::KeyW), None);
        press(&mut controller, KeyCode::Space);
        assert!(controller.state.is_moving());

        let controls = controller.take_controls();
        assert!(controls.forward && controls.jump);
        assert!(!controls.back);

        controller.handle_keyboard(KeyCode::KeyW, ElementState::Released, false);
        assert!(!controller.take_controls().forward);
        // Still held until released
        assert!(controller.take_controls().jump);
    }

    #[test]
    fn test_actions() {
        let mut controller = InputController::new();
        assert_eq!(press(&mut controller, KeyCode::Escape), Some(Action::Exit));
        assert_eq!(press(&mut controller, KeyCode::Tab), Some(Action::TogglePanel));
        assert_eq!(
            controller.handle_keyboard(KeyCode::Tab, ElementState::Released, false),
            None
        );
        assert_eq!(press(&mut controller, KeyCode::KeyZ), None);
    }

    #[test]
    fn test_repeat_does_not_toggle() {
        let mut controller = InputController::new();
        press(&mut controller, KeyCode::KeyG);
        assert!(controller.state.cursor_grabbed);
        assert_eq!(
            controller.handle_keyboard(KeyCode::KeyG, ElementState::Pressed, true),
            None
        );
        assert!(controller.state.cursor_grabbed);
    }

    #[test]
    fn test_mouse_needs_grab() {
        let mut controller = InputController::new();
        controller.handle_mouse_motion(10.0, 5.0);
        assert_eq!(controller.take_controls().mouse_dx, 0.0);

        press(&mut controller, KeyCode::KeyG);
        controller.handle_mouse_motion(10.0, 5.0);
        controller.handle_mouse_motion(-4.0, 1.0);
        let controls = controller.take_controls();
        assert_eq!((controls.mouse_dx, controls.mouse_dy), (6.0, 6.0));

        // Drained by the snapshot
        assert_eq!(controller.take_controls().mouse_dx, 0.0);
    }

    #[test]
    fn test_release_all_keeps_grab() {
        let mut controller = InputController::new();
        press(&mut controller, KeyCode::KeyG);
        press(&mut controller, KeyCode::KeyD);
        press(&mut controller, KeyCode::KeyE);
        controller.release_all();

        let controls = controller.take_controls();
        assert!(!controls.right && !controls.ascend);
        assert!(controller.state.cursor_grabbed);
    }

    #[test]
    fn test_custom_bindings() {
        let mut controller = InputController {
            config: InputConfig {
                forward: KeyCode::ArrowUp,
                ..Default::default()
            },
            ..Default::default()
        };
        press(&mut controller, KeyCode::KeyW);
        press(&mut controller, KeyCode::ArrowUp);
        assert!(controller.take_controls().forward);
    }
}
