use bitflags::bitflags;
use winit::event::{ElementState, KeyboardInput, VirtualKeyCode, WindowEvent};

bitflags! {
    /// Keys currently held down, polled once per tick by the camera controller.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct InputState: u32 {
        const FORWARD = 1 << 0;
        const BACKWARD = 1 << 1;
        const LEFT = 1 << 2;
        const RIGHT = 1 << 3;
        const ASCEND = 1 << 4;
        const DESCEND = 1 << 5;
        const TURN_LEFT = 1 << 6;
        const TURN_RIGHT = 1 << 7;
        const LOOK_UP = 1 << 8;
        const LOOK_DOWN = 1 << 9;
    }
}

impl InputState {
    pub fn from_keycode(keycode: VirtualKeyCode) -> Option<Self> {
        let flag = match keycode {
            VirtualKeyCode::W => Self::FORWARD,
            VirtualKeyCode::S => Self::BACKWARD,
            VirtualKeyCode::A => Self::LEFT,
            VirtualKeyCode::D => Self::RIGHT,
            VirtualKeyCode::Space => Self::ASCEND,
            VirtualKeyCode::LShift => Self::DESCEND,
            VirtualKeyCode::Left => Self::TURN_LEFT,
            VirtualKeyCode::Right => Self::TURN_RIGHT,
            VirtualKeyCode::Up => Self::LOOK_UP,
            VirtualKeyCode::Down => Self::LOOK_DOWN,
            _ => return None,
        };
        Some(flag)
    }

    /// Tracks key presses and releases. Returns `true` when the event changed a tracked key.
    pub fn process_event(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::KeyboardInput {
                input:
                    KeyboardInput {
                        state,
                        virtual_keycode: Some(keycode),
                        ..
                    },
                ..
            } => match Self::from_keycode(*keycode) {
                Some(flag) => {
                    self.set(flag, *state == ElementState::Pressed);
                    true
                }
                None => false,
            },
            WindowEvent::Focused(false) => {
                // Releases are not delivered to an unfocused window.
                *self = Self::empty();
                false
            }
            _ => false,
        }
    }

    /// -1, 0 or 1 depending on which of the two opposing keys are held.
    pub fn axis(&self, negative: Self, positive: Self) -> f32 {
        let mut value = 0.0;
        if self.contains(negative) {
            value -= 1.0;
        }
        if self.contains(positive) {
            value += 1.0;
        }
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_movement_keys() {
        assert_eq!(InputState::from_keycode(VirtualKeyCode::W), Some(InputState::FORWARD));
        assert_eq!(InputState::from_keycode(VirtualKeyCode::LShift), Some(InputState::DESCEND));
        assert_eq!(InputState::from_keycode(VirtualKeyCode::Up), Some(InputState::LOOK_UP));
        assert_eq!(InputState::from_keycode(VirtualKeyCode::Q), None);
    }

    #[test]
    fn opposing_keys_cancel() {
        let both = InputState::TURN_LEFT | InputState::TURN_RIGHT;
        assert_eq!(both.axis(InputState::TURN_LEFT, InputState::TURN_RIGHT), 0.0);
        assert_eq!(
            InputState::TURN_LEFT.axis(InputState::TURN_LEFT, InputState::TURN_RIGHT),
            -1.0
        );
        assert_eq!(
            InputState::empty().axis(InputState::LOOK_DOWN, InputState::LOOK_UP),
            0.0
        );
    }
}
