use glam::Vec2;
use winit::event::{
    DeviceEvent, ElementState, Event, KeyboardInput, MouseButton, VirtualKeyCode, WindowEvent,
};

use crate::camera::Direction;

/// Input consumed by the scene once per frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameInput {
    pub pointer_delta: Vec2,
    pub look_held: bool,
    pub held: [bool; 6],
}

impl FrameInput {
    pub fn is_held(&self, direction: Direction) -> bool {
        self.held[direction.index()]
    }

    pub fn with_held(mut self, direction: Direction) -> Self {
        self.held[direction.index()] = true;
        self
    }
}

/// Accumulates window and device events between frames.
#[derive(Debug, Default)]
pub struct InputState {
    frame: FrameInput,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle_event(&mut self, event: &Event<()>) {
        match event {
            Event::WindowEvent { event, .. } => self.handle_window_event(event),
            Event::DeviceEvent {
                event: DeviceEvent::MouseMotion { delta },
                ..
            } => {
                if self.frame.look_held {
                    self.frame.pointer_delta += Vec2::new(delta.0 as f32, delta.1 as f32);
                }
            }
            _ => {}
        }
    }

    fn handle_window_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Right,
                ..
            } => {
                self.frame.look_held = *state == ElementState::Pressed;
            }
            WindowEvent::KeyboardInput {
                input:
                    KeyboardInput {
                        state,
                        virtual_keycode: Some(keycode),
                        ..
                    },
                ..
            } => {
                if let Some(direction) = key_direction(*keycode) {
                    self.frame.held[direction.index()] = *state == ElementState::Pressed;
                }
            }
            WindowEvent::Focused(false) => {
                self.frame = FrameInput::default();
            }
            _ => {}
        }
    }

    /// Snapshot for this frame.
    pub fn frame(&self) -> FrameInput {
        self.frame
    }

    /// Clear the per-frame accumulators; held states persist.
    pub fn end_frame(&mut self) {
        self.frame.pointer_delta = Vec2::ZERO;
    }
}

fn key_direction(keycode: VirtualKeyCode) -> Option<Direction> {
    match keycode {
        VirtualKeyCode::W => Some(Direction::Forward),
        VirtualKeyCode::S => Some(Direction::Back),
        VirtualKeyCode::A => Some(Direction::Left),
        VirtualKeyCode::D => Some(Direction::Right),
        VirtualKeyCode::Space | VirtualKeyCode::E => Some(Direction::Up),
        VirtualKeyCode::LShift | VirtualKeyCode::Q => Some(Direction::Down),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_movement_keys() {
        assert_eq!(key_direction(VirtualKeyCode::W), Some(Direction::Forward));
        assert_eq!(key_direction(VirtualKeyCode::LShift), Some(Direction::Down));
        assert_eq!(key_direction(VirtualKeyCode::F5), None);
    }

    #[test]
    fn end_frame_keeps_held_state() {
        let mut input = InputState::new();
        input.frame = FrameInput {
            pointer_delta: Vec2::new(3.0, -1.0),
            look_held: true,
            ..FrameInput::default()
        }
        .with_held(Direction::Right);

        input.end_frame();
        let frame = input.frame();
        assert_eq!(frame.pointer_delta, Vec2::ZERO);
        assert!(frame.look_held);
        assert!(frame.is_held(Direction::Right));
        assert!(!frame.is_held(Direction::Left));
    }
}
