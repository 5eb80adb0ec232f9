//! Pointer input state tracking for the viewer surface

use winit::event::{ElementState, MouseButton, MouseScrollDelta, Touch, TouchPhase, WindowEvent};

/// Tracks pointer and touch input scoped to the render surface
///
/// The engine only cares about drag deltas (orbit rotation) and wheel
/// deltas (zoom); keyboard input stays with the host shell.
pub struct InputState {
    /// Current pointer position in surface pixels
    pointer_position: (f32, f32),
    /// Pointer movement accumulated since the last frame while dragging
    drag_delta: (f32, f32),
    /// Wheel scroll accumulated since the last frame, in lines
    wheel_delta: f32,
    /// Whether the primary button (or a touch contact) is down
    dragging: bool,
    /// Active touch id, if a touch drives the drag
    touch_id: Option<u64>,
}

impl InputState {
    /// Create new input state
    pub fn new() -> Self {
        Self {
            pointer_position: (0.0, 0.0),
            drag_delta: (0.0, 0.0),
            wheel_delta: 0.0,
            dragging: false,
            touch_id: None,
        }
    }

    /// Process a window event
    pub fn process_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::CursorMoved { position, .. } => {
                let new_pos = (position.x as f32, position.y as f32);
                if self.dragging && self.touch_id.is_none() {
                    self.drag_delta.0 += new_pos.0 - self.pointer_position.0;
                    self.drag_delta.1 += new_pos.1 - self.pointer_position.1;
                }
                self.pointer_position = new_pos;
            }
            WindowEvent::MouseInput { state, button: MouseButton::Left, .. } => {
                self.dragging = *state == ElementState::Pressed;
            }
            WindowEvent::MouseWheel { delta, .. } => {
                self.wheel_delta += match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    // Pixel deltas are roughly 40px per wheel line
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 40.0,
                };
            }
            WindowEvent::Touch(Touch { phase, location, id, .. }) => {
                let pos = (location.x as f32, location.y as f32);
                match phase {
                    TouchPhase::Started => {
                        if self.touch_id.is_none() {
                            self.touch_id = Some(*id);
                            self.dragging = true;
                            self.pointer_position = pos;
                        }
                    }
                    TouchPhase::Moved => {
                        if self.touch_id == Some(*id) {
                            self.drag_delta.0 += pos.0 - self.pointer_position.0;
                            self.drag_delta.1 += pos.1 - self.pointer_position.1;
                            self.pointer_position = pos;
                        }
                    }
                    TouchPhase::Ended | TouchPhase::Cancelled => {
                        if self.touch_id == Some(*id) {
                            self.touch_id = None;
                            self.dragging = false;
                        }
                    }
                }
            }
            _ => {}
        }
    }

    /// Call at end of frame to reset per-frame accumulators
    pub fn end_frame(&mut self) {
        self.drag_delta = (0.0, 0.0);
        self.wheel_delta = 0.0;
    }

    /// Drag delta accumulated this frame (surface pixels)
    pub fn drag_delta(&self) -> (f32, f32) {
        self.drag_delta
    }

    /// Wheel delta accumulated this frame (lines)
    pub fn wheel_delta(&self) -> f32 {
        self.wheel_delta
    }

    /// Whether a drag is in progress
    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// Current pointer position
    pub fn pointer_position(&self) -> (f32, f32) {
        self.pointer_position
    }
}

impl Default for InputState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drag_accumulates_only_while_pressed() {
        let mut input = InputState::new();
        input.pointer_position = (10.0, 10.0);

        // Not dragging: no delta
        input.dragging = false;
        input.pointer_position = (20.0, 10.0);
        assert_eq!(input.drag_delta(), (0.0, 0.0));

        // Dragging: deltas accumulate and clear at frame end
        input.dragging = true;
        input.drag_delta = (5.0, -3.0);
        assert_eq!(input.drag_delta(), (5.0, -3.0));

        input.end_frame();
        assert_eq!(input.drag_delta(), (0.0, 0.0));
        assert!(input.is_dragging());
    }

    #[test]
    fn test_wheel_accumulates_within_frame() {
        let mut input = InputState::new();
        input.wheel_delta += 1.0;
        input.wheel_delta += 0.5;
        assert_eq!(input.wheel_delta(), 1.5);
        input.end_frame();
        assert_eq!(input.wheel_delta(), 0.0);
    }
}
