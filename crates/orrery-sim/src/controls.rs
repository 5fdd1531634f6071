//! Keyboard and mouse bindings, sampled once per frame.
//!
//! | Input              | Action                          |
//! |--------------------|---------------------------------|
//! | Escape             | exit                            |
//! | W / S / A / D      | camera forward / back / left / right |
//! | ArrowUp / ArrowDown| sun rotation speed ± 0.1        |
//! | ArrowLeft / Right  | moon orbit speed + 0.1 / − 0.1  |
//! | pointer motion     | look around                     |
//! | wheel              | zoom                            |

use orrery_engine::input::{InputFrame, InputState, Key};

use crate::camera::CameraMovement;

/// Speed change applied per frame while an arrow key is held.
pub const SPEED_STEP: f32 = 0.1;

const MOVE_KEYS: [(Key, CameraMovement); 4] = [
    (Key::W, CameraMovement::Forward),
    (Key::S, CameraMovement::Backward),
    (Key::A, CameraMovement::Left),
    (Key::D, CameraMovement::Right),
];

/// What the user asked for this frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameControls {
    pub exit: bool,
    pub movement: Vec<CameraMovement>,
    pub sun_rotation_delta: f32,
    pub moon_orbit_delta: f32,
    /// Pointer motion in pixels, y positive upwards.
    pub look: (f32, f32),
    /// Wheel lines, positive away from the user.
    pub zoom: f32,
}

impl FrameControls {
    pub fn sample(input: &InputState, frame: &InputFrame) -> Self {
        let held = |key| input.key_down(key);

        let movement = MOVE_KEYS
            .iter()
            .filter(|(key, _)| held(*key))
            .map(|&(_, movement)| movement)
            .collect();

        let mut sun_rotation_delta = 0.0;
        if held(Key::ArrowUp) {
            sun_rotation_delta += SPEED_STEP;
        }
        if held(Key::ArrowDown) {
            sun_rotation_delta -= SPEED_STEP;
        }

        let mut moon_orbit_delta = 0.0;
        if held(Key::ArrowLeft) {
            moon_orbit_delta += SPEED_STEP;
        }
        if held(Key::ArrowRight) {
            moon_orbit_delta -= SPEED_STEP;
        }

        let (dx, dy) = frame.pointer_delta;

        Self {
            exit: held(Key::Escape),
            movement,
            sun_rotation_delta,
            moon_orbit_delta,
            // Screen y grows downwards.
            look: (dx, -dy),
            zoom: frame.wheel_lines,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orrery_engine::input::{InputEvent, KeyState, MouseWheelDelta, PointerMoveEvent};

    fn press(state: &mut InputState, frame: &mut InputFrame, key: Key) {
        state.apply_event(
            frame,
            InputEvent::Key {
                key,
                state: KeyState::Pressed,
                repeat: false,
            },
        );
    }

    #[test]
    fn idle_input_does_nothing() {
        let controls = FrameControls::sample(&InputState::default(), &InputFrame::default());
        assert_eq!(controls, FrameControls::default());
    }

    #[test]
    fn held_keys_map_to_actions() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();
        for key in [Key::W, Key::D, Key::ArrowUp, Key::ArrowRight, Key::Escape] {
            press(&mut state, &mut frame, key);
        }

        let c = FrameControls::sample(&state, &frame);
        assert!(c.exit);
        assert_eq!(c.movement, vec![CameraMovement::Forward, CameraMovement::Right]);
        assert_eq!(c.sun_rotation_delta, SPEED_STEP);
        assert_eq!(c.moon_orbit_delta, -SPEED_STEP);
    }

    #[test]
    fn opposite_arrows_cancel() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();
        press(&mut state, &mut frame, Key::ArrowLeft);
        press(&mut state, &mut frame, Key::ArrowRight);
        assert_eq!(FrameControls::sample(&state, &frame).moon_orbit_delta, 0.0);
    }

    #[test]
    fn pointer_and_wheel_feed_look_and_zoom() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();
        let mv = |x, y| InputEvent::PointerMoved(PointerMoveEvent { x, y });
        state.apply_event(&mut frame, mv(100.0, 100.0));
        state.apply_event(&mut frame, mv(110.0, 90.0));
        state.apply_event(&mut frame, InputEvent::MouseWheel(MouseWheelDelta::Line { x: 0.0, y: 2.0 }));

        let c = FrameControls::sample(&state, &frame);
        assert_eq!(c.look, (10.0, 10.0));
        assert_eq!(c.zoom, 2.0);
    }
}
