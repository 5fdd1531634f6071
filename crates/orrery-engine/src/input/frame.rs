/// Motion accumulated over one frame.
///
/// `InputState` answers "is this key held"; `InputFrame` carries what moved
/// since the last frame. The runtime clears it after every `on_frame`.
#[derive(Debug, Default)]
pub struct InputFrame {
    /// Pointer motion this frame in logical pixels (+y down).
    pub pointer_delta: (f32, f32),

    /// Vertical wheel motion this frame, in lines.
    pub wheel_lines: f32,
}

impl InputFrame {
    pub fn clear(&mut self) {
        self.pointer_delta = (0.0, 0.0);
        self.wheel_lines = 0.0;
    }
}
