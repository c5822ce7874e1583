use super::frame::{FrameId, REPLICATE_DEBOUNCE_TIME};

/// Sender-side debounce for outbound pose updates.
///
/// Updates go out at most once per debounce window, except that a
/// reference-frame change always goes out immediately: the receiver's
/// continuity handoff needs the new anchor as soon as possible.
#[derive(Debug, Default)]
pub struct UpdateGate {
    last_sent: Option<f64>,
    last_frame: Option<FrameId>,
}

impl UpdateGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the send when it returns true.
    pub fn should_send(&mut self, now: f64, reference_frame: FrameId) -> bool {
        let window_elapsed = match self.last_sent {
            None => true,
            Some(at) => (now - at) as f32 >= REPLICATE_DEBOUNCE_TIME,
        };
        let frame_changed = self.last_frame != Some(reference_frame);

        if window_elapsed || frame_changed {
            self.last_sent = Some(now);
            self.last_frame = Some(reference_frame);
            true
        } else {
            false
        }
    }
}
