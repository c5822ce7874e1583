use std::collections::HashMap;

use crate::math::Pose;

/// Duration of the interpolation window, in seconds. The sender's debounce
/// gate and the receiver's alpha computation both consult this value; they
/// must agree for the interpolation to match the real sampling interval.
pub const REPLICATE_DEBOUNCE_TIME: f32 = 0.2;

pub type ParticipantId = u32;

/// Identifier of the surface/anchor pose a participant is attached to.
pub type FrameId = u32;

/// Resolves a reference frame id to its current world pose.
///
/// The host owns the anchors; this component only reads them. Callers must
/// keep an anchor alive for as long as any replicated frame references it,
/// or pose reconstruction fails with [`ReplicationError::StaleReferenceFrame`].
pub trait ReferenceFrames {
    fn frame_pose(&self, frame: FrameId) -> Option<Pose>;
}

/// Plain map-backed anchor store, for tests and standalone drivers.
#[derive(Debug, Default)]
pub struct FrameRegistry {
    frames: HashMap<FrameId, Pose>,
}

impl FrameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, frame: FrameId, pose: Pose) {
        self.frames.insert(frame, pose);
    }

    pub fn remove(&mut self, frame: FrameId) -> Option<Pose> {
        self.frames.remove(&frame)
    }
}

impl ReferenceFrames for FrameRegistry {
    fn frame_pose(&self, frame: FrameId) -> Option<Pose> {
        self.frames.get(&frame).copied()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReplicationError {
    #[error("reference frame {0} no longer exists")]
    StaleReferenceFrame(FrameId),
}

/// One inbound pose update. A missing `reference_frame` or `offset` is the
/// tombstone protocol, not an error: it clears the sender's replicated state.
#[derive(Debug, Clone, Default)]
pub struct PoseUpdate {
    pub reference_frame: Option<FrameId>,
    pub offset: Option<Pose>,
    pub limbs: Vec<(String, Pose)>,
}

impl PoseUpdate {
    pub fn new(reference_frame: FrameId, offset: Pose) -> Self {
        Self {
            reference_frame: Some(reference_frame),
            offset: Some(offset),
            limbs: Vec::new(),
        }
    }

    pub fn with_limb(mut self, name: impl Into<String>, pose: Pose) -> Self {
        self.limbs.push((name.into(), pose));
        self
    }

    pub fn tombstone() -> Self {
        Self::default()
    }

    pub fn is_tombstone(&self) -> bool {
        self.reference_frame.is_none() || self.offset.is_none()
    }
}

/// Authoritative latest-value state for one participant.
#[derive(Debug, Clone)]
pub struct ReplicationFrame {
    pub reference_frame: FrameId,
    pub offset: Pose,
    /// Sparse: only limbs that deviate from the root offset.
    pub limbs: HashMap<String, Pose>,
}

impl ReplicationFrame {
    pub fn to_update(&self) -> PoseUpdate {
        PoseUpdate {
            reference_frame: Some(self.reference_frame),
            offset: Some(self.offset),
            limbs: self.limbs.iter().map(|(n, p)| (n.clone(), *p)).collect(),
        }
    }
}

/// Client-held interpolation state for one remote participant.
///
/// `lerp_offset` always lies on the path from `from_offset` to `offset`,
/// parameterized by time elapsed since `received_at` over the debounce
/// window, clamped to [0, 1].
#[derive(Debug, Clone)]
pub struct ClientReplicationFrame {
    pub reference_frame: FrameId,
    pub offset: Pose,
    pub limbs: HashMap<String, Pose>,
    pub from_offset: Pose,
    pub lerp_offset: Pose,
    /// Monotonic seconds, supplied by the render driver.
    pub received_at: f64,
}

impl ClientReplicationFrame {
    /// First sight of a participant: no interpolation, snap to the target.
    pub fn snapped(
        reference_frame: FrameId,
        offset: Pose,
        limbs: HashMap<String, Pose>,
        now: f64,
    ) -> Self {
        Self {
            reference_frame,
            offset,
            limbs,
            from_offset: offset,
            lerp_offset: offset,
            received_at: now,
        }
    }

    pub fn alpha(&self, now: f64) -> f32 {
        (((now - self.received_at) as f32) / REPLICATE_DEBOUNCE_TIME).clamp(0.0, 1.0)
    }
}

pub(crate) fn limb_map(limbs: Vec<(String, Pose)>) -> HashMap<String, Pose> {
    limbs.into_iter().collect()
}
