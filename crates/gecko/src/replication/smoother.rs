use std::collections::HashMap;

use log::debug;

use crate::math::Pose;

use super::frame::{
    ClientReplicationFrame, ParticipantId, PoseUpdate, ReferenceFrames, ReplicationError,
    limb_map,
};

/// Result of feeding one push into the smoother.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// Arrived before the startup snapshot; held until the snapshot lands.
    Buffered,
    /// First sight of this participant; snapped, no interpolation.
    Created,
    /// New interpolation target installed.
    Updated,
    /// Tombstone: the participant left the render set. The caller should
    /// also drop any cached render state (see [`super::RigCache`]).
    Removed,
    /// Tombstone for a participant that was never tracked.
    Ignored,
}

/// Interpolated world pose for one remote participant at one render tick.
#[derive(Debug, Clone)]
pub struct RenderPose {
    pub participant: ParticipantId,
    pub root: Pose,
    /// World poses for limbs that deviate from the root. Parts without an
    /// entry here take the root pose.
    pub limbs: Vec<(String, Pose)>,
}

/// Client-side reconstruction of remote participants' transforms from
/// sparse, debounced pushes.
///
/// All time arguments are monotonic seconds from a single clock supplied by
/// the render driver; the smoother keeps no clock of its own.
#[derive(Debug)]
pub struct ReplicationSmoother {
    local: ParticipantId,
    remotes: HashMap<ParticipantId, ClientReplicationFrame>,
    /// Pushes that raced ahead of the startup snapshot, in arrival order.
    pending: Vec<(ParticipantId, PoseUpdate)>,
    ready: bool,
}

impl ReplicationSmoother {
    /// `local` is the viewing participant; its own frames are tracked but
    /// never sampled.
    pub fn new(local: ParticipantId) -> Self {
        Self {
            local,
            remotes: HashMap::new(),
            pending: Vec::new(),
            ready: false,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn tracked(&self) -> usize {
        self.remotes.len()
    }

    pub fn frame(&self, participant: ParticipantId) -> Option<&ClientReplicationFrame> {
        self.remotes.get(&participant)
    }

    /// Applies the one-time full-state response, then replays any pushes
    /// that arrived before it, in their original order.
    pub fn apply_snapshot(
        &mut self,
        now: f64,
        entries: Vec<(ParticipantId, PoseUpdate)>,
        frames: &impl ReferenceFrames,
    ) -> Result<(), ReplicationError> {
        for (participant, update) in entries {
            if let (Some(reference_frame), Some(offset)) =
                (update.reference_frame, update.offset)
            {
                self.remotes.insert(
                    participant,
                    ClientReplicationFrame::snapped(
                        reference_frame,
                        offset,
                        limb_map(update.limbs),
                        now,
                    ),
                );
            }
        }
        self.ready = true;

        let buffered = std::mem::take(&mut self.pending);
        debug!("snapshot applied: {} tracked, {} buffered pushes", self.remotes.len(), buffered.len());
        for (participant, update) in buffered {
            self.apply_push(now, participant, update, frames)?;
        }
        Ok(())
    }

    /// Ingests one push. Pushes are applied in arrival order; stale
    /// deliveries from a reordering transport are tolerated, not corrected.
    pub fn push(
        &mut self,
        now: f64,
        participant: ParticipantId,
        update: PoseUpdate,
        frames: &impl ReferenceFrames,
    ) -> Result<PushOutcome, ReplicationError> {
        if !self.ready {
            self.pending.push((participant, update));
            return Ok(PushOutcome::Buffered);
        }
        self.apply_push(now, participant, update, frames)
    }

    fn apply_push(
        &mut self,
        now: f64,
        participant: ParticipantId,
        update: PoseUpdate,
        frames: &impl ReferenceFrames,
    ) -> Result<PushOutcome, ReplicationError> {
        let (reference_frame, offset) = match (update.reference_frame, update.offset) {
            (Some(reference_frame), Some(offset)) => (reference_frame, offset),
            _ => {
                return Ok(if self.remotes.remove(&participant).is_some() {
                    PushOutcome::Removed
                } else {
                    PushOutcome::Ignored
                });
            }
        };

        let Some(prev) = self.remotes.get_mut(&participant) else {
            self.remotes.insert(
                participant,
                ClientReplicationFrame::snapped(
                    reference_frame,
                    offset,
                    limb_map(update.limbs),
                    now,
                ),
            );
            return Ok(PushOutcome::Created);
        };

        // Capture the currently displayed world pose and re-express it
        // relative to the new anchor. Interpolation restarts from exactly
        // where the participant is drawn, so an anchor switch (stepping
        // from one wall to another) cannot snap.
        let prev_anchor = frames
            .frame_pose(prev.reference_frame)
            .ok_or(ReplicationError::StaleReferenceFrame(prev.reference_frame))?;
        let world = prev_anchor * prev.lerp_offset;
        let new_anchor = frames
            .frame_pose(reference_frame)
            .ok_or(ReplicationError::StaleReferenceFrame(reference_frame))?;
        let from_offset = new_anchor.inverse() * world;

        prev.reference_frame = reference_frame;
        prev.offset = offset;
        prev.limbs = limb_map(update.limbs);
        prev.from_offset = from_offset;
        prev.lerp_offset = from_offset;
        prev.received_at = now;
        Ok(PushOutcome::Updated)
    }

    /// Advances every remote frame to `now` and returns the world poses to
    /// draw, sorted by participant id. The local viewer is skipped.
    pub fn sample(
        &mut self,
        now: f64,
        frames: &impl ReferenceFrames,
    ) -> Result<Vec<RenderPose>, ReplicationError> {
        let mut out = Vec::with_capacity(self.remotes.len());

        for (&participant, frame) in &mut self.remotes {
            if participant == self.local {
                continue;
            }

            let alpha = frame.alpha(now);
            frame.lerp_offset = if alpha >= 1.0 {
                frame.offset
            } else if alpha <= 0.0 {
                frame.from_offset
            } else {
                Pose::lerp(&frame.from_offset, &frame.offset, alpha)
            };

            let anchor = frames
                .frame_pose(frame.reference_frame)
                .ok_or(ReplicationError::StaleReferenceFrame(frame.reference_frame))?;
            let root = anchor * frame.lerp_offset;
            let limbs = frame
                .limbs
                .iter()
                .map(|(name, offset)| (name.clone(), root * *offset))
                .collect();

            out.push(RenderPose {
                participant,
                root,
                limbs,
            });
        }

        out.sort_by_key(|pose| pose.participant);
        Ok(out)
    }
}
