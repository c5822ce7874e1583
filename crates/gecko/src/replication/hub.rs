use std::collections::HashMap;

use super::frame::{ParticipantId, PoseUpdate, ReplicationFrame, limb_map};

/// What the relay should do after the hub ingested an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HubChange {
    /// The participant's frame was upserted; rebroadcast the update.
    Updated,
    /// The update was a tombstone; rebroadcast the tombstone.
    Removed,
    /// A tombstone for a participant the hub never saw. Nothing to relay.
    Ignored,
}

/// Authoritative latest-value cache, one [`ReplicationFrame`] per connected
/// participant.
///
/// This is a thin broadcast relay: updates are accepted at whatever rate
/// they arrive. Debounce is enforced by the sender, never here, and nothing
/// reorders or deduplicates stale deliveries.
#[derive(Debug, Default)]
pub struct ReplicationHub {
    frames: HashMap<ParticipantId, ReplicationFrame>,
}

impl ReplicationHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ingests an update from `participant` and reports what to rebroadcast.
    pub fn apply(&mut self, participant: ParticipantId, update: PoseUpdate) -> HubChange {
        match (update.reference_frame, update.offset) {
            (Some(reference_frame), Some(offset)) => {
                self.frames.insert(
                    participant,
                    ReplicationFrame {
                        reference_frame,
                        offset,
                        limbs: limb_map(update.limbs),
                    },
                );
                HubChange::Updated
            }
            _ => {
                if self.frames.remove(&participant).is_some() {
                    HubChange::Removed
                } else {
                    HubChange::Ignored
                }
            }
        }
    }

    /// Drops a participant on disconnect. Returns true if a frame existed;
    /// the caller broadcasts the tombstone.
    pub fn remove(&mut self, participant: ParticipantId) -> bool {
        self.frames.remove(&participant).is_some()
    }

    pub fn get(&self, participant: ParticipantId) -> Option<&ReplicationFrame> {
        self.frames.get(&participant)
    }

    /// Full-state answer for a newly joined participant's one-time request.
    pub fn snapshot(&self) -> Vec<(ParticipantId, PoseUpdate)> {
        let mut entries: Vec<_> = self
            .frames
            .iter()
            .map(|(&id, frame)| (id, frame.to_update()))
            .collect();
        entries.sort_by_key(|(id, _)| *id);
        entries
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Pose;
    use glam::Vec3;

    fn update_at(x: f32) -> PoseUpdate {
        PoseUpdate::new(1, Pose::from_position(Vec3::new(x, 0.0, 0.0)))
    }

    #[test]
    fn upsert_replaces_wholesale() {
        let mut hub = ReplicationHub::new();

        assert_eq!(hub.apply(7, update_at(1.0).with_limb("hand", Pose::IDENTITY)), HubChange::Updated);
        assert_eq!(hub.apply(7, update_at(2.0)), HubChange::Updated);

        let frame = hub.get(7).unwrap();
        assert_eq!(frame.offset.position.x, 2.0);
        // Limbs from the earlier update do not linger.
        assert!(frame.limbs.is_empty());
        assert_eq!(hub.len(), 1);
    }

    #[test]
    fn tombstone_removes_and_relays() {
        let mut hub = ReplicationHub::new();
        hub.apply(3, update_at(1.0));

        assert_eq!(hub.apply(3, PoseUpdate::tombstone()), HubChange::Removed);
        assert!(hub.get(3).is_none());
        assert_eq!(hub.apply(3, PoseUpdate::tombstone()), HubChange::Ignored);
    }

    #[test]
    fn partial_update_counts_as_tombstone() {
        let mut hub = ReplicationHub::new();
        hub.apply(3, update_at(1.0));

        let missing_offset = PoseUpdate {
            reference_frame: Some(1),
            offset: None,
            limbs: Vec::new(),
        };
        assert_eq!(hub.apply(3, missing_offset), HubChange::Removed);
    }

    #[test]
    fn snapshot_lists_every_participant() {
        let mut hub = ReplicationHub::new();
        hub.apply(2, update_at(1.0));
        hub.apply(9, update_at(2.0));
        hub.apply(5, update_at(3.0));
        hub.remove(9);

        let snapshot = hub.snapshot();
        let ids: Vec<_> = snapshot.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![2, 5]);
        assert!(snapshot.iter().all(|(_, u)| !u.is_tombstone()));
    }
}
