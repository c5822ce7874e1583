use std::collections::HashMap;

use crate::math::Pose;

use super::frame::ParticipantId;
use super::smoother::RenderPose;

/// Lists the proxy-geometry part names for a participant's character model.
///
/// Returns `None` while the model is not locally available yet; discovery
/// is retried on the next render tick.
pub trait PartSource {
    fn parts(&self, participant: ParticipantId) -> Option<Vec<String>>;
}

/// Lazily discovered, cached part lists for remote characters.
///
/// Discovery happens once per participant, on the first render tick after
/// the model is available. The cache must be invalidated when a
/// participant's model changes and dropped on tombstone.
#[derive(Debug, Default)]
pub struct RigCache {
    parts: HashMap<ParticipantId, Vec<String>>,
}

impl RigCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parts_for(
        &mut self,
        participant: ParticipantId,
        source: &impl PartSource,
    ) -> Option<&[String]> {
        if !self.parts.contains_key(&participant) {
            let discovered = source.parts(participant)?;
            self.parts.insert(participant, discovered);
        }
        self.parts.get(&participant).map(Vec::as_slice)
    }

    pub fn invalidate(&mut self, participant: ParticipantId) {
        self.parts.remove(&participant);
    }

    pub fn remove(&mut self, participant: ParticipantId) {
        self.parts.remove(&participant);
    }

    pub fn clear(&mut self) {
        self.parts.clear();
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

/// Resolves the world pose of every named part: the limb pose when the
/// update carried one for that part, the root pose otherwise.
pub fn part_world_poses(rendered: &RenderPose, parts: &[String]) -> Vec<(String, Pose)> {
    parts
        .iter()
        .map(|part| {
            let pose = rendered
                .limbs
                .iter()
                .find(|(name, _)| name == part)
                .map(|(_, pose)| *pose)
                .unwrap_or(rendered.root);
            (part.clone(), pose)
        })
        .collect()
}
