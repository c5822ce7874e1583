use glam::Vec3;
use rkyv::{Archive, Deserialize, Serialize, rancor};

use crate::math::{Pose, Rotation};
use crate::replication::{FrameId, ParticipantId, PoseUpdate};

pub const MAX_PACKET_SIZE: usize = 1200;
pub const PROTOCOL_VERSION: u32 = 1;
pub const PROTOCOL_MAGIC: u32 = 0x4745434B;
pub const DEFAULT_PORT: u16 = 27045;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Archive, Serialize, Deserialize)]
#[rkyv(compare(PartialEq), derive(Debug))]
pub struct PacketHeader {
    pub magic: u32,
    pub version: u32,
    pub sequence: u32,
}

impl PacketHeader {
    pub fn new(sequence: u32) -> Self {
        Self {
            magic: PROTOCOL_MAGIC,
            version: PROTOCOL_VERSION,
            sequence,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.magic == PROTOCOL_MAGIC && self.version == PROTOCOL_VERSION
    }
}

/// A rigid pose on the wire: scaled-axis rotation plus position. The
/// scaled-axis form is exact for any rotation angle in `[0, pi]` and keeps
/// limb-heavy updates inside one datagram.
#[derive(Debug, Clone, Copy, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub struct PoseWire {
    pub rotation: [f32; 3],
    pub position: [f32; 3],
}

impl From<Pose> for PoseWire {
    fn from(pose: Pose) -> Self {
        Self {
            rotation: pose.rotation.to_scaled_axis().to_array(),
            position: pose.position.to_array(),
        }
    }
}

impl From<PoseWire> for Pose {
    fn from(wire: PoseWire) -> Self {
        Pose::new(
            Rotation::from_scaled_axis(Vec3::from_array(wire.rotation)),
            Vec3::from_array(wire.position),
        )
    }
}

#[derive(Debug, Clone, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub struct LimbWire {
    pub name: String,
    pub pose: PoseWire,
}

/// Wire form of [`PoseUpdate`]. A missing `reference_frame` or `offset`
/// is the tombstone.
#[derive(Debug, Clone, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub struct UpdateWire {
    pub reference_frame: Option<FrameId>,
    pub offset: Option<PoseWire>,
    pub limbs: Vec<LimbWire>,
}

impl From<PoseUpdate> for UpdateWire {
    fn from(update: PoseUpdate) -> Self {
        Self {
            reference_frame: update.reference_frame,
            offset: update.offset.map(Into::into),
            limbs: update
                .limbs
                .into_iter()
                .map(|(name, pose)| LimbWire {
                    name,
                    pose: pose.into(),
                })
                .collect(),
        }
    }
}

impl From<UpdateWire> for PoseUpdate {
    fn from(wire: UpdateWire) -> Self {
        Self {
            reference_frame: wire.reference_frame,
            offset: wire.offset.map(Into::into),
            limbs: wire
                .limbs
                .into_iter()
                .map(|limb| (limb.name, limb.pose.into()))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub struct ParticipantUpdate {
    pub participant: ParticipantId,
    pub update: UpdateWire,
}

#[derive(Debug, Clone, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub enum PacketType {
    /// Client -> relay: join.
    Hello,
    /// Relay -> client: joined, with the assigned participant id.
    Welcome { participant_id: ParticipantId },
    /// Client -> relay: one-time startup request for the full frame set.
    FullStateRequest,
    /// Relay -> client: complete participant -> frame mapping.
    FullState(Vec<ParticipantUpdate>),
    /// Client -> relay: local pose update or tombstone.
    PoseUpdate(UpdateWire),
    /// Relay -> clients: another participant's update or tombstone.
    Replicated(ParticipantUpdate),
    Ping { timestamp: u64 },
    Pong { timestamp: u64 },
    Disconnect,
}

#[derive(Debug, Clone, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub struct Packet {
    pub header: PacketHeader,
    pub payload: PacketType,
}

/// Splits a full-state reply into chunks that each serialize within
/// [`MAX_PACKET_SIZE`]. A populated hub does not fit one datagram, so the
/// relay answers a newcomer with as many `FullState` packets as needed.
///
/// An empty snapshot still yields one (empty) chunk, so the newcomer
/// always hears back. A single entry too large for the MTU is kept as its
/// own chunk; the send path rejects and reports it.
pub fn chunk_full_state(entries: Vec<ParticipantUpdate>) -> Vec<Vec<ParticipantUpdate>> {
    let mut chunks: Vec<Vec<ParticipantUpdate>> = Vec::new();
    let mut current: Vec<ParticipantUpdate> = Vec::new();

    for entry in entries {
        current.push(entry);
        if current.len() > 1 && full_state_len(&current) > MAX_PACKET_SIZE {
            let overflow = current.pop();
            chunks.push(std::mem::take(&mut current));
            current.extend(overflow);
        }
    }

    chunks.push(current);
    chunks
}

fn full_state_len(entries: &[ParticipantUpdate]) -> usize {
    Packet::new(PacketHeader::new(0), PacketType::FullState(entries.to_vec()))
        .serialize()
        .map_or(usize::MAX, |bytes| bytes.len())
}

#[derive(Debug, thiserror::Error)]
pub enum PacketError {
    #[error("serialization failed: {0}")]
    Serialize(rancor::Error),
    #[error("deserialization failed: {0}")]
    Deserialize(rancor::Error),
}

impl Packet {
    pub fn new(header: PacketHeader, payload: PacketType) -> Self {
        Self { header, payload }
    }

    pub fn serialize(&self) -> Result<Vec<u8>, PacketError> {
        rkyv::to_bytes::<rancor::Error>(self)
            .map(|aligned| aligned.into_vec())
            .map_err(PacketError::Serialize)
    }

    pub fn deserialize(data: &[u8]) -> Result<Self, PacketError> {
        rkyv::from_bytes::<Self, rancor::Error>(data).map_err(PacketError::Deserialize)
    }
}
