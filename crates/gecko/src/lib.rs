//! Surface-sticking character locomotion support: a damped rotational
//! spring for smoothing orientation under reoriented gravity, and the
//! replication layer that keeps remote characters continuously
//! interpolated from sparse, debounced pose updates.

pub mod math;
pub mod net;
pub mod replication;
pub mod spring;

pub use math::{Pose, Rotation};
pub use net::{
    DEFAULT_PORT, NetworkEndpoint, NetworkStats, Packet, PacketError, PacketHeader, PacketType,
    ParticipantUpdate, Peer, PeerTable, PoseWire, UpdateWire, chunk_full_state,
};
pub use replication::{
    ClientReplicationFrame, FrameId, FrameRegistry, HubChange, ParticipantId, PartSource,
    PoseUpdate, PushOutcome, REPLICATE_DEBOUNCE_TIME, ReferenceFrames, RenderPose,
    ReplicationError, ReplicationFrame, ReplicationHub, ReplicationSmoother, RigCache,
    UpdateGate,
};
pub use spring::RotationalSpring;
