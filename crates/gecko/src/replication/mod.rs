//! Pose replication for surface-sticking characters.
//!
//! Two roles over one protocol: [`ReplicationHub`] is the authoritative
//! latest-value cache and broadcast relay, [`ReplicationSmoother`] turns
//! the sparse, debounced pushes back into continuously interpolated world
//! poses. Each role is single-threaded; the only shared state is the
//! messages themselves.

mod frame;
mod hub;
mod rig;
mod sender;
mod smoother;

pub use frame::{
    ClientReplicationFrame, FrameId, FrameRegistry, ParticipantId, PoseUpdate,
    REPLICATE_DEBOUNCE_TIME, ReferenceFrames, ReplicationError, ReplicationFrame,
};
pub use hub::{HubChange, ReplicationHub};
pub use rig::{PartSource, RigCache, part_world_poses};
pub use sender::UpdateGate;
pub use smoother::{PushOutcome, RenderPose, ReplicationSmoother};
