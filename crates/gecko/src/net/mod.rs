mod endpoint;
mod peers;
mod protocol;
mod stats;

pub use endpoint::NetworkEndpoint;
pub use peers::{Peer, PeerTable};
pub use protocol::{
    DEFAULT_PORT, LimbWire, MAX_PACKET_SIZE, PROTOCOL_MAGIC, PROTOCOL_VERSION, Packet,
    PacketError, PacketHeader, PacketType, ParticipantUpdate, PoseWire, UpdateWire,
    chunk_full_state,
};
pub use stats::NetworkStats;
