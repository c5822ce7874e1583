/// Raw send/receive counters for one endpoint. Serialized as-is when a
/// driver wants to export them.
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct NetworkStats {
    pub packets_sent: u64,
    pub packets_received: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub malformed_packets: u64,
}
