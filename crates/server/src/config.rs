#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub max_peers: usize,
    pub timeout_secs: u64,
    /// Inbound packets are polled at this rate. Updates are relayed the
    /// tick they arrive; the relay itself never rate-limits.
    pub poll_rate: u32,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            max_peers: 32,
            timeout_secs: 120,
            poll_rate: 120,
        }
    }
}
