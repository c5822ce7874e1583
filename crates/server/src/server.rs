use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use gecko::{
    HubChange, NetworkEndpoint, Packet, PacketHeader, PacketType, ParticipantId,
    ParticipantUpdate, PeerTable, PoseUpdate, ReplicationHub, UpdateWire, chunk_full_state,
};

use crate::config::RelayConfig;

/// Thin broadcast relay plus latest-value cache.
///
/// Accepts every update at whatever rate it arrives (debounce is the
/// sender's job), rebroadcasts it to every other peer, and answers each
/// newcomer's one-time full-state request from the hub.
pub struct RelayServer {
    endpoint: NetworkEndpoint,
    peers: PeerTable,
    hub: ReplicationHub,
    poll_interval: Duration,
    running: Arc<AtomicBool>,
}

impl RelayServer {
    pub fn new(bind_addr: &str, config: RelayConfig) -> io::Result<Self> {
        let endpoint = NetworkEndpoint::bind(bind_addr)?;
        info!("relay listening on {}", endpoint.local_addr());

        Ok(Self {
            endpoint,
            peers: PeerTable::with_timeout(config.max_peers, config.timeout_secs),
            hub: ReplicationHub::new(),
            poll_interval: Duration::from_secs_f64(1.0 / config.poll_rate.max(1) as f64),
            running: Arc::new(AtomicBool::new(true)),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.endpoint.local_addr()
    }

    pub fn running(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    pub fn run(&mut self) {
        while self.running.load(Ordering::SeqCst) {
            let started = Instant::now();
            if let Err(e) = self.tick_once() {
                warn!("network error: {e}");
            }

            if let Some(remaining) = self.poll_interval.checked_sub(started.elapsed()) {
                std::thread::sleep(remaining);
            }
        }
    }

    pub fn tick_once(&mut self) -> io::Result<()> {
        for (packet, addr) in self.endpoint.receive()? {
            self.handle_packet(packet, addr);
        }

        for participant in self.peers.sweep_timed_out() {
            info!("participant {participant} timed out");
            if self.hub.remove(participant) {
                self.broadcast_tombstone(participant);
            }
        }

        Ok(())
    }

    fn handle_packet(&mut self, packet: Packet, addr: SocketAddr) {
        if let Some(peer) = self.peers.get_by_addr_mut(&addr) {
            peer.touch();
        }

        match packet.payload {
            PacketType::Hello => self.handle_hello(addr),
            PacketType::FullStateRequest => self.handle_full_state_request(addr),
            PacketType::PoseUpdate(update) => self.handle_pose_update(addr, update),
            PacketType::Disconnect => self.handle_disconnect(addr),
            PacketType::Ping { timestamp } => {
                let pong = Packet::new(PacketHeader::new(0), PacketType::Pong { timestamp });
                self.try_send(&pong, addr);
            }
            other => {
                debug!("ignoring unexpected packet from {addr}: {other:?}");
            }
        }
    }

    fn handle_hello(&mut self, addr: SocketAddr) {
        let participant = match self.peers.join(addr) {
            Ok(peer) => peer.participant,
            Err(reason) => {
                warn!("rejecting {addr}: {reason}");
                let bye = Packet::new(PacketHeader::new(0), PacketType::Disconnect);
                self.try_send(&bye, addr);
                return;
            }
        };

        info!("participant {participant} joined from {addr}");
        self.send_to_participant(
            participant,
            PacketType::Welcome {
                participant_id: participant,
            },
        );
    }

    fn handle_full_state_request(&mut self, addr: SocketAddr) {
        let Some(peer) = self.peers.get_by_addr(&addr) else {
            debug!("full-state request from unknown address {addr}");
            return;
        };
        let participant = peer.participant;

        let entries: Vec<ParticipantUpdate> = self
            .hub
            .snapshot()
            .into_iter()
            .map(|(participant, update)| ParticipantUpdate {
                participant,
                update: update.into(),
            })
            .collect();

        // A populated hub exceeds one datagram; answer in MTU-sized chunks.
        for chunk in chunk_full_state(entries) {
            self.send_to_participant(participant, PacketType::FullState(chunk));
        }
    }

    fn handle_pose_update(&mut self, addr: SocketAddr, update: UpdateWire) {
        let Some(peer) = self.peers.get_by_addr(&addr) else {
            debug!("pose update from unknown address {addr}");
            return;
        };
        let participant = peer.participant;
        let update = PoseUpdate::from(update);

        match self.hub.apply(participant, update.clone()) {
            HubChange::Updated => self.broadcast_from(participant, update),
            HubChange::Removed => self.broadcast_tombstone(participant),
            HubChange::Ignored => {}
        }
    }

    fn handle_disconnect(&mut self, addr: SocketAddr) {
        let Some(peer) = self.peers.remove_by_addr(&addr) else {
            return;
        };
        let participant = peer.participant;
        info!("participant {participant} disconnected");

        if self.hub.remove(participant) {
            self.broadcast_tombstone(participant);
        }
    }

    fn broadcast_tombstone(&mut self, participant: ParticipantId) {
        self.broadcast_from(participant, PoseUpdate::tombstone());
    }

    /// Relays `update` to every connected peer except its originator.
    fn broadcast_from(&mut self, participant: ParticipantId, update: PoseUpdate) {
        let wire: UpdateWire = update.into();
        let targets: Vec<SocketAddr> = self
            .peers
            .iter()
            .filter(|peer| peer.participant != participant)
            .map(|peer| peer.addr)
            .collect();

        for addr in targets {
            let packet = self.endpoint.create_packet(PacketType::Replicated(ParticipantUpdate {
                participant,
                update: wire.clone(),
            }));
            self.try_send(&packet, addr);
        }
    }

    fn send_to_participant(&mut self, participant: ParticipantId, payload: PacketType) {
        let Some(addr) = self.peers.get(participant).map(|peer| peer.addr) else {
            return;
        };
        let packet = self.endpoint.create_packet(payload);
        self.try_send(&packet, addr);
    }

    /// Sends to one peer; a failed send is logged, never fatal to the
    /// relay loop.
    fn try_send(&mut self, packet: &Packet, addr: SocketAddr) {
        if let Err(e) = self.endpoint.send_to(packet, addr) {
            warn!("send to {addr} failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::thread;

    use gecko::Pose;

    fn test_config() -> RelayConfig {
        RelayConfig {
            max_peers: 64,
            timeout_secs: 120,
            poll_rate: 120,
        }
    }

    fn connect(server: &mut RelayServer) -> NetworkEndpoint {
        let mut client = NetworkEndpoint::bind("127.0.0.1:0").unwrap();
        client.set_remote(server.local_addr());

        let hello = client.create_packet(PacketType::Hello);
        client.send(&hello).unwrap();

        let start = Instant::now();
        loop {
            server.tick_once().unwrap();
            for (packet, _) in client.receive().unwrap() {
                if matches!(packet.payload, PacketType::Welcome { .. }) {
                    return client;
                }
            }
            assert!(start.elapsed() < Duration::from_millis(500), "no welcome received");
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn populated_relay_answers_a_newcomer_across_packets() {
        let mut server = RelayServer::new("127.0.0.1:0", test_config()).unwrap();

        // 32 participants with two limbs each: the snapshot is several
        // times the MTU, so the reply must span multiple datagrams.
        for participant in 1..=32 {
            let update = PoseUpdate::new(1, Pose::IDENTITY)
                .with_limb("left_hand", Pose::IDENTITY)
                .with_limb("right_hand", Pose::IDENTITY);
            server.hub.apply(participant, update);
        }

        let mut newcomer = connect(&mut server);
        let request = newcomer.create_packet(PacketType::FullStateRequest);
        newcomer.send(&request).unwrap();

        let mut participants = BTreeSet::new();
        let mut full_state_packets = 0;
        let start = Instant::now();
        while participants.len() < 32 {
            // The relay must survive the oversized snapshot, not die on a
            // single too-large send.
            server.tick_once().unwrap();
            for (packet, _) in newcomer.receive().unwrap() {
                if let PacketType::FullState(entries) = packet.payload {
                    full_state_packets += 1;
                    for entry in entries {
                        participants.insert(entry.participant);
                    }
                }
            }
            assert!(start.elapsed() < Duration::from_millis(500), "full state incomplete");
            thread::sleep(Duration::from_millis(1));
        }

        assert!(full_state_packets > 1);
        assert_eq!(participants, (1..=32).collect::<BTreeSet<_>>());
    }

    #[test]
    fn relay_outlives_an_unreachable_limb_heavy_rebroadcast() {
        let mut server = RelayServer::new("127.0.0.1:0", test_config()).unwrap();
        let mut sender = connect(&mut server);
        let _listener = connect(&mut server);

        // An update whose wire form alone exceeds the MTU: the send is
        // rejected and logged, and the loop keeps serving.
        let mut update = PoseUpdate::new(1, Pose::IDENTITY);
        for i in 0..60 {
            update = update.with_limb(format!("limb_{i}"), Pose::IDENTITY);
        }
        server.broadcast_from(99, update);

        // Still alive: an ordinary update flows end to end.
        let packet =
            sender.create_packet(PacketType::PoseUpdate(PoseUpdate::new(1, Pose::IDENTITY).into()));
        sender.send(&packet).unwrap();

        let start = Instant::now();
        loop {
            server.tick_once().unwrap();
            if server.hub.get(1).is_some() {
                break;
            }
            assert!(start.elapsed() < Duration::from_millis(500), "update not ingested");
            thread::sleep(Duration::from_millis(1));
        }
    }
}
