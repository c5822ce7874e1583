use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use crate::replication::ParticipantId;

const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// One connected participant as seen by the relay.
#[derive(Debug)]
pub struct Peer {
    pub addr: SocketAddr,
    pub participant: ParticipantId,
    pub last_receive_time: Instant,
}

impl Peer {
    fn new(addr: SocketAddr, participant: ParticipantId) -> Self {
        Self {
            addr,
            participant,
            last_receive_time: Instant::now(),
        }
    }

    pub fn is_timed_out(&self, timeout: Duration) -> bool {
        self.last_receive_time.elapsed() > timeout
    }

    pub fn touch(&mut self) {
        self.last_receive_time = Instant::now();
    }
}

/// Address-keyed table of connected peers with id assignment and a
/// timeout sweep.
#[derive(Debug)]
pub struct PeerTable {
    by_addr: HashMap<SocketAddr, ParticipantId>,
    peers: HashMap<ParticipantId, Peer>,
    next_participant: ParticipantId,
    max_peers: usize,
    timeout: Duration,
}

impl PeerTable {
    pub fn new(max_peers: usize) -> Self {
        Self::with_timeout(max_peers, DEFAULT_TIMEOUT_SECS)
    }

    pub fn with_timeout(max_peers: usize, timeout_secs: u64) -> Self {
        Self {
            by_addr: HashMap::new(),
            peers: HashMap::new(),
            next_participant: 1,
            max_peers,
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    /// Admits `addr`, assigning a fresh participant id. Re-joining from a
    /// known address returns the existing peer.
    pub fn join(&mut self, addr: SocketAddr) -> Result<&mut Peer, &'static str> {
        if let Some(&participant) = self.by_addr.get(&addr) {
            return Ok(self.peers.get_mut(&participant).expect("peer table out of sync"));
        }

        if self.peers.len() >= self.max_peers {
            return Err("relay full");
        }

        let participant = self.next_participant;
        self.next_participant += 1;

        self.peers.insert(participant, Peer::new(addr, participant));
        self.by_addr.insert(addr, participant);
        Ok(self.peers.get_mut(&participant).expect("peer table out of sync"))
    }

    pub fn get(&self, participant: ParticipantId) -> Option<&Peer> {
        self.peers.get(&participant)
    }

    pub fn get_by_addr(&self, addr: &SocketAddr) -> Option<&Peer> {
        self.by_addr.get(addr).and_then(|id| self.peers.get(id))
    }

    pub fn get_by_addr_mut(&mut self, addr: &SocketAddr) -> Option<&mut Peer> {
        if let Some(&participant) = self.by_addr.get(addr) {
            self.peers.get_mut(&participant)
        } else {
            None
        }
    }

    pub fn remove(&mut self, participant: ParticipantId) -> Option<Peer> {
        let peer = self.peers.remove(&participant)?;
        self.by_addr.remove(&peer.addr);
        Some(peer)
    }

    pub fn remove_by_addr(&mut self, addr: &SocketAddr) -> Option<Peer> {
        let participant = self.by_addr.remove(addr)?;
        self.peers.remove(&participant)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Peer> {
        self.peers.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Peer> {
        self.peers.values_mut()
    }

    /// Removes and returns every peer that has gone silent.
    pub fn sweep_timed_out(&mut self) -> Vec<ParticipantId> {
        let timed_out: Vec<ParticipantId> = self
            .peers
            .iter()
            .filter(|(_, peer)| peer.is_timed_out(self.timeout))
            .map(|(&id, _)| id)
            .collect();

        for id in &timed_out {
            self.remove(*id);
        }
        timed_out
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}
