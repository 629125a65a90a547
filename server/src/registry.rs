//! Connection registry and the server side of the session protocol
//!
//! The registry owns one [`PeerConnection`] per remote address and is the only
//! thing that mutates them. It does no I/O: the network layer feeds it decoded
//! packets through [`ConnectionRegistry::handle_packet`], advances it with
//! [`ConnectionRegistry::update`] once per tick and sends whatever
//! [`ConnectionRegistry::drain_outgoing`] returns.
//!
//! Per tick the registry:
//! - queues a time sync for every connected peer every 250 ms
//! - sends approvals, assigning a fresh random player id on first approval
//! - relays this tick's position packets to every connected peer except
//!   the one that sent them
//! - sends at most one awareness announcement per peer per 100 ms
//! - evicts peers that have been silent for longer than the timeout

use crate::awareness::AckOutcome;
use crate::connection::{PeerConnection, PeerStatus};
use log::{debug, error, info, trace, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::{
    HandshakeState, Packet, PacketBody, PlayerId, PositionUpdate, MAX_CONNECTIONS,
    TIME_SYNC_INTERVAL,
};
use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;

pub struct ConnectionRegistry {
    peers: HashMap<SocketAddr, PeerConnection>,
    max_connections: usize,
    /// Packets to relay this tick, with the address they came from
    broadcast_queue: Vec<(Packet, Option<SocketAddr>)>,
    last_time_sync_sent: Option<f32>,
    outbox: Vec<(SocketAddr, Packet)>,
    rng: StdRng,
}

impl ConnectionRegistry {
    pub fn new(max_connections: usize) -> Self {
        Self::with_rng(max_connections, StdRng::from_entropy())
    }

    /// Deterministic player id allocation, for tests and simulations.
    pub fn with_seed(max_connections: usize, seed: u64) -> Self {
        Self::with_rng(max_connections, StdRng::seed_from_u64(seed))
    }

    fn with_rng(max_connections: usize, rng: StdRng) -> Self {
        Self {
            peers: HashMap::new(),
            max_connections,
            broadcast_queue: Vec::new(),
            last_time_sync_sent: None,
            outbox: Vec::new(),
            rng,
        }
    }

    /// Applies one decoded datagram from `addr`.
    pub fn handle_packet(&mut self, addr: SocketAddr, packet: Packet, now: f32) {
        if let Some(peer) = self.peers.get_mut(&addr) {
            peer.touch(now);
        }

        match packet.body {
            PacketBody::Connection(HandshakeState::WantConnect) => {
                self.handle_want_connect(addr, now);
            }
            PacketBody::Connection(HandshakeState::AckConnectionResponse) => {
                self.handle_connection_ack(addr);
            }
            PacketBody::Connection(state) => {
                warn!("Unexpected handshake state {:?} from {}", state, addr);
            }
            PacketBody::NewPlayerAck { player_id } => {
                self.handle_awareness_ack(addr, player_id, false);
            }
            PacketBody::PlayerDisconnectedAck { player_id } => {
                self.handle_awareness_ack(addr, player_id, true);
            }
            PacketBody::Position(update) => {
                self.handle_gameplay(addr, packet, update);
            }
            PacketBody::TimeSync { .. }
            | PacketBody::NewPlayer { .. }
            | PacketBody::PlayerDisconnected { .. }
            | PacketBody::Error => {
                warn!("Dropping {:?} packet from client at {}", packet.kind(), addr);
            }
        }
    }

    fn handle_want_connect(&mut self, addr: SocketAddr, now: f32) {
        if let Some(peer) = self.peers.get_mut(&addr) {
            debug!("Duplicate connection request from {}", addr);
            // The approval was probably lost; resend it with the same id.
            if peer.status == PeerStatus::AwaitingAckConfirm {
                peer.status = PeerStatus::AwaitingAckSend;
            }
            self.queue(
                addr,
                Packet::stamped(PacketBody::Connection(HandshakeState::ErrorOrNotSet), now),
            );
            return;
        }

        if self.peers.len() >= self.max_connections {
            info!(
                "Declining connection from {}: {} peers connected",
                addr,
                self.peers.len()
            );
            self.queue(
                addr,
                Packet::stamped(PacketBody::Connection(HandshakeState::DeclineConnect), now),
            );
            return;
        }

        info!("Peer registered from {}", addr);
        self.peers.insert(addr, PeerConnection::new(addr, now));
    }

    fn handle_connection_ack(&mut self, addr: SocketAddr) {
        match self.peers.get(&addr).map(|peer| peer.status) {
            Some(PeerStatus::AwaitingAckConfirm) => self.setup_new_player(addr),
            Some(PeerStatus::Connected) => {
                debug!("Duplicate connection ack from {}", addr);
            }
            Some(status) => {
                warn!("Connection ack from {} while {:?}", addr, status);
            }
            None => {
                warn!("Connection ack from unknown address {}", addr);
            }
        }
    }

    fn handle_awareness_ack(&mut self, addr: SocketAddr, player_id: PlayerId, departure: bool) {
        let Some(peer) = self.peers.get_mut(&addr) else {
            warn!("Awareness ack from unknown address {}", addr);
            return;
        };

        let outcome = if departure {
            peer.awareness.acknowledge_disconnect(player_id)
        } else {
            peer.awareness.acknowledge_new_player(player_id)
        };

        match outcome {
            AckOutcome::Applied => {
                debug!("{} acknowledged player {}", addr, player_id);
            }
            AckOutcome::Duplicate => {
                debug!("Duplicate ack for player {} from {}", player_id, addr);
            }
            AckOutcome::Unknown => {
                warn!("Ack for unknown player {} from {}", player_id, addr);
            }
        }
    }

    fn handle_gameplay(&mut self, addr: SocketAddr, packet: Packet, update: PositionUpdate) {
        let status = match self.peers.get(&addr) {
            Some(peer) => peer.status,
            None => {
                warn!("Position packet from unregistered address {}", addr);
                return;
            }
        };

        match status {
            PeerStatus::AwaitingAckConfirm => {
                // The ack was lost but the client is already playing.
                debug!("Implicit connection ack from {}", addr);
                self.setup_new_player(addr);
            }
            PeerStatus::Connected => {}
            PeerStatus::AwaitingAckSend | PeerStatus::ToDisconnect => {
                warn!("Position packet from {} while {:?}", addr, status);
                return;
            }
        }

        let owner = self.peers.get(&addr).and_then(|peer| peer.player_id());
        if owner != Some(update.player_id) {
            warn!(
                "Dropping position for player {} sent by {} (owns {:?})",
                update.player_id, addr, owner
            );
            return;
        }

        trace!("Relaying position of player {}", update.player_id);
        self.broadcast_queue.push((packet, Some(addr)));
    }

    /// Marks the peer connected and makes every peer aware of every
    /// assigned player.
    fn setup_new_player(&mut self, addr: SocketAddr) {
        let Some(peer) = self.peers.get_mut(&addr) else {
            return;
        };
        peer.status = PeerStatus::Connected;
        info!("Player {:?} connected from {}", peer.player_id(), addr);

        self.make_connections_aware_of_new_player();
    }

    fn make_connections_aware_of_new_player(&mut self) {
        let live_ids: Vec<PlayerId> = self
            .peers
            .values()
            .filter(|peer| peer.status != PeerStatus::ToDisconnect)
            .filter_map(|peer| peer.player_id())
            .collect();

        for peer in self.peers.values_mut() {
            let own_id = peer.player_id();
            for &player_id in &live_ids {
                if Some(player_id) != own_id {
                    peer.awareness.insert_unaware(player_id);
                }
            }
        }
    }

    /// Advances every peer by one tick.
    pub fn update(&mut self, now: f32) {
        let time_sync_due = self
            .last_time_sync_sent
            .map_or(true, |last| now - last >= TIME_SYNC_INTERVAL);
        if time_sync_due {
            self.last_time_sync_sent = Some(now);
            self.broadcast_queue.push((
                Packet::stamped(PacketBody::TimeSync { server_time: now }, now),
                None,
            ));
        }

        let mut taken = self.taken_player_ids();

        for peer in self.peers.values_mut() {
            match peer.status {
                PeerStatus::AwaitingAckSend => {
                    let player_id = match peer.player_id() {
                        Some(id) => id,
                        None => {
                            let id = allocate_player_id(&mut self.rng, &taken);
                            taken.insert(id);
                            if let Err(e) = peer.assign_player_id(id) {
                                error!("Failed to assign player id to {}: {}", peer.addr, e);
                                continue;
                            }
                            id
                        }
                    };

                    debug!("Approving {} as player {}", peer.addr, player_id);
                    let approval = Packet::stamped(
                        PacketBody::Connection(HandshakeState::ApproveConnect {
                            assigned_player_id: player_id,
                            server_time: now,
                        }),
                        now,
                    );
                    send(&mut self.outbox, peer, approval, now);
                    peer.status = PeerStatus::AwaitingAckConfirm;
                }
                PeerStatus::Connected => {
                    for (packet, origin) in &self.broadcast_queue {
                        if *origin != Some(peer.addr) {
                            send(&mut self.outbox, peer, *packet, now);
                        }
                    }

                    if let Some(body) = peer.awareness.next_announcement(now) {
                        send(&mut self.outbox, peer, Packet::stamped(body, now), now);
                    }
                }
                PeerStatus::AwaitingAckConfirm | PeerStatus::ToDisconnect => {}
            }
        }

        self.broadcast_queue.clear();
        self.evict_timed_out(now);
    }

    fn evict_timed_out(&mut self, now: f32) {
        let timed_out: Vec<SocketAddr> = self
            .peers
            .values()
            .filter(|peer| peer.is_timed_out(now))
            .map(|peer| peer.addr)
            .collect();

        for addr in timed_out {
            let Some(mut peer) = self.peers.remove(&addr) else {
                continue;
            };
            peer.status = PeerStatus::ToDisconnect;
            info!("Player {:?} at {} timed out", peer.player_id(), addr);

            if let Some(player_id) = peer.player_id() {
                for other in self.peers.values_mut() {
                    other.awareness.mark_to_disconnect(player_id);
                }
            }
        }
    }

    /// Ids that must not be handed out: live peers and players some peer
    /// still has to be told about.
    fn taken_player_ids(&self) -> HashSet<PlayerId> {
        let mut taken: HashSet<PlayerId> =
            self.peers.values().filter_map(|peer| peer.player_id()).collect();
        for peer in self.peers.values() {
            taken.extend(peer.awareness.iter().map(|(id, _)| id));
        }
        taken
    }

    fn queue(&mut self, addr: SocketAddr, packet: Packet) {
        self.outbox.push((addr, packet));
    }

    pub fn drain_outgoing(&mut self) -> Vec<(SocketAddr, Packet)> {
        std::mem::take(&mut self.outbox)
    }

    pub fn peer(&self, addr: &SocketAddr) -> Option<&PeerConnection> {
        self.peers.get(addr)
    }

    pub fn peers(&self) -> impl Iterator<Item = &PeerConnection> {
        self.peers.values()
    }

    pub fn connected_count(&self) -> usize {
        self.peers.values().filter(|peer| peer.is_connected()).count()
    }

    pub fn max_connections(&self) -> usize {
        self.max_connections
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new(MAX_CONNECTIONS)
    }
}

fn allocate_player_id(rng: &mut StdRng, taken: &HashSet<PlayerId>) -> PlayerId {
    loop {
        let candidate: PlayerId = rng.gen();
        if !taken.contains(&candidate) {
            return candidate;
        }
    }
}

fn send(outbox: &mut Vec<(SocketAddr, Packet)>, peer: &mut PeerConnection, packet: Packet, now: f32) {
    peer.mark_sent(now);
    outbox.push((peer.addr, packet));
}
