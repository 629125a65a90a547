//! Server-side state for one remote transport address

use crate::awareness::AwarenessMap;
use shared::{PlayerId, PEER_TIMEOUT};
use std::net::SocketAddr;
use thiserror::Error;

/// Where a peer is in the server's handshake
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerStatus {
    /// Registered, approval not yet sent
    AwaitingAckSend,
    /// Approval sent, waiting for the client to confirm it
    AwaitingAckConfirm,
    Connected,
    /// Timed out, about to be removed
    ToDisconnect,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("peer already has player id {0}")]
pub struct AlreadyAssigned(pub PlayerId);

/// A remote peer as seen by the server
///
/// The player id is assigned once, when the approval is first sent, and
/// never changes afterwards.
#[derive(Debug)]
pub struct PeerConnection {
    pub addr: SocketAddr,
    player_id: Option<PlayerId>,
    pub status: PeerStatus,
    pub last_message_sent_time: f32,
    pub last_message_receive_time: f32,
    pub awareness: AwarenessMap,
}

impl PeerConnection {
    pub fn new(addr: SocketAddr, now: f32) -> Self {
        Self {
            addr,
            player_id: None,
            status: PeerStatus::AwaitingAckSend,
            last_message_sent_time: now,
            last_message_receive_time: now,
            awareness: AwarenessMap::new(),
        }
    }

    pub fn player_id(&self) -> Option<PlayerId> {
        self.player_id
    }

    pub fn assign_player_id(&mut self, player_id: PlayerId) -> Result<(), AlreadyAssigned> {
        match self.player_id {
            Some(existing) => Err(AlreadyAssigned(existing)),
            None => {
                self.player_id = Some(player_id);
                Ok(())
            }
        }
    }

    /// Records that a datagram arrived from this peer.
    pub fn touch(&mut self, now: f32) {
        self.last_message_receive_time = now;
    }

    pub fn mark_sent(&mut self, now: f32) {
        self.last_message_sent_time = now;
    }

    pub fn is_timed_out(&self, now: f32) -> bool {
        now - self.last_message_receive_time > PEER_TIMEOUT
    }

    pub fn is_connected(&self) -> bool {
        self.status == PeerStatus::Connected
    }
}
