//! Client side of the connection handshake
//!
//! States run their entry action the moment they are entered and some chain
//! straight into the next one:
//!
//! ```text
//! NotConnected -> WantConnect -> AwaitingApproval -> ConfirmingApproval -> Connected
//!                      ^               |   \
//!                      +-- 2s timeout -+    +-> Declined
//! ```
//!
//! Nothing here touches a socket. Packets to send pile up in an outbox and
//! status changes in an event list, both drained by the session.

use crate::clock::ClockSync;
use crate::events::{ConnectionStatus, SessionEvent};
use log::{debug, info, warn};
use shared::{HandshakeState, Packet, PacketBody, PlayerId, CONNECT_ACK_TIMEOUT, PEER_TIMEOUT};
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    NotConnected,
    WantConnect,
    AwaitingApproval,
    ConfirmingApproval,
    Connected,
    Declined,
}

impl ConnectionState {
    pub fn status(self) -> ConnectionStatus {
        match self {
            ConnectionState::NotConnected => ConnectionStatus::Disconnected,
            ConnectionState::WantConnect
            | ConnectionState::AwaitingApproval
            | ConnectionState::ConfirmingApproval => ConnectionStatus::Connecting,
            ConnectionState::Connected => ConnectionStatus::Connected,
            ConnectionState::Declined => ConnectionStatus::Declined,
        }
    }
}

#[derive(Debug)]
pub struct Connection {
    state: ConnectionState,
    started: bool,
    player_id: Option<PlayerId>,
    approved_server_time: Option<f32>,
    clock: ClockSync,
    ack_timer_started: f32,
    last_time_received_message: Option<f32>,
    reported_status: Option<ConnectionStatus>,
    /// Packets that leave on the next send, whatever the state
    outbox: Vec<Packet>,
    /// Packets held back until connected
    queued: VecDeque<Packet>,
    events: Vec<SessionEvent>,
}

impl Connection {
    pub fn new() -> Self {
        Self {
            state: ConnectionState::NotConnected,
            started: false,
            player_id: None,
            approved_server_time: None,
            clock: ClockSync::new(),
            ack_timer_started: 0.0,
            last_time_received_message: None,
            reported_status: None,
            outbox: Vec::new(),
            queued: VecDeque::new(),
            events: Vec::new(),
        }
    }

    /// Begins the handshake. Later calls do nothing.
    pub fn start(&mut self, now: f32) {
        if self.started {
            return;
        }
        self.started = true;
        self.enter(ConnectionState::NotConnected, now);
    }

    fn enter(&mut self, state: ConnectionState, now: f32) {
        let mut next = Some(state);

        while let Some(state) = next.take() {
            debug!("Connection state {:?} -> {:?}", self.state, state);
            self.state = state;

            next = match state {
                ConnectionState::NotConnected => {
                    self.report_status();
                    Some(ConnectionState::WantConnect)
                }
                ConnectionState::WantConnect => {
                    self.report_status();
                    self.send_now(PacketBody::Connection(HandshakeState::WantConnect), now);
                    Some(ConnectionState::AwaitingApproval)
                }
                ConnectionState::AwaitingApproval => {
                    self.ack_timer_started = now;
                    None
                }
                ConnectionState::ConfirmingApproval => {
                    self.send_now(
                        PacketBody::Connection(HandshakeState::AckConnectionResponse),
                        now,
                    );
                    Some(ConnectionState::Connected)
                }
                ConnectionState::Connected => {
                    if let Some(server_time) = self.approved_server_time {
                        self.clock.on_connected(server_time, now);
                    }
                    info!(
                        "Connected as player {:?} at server time {:?}",
                        self.player_id, self.approved_server_time
                    );
                    self.report_status();
                    None
                }
                ConnectionState::Declined => {
                    warn!("Server declined the connection");
                    self.report_status();
                    None
                }
            };
        }
    }

    fn report_status(&mut self) {
        let status = self.state.status();
        if self.reported_status == Some(status) {
            return;
        }
        self.reported_status = Some(status);

        let (player_id, server_time) = if status == ConnectionStatus::Connected {
            (self.player_id, self.approved_server_time)
        } else {
            (None, None)
        };
        self.events.push(SessionEvent::StatusChanged {
            status,
            player_id,
            server_time,
        });
    }

    /// Records that a datagram arrived from the server.
    pub fn touch(&mut self, now: f32) {
        self.last_time_received_message = Some(now);
    }

    pub fn handle_handshake(&mut self, handshake: HandshakeState, now: f32) {
        if self.state != ConnectionState::AwaitingApproval {
            warn!("Ignoring handshake {:?} while {:?}", handshake, self.state);
            return;
        }

        match handshake {
            HandshakeState::ApproveConnect {
                assigned_player_id,
                server_time,
            } => {
                self.player_id = Some(assigned_player_id);
                self.approved_server_time = Some(server_time);
                self.enter(ConnectionState::ConfirmingApproval, now);
            }
            HandshakeState::DeclineConnect => {
                self.enter(ConnectionState::Declined, now);
            }
            HandshakeState::ErrorOrNotSet => {
                warn!("Server reported a handshake error, still waiting for approval");
            }
            HandshakeState::WantConnect | HandshakeState::AckConnectionResponse => {
                warn!("Unexpected handshake {:?} from server", handshake);
            }
        }
    }

    pub fn handle_time_sync(&mut self, server_time: f32, now: f32) {
        self.clock.on_time_sync(server_time, now);
    }

    /// Retries the handshake after the ack timeout and flushes held packets
    /// once connected.
    pub fn update(&mut self, now: f32) {
        match self.state {
            ConnectionState::AwaitingApproval => {
                if now - self.ack_timer_started > CONNECT_ACK_TIMEOUT {
                    info!("No approval after {}s, retrying", CONNECT_ACK_TIMEOUT);
                    self.enter(ConnectionState::WantConnect, now);
                }
            }
            ConnectionState::Connected => {
                self.outbox.extend(self.queued.drain(..));
            }
            _ => {}
        }
    }

    /// Sends on the next flush regardless of state.
    pub fn send_now(&mut self, body: PacketBody, now: f32) {
        let packet = Packet::stamped(body, self.server_time(now));
        self.outbox.push(packet);
    }

    /// Holds a packet until the connection is established.
    pub fn queue(&mut self, body: PacketBody, now: f32) {
        let packet = Packet::stamped(body, self.server_time(now));
        self.queued.push_back(packet);
    }

    pub fn take_outgoing(&mut self) -> Vec<Packet> {
        std::mem::take(&mut self.outbox)
    }

    pub fn take_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn server_time(&self, now: f32) -> f32 {
        self.clock.current_server_time(now)
    }

    /// True when nothing has arrived from the server for longer than the
    /// peer timeout.
    pub fn server_silent(&self, now: f32) -> bool {
        match self.last_time_received_message {
            Some(last) => now - last > PEER_TIMEOUT,
            None => self.started && now - self.ack_timer_started > PEER_TIMEOUT,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn player_id(&self) -> Option<PlayerId> {
        self.player_id
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    pub fn clock(&self) -> &ClockSync {
        &self.clock
    }
}

impl Default for Connection {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn approve(id: PlayerId, server_time: f32) -> HandshakeState {
        HandshakeState::ApproveConnect {
            assigned_player_id: id,
            server_time,
        }
    }

    fn bodies(packets: &[Packet]) -> Vec<PacketBody> {
        packets.iter().map(|p| p.body).collect()
    }

    #[test]
    fn test_start_sends_want_connect() {
        let mut connection = Connection::new();
        connection.start(0.0);

        assert_eq!(connection.state(), ConnectionState::AwaitingApproval);
        assert_eq!(
            bodies(&connection.take_outgoing()),
            vec![PacketBody::Connection(HandshakeState::WantConnect)]
        );

        let statuses: Vec<ConnectionStatus> = connection
            .take_events()
            .into_iter()
            .map(|event| match event {
                SessionEvent::StatusChanged { status, .. } => status,
                other => panic!("Unexpected event {:?}", other),
            })
            .collect();
        assert_eq!(
            statuses,
            vec![ConnectionStatus::Disconnected, ConnectionStatus::Connecting]
        );

        connection.start(1.0);
        assert!(connection.take_outgoing().is_empty());
    }

    #[test]
    fn test_retry_after_ack_timeout() {
        let mut connection = Connection::new();
        connection.start(0.0);
        connection.take_outgoing();

        connection.update(1.9);
        assert!(connection.take_outgoing().is_empty());

        connection.update(2.1);
        assert_eq!(
            bodies(&connection.take_outgoing()),
            vec![PacketBody::Connection(HandshakeState::WantConnect)]
        );
        assert_eq!(connection.state(), ConnectionState::AwaitingApproval);

        // Timer restarted from the retry.
        connection.update(3.9);
        assert!(connection.take_outgoing().is_empty());
        connection.update(4.2);
        assert_eq!(connection.take_outgoing().len(), 1);

        // Still connecting, no repeated status events.
        connection.take_events();
        connection.update(6.5);
        assert!(connection.take_events().is_empty());
    }

    #[test]
    fn test_approval_connects_and_seeds_clock() {
        let mut connection = Connection::new();
        connection.start(0.0);
        connection.take_outgoing();
        connection.take_events();

        connection.handle_handshake(approve(42, 100.0), 0.5);
        assert_eq!(connection.state(), ConnectionState::Connected);
        assert_eq!(connection.player_id(), Some(42));
        assert_approx_eq!(connection.server_time(1.5), 101.0);

        let outgoing = connection.take_outgoing();
        assert_eq!(
            bodies(&outgoing),
            vec![PacketBody::Connection(HandshakeState::AckConnectionResponse)]
        );

        assert_eq!(
            connection.take_events(),
            vec![SessionEvent::StatusChanged {
                status: ConnectionStatus::Connected,
                player_id: Some(42),
                server_time: Some(100.0),
            }]
        );
    }

    #[test]
    fn test_decline_is_terminal() {
        let mut connection = Connection::new();
        connection.start(0.0);
        connection.take_outgoing();

        connection.handle_handshake(HandshakeState::DeclineConnect, 0.1);
        assert_eq!(connection.state(), ConnectionState::Declined);

        connection.update(10.0);
        assert!(connection.take_outgoing().is_empty());
        connection.handle_handshake(approve(1, 0.0), 10.0);
        assert_eq!(connection.state(), ConnectionState::Declined);
    }

    #[test]
    fn test_handshake_outside_awaiting_ignored() {
        let mut connection = Connection::new();
        connection.handle_handshake(approve(1, 0.0), 0.0);
        assert_eq!(connection.state(), ConnectionState::NotConnected);

        connection.start(0.0);
        connection.handle_handshake(HandshakeState::ErrorOrNotSet, 0.1);
        assert_eq!(connection.state(), ConnectionState::AwaitingApproval);

        connection.handle_handshake(approve(7, 5.0), 0.2);
        connection.take_outgoing();
        connection.take_events();

        // Stray handshakes once connected change nothing.
        connection.handle_handshake(approve(8, 6.0), 0.3);
        connection.handle_handshake(HandshakeState::ErrorOrNotSet, 0.4);
        assert_eq!(connection.player_id(), Some(7));
        assert_eq!(connection.state(), ConnectionState::Connected);
        assert!(connection.take_outgoing().is_empty());
        assert!(connection.take_events().is_empty());
    }

    #[test]
    fn test_queued_packets_wait_for_connection() {
        let mut connection = Connection::new();
        connection.start(0.0);
        connection.take_outgoing();

        connection.queue(PacketBody::NewPlayerAck { player_id: 3 }, 0.1);
        connection.update(0.1);
        assert!(connection.take_outgoing().is_empty());

        connection.handle_handshake(approve(1, 50.0), 0.2);
        connection.take_outgoing();
        connection.update(0.3);

        let outgoing = connection.take_outgoing();
        assert_eq!(outgoing.len(), 1);
        assert_eq!(outgoing[0].body, PacketBody::NewPlayerAck { player_id: 3 });
    }

    #[test]
    fn test_outgoing_stamped_with_server_time() {
        let mut connection = Connection::new();
        connection.start(0.0);
        connection.handle_handshake(approve(1, 50.0), 1.0);
        connection.take_outgoing();

        connection.send_now(PacketBody::NewPlayerAck { player_id: 2 }, 1.5);
        let outgoing = connection.take_outgoing();
        assert_approx_eq!(outgoing[0].time_sent, 50.5);
    }

    #[test]
    fn test_server_silence() {
        let mut connection = Connection::new();
        assert!(!connection.server_silent(100.0));

        connection.start(0.0);
        connection.touch(1.0);
        assert!(!connection.server_silent(8.0));
        assert!(connection.server_silent(9.0));
    }
}
