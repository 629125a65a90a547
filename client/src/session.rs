//! A client's view of one multiplayer session
//!
//! [`ClientSession`] glues the connection state machine, the remote player
//! roster and the local position reporter together and forwards everything
//! noteworthy to its observers. It is driven with explicit timestamps and
//! never touches a socket, which keeps it usable from tests and from any
//! transport.

use crate::connection::{Connection, ConnectionState};
use crate::events::{ConnectionStatus, EventDispatcher, ObserverId, SessionEvent, SessionObserver};
use crate::input::{InputSource, PositionReporter};
use crate::players::PeerRoster;
use log::{debug, warn};
use shared::{Packet, PacketBody, PlayerId, MOVEMENT_SPEED};

pub struct ClientSession {
    connection: Connection,
    roster: PeerRoster,
    reporter: PositionReporter,
    dispatcher: EventDispatcher,
}

impl ClientSession {
    pub fn new(created_at: f32) -> Self {
        Self::with_speed(created_at, MOVEMENT_SPEED)
    }

    pub fn with_speed(created_at: f32, movement_speed: f32) -> Self {
        Self {
            connection: Connection::new(),
            roster: PeerRoster::new(),
            reporter: PositionReporter::with_speed(created_at, movement_speed),
            dispatcher: EventDispatcher::new(),
        }
    }

    pub fn subscribe(&mut self, observer: Box<dyn SessionObserver + Send>) -> ObserverId {
        self.dispatcher.subscribe(observer)
    }

    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        self.dispatcher.unsubscribe(id)
    }

    /// Applies one packet received from the server.
    pub fn handle_packet(&mut self, packet: Packet, now: f32) {
        self.connection.touch(now);

        match packet.body {
            PacketBody::Connection(handshake) => {
                self.connection.handle_handshake(handshake, now);
                if let Some(player_id) = self.connection.player_id() {
                    if self.connection.is_connected() {
                        self.roster.set_local_player(player_id);
                    }
                }
            }
            PacketBody::TimeSync { server_time } => {
                self.connection.handle_time_sync(server_time, now);
            }
            PacketBody::NewPlayer { player_id } => {
                if self.roster.spawn(player_id) {
                    self.dispatcher.dispatch(&SessionEvent::PeerSpawn(player_id));
                }
                self.connection.send_now(PacketBody::NewPlayerAck { player_id }, now);
            }
            PacketBody::PlayerDisconnected { player_id } => {
                if self.roster.despawn(player_id) {
                    self.dispatcher.dispatch(&SessionEvent::PeerDespawn(player_id));
                }
                self.connection
                    .send_now(PacketBody::PlayerDisconnectedAck { player_id }, now);
            }
            PacketBody::Position(update) => {
                if self.connection.is_connected() {
                    self.roster.apply_position(update, packet.time_sent);
                } else {
                    debug!("Position packet before connecting, dropped");
                }
            }
            PacketBody::NewPlayerAck { .. }
            | PacketBody::PlayerDisconnectedAck { .. }
            | PacketBody::Error => {
                warn!("Dropping unexpected {:?} packet from server", packet.kind());
            }
        }

        self.dispatch_connection_events();
    }

    /// Advances timers, reports the local position and reconstructs remote
    /// players. `dt` is the time since the previous update.
    pub fn update(&mut self, now: f32, dt: f32, input: &dyn InputSource) {
        self.connection.start(now);

        if self.connection.is_connected() {
            if let Some(player_id) = self.player_id() {
                if let Some(update) = self.reporter.poll(now, player_id, input) {
                    self.connection.queue(PacketBody::Position(update), now);
                }
            }
        }

        self.connection.update(now);

        for pose in self.roster.advance(dt) {
            self.dispatcher.dispatch(&SessionEvent::PeerPositionUpdate(pose));
        }

        self.dispatch_connection_events();
    }

    fn dispatch_connection_events(&mut self) {
        for event in self.connection.take_events() {
            self.dispatcher.dispatch(&event);
        }
    }

    /// Packets ready to go out, in order.
    pub fn take_outgoing(&mut self) -> Vec<Packet> {
        self.connection.take_outgoing()
    }

    pub fn state(&self) -> ConnectionState {
        self.connection.state()
    }

    pub fn status(&self) -> ConnectionStatus {
        self.connection.state().status()
    }

    pub fn player_id(&self) -> Option<PlayerId> {
        self.connection.player_id()
    }

    pub fn server_time(&self, now: f32) -> f32 {
        self.connection.server_time(now)
    }

    pub fn server_silent(&self, now: f32) -> bool {
        self.connection.server_silent(now)
    }

    pub fn set_prediction_enabled(&mut self, enabled: bool) {
        self.roster.set_prediction_enabled(enabled);
    }

    pub fn roster(&self) -> &PeerRoster {
        &self.roster
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }
}
