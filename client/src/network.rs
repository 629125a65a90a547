//! Non-blocking UDP transport for a [`ClientSession`]
//!
//! Uses a std socket so it can be polled from a frame loop with no async
//! runtime behind it.

use crate::events::{ObserverId, SessionObserver};
use crate::input::InputSource;
use crate::session::ClientSession;
use log::{debug, error, info, trace, warn};
use shared::{
    NetworkConfig, Packet, SessionClock, SessionError, CLIENT_MAX_PACKETS_PER_TICK,
    MAX_PACKET_SIZE,
};
use std::io::ErrorKind;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};

/// Owns the socket and the session clock. Call [`NetworkClient::poll`] once
/// per frame; it never blocks.
pub struct NetworkClient {
    socket: UdpSocket,
    server_addr: SocketAddr,
    clock: SessionClock,
    session: ClientSession,
}

impl NetworkClient {
    pub fn connect(config: &NetworkConfig) -> Result<Self, SessionError> {
        Self::connect_with_speed(config, shared::MOVEMENT_SPEED)
    }

    pub fn connect_with_speed(
        config: &NetworkConfig,
        movement_speed: f32,
    ) -> Result<Self, SessionError> {
        let server_addr = config.socket_addr()?;
        let bind_ip = if server_addr.is_ipv6() {
            IpAddr::V6(Ipv6Addr::UNSPECIFIED)
        } else {
            IpAddr::V4(Ipv4Addr::UNSPECIFIED)
        };
        let bind_addr = SocketAddr::new(bind_ip, 0);

        let socket = UdpSocket::bind(bind_addr).map_err(|source| SessionError::Bind {
            addr: bind_addr,
            source,
        })?;
        socket.set_nonblocking(true)?;
        info!(
            "Client bound to {}, server at {}",
            socket.local_addr()?,
            server_addr
        );

        let clock = SessionClock::new();
        let session = ClientSession::with_speed(clock.now(), movement_speed);

        Ok(NetworkClient {
            socket,
            server_addr,
            clock,
            session,
        })
    }

    pub fn subscribe(&mut self, observer: Box<dyn SessionObserver + Send>) -> ObserverId {
        self.session.subscribe(observer)
    }

    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        self.session.unsubscribe(id)
    }

    /// Receives, advances the session by `dt` and sends.
    pub fn poll(&mut self, dt: f32, input: &dyn InputSource) {
        self.receive_packets();
        let now = self.clock.now();
        self.session.update(now, dt, input);
        self.send_packets();
    }

    fn receive_packets(&mut self) {
        let mut buffer = [0u8; MAX_PACKET_SIZE];

        for _ in 0..CLIENT_MAX_PACKETS_PER_TICK {
            match self.socket.recv_from(&mut buffer) {
                Ok((len, from)) => {
                    if from != self.server_addr {
                        debug!("Ignoring datagram from {}", from);
                        continue;
                    }

                    let (packet, ok) = Packet::decode(&buffer[..len]);
                    if !ok {
                        warn!("Dropping malformed datagram from server");
                        continue;
                    }
                    trace!("{:?} from server", packet.kind());
                    let now = self.clock.now();
                    self.session.handle_packet(packet, now);
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) => {
                    debug!("Error receiving packet: {}", e);
                }
            }
        }
    }

    fn send_packets(&mut self) {
        for packet in self.session.take_outgoing() {
            let data = match packet.encode() {
                Ok(data) => data,
                Err(e) => {
                    error!("Failed to encode {:?}: {}", packet.kind(), e);
                    continue;
                }
            };

            if let Err(e) = self.socket.send_to(&data, self.server_addr) {
                warn!("Failed to send {:?}: {}", packet.kind(), e);
            }
        }
    }

    /// Seconds since this client started.
    pub fn now(&self) -> f32 {
        self.clock.now()
    }

    pub fn server_time(&self) -> f32 {
        self.session.server_time(self.clock.now())
    }

    pub fn server_silent(&self) -> bool {
        self.session.server_silent(self.clock.now())
    }

    pub fn session(&self) -> &ClientSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut ClientSession {
        &mut self.session
    }

    pub fn server_addr(&self) -> SocketAddr {
        self.server_addr
    }

    pub fn local_addr(&self) -> Result<SocketAddr, SessionError> {
        Ok(self.socket.local_addr()?)
    }
}
