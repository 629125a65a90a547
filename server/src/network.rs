//! Server network layer driving the connection registry over UDP

use crate::registry::ConnectionRegistry;
use log::{debug, error, info, trace, warn};
use shared::{Packet, SessionClock, SessionError, MAX_PACKET_SIZE, SERVER_MAX_PACKETS_PER_TICK};
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::{interval, MissedTickBehavior};

/// Authoritative session server
///
/// Each tick drains a bounded number of datagrams, advances the registry and
/// sends everything it produced.
pub struct Server {
    socket: UdpSocket,
    registry: ConnectionRegistry,
    clock: SessionClock,
    tick_duration: Duration,
}

impl Server {
    pub async fn bind(
        addr: SocketAddr,
        tick_duration: Duration,
        max_connections: usize,
    ) -> Result<Self, SessionError> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|source| SessionError::Bind { addr, source })?;
        info!("Server listening on {}", socket.local_addr()?);

        Ok(Server {
            socket,
            registry: ConnectionRegistry::new(max_connections),
            clock: SessionClock::new(),
            tick_duration,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, SessionError> {
        Ok(self.socket.local_addr()?)
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// Reads at most one tick's worth of datagrams without blocking.
    fn receive_packets(&mut self) {
        let mut buffer = [0u8; MAX_PACKET_SIZE];

        for _ in 0..SERVER_MAX_PACKETS_PER_TICK {
            match self.socket.try_recv_from(&mut buffer) {
                Ok((len, addr)) => match Packet::try_decode(&buffer[..len]) {
                    Ok(packet) => {
                        trace!("{:?} from {}", packet.kind(), addr);
                        let now = self.clock.now();
                        self.registry.handle_packet(addr, packet, now);
                    }
                    Err(e) => {
                        warn!("Dropping datagram from {}: {}", addr, e);
                    }
                },
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) => {
                    // ICMP port unreachable surfaces here on some platforms.
                    debug!("Error receiving packet: {}", e);
                }
            }
        }
    }

    async fn send_packets(&mut self) {
        for (addr, packet) in self.registry.drain_outgoing() {
            let data = match packet.encode() {
                Ok(data) => data,
                Err(e) => {
                    error!("Failed to encode {:?} for {}: {}", packet.kind(), addr, e);
                    continue;
                }
            };

            if let Err(e) = self.socket.send_to(&data, addr).await {
                warn!("Failed to send packet to {}: {}", addr, e);
            }
        }
    }

    /// Runs a single tick.
    pub async fn tick(&mut self) {
        self.receive_packets();
        let now = self.clock.now();
        self.registry.update(now);
        self.send_packets().await;
    }

    /// Main server loop. Runs until the task is dropped.
    pub async fn run(&mut self) -> Result<(), SessionError> {
        let mut tick_interval = interval(self.tick_duration);
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut ticks: u64 = 0;

        info!("Server started successfully");

        loop {
            tick_interval.tick().await;
            self.tick().await;
            ticks += 1;

            if ticks % 600 == 0 {
                debug!(
                    "Tick {}: {} peers, {} connected",
                    ticks,
                    self.registry.len(),
                    self.registry.connected_count()
                );
            }
        }
    }
}
