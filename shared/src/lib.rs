pub mod clock;
pub mod config;
pub mod error;
pub mod packet;

pub use clock::SessionClock;
pub use config::NetworkConfig;
pub use error::{CodecError, ConfigError, SessionError};
pub use packet::{HandshakeState, Packet, PacketBody, PacketKind, PlayerId, PositionUpdate};

pub const DEFAULT_IP: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 55123;

/// Receive buffer size and the upper bound for any encoded packet.
pub const MAX_PACKET_SIZE: usize = 2048;

pub const MAX_CONNECTIONS: usize = 32;
pub const SERVER_MAX_PACKETS_PER_TICK: usize = 20;
pub const CLIENT_MAX_PACKETS_PER_TICK: usize = 10;

/// Seconds without any datagram before a peer is evicted.
pub const PEER_TIMEOUT: f32 = 7.5;
pub const TIME_SYNC_INTERVAL: f32 = 0.25;
pub const AWARENESS_RESEND_INTERVAL: f32 = 0.1;
pub const CONNECT_ACK_TIMEOUT: f32 = 2.0;

pub const POSITION_SEND_INTERVAL: f32 = 1.0 / 30.0;
pub const POSITION_FIRST_SEND_DELAY: f32 = 0.25;
pub const MOVEMENT_SPEED: f32 = 5.0;
pub const MOVING_SPEED_THRESHOLD: f32 = 0.0001;

/// Two packets of the same kind and player closer in time than this are duplicates.
pub const DUPLICATE_TIME_EPSILON: f32 = 0.01;
pub const POSITION_BUFFER_CAPACITY: usize = 4;
