use crate::error::CodecError;
use crate::{DUPLICATE_TIME_EPSILON, MAX_PACKET_SIZE};
use bincode::Options;
use serde::{Deserialize, Serialize};

pub type PlayerId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketKind {
    Error,
    Connection,
    Position,
    TimeSync,
    NewPlayer,
    NewPlayerAck,
    PlayerDisconnected,
    PlayerDisconnectedAck,
}

/// Handshake step carried by a connection packet.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub enum HandshakeState {
    ErrorOrNotSet,
    WantConnect,
    ApproveConnect {
        assigned_player_id: PlayerId,
        server_time: f32,
    },
    DeclineConnect,
    AckConnectionResponse,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct PositionUpdate {
    pub player_id: PlayerId,
    pub x: f32,
    pub y: f32,
    pub speed: f32,
    pub is_moving: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub enum PacketBody {
    Error,
    Connection(HandshakeState),
    Position(PositionUpdate),
    TimeSync { server_time: f32 },
    NewPlayer { player_id: PlayerId },
    NewPlayerAck { player_id: PlayerId },
    PlayerDisconnected { player_id: PlayerId },
    PlayerDisconnectedAck { player_id: PlayerId },
}

/// A timestamped message. `time_sent` is in server-relative seconds.
///
/// The body is serialized first so the kind tag leads every datagram.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct Packet {
    pub body: PacketBody,
    pub time_sent: f32,
}

fn wire_options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_little_endian()
        .reject_trailing_bytes()
        .with_limit(MAX_PACKET_SIZE as u64)
}

fn require_finite(value: f32, field: &'static str) -> Result<(), CodecError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(CodecError::NonFinite(field))
    }
}

impl Packet {
    pub fn new(body: PacketBody) -> Self {
        Self {
            body,
            time_sent: 0.0,
        }
    }

    pub fn stamped(body: PacketBody, time_sent: f32) -> Self {
        Self { body, time_sent }
    }

    /// The sentinel produced for undecodable input.
    pub fn error() -> Self {
        Self::new(PacketBody::Error)
    }

    pub fn kind(&self) -> PacketKind {
        match self.body {
            PacketBody::Error => PacketKind::Error,
            PacketBody::Connection(_) => PacketKind::Connection,
            PacketBody::Position(_) => PacketKind::Position,
            PacketBody::TimeSync { .. } => PacketKind::TimeSync,
            PacketBody::NewPlayer { .. } => PacketKind::NewPlayer,
            PacketBody::NewPlayerAck { .. } => PacketKind::NewPlayerAck,
            PacketBody::PlayerDisconnected { .. } => PacketKind::PlayerDisconnected,
            PacketBody::PlayerDisconnectedAck { .. } => PacketKind::PlayerDisconnectedAck,
        }
    }

    /// Player the packet is about, if its kind carries one.
    pub fn player_id(&self) -> Option<PlayerId> {
        match self.body {
            PacketBody::Position(update) => Some(update.player_id),
            PacketBody::NewPlayer { player_id }
            | PacketBody::NewPlayerAck { player_id }
            | PacketBody::PlayerDisconnected { player_id }
            | PacketBody::PlayerDisconnectedAck { player_id } => Some(player_id),
            PacketBody::Connection(HandshakeState::ApproveConnect {
                assigned_player_id,
                ..
            }) => Some(assigned_player_id),
            _ => None,
        }
    }

    pub fn is_duplicate_of(&self, other: &Packet) -> bool {
        self.kind() == other.kind()
            && self.player_id() == other.player_id()
            && (self.time_sent - other.time_sent).abs() < DUPLICATE_TIME_EPSILON
    }

    fn validate(&self) -> Result<(), CodecError> {
        require_finite(self.time_sent, "time_sent")?;
        match self.body {
            PacketBody::Position(update) => {
                require_finite(update.x, "x")?;
                require_finite(update.y, "y")?;
                require_finite(update.speed, "speed")
            }
            PacketBody::TimeSync { server_time }
            | PacketBody::Connection(HandshakeState::ApproveConnect { server_time, .. }) => {
                require_finite(server_time, "server_time")
            }
            _ => Ok(()),
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        self.validate()?;
        Ok(wire_options().serialize(self)?)
    }

    pub fn try_decode(bytes: &[u8]) -> Result<Packet, CodecError> {
        let packet: Packet = wire_options().deserialize(bytes)?;
        packet.validate()?;
        Ok(packet)
    }

    /// Decodes a datagram, returning the error sentinel and `false` on any
    /// malformed input.
    pub fn decode(bytes: &[u8]) -> (Packet, bool) {
        match Self::try_decode(bytes) {
            Ok(packet) => (packet, true),
            Err(_) => (Packet::error(), false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn position(player_id: PlayerId, x: f32, y: f32, time_sent: f32) -> Packet {
        Packet::stamped(
            PacketBody::Position(PositionUpdate {
                player_id,
                x,
                y,
                speed: 5.0,
                is_moving: true,
            }),
            time_sent,
        )
    }

    #[test]
    fn test_position_round_trip() {
        let packet = position(7, -12.5, 3.25, 10.125);
        let bytes = packet.encode().unwrap();
        let (decoded, ok) = Packet::decode(&bytes);

        assert!(ok);
        assert_eq!(decoded, packet);
        assert_eq!(decoded.kind(), PacketKind::Position);
        assert_approx_eq!(decoded.time_sent, 10.125);
    }

    #[test]
    fn test_kind_tag_leads_datagram() {
        let bytes = Packet::stamped(PacketBody::TimeSync { server_time: 1.0 }, 1.0)
            .encode()
            .unwrap();
        // TimeSync is the fourth body variant, fixed-width little endian tag.
        assert_eq!(&bytes[..4], &[3, 0, 0, 0]);
        // tag + server_time + time_sent
        assert_eq!(bytes.len(), 12);
    }

    #[test]
    fn test_approve_connect_round_trip() {
        let packet = Packet::stamped(
            PacketBody::Connection(HandshakeState::ApproveConnect {
                assigned_player_id: u32::MAX,
                server_time: 0.0,
            }),
            0.0,
        );
        let (decoded, ok) = Packet::decode(&packet.encode().unwrap());
        assert!(ok);
        assert_eq!(decoded, packet);
        assert_eq!(decoded.player_id(), Some(u32::MAX));
    }

    #[test]
    fn test_boundary_floats_survive() {
        let packet = position(1, f32::MAX, f32::MIN_POSITIVE, f32::MAX);
        let (decoded, ok) = Packet::decode(&packet.encode().unwrap());
        assert!(ok);
        assert_eq!(decoded, packet);

        let negative_zero = position(1, -0.0, 0.0, 0.0);
        let (decoded, ok) = Packet::decode(&negative_zero.encode().unwrap());
        assert!(ok);
        if let PacketBody::Position(update) = decoded.body {
            assert!(update.x.is_sign_negative());
        } else {
            panic!("Wrong packet type after decoding");
        }
    }

    #[test]
    fn test_nan_is_rejected() {
        let packet = position(1, f32::NAN, 0.0, 1.0);
        assert!(matches!(packet.encode(), Err(CodecError::NonFinite("x"))));

        // Hand-built datagram carrying a NaN time_sent.
        let mut bytes = Packet::stamped(PacketBody::NewPlayer { player_id: 2 }, 1.0)
            .encode()
            .unwrap();
        let len = bytes.len();
        bytes[len - 4..].copy_from_slice(&f32::NAN.to_le_bytes());
        assert!(matches!(
            Packet::try_decode(&bytes),
            Err(CodecError::NonFinite("time_sent"))
        ));
        let (sentinel, ok) = Packet::decode(&bytes);
        assert!(!ok);
        assert_eq!(sentinel.kind(), PacketKind::Error);
    }

    #[test]
    fn test_garbage_decodes_to_error_sentinel() {
        for bytes in [&[][..], &[0xff, 0xff, 0xff, 0xff][..], &[1, 0][..]] {
            let (packet, ok) = Packet::decode(bytes);
            assert!(!ok);
            assert_eq!(packet.kind(), PacketKind::Error);
        }
    }

    #[test]
    fn test_truncated_and_trailing_bytes_rejected() {
        let bytes = position(3, 1.0, 2.0, 3.0).encode().unwrap();
        assert!(!Packet::decode(&bytes[..bytes.len() - 1]).1);

        let mut padded = bytes.clone();
        padded.push(0);
        assert!(!Packet::decode(&padded).1);
    }

    #[test]
    fn test_duplicate_detection() {
        let a = position(4, 0.0, 0.0, 1.000);
        let b = position(4, 9.0, 9.0, 1.005);
        let c = position(4, 0.0, 0.0, 1.020);
        let other_player = position(5, 0.0, 0.0, 1.000);

        assert!(a.is_duplicate_of(&b));
        assert!(!a.is_duplicate_of(&c));
        assert!(!a.is_duplicate_of(&other_player));

        let ack = Packet::stamped(PacketBody::NewPlayerAck { player_id: 4 }, 1.0);
        assert!(!a.is_duplicate_of(&ack));
    }
}
