//! Session events and the observers that receive them
//!
//! A session owns an [`EventDispatcher`] holding its subscribers. Observers
//! are registered with [`EventDispatcher::subscribe`] and removed with the
//! returned [`ObserverId`]. For consumers that prefer message passing, an
//! unbounded tokio sender is itself an observer.

use log::debug;
use shared::PlayerId;
use tokio::sync::mpsc::UnboundedSender;

/// Connection status as reported to the outside world
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
    /// The server refused us. Terminal.
    Declined,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeerPose {
    pub player_id: PlayerId,
    pub x: f32,
    pub y: f32,
    pub is_moving: bool,
    /// Normalized movement direction, zero when stopped
    pub facing: (f32, f32),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SessionEvent {
    StatusChanged {
        status: ConnectionStatus,
        player_id: Option<PlayerId>,
        server_time: Option<f32>,
    },
    PeerSpawn(PlayerId),
    PeerDespawn(PlayerId),
    PeerPositionUpdate(PeerPose),
}

/// Receives session events. Every method defaults to doing nothing.
pub trait SessionObserver {
    fn on_status_changed(
        &mut self,
        _status: ConnectionStatus,
        _player_id: Option<PlayerId>,
        _server_time: Option<f32>,
    ) {
    }

    fn on_peer_spawn(&mut self, _player_id: PlayerId) {}

    fn on_peer_despawn(&mut self, _player_id: PlayerId) {}

    fn on_peer_position_update(&mut self, _pose: PeerPose) {}
}

impl SessionObserver for UnboundedSender<SessionEvent> {
    fn on_status_changed(
        &mut self,
        status: ConnectionStatus,
        player_id: Option<PlayerId>,
        server_time: Option<f32>,
    ) {
        forward(
            self,
            SessionEvent::StatusChanged {
                status,
                player_id,
                server_time,
            },
        );
    }

    fn on_peer_spawn(&mut self, player_id: PlayerId) {
        forward(self, SessionEvent::PeerSpawn(player_id));
    }

    fn on_peer_despawn(&mut self, player_id: PlayerId) {
        forward(self, SessionEvent::PeerDespawn(player_id));
    }

    fn on_peer_position_update(&mut self, pose: PeerPose) {
        forward(self, SessionEvent::PeerPositionUpdate(pose));
    }
}

fn forward(sender: &UnboundedSender<SessionEvent>, event: SessionEvent) {
    if sender.send(event).is_err() {
        debug!("Event receiver dropped, discarding {:?}", event);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(u64);

#[derive(Default)]
pub struct EventDispatcher {
    observers: Vec<(ObserverId, Box<dyn SessionObserver + Send>)>,
    next_id: u64,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, observer: Box<dyn SessionObserver + Send>) -> ObserverId {
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        self.observers.push((id, observer));
        id
    }

    /// Returns false if the id was not subscribed.
    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(observer_id, _)| *observer_id != id);
        self.observers.len() != before
    }

    pub fn dispatch(&mut self, event: &SessionEvent) {
        for (_, observer) in &mut self.observers {
            match *event {
                SessionEvent::StatusChanged {
                    status,
                    player_id,
                    server_time,
                } => observer.on_status_changed(status, player_id, server_time),
                SessionEvent::PeerSpawn(id) => observer.on_peer_spawn(id),
                SessionEvent::PeerDespawn(id) => observer.on_peer_despawn(id),
                SessionEvent::PeerPositionUpdate(pose) => observer.on_peer_position_update(pose),
            }
        }
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}
