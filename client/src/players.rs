//! Remote players known to this client

use crate::events::PeerPose;
use crate::interpolation::{PositionSample, PositionTracker};
use log::{debug, trace};
use shared::{PlayerId, PositionUpdate};
use std::collections::BTreeMap;

/// Every remote player we were told about, each with its own reconstruction
/// buffer. The local player never appears here.
#[derive(Debug)]
pub struct PeerRoster {
    local_player_id: Option<PlayerId>,
    peers: BTreeMap<PlayerId, PositionTracker>,
    prediction_enabled: bool,
}

impl PeerRoster {
    pub fn new() -> Self {
        Self {
            local_player_id: None,
            peers: BTreeMap::new(),
            prediction_enabled: true,
        }
    }

    pub fn set_local_player(&mut self, player_id: PlayerId) {
        self.local_player_id = Some(player_id);
        self.peers.remove(&player_id);
    }

    /// Returns true if the player was new.
    pub fn spawn(&mut self, player_id: PlayerId) -> bool {
        if Some(player_id) == self.local_player_id || self.peers.contains_key(&player_id) {
            return false;
        }

        debug!("Spawning remote player {}", player_id);
        let mut tracker = PositionTracker::new();
        tracker.set_prediction_enabled(self.prediction_enabled);
        self.peers.insert(player_id, tracker);
        true
    }

    /// Returns true if the player was known.
    pub fn despawn(&mut self, player_id: PlayerId) -> bool {
        let removed = self.peers.remove(&player_id).is_some();
        if removed {
            debug!("Despawning remote player {}", player_id);
        }
        removed
    }

    /// Feeds a position packet to its player's buffer. Unknown players and
    /// our own echoes are ignored.
    pub fn apply_position(&mut self, update: PositionUpdate, time_sent: f32) -> bool {
        if Some(update.player_id) == self.local_player_id {
            return false;
        }

        match self.peers.get_mut(&update.player_id) {
            Some(tracker) => tracker.insert(PositionSample::from_update(update, time_sent)),
            None => {
                trace!("Position for unknown player {}", update.player_id);
                false
            }
        }
    }

    /// Advances every reconstruction and returns the resulting poses.
    pub fn advance(&mut self, dt: f32) -> Vec<PeerPose> {
        self.peers
            .iter_mut()
            .filter_map(|(&player_id, tracker)| {
                tracker.advance(dt).map(|pose| PeerPose {
                    player_id,
                    x: pose.x,
                    y: pose.y,
                    is_moving: pose.is_moving,
                    facing: pose.facing,
                })
            })
            .collect()
    }

    pub fn set_prediction_enabled(&mut self, enabled: bool) {
        self.prediction_enabled = enabled;
        for tracker in self.peers.values_mut() {
            tracker.set_prediction_enabled(enabled);
        }
    }

    pub fn prediction_enabled(&self) -> bool {
        self.prediction_enabled
    }

    pub fn contains(&self, player_id: PlayerId) -> bool {
        self.peers.contains_key(&player_id)
    }

    pub fn tracker(&self, player_id: PlayerId) -> Option<&PositionTracker> {
        self.peers.get(&player_id)
    }

    pub fn player_ids(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.peers.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

impl Default for PeerRoster {
    fn default() -> Self {
        Self::new()
    }
}
