//! Per-peer knowledge of the other players
//!
//! Every connected peer carries an awareness map describing which other
//! players it has been told about. The server keeps re-announcing joins and
//! departures, one packet per resend interval, until the peer acknowledges.

use log::warn;
use shared::{PacketBody, PlayerId, AWARENESS_RESEND_INTERVAL};
use std::collections::BTreeMap;

/// What a peer knows about another player
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Awareness {
    /// Joined, announcement not yet acknowledged
    Unaware,
    /// Announcement acknowledged
    Aware,
    /// Left, departure not yet acknowledged
    ToDisconnect,
}

/// Result of applying an acknowledgement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckOutcome {
    Applied,
    Duplicate,
    Unknown,
}

#[derive(Debug, Default)]
pub struct AwarenessMap {
    entries: BTreeMap<PlayerId, Awareness>,
    last_sent: Option<f32>,
}

impl AwarenessMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a player the peer must be told about.
    ///
    /// Existing entries are left alone so a re-announcement never resets an
    /// acknowledged or departing player.
    pub fn insert_unaware(&mut self, player_id: PlayerId) {
        self.entries.entry(player_id).or_insert(Awareness::Unaware);
    }

    /// Flags a known player as departed. Returns false if the peer never
    /// heard of the player.
    pub fn mark_to_disconnect(&mut self, player_id: PlayerId) -> bool {
        match self.entries.get_mut(&player_id) {
            Some(state) => {
                *state = Awareness::ToDisconnect;
                true
            }
            None => false,
        }
    }

    pub fn acknowledge_new_player(&mut self, player_id: PlayerId) -> AckOutcome {
        match self.entries.get_mut(&player_id) {
            Some(state @ Awareness::Unaware) => {
                *state = Awareness::Aware;
                AckOutcome::Applied
            }
            Some(Awareness::Aware) => AckOutcome::Duplicate,
            // A late join ack must not resurrect a departed player.
            Some(Awareness::ToDisconnect) => AckOutcome::Duplicate,
            None => AckOutcome::Unknown,
        }
    }

    pub fn acknowledge_disconnect(&mut self, player_id: PlayerId) -> AckOutcome {
        match self.entries.get(&player_id) {
            Some(Awareness::ToDisconnect) => {
                self.entries.remove(&player_id);
                AckOutcome::Applied
            }
            Some(_) => {
                warn!(
                    "Disconnect ack for player {} which is not departing",
                    player_id
                );
                AckOutcome::Duplicate
            }
            None => AckOutcome::Unknown,
        }
    }

    /// Picks the next announcement, if one is due.
    ///
    /// Joins go out before departures and both share a single resend timer,
    /// so at most one awareness packet leaves per interval.
    pub fn next_announcement(&mut self, now: f32) -> Option<PacketBody> {
        if let Some(last_sent) = self.last_sent {
            if now - last_sent < AWARENESS_RESEND_INTERVAL {
                return None;
            }
        }

        let body = self
            .first_with(Awareness::Unaware)
            .map(|player_id| PacketBody::NewPlayer { player_id })
            .or_else(|| {
                self.first_with(Awareness::ToDisconnect)
                    .map(|player_id| PacketBody::PlayerDisconnected { player_id })
            })?;

        self.last_sent = Some(now);
        Some(body)
    }

    fn first_with(&self, wanted: Awareness) -> Option<PlayerId> {
        self.entries
            .iter()
            .find(|(_, state)| **state == wanted)
            .map(|(id, _)| *id)
    }

    pub fn get(&self, player_id: PlayerId) -> Option<Awareness> {
        self.entries.get(&player_id).copied()
    }

    pub fn contains(&self, player_id: PlayerId) -> bool {
        self.entries.contains_key(&player_id)
    }

    pub fn remove(&mut self, player_id: PlayerId) {
        self.entries.remove(&player_id);
    }

    pub fn iter(&self) -> impl Iterator<Item = (PlayerId, Awareness)> + '_ {
        self.entries.iter().map(|(id, state)| (*id, *state))
    }

    /// True when nothing is waiting on an acknowledgement.
    pub fn is_settled(&self) -> bool {
        self.entries.values().all(|state| *state == Awareness::Aware)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
