use crate::events::{ConnectionStatus, PeerPose, SessionEvent};
use macroquad::prelude::*;
use shared::PlayerId;
use std::collections::BTreeMap;

/// Everything the renderer needs, rebuilt from session events.
#[derive(Debug, Clone)]
pub struct PresentationState {
    pub status: ConnectionStatus,
    pub local_player_id: Option<PlayerId>,
    pub peers: BTreeMap<PlayerId, Option<PeerPose>>,
}

impl PresentationState {
    pub fn new() -> Self {
        Self {
            status: ConnectionStatus::Disconnected,
            local_player_id: None,
            peers: BTreeMap::new(),
        }
    }

    pub fn apply(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::StatusChanged {
                status, player_id, ..
            } => {
                self.status = status;
                if player_id.is_some() {
                    self.local_player_id = player_id;
                }
            }
            SessionEvent::PeerSpawn(player_id) => {
                self.peers.entry(player_id).or_insert(None);
            }
            SessionEvent::PeerDespawn(player_id) => {
                self.peers.remove(&player_id);
            }
            SessionEvent::PeerPositionUpdate(pose) => {
                // Updates for despawned peers can still be in flight.
                if let Some(slot) = self.peers.get_mut(&pose.player_id) {
                    *slot = Some(pose);
                }
            }
        }
    }

    /// Players on screen, including the local one once connected.
    pub fn player_count(&self) -> usize {
        self.peers.len() + usize::from(self.local_player_id.is_some())
    }
}

impl Default for PresentationState {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct UiConfig {
    pub server_time: f32,
    pub server_silent: bool,
    pub prediction_enabled: bool,
}

pub struct Renderer {
    width: f32,
    height: f32,
    /// Pixels per world unit
    scale: f32,
}

const PLAYER_RADIUS: f32 = 12.0;

impl Renderer {
    pub fn new(width: usize, height: usize) -> Self {
        Renderer {
            width: width as f32,
            height: height as f32,
            scale: 40.0,
        }
    }

    fn to_screen(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.width / 2.0 + x * self.scale,
            self.height / 2.0 + y * self.scale,
        )
    }

    pub fn render(&self, state: &PresentationState, local_position: (f32, f32), ui: UiConfig) {
        clear_background(Color::from_rgba(26, 26, 26, 255));

        for pose in state.peers.values().flatten() {
            self.draw_peer(pose);
        }

        if state.status == ConnectionStatus::Connected {
            let (x, y) = self.to_screen(local_position.0, local_position.1);
            draw_circle(x, y, PLAYER_RADIUS, GREEN);
            draw_circle_lines(x, y, PLAYER_RADIUS, 2.0, WHITE);
        }

        self.draw_ui(state, ui);
    }

    fn draw_peer(&self, pose: &PeerPose) {
        let (x, y) = self.to_screen(pose.x, pose.y);
        draw_circle(x, y, PLAYER_RADIUS, Color::from_rgba(255, 68, 68, 255));
        draw_circle_lines(x, y, PLAYER_RADIUS, 2.0, WHITE);

        if pose.is_moving {
            let end_x = x + pose.facing.0 * PLAYER_RADIUS * 1.8;
            let end_y = y + pose.facing.1 * PLAYER_RADIUS * 1.8;
            draw_line(x, y, end_x, end_y, 2.0, YELLOW);
        }

        draw_text(
            &pose.player_id.to_string(),
            x - PLAYER_RADIUS,
            y - PLAYER_RADIUS - 4.0,
            14.0,
            LIGHTGRAY,
        );
    }

    fn draw_ui(&self, state: &PresentationState, ui: UiConfig) {
        let (label, color) = match state.status {
            ConnectionStatus::Disconnected => ("DISCONNECTED", RED),
            ConnectionStatus::Connecting => ("CONNECTING", YELLOW),
            ConnectionStatus::Connected => ("CONNECTED", GREEN),
            ConnectionStatus::Declined => ("SERVER FULL", RED),
        };
        draw_rectangle(10.0, 10.0, 8.0, 8.0, color);
        draw_text(label, 24.0, 18.0, 16.0, WHITE);

        if let Some(id) = state.local_player_id {
            draw_text(&format!("player {}", id), 10.0, 36.0, 16.0, WHITE);
        }
        draw_text(
            &format!("server time {:.2}s", ui.server_time),
            10.0,
            54.0,
            16.0,
            WHITE,
        );
        draw_text(
            &format!("{} players", state.player_count()),
            10.0,
            72.0,
            16.0,
            WHITE,
        );

        let prediction_color = if ui.prediction_enabled { GREEN } else { RED };
        draw_rectangle(10.0, 82.0, 8.0, 8.0, prediction_color);
        draw_text("P prediction", 24.0, 90.0, 16.0, WHITE);

        if ui.server_silent {
            draw_text(
                "no response from server",
                10.0,
                self.height - 12.0,
                18.0,
                ORANGE,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pose(player_id: PlayerId, x: f32) -> PeerPose {
        PeerPose {
            player_id,
            x,
            y: 0.0,
            is_moving: false,
            facing: (0.0, 0.0),
        }
    }

    #[test]
    fn test_status_and_local_player() {
        let mut state = PresentationState::new();
        state.apply(SessionEvent::StatusChanged {
            status: ConnectionStatus::Connecting,
            player_id: None,
            server_time: None,
        });
        assert_eq!(state.player_count(), 0);

        state.apply(SessionEvent::StatusChanged {
            status: ConnectionStatus::Connected,
            player_id: Some(4),
            server_time: Some(1.0),
        });
        assert_eq!(state.status, ConnectionStatus::Connected);
        assert_eq!(state.local_player_id, Some(4));
        assert_eq!(state.player_count(), 1);
    }

    #[test]
    fn test_peer_lifecycle() {
        let mut state = PresentationState::new();
        state.apply(SessionEvent::PeerSpawn(2));
        assert_eq!(state.peers.get(&2), Some(&None));

        state.apply(SessionEvent::PeerPositionUpdate(pose(2, 3.0)));
        assert_eq!(state.peers.get(&2), Some(&Some(pose(2, 3.0))));

        state.apply(SessionEvent::PeerDespawn(2));
        state.apply(SessionEvent::PeerPositionUpdate(pose(2, 4.0)));
        assert!(state.peers.is_empty());
    }

    #[test]
    fn test_renderer_maps_origin_to_center() {
        let renderer = Renderer::new(800, 600);
        assert_eq!(renderer.to_screen(0.0, 0.0), (400.0, 300.0));
        assert_eq!(renderer.to_screen(1.0, -1.0), (440.0, 260.0));
    }
}
