//! Client estimate of the server clock

/// Tracks the last server time we heard and when we heard it.
///
/// The estimate is `last_known + (local_now - received_at)` with no smoothing.
/// The connection approval and every time sync re-seed it.
#[derive(Debug, Clone, Default)]
pub struct ClockSync {
    last_known_server_time: f32,
    received_at: f32,
    synced: bool,
    connected_local_time: Option<f32>,
    connected_server_time: Option<f32>,
}

impl ClockSync {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the clock from the server time carried by the approval.
    pub fn on_connected(&mut self, server_time: f32, local_now: f32) {
        self.connected_local_time = Some(local_now);
        self.connected_server_time = Some(server_time);
        self.resync(server_time, local_now);
    }

    pub fn on_time_sync(&mut self, server_time: f32, local_now: f32) {
        self.resync(server_time, local_now);
    }

    fn resync(&mut self, server_time: f32, local_now: f32) {
        self.last_known_server_time = server_time;
        self.received_at = local_now;
        self.synced = true;
    }

    /// Current server time. Before the first sync this is the local time.
    pub fn current_server_time(&self, local_now: f32) -> f32 {
        if self.synced {
            self.last_known_server_time + (local_now - self.received_at)
        } else {
            local_now
        }
    }

    pub fn is_synced(&self) -> bool {
        self.synced
    }

    /// Local and server time at the moment the connection was approved.
    pub fn connected_at(&self) -> Option<(f32, f32)> {
        self.connected_local_time.zip(self.connected_server_time)
    }
}
