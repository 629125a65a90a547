use std::time::Instant;

/// Monotonic seconds since the clock was created.
#[derive(Debug, Clone, Copy)]
pub struct SessionClock {
    started: Instant,
}

impl SessionClock {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    pub fn now(&self) -> f32 {
        self.started.elapsed().as_secs_f32()
    }
}

impl Default for SessionClock {
    fn default() -> Self {
        Self::new()
    }
}
