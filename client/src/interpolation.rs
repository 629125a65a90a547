//! Reconstruction of remote player positions from lossy position packets
//!
//! Each remote player gets a small newest-first buffer of samples. When the
//! two newest samples both say the player is moving we dead-reckon along the
//! last observed step, deliberately overshooting past the newest sample until
//! fresher data arrives. Otherwise we snap to the newest sample.

use shared::{PlayerId, PositionUpdate, DUPLICATE_TIME_EPSILON, POSITION_BUFFER_CAPACITY};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionSample {
    pub player_id: PlayerId,
    pub x: f32,
    pub y: f32,
    pub speed: f32,
    pub is_moving: bool,
    pub time_sent: f32,
}

impl PositionSample {
    pub fn from_update(update: PositionUpdate, time_sent: f32) -> Self {
        Self {
            player_id: update.player_id,
            x: update.x,
            y: update.y,
            speed: update.speed,
            is_moving: update.is_moving,
            time_sent,
        }
    }

    fn is_duplicate_of(&self, other: &PositionSample) -> bool {
        self == other || (self.time_sent - other.time_sent).abs() < DUPLICATE_TIME_EPSILON
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Motion {
    Predicting,
    StartingToMove,
    Stopped,
}

/// Reconstructed pose for one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub x: f32,
    pub y: f32,
    pub is_moving: bool,
    pub facing: (f32, f32),
}

#[derive(Debug, Clone)]
pub struct PositionTracker {
    /// Newest first
    samples: Vec<PositionSample>,
    motion: Motion,
    lerp_timer: f32,
    average_velocity: (f32, f32),
    prediction_enabled: bool,
}

impl PositionTracker {
    pub fn new() -> Self {
        Self {
            samples: Vec::with_capacity(POSITION_BUFFER_CAPACITY + 1),
            motion: Motion::Stopped,
            lerp_timer: 0.0,
            average_velocity: (0.0, 0.0),
            prediction_enabled: true,
        }
    }

    /// Adds a sample. Returns false if it was a duplicate and dropped.
    pub fn insert(&mut self, sample: PositionSample) -> bool {
        if self.samples.iter().any(|s| s.is_duplicate_of(&sample)) {
            return false;
        }

        self.samples.push(sample);
        self.samples.sort_by(|a, b| b.time_sent.total_cmp(&a.time_sent));
        self.samples.truncate(POSITION_BUFFER_CAPACITY);
        self.classify();
        true
    }

    fn classify(&mut self) {
        let [newest, previous, ..] = *self.samples.as_slice() else {
            return;
        };

        if newest.is_moving && previous.is_moving {
            self.motion = Motion::Predicting;
            self.lerp_timer = 0.0;
            self.average_velocity = (newest.x - previous.x, newest.y - previous.y);
        } else if newest.is_moving {
            self.motion = Motion::StartingToMove;
            self.lerp_timer = 0.0;
            self.average_velocity = (0.0, 0.0);
        } else {
            self.motion = Motion::Stopped;
            self.average_velocity = (0.0, 0.0);
        }
    }

    /// Advances the reconstruction by `dt` seconds.
    ///
    /// Returns `None` until at least two samples have arrived.
    pub fn advance(&mut self, dt: f32) -> Option<Pose> {
        let [newest, previous, ..] = *self.samples.as_slice() else {
            return None;
        };

        if self.prediction_enabled && self.motion == Motion::Predicting {
            let step = newest.time_sent - previous.time_sent;
            if step > 0.0 {
                self.lerp_timer += dt / step;
            }
            let t = self.lerp_timer;
            return Some(Pose {
                x: lerp_unclamped(previous.x, newest.x, t),
                y: lerp_unclamped(previous.y, newest.y, t),
                is_moving: true,
                facing: normalized(self.average_velocity),
            });
        }

        // Heading is only known while predicting.
        Some(Pose {
            x: newest.x,
            y: newest.y,
            is_moving: newest.is_moving,
            facing: (0.0, 0.0),
        })
    }

    pub fn set_prediction_enabled(&mut self, enabled: bool) {
        self.prediction_enabled = enabled;
    }

    pub fn motion(&self) -> Motion {
        self.motion
    }

    pub fn newest(&self) -> Option<&PositionSample> {
        self.samples.first()
    }

    pub fn samples(&self) -> &[PositionSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl Default for PositionTracker {
    fn default() -> Self {
        Self::new()
    }
}

fn lerp_unclamped(from: f32, to: f32, t: f32) -> f32 {
    from + (to - from) * t
}

fn normalized((x, y): (f32, f32)) -> (f32, f32) {
    let length = (x * x + y * y).sqrt();
    if length > f32::EPSILON {
        (x / length, y / length)
    } else {
        (0.0, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn sample(x: f32, time_sent: f32, is_moving: bool) -> PositionSample {
        PositionSample {
            player_id: 1,
            x,
            y: 0.0,
            speed: if is_moving { 5.0 } else { 0.0 },
            is_moving,
            time_sent,
        }
    }

    #[test]
    fn test_single_sample_produces_nothing() {
        let mut tracker = PositionTracker::new();
        tracker.insert(sample(1.0, 1.0, true));
        assert_eq!(tracker.advance(0.016), None);
    }

    #[test]
    fn test_near_duplicate_dropped() {
        let mut tracker = PositionTracker::new();
        assert!(tracker.insert(sample(1.0, 1.000, true)));
        assert!(!tracker.insert(sample(2.0, 1.005, true)));
        assert!(!tracker.insert(sample(1.0, 1.000, true)));
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn test_buffer_keeps_four_newest() {
        let mut tracker = PositionTracker::new();
        for (i, t) in [0.3, 0.1, 0.5, 0.2, 0.4].iter().enumerate() {
            tracker.insert(sample(i as f32, *t, true));
        }

        let times: Vec<f32> = tracker.samples().iter().map(|s| s.time_sent).collect();
        assert_eq!(times, vec![0.5, 0.4, 0.3, 0.2]);

        // Older than everything kept, falls straight off the end.
        tracker.insert(sample(9.0, 0.05, true));
        assert_eq!(tracker.len(), 4);
        assert_eq!(tracker.samples()[3].time_sent, 0.2);
    }

    #[test]
    fn test_prediction_overshoots() {
        let mut tracker = PositionTracker::new();
        tracker.insert(sample(0.0, 1.0, true));
        tracker.insert(sample(1.0, 1.1, true));
        assert_eq!(tracker.motion(), Motion::Predicting);

        let pose = tracker.advance(0.15).unwrap();
        assert_approx_eq!(pose.x, 1.5, 1e-4);
        assert!(pose.is_moving);
        assert_approx_eq!(pose.facing.0, 1.0);
        assert_approx_eq!(pose.facing.1, 0.0);

        let pose = tracker.advance(0.05).unwrap();
        assert_approx_eq!(pose.x, 2.0, 1e-4);
    }

    #[test]
    fn test_new_sample_resets_prediction() {
        let mut tracker = PositionTracker::new();
        tracker.insert(sample(0.0, 1.0, true));
        tracker.insert(sample(1.0, 1.1, true));
        tracker.advance(0.2);

        tracker.insert(sample(2.0, 1.2, true));
        let pose = tracker.advance(0.0).unwrap();
        assert_approx_eq!(pose.x, 1.0, 1e-4);
    }

    #[test]
    fn test_out_of_order_sample_reclassifies() {
        let mut tracker = PositionTracker::new();
        tracker.insert(sample(2.0, 1.2, true));
        tracker.insert(sample(0.0, 1.0, false));
        assert_eq!(tracker.motion(), Motion::StartingToMove);

        // Late packet lands between the two.
        tracker.insert(sample(1.0, 1.1, true));
        assert_eq!(tracker.motion(), Motion::Predicting);
        assert_eq!(tracker.newest().unwrap().time_sent, 1.2);
    }

    #[test]
    fn test_starting_to_move_snaps_to_newest() {
        let mut tracker = PositionTracker::new();
        tracker.insert(sample(0.0, 1.0, false));
        tracker.insert(sample(3.0, 1.1, true));
        assert_eq!(tracker.motion(), Motion::StartingToMove);

        let pose = tracker.advance(0.5).unwrap();
        assert_approx_eq!(pose.x, 3.0);
        assert!(pose.is_moving);
    }

    #[test]
    fn test_stopped_snaps_and_clears_facing() {
        let mut tracker = PositionTracker::new();
        tracker.insert(sample(0.0, 1.0, true));
        tracker.insert(sample(1.0, 1.1, true));
        tracker.insert(sample(1.2, 1.2, false));
        assert_eq!(tracker.motion(), Motion::Stopped);

        let pose = tracker.advance(0.5).unwrap();
        assert_approx_eq!(pose.x, 1.2);
        assert!(!pose.is_moving);
        assert_eq!(pose.facing, (0.0, 0.0));
    }

    #[test]
    fn test_restart_after_stop_drops_old_heading() {
        let mut tracker = PositionTracker::new();
        tracker.insert(sample(0.0, 1.0, true));
        tracker.insert(sample(1.0, 1.1, true));
        tracker.insert(sample(1.0, 1.2, false));
        // Starts again, this time north.
        tracker.insert(PositionSample {
            y: -1.0,
            ..sample(1.0, 1.3, true)
        });
        assert_eq!(tracker.motion(), Motion::StartingToMove);

        let pose = tracker.advance(0.016).unwrap();
        assert!(pose.is_moving);
        assert_approx_eq!(pose.y, -1.0);
        assert_eq!(pose.facing, (0.0, 0.0));
    }

    #[test]
    fn test_prediction_disabled_snaps() {
        let mut tracker = PositionTracker::new();
        tracker.set_prediction_enabled(false);
        tracker.insert(sample(0.0, 1.0, true));
        tracker.insert(sample(1.0, 1.1, true));

        let pose = tracker.advance(0.15).unwrap();
        assert_approx_eq!(pose.x, 1.0);
        assert_eq!(pose.facing, (0.0, 0.0));
    }
}
