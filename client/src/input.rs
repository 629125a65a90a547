//! Local input and the position reports derived from it

use macroquad::prelude::{is_key_down, KeyCode};
use shared::{
    PlayerId, PositionUpdate, MOVEMENT_SPEED, MOVING_SPEED_THRESHOLD, POSITION_FIRST_SEND_DELAY,
    POSITION_SEND_INTERVAL,
};

/// Where the local player is and where it wants to go
pub trait InputSource {
    /// Raw movement direction. Any length; only the direction matters.
    fn local_input_vector(&self) -> (f32, f32);

    fn current_local_position(&self) -> (f32, f32);
}

/// Produces a position report about every 33 ms once the session is
/// connected.
#[derive(Debug, Clone)]
pub struct PositionReporter {
    next_send: f32,
    movement_speed: f32,
}

impl PositionReporter {
    pub fn new(created_at: f32) -> Self {
        Self::with_speed(created_at, MOVEMENT_SPEED)
    }

    pub fn with_speed(created_at: f32, movement_speed: f32) -> Self {
        Self {
            next_send: created_at + POSITION_FIRST_SEND_DELAY,
            movement_speed,
        }
    }

    pub fn poll(
        &mut self,
        now: f32,
        player_id: PlayerId,
        input: &dyn InputSource,
    ) -> Option<PositionUpdate> {
        if now < self.next_send {
            return None;
        }
        self.next_send = now + POSITION_SEND_INTERVAL;

        let (x, y) = input.current_local_position();
        let speed = unit_length(input.local_input_vector()) * self.movement_speed;
        Some(PositionUpdate {
            player_id,
            x,
            y,
            speed,
            is_moving: speed > MOVING_SPEED_THRESHOLD,
        })
    }
}

/// Length of the normalized vector: one for any real direction, zero for
/// none.
fn unit_length((x, y): (f32, f32)) -> f32 {
    if (x * x + y * y).sqrt() > f32::EPSILON {
        1.0
    } else {
        0.0
    }
}

/// Combines four direction keys into a movement vector.
pub fn direction_from_keys(left: bool, right: bool, up: bool, down: bool) -> (f32, f32) {
    let axis = |negative: bool, positive: bool| match (negative, positive) {
        (true, false) => -1.0,
        (false, true) => 1.0,
        _ => 0.0,
    };
    (axis(left, right), axis(up, down))
}

/// WASD / arrow key movement of the local player
#[derive(Debug, Clone)]
pub struct KeyboardInput {
    position: (f32, f32),
    direction: (f32, f32),
    movement_speed: f32,
}

impl KeyboardInput {
    pub fn new(start: (f32, f32), movement_speed: f32) -> Self {
        Self {
            position: start,
            direction: (0.0, 0.0),
            movement_speed,
        }
    }

    /// Samples the keyboard and moves the local player.
    pub fn update(&mut self, dt: f32) {
        self.direction = direction_from_keys(
            is_key_down(KeyCode::A) || is_key_down(KeyCode::Left),
            is_key_down(KeyCode::D) || is_key_down(KeyCode::Right),
            is_key_down(KeyCode::W) || is_key_down(KeyCode::Up),
            is_key_down(KeyCode::S) || is_key_down(KeyCode::Down),
        );
        self.step(dt);
    }

    fn step(&mut self, dt: f32) {
        let (dx, dy) = self.direction;
        let length = (dx * dx + dy * dy).sqrt();
        if length > f32::EPSILON {
            self.position.0 += dx / length * self.movement_speed * dt;
            self.position.1 += dy / length * self.movement_speed * dt;
        }
    }

    pub fn position(&self) -> (f32, f32) {
        self.position
    }
}

impl InputSource for KeyboardInput {
    fn local_input_vector(&self) -> (f32, f32) {
        self.direction
    }

    fn current_local_position(&self) -> (f32, f32) {
        self.position
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    struct FixedInput {
        direction: (f32, f32),
        position: (f32, f32),
    }

    impl InputSource for FixedInput {
        fn local_input_vector(&self) -> (f32, f32) {
            self.direction
        }

        fn current_local_position(&self) -> (f32, f32) {
            self.position
        }
    }

    #[test]
    fn test_first_report_delayed() {
        let input = FixedInput {
            direction: (0.0, 0.0),
            position: (1.0, 2.0),
        };
        let mut reporter = PositionReporter::new(10.0);

        assert!(reporter.poll(10.1, 1, &input).is_none());
        let update = reporter.poll(10.25, 1, &input).unwrap();
        assert_eq!(update.player_id, 1);
        assert_eq!((update.x, update.y), (1.0, 2.0));
        assert!(!update.is_moving);
    }

    #[test]
    fn test_report_cadence() {
        let input = FixedInput {
            direction: (0.0, 0.0),
            position: (0.0, 0.0),
        };
        let mut reporter = PositionReporter::new(0.0);

        let sent = (0..50)
            .map(|frame| frame as f32 / 50.0 + 0.25)
            .filter(|now| reporter.poll(*now, 1, &input).is_some())
            .count();
        // At 50 fps every second frame is past the interval.
        assert_eq!(sent, 25);
    }

    #[test]
    fn test_speed_from_normalized_input() {
        let input = FixedInput {
            direction: (3.0, 4.0),
            position: (0.0, 0.0),
        };
        let mut reporter = PositionReporter::with_speed(0.0, 5.0);
        let update = reporter.poll(1.0, 1, &input).unwrap();
        assert_approx_eq!(update.speed, 5.0);
        assert!(update.is_moving);
    }

    #[test]
    fn test_direction_from_keys() {
        assert_eq!(direction_from_keys(true, false, false, false), (-1.0, 0.0));
        assert_eq!(direction_from_keys(true, true, false, true), (0.0, 1.0));
        assert_eq!(direction_from_keys(false, false, false, false), (0.0, 0.0));
    }

    #[test]
    fn test_keyboard_step_is_normalized() {
        let mut input = KeyboardInput::new((0.0, 0.0), 5.0);
        input.direction = (1.0, 1.0);
        input.step(1.0);
        let (x, y) = input.position();
        assert_approx_eq!((x * x + y * y).sqrt(), 5.0, 1e-4);
    }
}
