//! Spin Arena - deterministic simulation core for a spinner-vs-puck arena game
//!
//! Core modules:
//! - `sim`: Deterministic simulation (entities, round state machine, teleports)
//! - `view`: Non-replayed presentation pass fed from snapshots
//! - `settings`: Data-driven match configuration
//! - `error`: Configuration errors

pub mod error;
pub mod settings;
pub mod sim;
pub mod view;

pub use error::ConfigError;
pub use settings::MatchSettings;

use glam::Vec3;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz, matches the prediction tick rate)
    pub const SIM_DT: f32 = 1.0 / 60.0;

    /// Below this speed the puck counts as stopped
    pub const PUCK_STOPPED_SPEED: f32 = 0.1;

    /// Input magnitude treated as "no rotation input"
    pub const ROTATION_INPUT_DEADZONE: f32 = 0.01;

    /// Contact radius floor for spinner arm impacts
    pub const MIN_IMPACT_RADIUS: f32 = 0.1;

    /// Tangential / outward blend of a spinner arm impact
    pub const IMPACT_TANGENT_WEIGHT: f32 = 0.6;
    pub const IMPACT_OUTWARD_WEIGHT: f32 = 0.4;

    /// Share of vertical speed a diagonal reflector keeps
    pub const DIAGONAL_VERTICAL_RETENTION: f32 = 0.8;
}

/// Move `current` toward `target` by at most `max_delta`, never overshooting
#[inline]
pub fn move_towards(current: Vec3, target: Vec3, max_delta: f32) -> Vec3 {
    let to_target = target - current;
    let dist = to_target.length();
    if dist <= max_delta || dist == 0.0 {
        target
    } else {
        current + to_target / dist * max_delta
    }
}

/// Move a scalar toward zero by at most `step`, flooring at exactly zero
#[inline]
pub fn decay_toward_zero(value: f32, step: f32) -> f32 {
    if value.abs() <= step {
        0.0
    } else {
        value - value.signum() * step
    }
}

/// Reflect a velocity about a surface normal: v' = v - 2(v·n)n
#[inline]
pub fn reflect(velocity: Vec3, normal: Vec3) -> Vec3 {
    let n = normal.normalize_or_zero();
    velocity - 2.0 * velocity.dot(n) * n
}

/// Rescale a velocity so its magnitude lies in `[min, max]`, keeping direction
#[inline]
pub fn clamp_speed(velocity: Vec3, min: f32, max: f32) -> Vec3 {
    let speed = velocity.length();
    if speed == 0.0 {
        return velocity;
    }
    let dir = velocity / speed;
    dir * speed.clamp(min, max)
}

/// Drop the vertical component
#[inline]
pub fn flatten_y(v: Vec3) -> Vec3 {
    Vec3::new(v.x, 0.0, v.z)
}

/// Normalize an angle in degrees to (-180, 180]
#[inline]
pub fn normalize_degrees(mut angle: f32) -> f32 {
    angle %= 360.0;
    if angle > 180.0 {
        angle -= 360.0;
    } else if angle <= -180.0 {
        angle += 360.0;
    }
    angle
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_towards_never_overshoots() {
        let v = Vec3::new(0.3, 0.0, 0.4); // length 0.5
        assert_eq!(move_towards(v, Vec3::ZERO, 1.0), Vec3::ZERO);

        let slowed = move_towards(Vec3::new(3.0, 0.0, 4.0), Vec3::ZERO, 1.0);
        assert!((slowed.length() - 4.0).abs() < 1e-5);
    }

    #[test]
    fn test_decay_toward_zero() {
        assert_eq!(decay_toward_zero(100.0, 200.0), 0.0);
        assert_eq!(decay_toward_zero(-50.0, 20.0), -30.0);
        assert_eq!(decay_toward_zero(50.0, 20.0), 30.0);
    }

    #[test]
    fn test_reflect() {
        let v = Vec3::new(10.0, 0.0, 0.0);
        let r = reflect(v, Vec3::new(-1.0, 0.0, 0.0));
        assert!((r.x + 10.0).abs() < 1e-5);
    }

    #[test]
    fn test_normalize_degrees() {
        assert_eq!(normalize_degrees(270.0), -90.0);
        assert_eq!(normalize_degrees(-180.0), 180.0);
        assert_eq!(normalize_degrees(45.0), 45.0);
    }
}
