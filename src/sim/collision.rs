//! Collision response for spinning arms
//!
//! Converts a spinner's rotation into a linear kick at the contact point:
//! mostly along the arm's direction of travel, partly straight outward.

use glam::Vec3;

use crate::consts::{IMPACT_OUTWARD_WEIGHT, IMPACT_TANGENT_WEIGHT, MIN_IMPACT_RADIUS};
use crate::flatten_y;

/// Instantaneous velocity change delivered by an arm hit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArmImpact {
    /// Unit direction on the XZ plane
    pub direction: Vec3,
    pub magnitude: f32,
}

impl ArmImpact {
    pub fn none() -> Self {
        Self {
            direction: Vec3::ZERO,
            magnitude: 0.0,
        }
    }

    #[inline]
    pub fn impulse(&self) -> Vec3 {
        self.direction * self.magnitude
    }
}

/// Kick from an arm spinning at `angular_velocity_deg` (deg/s) about `center`
///
/// The contact radius is measured on the XZ plane and floored at
/// `MIN_IMPACT_RADIUS`; magnitude is capped at `max_impact_velocity`.
pub fn arm_impact(
    center: Vec3,
    contact_point: Vec3,
    angular_velocity_deg: f32,
    impact_multiplier: f32,
    max_impact_velocity: f32,
) -> ArmImpact {
    let to_contact = flatten_y(contact_point - center);
    let outward = to_contact.normalize_or_zero();
    if outward == Vec3::ZERO {
        // Contact at the hub: no lever arm, no direction
        return ArmImpact::none();
    }
    let radius = to_contact.length().max(MIN_IMPACT_RADIUS);

    let angular_velocity_rad = angular_velocity_deg.to_radians();
    let tangent_speed = angular_velocity_rad.abs() * radius;

    let mut tangent = Vec3::Y.cross(outward);
    if angular_velocity_deg < 0.0 {
        tangent = -tangent;
    }

    let direction =
        (tangent * IMPACT_TANGENT_WEIGHT + outward * IMPACT_OUTWARD_WEIGHT).normalize_or_zero();
    let magnitude = (tangent_speed * impact_multiplier).min(max_impact_velocity);

    ArmImpact {
        direction,
        magnitude,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_impact_blends_tangent_and_outward() {
        // Contact on +X, spinning positive: up × +X = -Z
        let impact = arm_impact(Vec3::ZERO, Vec3::new(2.0, 0.5, 0.0), 90.0, 2.0, 50.0);
        let expected = (Vec3::new(0.0, 0.0, -0.6) + Vec3::new(0.4, 0.0, 0.0)).normalize();
        assert!((impact.direction - expected).length() < 1e-5);

        // |ω| = π/2 rad/s, r = 2 → tangent speed π, × 2
        assert!((impact.magnitude - std::f32::consts::PI * 2.0).abs() < 1e-4);
    }

    #[test]
    fn test_negative_spin_flips_tangent() {
        let pos = arm_impact(Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0), 90.0, 1.0, 50.0);
        let neg = arm_impact(Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0), -90.0, 1.0, 50.0);
        assert!((pos.direction.z + neg.direction.z).abs() < 1e-5);
        assert!((pos.direction.x - neg.direction.x).abs() < 1e-5);
        assert_eq!(pos.magnitude, neg.magnitude);
    }

    #[test]
    fn test_impact_capped() {
        let impact = arm_impact(Vec3::ZERO, Vec3::new(3.0, 0.0, 0.0), 720.0, 10.0, 50.0);
        assert_eq!(impact.magnitude, 50.0);
    }

    #[test]
    fn test_tiny_radius_uses_floor() {
        let impact = arm_impact(Vec3::ZERO, Vec3::new(0.01, 0.0, 0.0), 180.0, 1.0, 50.0);
        assert!((impact.magnitude - std::f32::consts::PI * 0.1).abs() < 1e-4);
    }

    #[test]
    fn test_hub_contact_has_no_impact() {
        let impact = arm_impact(Vec3::ONE, Vec3::new(1.0, 5.0, 1.0), 360.0, 1.0, 50.0);
        assert_eq!(impact.impulse(), Vec3::ZERO);
    }
}
