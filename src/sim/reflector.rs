//! Static reflectors that redirect the puck
//!
//! Corner reflectors mirror the puck and pull it back toward the middle of
//! the arena so it does not get stuck in a corner. Diagonal reflectors send
//! it along a fixed heading regardless of how it arrived.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use super::entity::EntityId;
use crate::consts::DIAGONAL_VERTICAL_RETENTION;
use crate::settings::{ReflectorKind, ReflectorLayout};
use crate::{flatten_y, reflect};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reflector {
    pub id: EntityId,
    pub position: Vec3,
    pub kind: ReflectorKind,
}

impl Reflector {
    pub fn from_layout(id: EntityId, layout: &ReflectorLayout) -> Self {
        Self {
            id,
            position: layout.position,
            kind: layout.kind,
        }
    }

    /// Outgoing velocity for a puck arriving with `velocity` at `point`
    pub fn deflect(&self, velocity: Vec3, point: Vec3, normal: Vec3) -> Vec3 {
        match self.kind {
            ReflectorKind::Corner {
                reflection_strength,
                center_pull,
                center,
            } => {
                let pull = flatten_y(center - point).normalize_or_zero() * center_pull;
                let out = reflect(velocity, normal) * reflection_strength + pull;
                let speed = velocity.length();
                if speed > 0.0 {
                    out.normalize_or_zero() * speed.max(out.length())
                } else {
                    out
                }
            }
            ReflectorKind::Diagonal {
                forward,
                angle_offset,
                velocity_multiplier,
                min_reflect_speed,
            } => {
                let heading =
                    Quat::from_rotation_y(angle_offset.to_radians()) * forward.normalize_or_zero();
                let speed = (velocity.length() * velocity_multiplier).max(min_reflect_speed);
                let mut out = heading * speed;
                out.y = velocity.y * DIAGONAL_VERTICAL_RETENTION;
                out
            }
        }
    }
}
