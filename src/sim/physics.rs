//! Rigid-body actuator seam
//!
//! Simulation code only reads and writes body velocities; collision
//! detection belongs to the physics engine, which reports what it found
//! through a `PhysicsReport` each tick. `BodyTable` is a kinematic stand-in
//! (integration only) used by the headless driver and the tests.

use std::collections::BTreeMap;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::entity::EntityId;
use crate::normalize_degrees;

/// Read/write access to simulated rigid bodies
pub trait Physics {
    fn position(&self, id: EntityId) -> Option<Vec3>;
    fn set_position(&mut self, id: EntityId, position: Vec3);

    fn velocity(&self, id: EntityId) -> Vec3;
    fn set_velocity(&mut self, id: EntityId, velocity: Vec3);

    /// Radians per second
    fn angular_velocity(&self, id: EntityId) -> Vec3;
    fn set_angular_velocity(&mut self, id: EntityId, angular_velocity: Vec3);

    /// Rotation about +Y, degrees
    fn yaw_degrees(&self, id: EntityId) -> f32;

    /// Instantaneous velocity change (unit mass)
    fn add_impulse(&mut self, id: EntityId, impulse: Vec3);
}

/// What kind of surface a body presents to the puck
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum BodyKind {
    #[default]
    Dynamic,
    /// Static arena wall (reflects the puck)
    Wall,
    /// Static reflector (redirects the puck)
    Reflector,
}

impl BodyKind {
    pub fn is_static(self) -> bool {
        matches!(self, BodyKind::Wall | BodyKind::Reflector)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Body {
    pub kind: BodyKind,
    pub position: Vec3,
    pub velocity: Vec3,
    pub angular_velocity: Vec3,
    pub yaw: f32,
}

impl Body {
    pub fn new(kind: BodyKind, position: Vec3, yaw: f32) -> Self {
        Self {
            kind,
            position,
            velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            yaw,
        }
    }
}

/// Kinematic body store keyed by entity id
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BodyTable {
    bodies: BTreeMap<EntityId, Body>,
}

impl BodyTable {
    pub fn insert(&mut self, id: EntityId, body: Body) {
        self.bodies.insert(id, body);
    }

    pub fn remove(&mut self, id: EntityId) -> Option<Body> {
        self.bodies.remove(&id)
    }

    pub fn get(&self, id: EntityId) -> Option<&Body> {
        self.bodies.get(&id)
    }

    pub fn kind(&self, id: EntityId) -> Option<BodyKind> {
        self.bodies.get(&id).map(|b| b.kind)
    }

    /// Advance positions and yaw by one step
    pub fn integrate(&mut self, dt: f32) {
        for body in self.bodies.values_mut() {
            if body.kind.is_static() {
                continue;
            }
            body.position += body.velocity * dt;
            body.yaw = normalize_degrees(body.yaw + body.angular_velocity.y.to_degrees() * dt);
        }
    }
}

impl Physics for BodyTable {
    fn position(&self, id: EntityId) -> Option<Vec3> {
        self.bodies.get(&id).map(|b| b.position)
    }

    fn set_position(&mut self, id: EntityId, position: Vec3) {
        if let Some(body) = self.bodies.get_mut(&id) {
            body.position = position;
        }
    }

    fn velocity(&self, id: EntityId) -> Vec3 {
        self.bodies.get(&id).map_or(Vec3::ZERO, |b| b.velocity)
    }

    fn set_velocity(&mut self, id: EntityId, velocity: Vec3) {
        if let Some(body) = self.bodies.get_mut(&id) {
            body.velocity = velocity;
        }
    }

    fn angular_velocity(&self, id: EntityId) -> Vec3 {
        self.bodies.get(&id).map_or(Vec3::ZERO, |b| b.angular_velocity)
    }

    fn set_angular_velocity(&mut self, id: EntityId, angular_velocity: Vec3) {
        if let Some(body) = self.bodies.get_mut(&id) {
            body.angular_velocity = angular_velocity;
        }
    }

    fn yaw_degrees(&self, id: EntityId) -> f32 {
        self.bodies.get(&id).map_or(0.0, |b| b.yaw)
    }

    fn add_impulse(&mut self, id: EntityId, impulse: Vec3) {
        if let Some(body) = self.bodies.get_mut(&id) {
            if !body.kind.is_static() {
                body.velocity += impulse;
            }
        }
    }
}

/// A collision reported by the physics engine
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    /// Body whose collision callback fires
    pub entity: EntityId,
    /// Body it touched
    pub other: EntityId,
    pub point: Vec3,
    /// Surface normal at the contact, pointing toward `entity`
    pub normal: Vec3,
}

/// A body entering a trigger volume (teleport zone)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TriggerEnter {
    pub entity: EntityId,
    pub zone: EntityId,
}

/// Everything the physics engine observed during the last step
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhysicsReport {
    pub contacts: Vec<Contact>,
    pub triggers: Vec<TriggerEnter>,
}
