//! Entity identity, hierarchy and simulation capabilities
//!
//! Entities are referenced only by `EntityId`; no simulated state holds a
//! pointer to another entity. Ids come from a counter stored in the snapshot
//! so replays allocate the same ids.

use std::collections::BTreeMap;
use std::fmt::Debug;

use glam::Vec3;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u32);

/// Network identity of a connected player
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub u16);

/// Spawnable entity templates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Prefab {
    Puck,
    Spinner,
    PlayerCore,
    /// Static arena pieces, created once per match
    TeleportZone,
    Wall,
    Reflector,
}

/// Hierarchy record for a live entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub id: EntityId,
    pub prefab: Prefab,
    pub owner: Option<PlayerId>,
    pub parent: Option<EntityId>,
    pub spawn_position: Vec3,
    pub spawn_yaw: f32,
}

/// Create/delete service for simulated entities
pub trait Hierarchy {
    fn create(
        &mut self,
        prefab: Prefab,
        position: Vec3,
        yaw_degrees: f32,
        owner: Option<PlayerId>,
    ) -> Option<EntityId>;

    fn delete(&mut self, id: EntityId);

    fn set_parent(&mut self, child: EntityId, parent: EntityId);
}

/// Deterministic entity table, part of the match snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityTable {
    records: BTreeMap<EntityId, EntityRecord>,
    next_id: u32,
}

impl Default for EntityTable {
    fn default() -> Self {
        Self {
            records: BTreeMap::new(),
            next_id: 1,
        }
    }
}

impl EntityTable {
    pub fn get(&self, id: EntityId) -> Option<&EntityRecord> {
        self.records.get(&id)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.records.contains_key(&id)
    }

    /// Live entities in id order
    pub fn iter(&self) -> impl Iterator<Item = &EntityRecord> {
        self.records.values()
    }

    pub fn of_prefab(&self, prefab: Prefab) -> impl Iterator<Item = &EntityRecord> {
        self.records.values().filter(move |r| r.prefab == prefab)
    }

    pub fn owned_by(&self, owner: PlayerId) -> impl Iterator<Item = &EntityRecord> {
        self.records
            .values()
            .filter(move |r| r.owner == Some(owner))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Hierarchy for EntityTable {
    fn create(
        &mut self,
        prefab: Prefab,
        position: Vec3,
        yaw_degrees: f32,
        owner: Option<PlayerId>,
    ) -> Option<EntityId> {
        let id = EntityId(self.next_id);
        self.next_id = self.next_id.checked_add(1)?;
        self.records.insert(
            id,
            EntityRecord {
                id,
                prefab,
                owner,
                parent: None,
                spawn_position: position,
                spawn_yaw: yaw_degrees,
            },
        );
        Some(id)
    }

    fn delete(&mut self, id: EntityId) {
        if self.records.remove(&id).is_none() {
            log::debug!("Delete of unknown entity {:?} ignored", id);
        }
    }

    fn set_parent(&mut self, child: EntityId, parent: EntityId) {
        if !self.records.contains_key(&parent) {
            log::warn!("Parent {:?} for {:?} does not exist", parent, child);
            return;
        }
        if let Some(record) = self.records.get_mut(&child) {
            record.parent = Some(parent);
        }
    }
}

/// Versioned state owned by a simulated entity
pub trait Predicted {
    type State: Clone + PartialEq + Debug;

    /// State for a freshly created entity
    fn initial_state(&self) -> Self::State;
}

/// Entity advanced once per tick without player input
pub trait Simulate: Predicted {
    type Context<'a>;

    fn simulate(&self, state: &mut Self::State, ctx: &mut Self::Context<'_>, delta: f32);
}

/// Entity advanced once per tick from its owner's input
pub trait SimulateWithInput: Predicted {
    type Input: Clone + Default + Debug;
    type Context<'a>;

    /// Clamp untrusted input into its legal range
    fn sanitize_input(&self, input: &mut Self::Input);

    /// Adjust a repeated input used when the real one has not arrived
    fn extrapolate_input(&self, _input: &mut Self::Input) {}

    fn simulate(
        &self,
        input: &Self::Input,
        state: &mut Self::State,
        ctx: &mut Self::Context<'_>,
        delta: f32,
    );
}
