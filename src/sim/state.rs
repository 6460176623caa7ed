//! Match snapshot
//!
//! Everything that must roll back lives here. Restoring a clone of a
//! `MatchState` and re-running the same ticks reproduces it exactly.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::entity::{EntityId, EntityTable, PlayerId, Prefab};
use super::physics::BodyTable;
use super::player::PlayerCoreState;
use super::puck::PuckState;
use super::round::RoundState;
use super::spinner::SpinnerState;

/// Complete versioned match state (deterministic, serializable)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchState {
    /// Ticks simulated so far
    pub tick: u64,
    pub round: RoundState,
    pub entities: EntityTable,
    pub bodies: BodyTable,
    /// Per-entity states, keyed and iterated by id
    pub pucks: BTreeMap<EntityId, PuckState>,
    pub spinners: BTreeMap<EntityId, SpinnerState>,
    pub cores: BTreeMap<EntityId, PlayerCoreState>,
}

impl MatchState {
    pub fn owner(&self, id: EntityId) -> Option<PlayerId> {
        self.entities.get(id).and_then(|r| r.owner)
    }

    /// Core entity of a player, if spawned
    pub fn core_of(&self, player: PlayerId) -> Option<(EntityId, &PlayerCoreState)> {
        self.cores
            .iter()
            .find(|(_, core)| core.owner == player)
            .map(|(&id, core)| (id, core))
    }

    pub fn spinner_of(&self, player: PlayerId) -> Option<(EntityId, &SpinnerState)> {
        let (_, core) = self.core_of(player)?;
        let id = core.spinner?;
        self.spinners.get(&id).map(|s| (id, s))
    }

    /// Ids of the static arena entities of `prefab`, in id order
    pub fn arena_ids(&self, prefab: Prefab) -> Vec<EntityId> {
        self.entities.of_prefab(prefab).map(|r| r.id).collect()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
