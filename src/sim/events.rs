//! Events produced by a tick
//!
//! The host drains these after each tick. They are derived from the
//! snapshot transition, so a re-simulated tick yields the same list.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::entity::{EntityId, PlayerId, Prefab};
use super::round::RoundPhase;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SimEvent {
    Spawned {
        entity: EntityId,
        prefab: Prefab,
        owner: Option<PlayerId>,
    },
    Despawned {
        entity: EntityId,
    },
    /// Puck hit a player core hard enough to hurt it
    Damaged {
        target: EntityId,
        source: EntityId,
        amount: f32,
    },
    PlayerDied {
        player: PlayerId,
        core: EntityId,
    },
    SpinnerRespawned {
        spinner: EntityId,
    },
    /// Spinner arm struck something
    ArmImpact {
        spinner: EntityId,
        target: EntityId,
        impulse: Vec3,
    },
    Teleported {
        puck: EntityId,
        entry_zone: EntityId,
        exit_zone: EntityId,
        position: Vec3,
        velocity: Vec3,
    },
    /// Puck redirected by a reflector
    Reflected {
        puck: EntityId,
        reflector: EntityId,
        velocity: Vec3,
    },
    ZonesShuffled {
        seed: u32,
    },
    PhaseChanged {
        from: RoundPhase,
        to: RoundPhase,
    },
    /// Last player standing, if any survived
    RoundEnded {
        round: u32,
        winner: Option<PlayerId>,
    },
}
