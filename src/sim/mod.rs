//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by entity ID)
//! - No rendering or platform dependencies

pub mod collision;
pub mod entity;
pub mod events;
pub mod physics;
pub mod player;
pub mod puck;
pub mod reflector;
pub mod rng;
pub mod round;
pub mod shuffle;
pub mod spinner;
pub mod state;
pub mod tick;
pub mod zone;

pub use collision::{ArmImpact, arm_impact};
pub use entity::{
    EntityId, EntityRecord, EntityTable, Hierarchy, PlayerId, Predicted, Prefab, Simulate,
    SimulateWithInput,
};
pub use events::SimEvent;
pub use physics::{Body, BodyKind, BodyTable, Contact, Physics, PhysicsReport, TriggerEnter};
pub use player::{
    AlternateTeams, Damageable, HealthState, PlayerCoreState, PlayerHealth, TeamAssignment,
    TeamAssignmentStrategy,
};
pub use puck::{Puck, PuckContext, PuckState};
pub use reflector::Reflector;
pub use rng::SimRng;
pub use round::{RoundMachine, RoundPhase, RoundState};
pub use shuffle::{ShuffleState, TeleportShuffle, shuffle_colors};
pub use spinner::{Spinner, SpinnerContext, SpinnerInput, SpinnerState, SpinnerStateType};
pub use state::MatchState;
pub use tick::{Match, MatchRules, TickInput};
pub use zone::{TeamSide, TeleportColorId, TeleportExit, TeleportZone, ZoneRegistry};
