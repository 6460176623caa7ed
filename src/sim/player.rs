//! Player cores: health, team and the spinner they carry

use serde::{Deserialize, Serialize};

use super::entity::{EntityId, PlayerId, Predicted};
use crate::settings::HealthSettings;

/// Something the puck can hurt
pub trait Damageable {
    fn take_damage(&mut self, amount: f32, source: Option<EntityId>);
    fn is_alive(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HealthState {
    pub health: f32,
    pub is_dead: bool,
}

/// Team slot for a player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamAssignment {
    pub team: u8,
    /// Index of the player within the team
    pub slot: u8,
}

/// Maps a player's join index to a team
pub trait TeamAssignmentStrategy {
    fn assign(&self, player_index: usize, player: PlayerId) -> TeamAssignment;
}

/// Even join indices on team 0, odd on team 1
#[derive(Debug, Clone, Copy, Default)]
pub struct AlternateTeams;

impl TeamAssignmentStrategy for AlternateTeams {
    fn assign(&self, player_index: usize, _player: PlayerId) -> TeamAssignment {
        TeamAssignment {
            team: (player_index % 2) as u8,
            slot: (player_index / 2) as u8,
        }
    }
}

/// Versioned state of a player core
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerCoreState {
    pub owner: PlayerId,
    pub team: TeamAssignment,
    pub spinner: Option<EntityId>,
    pub health: HealthState,
}

impl PlayerCoreState {
    pub fn is_spinner_loaded(&self) -> bool {
        self.spinner.is_some()
    }
}

/// Health rules shared by every core
#[derive(Debug, Clone)]
pub struct PlayerHealth {
    max_health: f32,
}

impl PlayerHealth {
    pub fn new(settings: &HealthSettings) -> Self {
        Self {
            max_health: settings.max_health,
        }
    }

    pub fn max_health(&self) -> f32 {
        self.max_health
    }

    /// Borrow a core's health as a damage sink
    pub fn sink<'a>(&'a self, state: &'a mut HealthState) -> HealthSink<'a> {
        HealthSink {
            max_health: self.max_health,
            state,
            died: false,
        }
    }
}

impl Predicted for PlayerHealth {
    type State = HealthState;

    fn initial_state(&self) -> HealthState {
        HealthState {
            health: self.max_health,
            is_dead: false,
        }
    }
}

/// Damage sink over one core's health for the duration of a contact
#[derive(Debug)]
pub struct HealthSink<'a> {
    max_health: f32,
    state: &'a mut HealthState,
    died: bool,
}

impl HealthSink<'_> {
    /// True if this sink's damage killed the core
    pub fn died(&self) -> bool {
        self.died
    }
}

impl Damageable for HealthSink<'_> {
    fn take_damage(&mut self, amount: f32, source: Option<EntityId>) {
        if self.state.is_dead || !amount.is_finite() {
            return;
        }
        self.state.health = (self.state.health - amount).clamp(0.0, self.max_health);
        if self.state.health <= 0.0 {
            self.state.is_dead = true;
            self.died = true;
            log::info!("Core killed by {:?}", source);
        }
    }

    fn is_alive(&self) -> bool {
        !self.state.is_dead
    }
}
