//! Fixed timestep simulation tick
//!
//! Advances a `MatchState` by one step in a fixed order:
//! contacts → teleport triggers → spinners → pucks → deaths → round phase →
//! zone sync → body integration. Every pass walks entities in ascending id
//! order.

use std::collections::BTreeMap;

use glam::Vec3;

use super::entity::{
    EntityId, EntityTable, Hierarchy, PlayerId, Prefab, Simulate, SimulateWithInput,
};
use super::events::SimEvent;
use super::physics::{Body, BodyKind, BodyTable, Contact, Physics, PhysicsReport};
use super::player::{AlternateTeams, PlayerHealth, TeamAssignmentStrategy};
use super::puck::{Puck, PuckContext};
use super::reflector::Reflector;
use super::round::{PhaseContext, RoundMachine, RoundState};
use super::shuffle::TeleportShuffle;
use super::spinner::{Spinner, SpinnerContext, SpinnerInput, SpinnerStateType};
use super::state::MatchState;
use super::zone::{TeleportZone, ZoneRegistry};
use crate::error::ConfigError;
use crate::settings::{MatchSettings, RoundSettings};

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone)]
pub struct TickInput {
    /// Players currently connected, any order
    pub connected: Vec<PlayerId>,
    /// Spinner input per player; missing players are treated as idle
    pub spinners: BTreeMap<PlayerId, SpinnerInput>,
    /// Re-simulating a tick whose inputs were already confirmed
    pub replaying_verified: bool,
    /// This peer owns spawning and teleport setup
    pub authoritative: bool,
}

impl Default for TickInput {
    fn default() -> Self {
        Self {
            connected: Vec::new(),
            spinners: BTreeMap::new(),
            replaying_verified: false,
            authoritative: true,
        }
    }
}

impl TickInput {
    /// Repeat this input for a tick whose real input has not arrived
    pub fn extrapolated(&self, spinner: &Spinner) -> Self {
        let mut next = self.clone();
        for input in next.spinners.values_mut() {
            spinner.extrapolate_input(input);
        }
        next.replaying_verified = false;
        next
    }
}

/// Stateless rules shared by every tick of a match
pub struct MatchRules {
    pub puck: Puck,
    pub spinner: Spinner,
    pub health: PlayerHealth,
    pub shuffle: TeleportShuffle,
    pub round: RoundSettings,
    pub teams: Box<dyn TeamAssignmentStrategy>,
}

impl MatchRules {
    pub fn new(settings: &MatchSettings) -> Self {
        Self {
            puck: Puck::new(&settings.puck, settings.round.puck_seed),
            spinner: Spinner::new(&settings.spinner),
            health: PlayerHealth::new(&settings.health),
            shuffle: TeleportShuffle::new(&settings.teleport),
            round: settings.round.clone(),
            teams: Box::new(AlternateTeams),
        }
    }
}

/// A match: its rules, arena and the tick driver
pub struct Match {
    rules: MatchRules,
    rounds: RoundMachine,
    zones: ZoneRegistry,
    reflectors: BTreeMap<EntityId, Reflector>,
    arena: MatchState,
}

impl Match {
    /// Validate settings and lay out the arena
    pub fn new(settings: &MatchSettings) -> Result<Self, ConfigError> {
        settings.validate()?;
        let rules = MatchRules::new(settings);

        let mut entities = EntityTable::default();
        let mut bodies = BodyTable::default();

        let mut zones = Vec::with_capacity(settings.arena.zones.len());
        for layout in &settings.arena.zones {
            let id = entities
                .create(Prefab::TeleportZone, layout.position, 0.0, None)
                .ok_or(ConfigError::MissingPrefab(Prefab::TeleportZone))?;
            zones.push(TeleportZone::from_layout(id, layout));
        }
        for wall in &settings.arena.walls {
            let id = entities
                .create(Prefab::Wall, wall.position, 0.0, None)
                .ok_or(ConfigError::MissingPrefab(Prefab::Wall))?;
            bodies.insert(id, Body::new(BodyKind::Wall, wall.position, 0.0));
        }
        let mut reflectors = BTreeMap::new();
        for layout in &settings.arena.reflectors {
            let id = entities
                .create(Prefab::Reflector, layout.position, 0.0, None)
                .ok_or(ConfigError::MissingPrefab(Prefab::Reflector))?;
            bodies.insert(id, Body::new(BodyKind::Reflector, layout.position, 0.0));
            reflectors.insert(id, Reflector::from_layout(id, layout));
        }

        let arena = MatchState {
            tick: 0,
            round: RoundState::new(&rules.shuffle),
            entities,
            bodies,
            pucks: BTreeMap::new(),
            spinners: BTreeMap::new(),
            cores: BTreeMap::new(),
        };

        Ok(Self {
            rules,
            rounds: RoundMachine,
            zones: ZoneRegistry::collect(zones),
            reflectors,
            arena,
        })
    }

    pub fn with_team_strategy(mut self, teams: Box<dyn TeamAssignmentStrategy>) -> Self {
        self.rules.teams = teams;
        self
    }

    /// Snapshot of an empty arena waiting for players
    pub fn initial_state(&self) -> MatchState {
        self.arena.clone()
    }

    pub fn rules(&self) -> &MatchRules {
        &self.rules
    }

    pub fn zones(&self) -> &ZoneRegistry {
        &self.zones
    }

    pub fn reflectors(&self) -> &BTreeMap<EntityId, Reflector> {
        &self.reflectors
    }

    /// Bring zone colors and pairing in line with the snapshot's seed
    fn sync_zones(&mut self, seed: u32) {
        if self.zones.applied_seed() == seed {
            return;
        }
        if seed == 0 {
            self.zones.restore_original_colors();
        } else {
            self.zones.apply_shuffle_seed(seed);
        }
    }

    /// Advance `state` by one fixed step
    ///
    /// `report` holds what the physics engine observed since the previous
    /// tick. Safe to call repeatedly for the same logical tick from a
    /// restored snapshot; the result depends only on the arguments.
    pub fn tick(
        &mut self,
        state: &mut MatchState,
        input: &TickInput,
        report: &PhysicsReport,
        delta: f32,
    ) -> Vec<SimEvent> {
        let delta = if delta.is_finite() { delta.max(0.0) } else { 0.0 };
        let mut events = Vec::new();

        let mut connected = input.connected.clone();
        connected.sort_unstable();
        connected.dedup();

        self.sync_zones(state.round.shuffle.current_seed);

        let deaths = self.resolve_contacts(state, report, &mut events);
        self.resolve_triggers(state, report, input.replaying_verified, &mut events);
        self.simulate_spinners(state, input, delta, &mut events);
        self.simulate_pucks(state, delta);
        self.process_deaths(state, &deaths, &mut events);

        let mut ctx = PhaseContext {
            rules: &self.rules,
            connected: &connected,
            authoritative: input.authoritative,
            entities: &mut state.entities,
            bodies: &mut state.bodies,
            pucks: &mut state.pucks,
            spinners: &mut state.spinners,
            cores: &mut state.cores,
            events: &mut events,
        };
        self.rounds.simulate(&mut state.round, &mut ctx, delta);

        self.sync_zones(state.round.shuffle.current_seed);
        state.bodies.integrate(delta);
        state.tick += 1;
        events
    }

    /// Apply collision callbacks; returns `(player, core)` for each kill
    fn resolve_contacts(
        &self,
        state: &mut MatchState,
        report: &PhysicsReport,
        events: &mut Vec<SimEvent>,
    ) -> Vec<(PlayerId, EntityId)> {
        let mut contacts = report.contacts.clone();
        contacts.sort_by(|a, b| a.entity.cmp(&b.entity).then(a.other.cmp(&b.other)));

        let mut deaths = Vec::new();
        for contact in &contacts {
            if state.pucks.contains_key(&contact.entity) {
                self.puck_contact(state, contact, events, &mut deaths);
            } else if state.spinners.contains_key(&contact.entity) {
                self.arm_contact(state, contact, events);
            }
        }
        deaths
    }

    fn puck_contact(
        &self,
        state: &mut MatchState,
        contact: &Contact,
        events: &mut Vec<SimEvent>,
        deaths: &mut Vec<(PlayerId, EntityId)>,
    ) {
        let rules = &self.rules;
        let hit_wall = state.bodies.kind(contact.other) == Some(BodyKind::Wall);
        let reflector = self.reflectors.get(&contact.other);
        let Some(puck) = state.pucks.get_mut(&contact.entity) else {
            return;
        };
        let mut ctx = PuckContext {
            id: contact.entity,
            body: &mut state.bodies,
        };

        if let Some(core) = state.cores.get_mut(&contact.other) {
            let mut sink = rules.health.sink(&mut core.health);
            if let Some(amount) = rules.puck.on_damageable_contact(&ctx, &mut sink) {
                events.push(SimEvent::Damaged {
                    target: contact.other,
                    source: contact.entity,
                    amount,
                });
            }
            if sink.died() {
                deaths.push((core.owner, contact.other));
            }
        } else if let Some(reflector) = reflector {
            let velocity = rules.puck.on_reflector_contact(
                puck,
                &mut ctx,
                reflector,
                contact.point,
                contact.normal,
            );
            events.push(SimEvent::Reflected {
                puck: contact.entity,
                reflector: reflector.id,
                velocity,
            });
        } else if hit_wall {
            rules.puck.on_wall_contact(puck, &mut ctx, contact.normal);
        }
        // Spinner arms report their own side of the contact
    }

    fn arm_contact(&self, state: &mut MatchState, contact: &Contact, events: &mut Vec<SimEvent>) {
        let rules = &self.rules;
        let Some(spinner) = state.spinners.get(&contact.entity) else {
            return;
        };
        let center = state
            .bodies
            .position(contact.entity)
            .unwrap_or(contact.point);
        let impact = rules.spinner.arm_impact(spinner, center, contact.point);
        if impact.magnitude <= 0.0 {
            return;
        }
        let impulse = impact.impulse();

        if let Some(puck) = state.pucks.get_mut(&contact.other) {
            let mut ctx = PuckContext {
                id: contact.other,
                body: &mut state.bodies,
            };
            rules.puck.apply_impact(puck, &mut ctx, impulse);
        } else if state.spinners.contains_key(&contact.other)
            || state.cores.contains_key(&contact.other)
        {
            return;
        } else if state.bodies.kind(contact.other) == Some(BodyKind::Dynamic) {
            state.bodies.add_impulse(contact.other, impulse);
        } else {
            return;
        }

        events.push(SimEvent::ArmImpact {
            spinner: contact.entity,
            target: contact.other,
            impulse,
        });
    }

    fn resolve_triggers(
        &self,
        state: &mut MatchState,
        report: &PhysicsReport,
        replaying_verified: bool,
        events: &mut Vec<SimEvent>,
    ) {
        let mut triggers = report.triggers.clone();
        triggers.sort_by(|a, b| a.entity.cmp(&b.entity).then(a.zone.cmp(&b.zone)));

        for trigger in &triggers {
            if self.zones.zone(trigger.zone).is_none() {
                continue;
            }
            let Some(puck) = state.pucks.get_mut(&trigger.entity) else {
                continue;
            };
            let mut ctx = PuckContext {
                id: trigger.entity,
                body: &mut state.bodies,
            };
            if let Some(exit) = self.rules.puck.on_teleport_trigger(
                puck,
                &mut ctx,
                &self.zones,
                trigger.zone,
                replaying_verified,
            ) {
                events.push(SimEvent::Teleported {
                    puck: trigger.entity,
                    entry_zone: trigger.zone,
                    exit_zone: exit.exit_zone,
                    position: exit.position,
                    velocity: exit.velocity,
                });
            }
        }
    }

    fn simulate_spinners(
        &self,
        state: &mut MatchState,
        input: &TickInput,
        delta: f32,
        events: &mut Vec<SimEvent>,
    ) {
        let rules = &self.rules;
        for (&id, spinner) in state.spinners.iter_mut() {
            let record = state.entities.get(id);
            let mut spinner_input = record
                .and_then(|r| r.owner)
                .and_then(|owner| input.spinners.get(&owner))
                .copied()
                .unwrap_or_default();
            rules.spinner.sanitize_input(&mut spinner_input);

            let can_respawn = record
                .and_then(|r| r.parent)
                .and_then(|core| state.cores.get(&core))
                .is_none_or(|core| !core.health.is_dead);

            let was_dead = spinner.state_type == SpinnerStateType::Dead;
            rules.spinner.simulate(
                &spinner_input,
                spinner,
                &mut SpinnerContext {
                    id,
                    body: &mut state.bodies,
                    can_respawn,
                },
                delta,
            );
            if was_dead && spinner.state_type == SpinnerStateType::Active {
                events.push(SimEvent::SpinnerRespawned { spinner: id });
            }
        }
    }

    fn simulate_pucks(&self, state: &mut MatchState, delta: f32) {
        for (&id, puck) in state.pucks.iter_mut() {
            self.rules.puck.simulate(
                puck,
                &mut PuckContext {
                    id,
                    body: &mut state.bodies,
                },
                delta,
            );
        }
    }

    fn process_deaths(
        &self,
        state: &mut MatchState,
        deaths: &[(PlayerId, EntityId)],
        events: &mut Vec<SimEvent>,
    ) {
        for &(player, core) in deaths {
            let spinner = state.cores.get(&core).and_then(|c| c.spinner);
            if let Some(spinner) = spinner.and_then(|id| state.spinners.get_mut(&id)) {
                self.rules.spinner.kill(spinner);
                spinner.angular_velocity = 0.0;
            }
            if let Some(body) = spinner {
                state.bodies.set_angular_velocity(body, Vec3::ZERO);
            }
            events.push(SimEvent::PlayerDied { player, core });
            self.rounds.player_died(&mut state.round, player);
        }
    }
}
