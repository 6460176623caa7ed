//! Round life-cycle state machine
//!
//! `WaitForPlayers → RoundStart → PlayerSpawning → RoundRunning` and back to
//! `WaitForPlayers`. Each phase is a node with `enter`/`simulate`/`exit`;
//! only the active node can ask to advance, and the machine advances at most
//! once per tick. Node-local data lives in `RoundState` so it rolls back with
//! the rest of the snapshot.

use std::collections::{BTreeMap, BTreeSet};

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::entity::{EntityId, EntityTable, Hierarchy, PlayerId, Predicted, Prefab};
use super::events::SimEvent;
use super::physics::{Body, BodyKind, BodyTable};
use super::player::PlayerCoreState;
use super::puck::{PuckContext, PuckState};
use super::shuffle::{ShuffleState, TeleportShuffle};
use super::spinner::SpinnerState;
use super::tick::MatchRules;
use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoundPhase {
    #[default]
    WaitForPlayers,
    RoundStart,
    PlayerSpawning,
    RoundRunning,
}

impl RoundPhase {
    /// Successor in the fixed cycle
    pub fn next(self) -> Self {
        match self {
            RoundPhase::WaitForPlayers => RoundPhase::RoundStart,
            RoundPhase::RoundStart => RoundPhase::PlayerSpawning,
            RoundPhase::PlayerSpawning => RoundPhase::RoundRunning,
            RoundPhase::RoundRunning => RoundPhase::WaitForPlayers,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            RoundPhase::WaitForPlayers => "Waiting for players",
            RoundPhase::RoundStart => "Round starting",
            RoundPhase::PlayerSpawning => "Spawning",
            RoundPhase::RoundRunning => "Round running",
        }
    }
}

/// Versioned round data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundState {
    pub phase: RoundPhase,
    /// Seconds in the current phase
    pub phase_time: f32,
    /// RoundStart countdown
    pub start_timer: f32,
    /// Players still alive in the running round
    pub roster: BTreeSet<PlayerId>,
    /// Connected players seen on the last tick
    pub connected: usize,
    pub shuffle: ShuffleState,
    /// Rounds started so far
    pub round_number: u32,
}

impl RoundState {
    pub fn new(shuffle: &TeleportShuffle) -> Self {
        Self {
            phase: RoundPhase::default(),
            phase_time: 0.0,
            start_timer: 0.0,
            roster: BTreeSet::new(),
            connected: 0,
            shuffle: shuffle.initial_state(),
            round_number: 0,
        }
    }
}

/// Everything a phase may touch during one tick
pub struct PhaseContext<'a> {
    pub rules: &'a MatchRules,
    /// Sorted, deduplicated
    pub connected: &'a [PlayerId],
    pub authoritative: bool,
    pub entities: &'a mut EntityTable,
    pub bodies: &'a mut BodyTable,
    pub pucks: &'a mut BTreeMap<EntityId, PuckState>,
    pub spinners: &'a mut BTreeMap<EntityId, SpinnerState>,
    pub cores: &'a mut BTreeMap<EntityId, PlayerCoreState>,
    pub events: &'a mut Vec<SimEvent>,
}

impl PhaseContext<'_> {
    fn spawn(
        &mut self,
        prefab: Prefab,
        position: Vec3,
        yaw_degrees: f32,
        owner: Option<PlayerId>,
    ) -> Option<EntityId> {
        let Some(id) = self.entities.create(prefab, position, yaw_degrees, owner) else {
            log::error!("{}", ConfigError::MissingPrefab(prefab));
            return None;
        };
        if matches!(prefab, Prefab::Puck | Prefab::Spinner) {
            self.bodies
                .insert(id, Body::new(BodyKind::Dynamic, position, yaw_degrees));
        }
        self.events.push(SimEvent::Spawned {
            entity: id,
            prefab,
            owner,
        });
        Some(id)
    }

    fn despawn(&mut self, id: EntityId) {
        self.entities.delete(id);
        self.bodies.remove(id);
        self.pucks.remove(&id);
        self.spinners.remove(&id);
        self.cores.remove(&id);
        self.events.push(SimEvent::Despawned { entity: id });
    }
}

trait PhaseNode {
    fn enter(&self, _round: &mut RoundState, _ctx: &mut PhaseContext<'_>) {}

    /// Returns true to request the next phase
    fn simulate(&self, round: &mut RoundState, ctx: &mut PhaseContext<'_>, delta: f32) -> bool;

    fn exit(&self, _round: &mut RoundState, _ctx: &mut PhaseContext<'_>) {}
}

struct WaitForPlayers;

impl PhaseNode for WaitForPlayers {
    fn simulate(&self, _round: &mut RoundState, ctx: &mut PhaseContext<'_>, _delta: f32) -> bool {
        ctx.connected.len() >= ctx.rules.round.required_players
    }
}

struct RoundStart;

impl PhaseNode for RoundStart {
    fn enter(&self, round: &mut RoundState, ctx: &mut PhaseContext<'_>) {
        round.start_timer = ctx.rules.round.start_delay;
    }

    fn simulate(&self, round: &mut RoundState, _ctx: &mut PhaseContext<'_>, delta: f32) -> bool {
        round.start_timer -= delta;
        round.start_timer <= 0.0
    }
}

struct PlayerSpawning;

impl PhaseNode for PlayerSpawning {
    fn enter(&self, _round: &mut RoundState, ctx: &mut PhaseContext<'_>) {
        let rules = ctx.rules;
        let points = &rules.round.spawn_points;
        if points.is_empty() {
            log::error!("{}", ConfigError::NoSpawnPoints);
            return;
        }

        let connected = ctx.connected;
        for (index, &player) in connected.iter().enumerate() {
            let point = points[index % points.len()];
            let Some(core) =
                ctx.spawn(Prefab::PlayerCore, point.position, point.yaw_degrees, Some(player))
            else {
                continue;
            };
            let Some(spinner) =
                ctx.spawn(Prefab::Spinner, point.position, point.yaw_degrees, Some(player))
            else {
                ctx.despawn(core);
                continue;
            };
            ctx.entities.set_parent(spinner, core);

            let team = rules.teams.assign(index, player);
            ctx.spinners.insert(spinner, rules.spinner.initial_state());
            ctx.cores.insert(
                core,
                PlayerCoreState {
                    owner: player,
                    team,
                    spinner: Some(spinner),
                    health: rules.health.initial_state(),
                },
            );
            log::info!(
                "Spawned {:?} at {:?} (team {}, slot {})",
                player,
                point.position,
                team.team,
                team.slot
            );
        }
    }

    fn simulate(&self, _round: &mut RoundState, _ctx: &mut PhaseContext<'_>, _delta: f32) -> bool {
        true
    }
}

struct RoundRunning;

impl PhaseNode for RoundRunning {
    fn enter(&self, round: &mut RoundState, ctx: &mut PhaseContext<'_>) {
        let rules = ctx.rules;
        round.round_number += 1;
        round.roster = ctx
            .cores
            .values()
            .filter(|core| !core.health.is_dead)
            .map(|core| core.owner)
            .collect();

        // Every peer derives the same layout; only the puck waits on authority
        round.shuffle = rules.shuffle.start();
        if round.shuffle.current_seed != 0 {
            ctx.events.push(SimEvent::ZonesShuffled {
                seed: round.shuffle.current_seed,
            });
        }

        if ctx.authoritative {
            let spawn = rules.round.puck_spawn;
            if let Some(id) = ctx.spawn(Prefab::Puck, spawn, 0.0, None) {
                let mut puck = rules.puck.initial_state();
                rules.puck.reset(
                    &mut puck,
                    &mut PuckContext {
                        id,
                        body: &mut *ctx.bodies,
                    },
                    spawn,
                    Vec3::ZERO,
                );
                ctx.pucks.insert(id, puck);
            }
        }

        for spinner in ctx.spinners.values_mut() {
            rules.spinner.activate(spinner);
        }

        log::info!(
            "Round {} started with {} players",
            round.round_number,
            round.roster.len()
        );
    }

    fn simulate(&self, round: &mut RoundState, ctx: &mut PhaseContext<'_>, delta: f32) -> bool {
        let connected = ctx.connected;
        round.roster.retain(|player| connected.binary_search(player).is_ok());

        if ctx.rules.shuffle.simulate(&mut round.shuffle, delta) {
            log::info!("Teleport colors shuffled (seed {})", round.shuffle.current_seed);
            ctx.events.push(SimEvent::ZonesShuffled {
                seed: round.shuffle.current_seed,
            });
        }

        round.roster.len() <= 1
    }

    fn exit(&self, round: &mut RoundState, ctx: &mut PhaseContext<'_>) {
        let winner = if round.roster.len() == 1 {
            round.roster.first().copied()
        } else {
            None
        };
        log::info!("Round {} ended, winner {:?}", round.round_number, winner);
        ctx.events.push(SimEvent::RoundEnded {
            round: round.round_number,
            winner,
        });

        round.roster.clear();
        round.shuffle.current_seed = 0;

        let rules = ctx.rules;
        for (&id, puck) in ctx.pucks.iter_mut() {
            rules.puck.deactivate(
                puck,
                &mut PuckContext {
                    id,
                    body: &mut *ctx.bodies,
                },
            );
        }

        let doomed: Vec<EntityId> = ctx
            .entities
            .iter()
            .filter(|r| matches!(r.prefab, Prefab::Puck | Prefab::Spinner | Prefab::PlayerCore))
            .map(|r| r.id)
            .collect();
        for id in doomed {
            ctx.despawn(id);
        }
    }
}

fn node(phase: RoundPhase) -> &'static dyn PhaseNode {
    match phase {
        RoundPhase::WaitForPlayers => &WaitForPlayers,
        RoundPhase::RoundStart => &RoundStart,
        RoundPhase::PlayerSpawning => &PlayerSpawning,
        RoundPhase::RoundRunning => &RoundRunning,
    }
}

/// Drives the active phase node
#[derive(Debug, Clone, Copy, Default)]
pub struct RoundMachine;

impl RoundMachine {
    /// Run the active node; returns the transition taken, if any
    pub fn simulate(
        &self,
        round: &mut RoundState,
        ctx: &mut PhaseContext<'_>,
        delta: f32,
    ) -> Option<(RoundPhase, RoundPhase)> {
        round.connected = ctx.connected.len();
        round.phase_time += delta;

        if node(round.phase).simulate(round, ctx, delta) {
            Some(self.next(round, ctx))
        } else {
            None
        }
    }

    fn next(&self, round: &mut RoundState, ctx: &mut PhaseContext<'_>) -> (RoundPhase, RoundPhase) {
        let from = round.phase;
        let to = from.next();

        node(from).exit(round, ctx);
        round.phase = to;
        round.phase_time = 0.0;
        node(to).enter(round, ctx);

        log::debug!("Round phase {:?} -> {:?}", from, to);
        ctx.events.push(SimEvent::PhaseChanged { from, to });
        (from, to)
    }

    /// A player's core died; drop them from the running roster
    pub fn player_died(&self, round: &mut RoundState, player: PlayerId) {
        if round.phase == RoundPhase::RoundRunning && round.roster.remove(&player) {
            log::info!("{:?} eliminated, {} remaining", player, round.roster.len());
        }
    }
}
