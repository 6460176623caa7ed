//! Presentation pass
//!
//! Reads snapshots and produces what a renderer or UI needs. Never writes
//! back into the simulation, may be skipped for any tick, and may run
//! several times on the same snapshot.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::sim::{
    EntityId, Match, MatchState, PlayerId, RoundPhase, SpinnerStateType, TeamSide,
    TeleportColorId, shuffle_colors,
};

/// Puck color for a normalized speed (slow=blue, medium=green, fast=red/orange)
pub fn speed_color(t: f32) -> [f32; 3] {
    let t = t.clamp(0.0, 1.0);

    if t < 0.25 {
        // Blue to cyan
        let u = t / 0.25;
        [0.2, 0.4 + 0.4 * u, 1.0]
    } else if t < 0.5 {
        // Cyan to green
        let u = (t - 0.25) / 0.25;
        [0.2, 0.8, 1.0 - 0.6 * u]
    } else if t < 0.75 {
        // Green to yellow
        let u = (t - 0.5) / 0.25;
        [0.2 + 0.8 * u, 0.8, 0.4 - 0.2 * u]
    } else {
        // Yellow to red/orange
        let u = (t - 0.75) / 0.25;
        [1.0, 0.8 - 0.5 * u, 0.2]
    }
}

/// Extra detail shown next to the phase name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PhaseParam {
    None,
    Number(f32),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PuckView {
    pub id: EntityId,
    pub position: Vec3,
    pub velocity: Vec3,
    /// 0 at rest, 1 at max speed
    pub speed_factor: f32,
    pub color: [f32; 3],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpinnerView {
    pub id: EntityId,
    pub owner: Option<PlayerId>,
    pub position: Vec3,
    /// Degrees, (-180, 180]
    pub angle: f32,
    pub angular_velocity: f32,
    pub state_type: SpinnerStateType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneView {
    pub id: EntityId,
    pub side: TeamSide,
    pub color: TeleportColorId,
    pub rgb: [f32; 3],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ViewEvent {
    PhaseEntered(RoundPhase),
    PhaseExited(RoundPhase),
    /// Zone materials changed to a new layout
    ZonesRecolored { seed: u32 },
}

/// Everything presented for one snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewFrame {
    pub tick: u64,
    pub phase: RoundPhase,
    pub phase_name: &'static str,
    pub param: PhaseParam,
    pub pucks: Vec<PuckView>,
    pub spinners: Vec<SpinnerView>,
    pub zones: Vec<ZoneView>,
    pub events: Vec<ViewEvent>,
}

/// Presentation state carried between frames
#[derive(Debug, Clone, Default)]
pub struct MatchView {
    /// Last phase announced to the UI
    phase: Option<RoundPhase>,
    /// Seed the zone colors were last computed for
    seed: Option<u32>,
    zones: Vec<ZoneView>,
}

impl MatchView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the view of `state`
    ///
    /// Continuous values always follow the snapshot. Phase enter/exit events
    /// fire only for `verified` snapshots so mispredicted phases never reach
    /// the UI. Zone colors are recomputed only when the shuffle seed changes.
    pub fn update_view(&mut self, game: &Match, state: &MatchState, verified: bool) -> ViewFrame {
        let mut events = Vec::new();

        if verified && self.phase != Some(state.round.phase) {
            if let Some(previous) = self.phase {
                events.push(ViewEvent::PhaseExited(previous));
            }
            events.push(ViewEvent::PhaseEntered(state.round.phase));
            self.phase = Some(state.round.phase);
        }

        let seed = state.round.shuffle.current_seed;
        if self.seed != Some(seed) {
            self.zones = zone_views(game, seed);
            self.seed = Some(seed);
            events.push(ViewEvent::ZonesRecolored { seed });
        }

        let rules = game.rules();
        let pucks = state
            .pucks
            .iter()
            .map(|(&id, puck)| {
                let speed_factor = rules.puck.speed_factor(puck);
                PuckView {
                    id,
                    position: state.bodies.get(id).map_or(Vec3::ZERO, |b| b.position),
                    velocity: puck.velocity,
                    speed_factor,
                    color: speed_color(speed_factor),
                }
            })
            .collect();

        let spinners = state
            .spinners
            .iter()
            .map(|(&id, spinner)| SpinnerView {
                id,
                owner: state.owner(id),
                position: state.bodies.get(id).map_or(Vec3::ZERO, |b| b.position),
                angle: spinner.current_angle,
                angular_velocity: spinner.angular_velocity,
                state_type: spinner.state_type,
            })
            .collect();

        ViewFrame {
            tick: state.tick,
            phase: state.round.phase,
            phase_name: state.round.phase.name(),
            param: phase_param(game, state),
            pucks,
            spinners,
            zones: self.zones.clone(),
            events,
        }
    }
}

fn phase_param(game: &Match, state: &MatchState) -> PhaseParam {
    let round = &state.round;
    match round.phase {
        RoundPhase::WaitForPlayers => PhaseParam::Text(format!(
            "{}/{}",
            round.connected,
            game.rules().round.required_players
        )),
        RoundPhase::RoundStart => PhaseParam::Number(round.start_timer.max(0.0)),
        RoundPhase::PlayerSpawning => PhaseParam::None,
        RoundPhase::RoundRunning => PhaseParam::Number(round.roster.len() as f32),
    }
}

/// Zone colors for a seed, computed without touching the registry
fn zone_views(game: &Match, seed: u32) -> Vec<ZoneView> {
    let zones = game.zones();
    let left = zones.original_colors(TeamSide::Left);
    let right = zones.original_colors(TeamSide::Right);
    let (left, right) = if seed == 0 {
        (left.to_vec(), right.to_vec())
    } else {
        shuffle_colors(left, right, seed)
    };

    [TeamSide::Left, TeamSide::Right]
        .into_iter()
        .zip([left, right])
        .flat_map(|(side, colors)| {
            zones
                .zones(side)
                .iter()
                .zip(colors)
                .map(move |(zone, color)| ZoneView {
                    id: zone.id,
                    side,
                    color,
                    rgb: color.rgb(),
                })
        })
        .collect()
}
