//! Spin Arena headless driver
//!
//! Runs a scripted two-player match on the kinematic body table and logs
//! what happens. Usage: `spin-arena [settings.json] [seconds]`.

use std::collections::{BTreeMap, BTreeSet};

use glam::Vec3;

use spin_arena::MatchSettings;
use spin_arena::consts::SIM_DT;
use spin_arena::flatten_y;
use spin_arena::sim::{
    Contact, EntityId, Match, MatchState, PhysicsReport, PlayerId, Prefab, SimEvent, SpinnerInput,
    TeamSide, TickInput, TriggerEnter,
};
use spin_arena::view::{MatchView, ViewEvent};

const PUCK_RADIUS: f32 = 0.25;
const ZONE_RADIUS: f32 = 0.75;
const CORE_RADIUS: f32 = 1.0;
const REFLECTOR_RADIUS: f32 = 0.75;

/// Stand-in collision detection for the kinematic bodies
///
/// Reports overlaps once on entry, the way an engine raises enter callbacks.
#[derive(Default)]
struct OverlapScanner {
    touching: BTreeSet<(EntityId, EntityId)>,
}

impl OverlapScanner {
    fn detect(&mut self, settings: &MatchSettings, game: &Match, state: &MatchState) -> PhysicsReport {
        let mut report = PhysicsReport::default();
        let mut touching = BTreeSet::new();
        let mut enter = |pair: (EntityId, EntityId)| {
            touching.insert(pair);
            !self.touching.contains(&pair)
        };

        let walls = state.arena_ids(Prefab::Wall);

        for &puck in state.pucks.keys() {
            let Some(body) = state.bodies.get(puck) else {
                continue;
            };
            let (p, v) = (body.position, body.velocity);

            for (&wall, layout) in walls.iter().zip(&settings.arena.walls) {
                let n = layout.normal.normalize_or_zero();
                let depth = (p - layout.position).dot(n);
                if depth < PUCK_RADIUS && v.dot(n) < 0.0 {
                    report.contacts.push(Contact {
                        entity: puck,
                        other: wall,
                        point: p - n * depth,
                        normal: n,
                    });
                }
            }

            for side in [TeamSide::Left, TeamSide::Right] {
                for zone in game.zones().zones(side) {
                    if flatten_y(p - zone.position).length() < ZONE_RADIUS && enter((puck, zone.id)) {
                        report.triggers.push(TriggerEnter {
                            entity: puck,
                            zone: zone.id,
                        });
                    }
                }
            }

            for (&id, reflector) in game.reflectors() {
                let offset = flatten_y(p - reflector.position);
                if offset.length() < REFLECTOR_RADIUS + PUCK_RADIUS && enter((puck, id)) {
                    report.contacts.push(Contact {
                        entity: puck,
                        other: id,
                        point: reflector.position + offset.normalize_or_zero() * REFLECTOR_RADIUS,
                        normal: offset.normalize_or_zero(),
                    });
                }
            }

            for &core in state.cores.keys() {
                let Some(center) = state.entities.get(core).map(|r| r.spawn_position) else {
                    continue;
                };
                let offset = flatten_y(p - center);
                if offset.length() < CORE_RADIUS + PUCK_RADIUS && enter((puck, core)) {
                    report.contacts.push(Contact {
                        entity: puck,
                        other: core,
                        point: center + offset.normalize_or_zero() * CORE_RADIUS,
                        normal: offset.normalize_or_zero(),
                    });
                }
            }

            for &spinner in state.spinners.keys() {
                let Some(arm) = state.bodies.get(spinner) else {
                    continue;
                };
                let yaw = arm.yaw.to_radians();
                let along_arm = Vec3::new(yaw.sin(), 0.0, yaw.cos());
                let local = flatten_y(p - arm.position);
                let along = local.dot(along_arm);
                let across = (local - along_arm * along).length();
                let reach = settings.spinner.arm_length;
                let half_width = settings.spinner.arm_width * 0.5;
                if along.abs() <= reach && across <= half_width + PUCK_RADIUS && enter((spinner, puck)) {
                    report.contacts.push(Contact {
                        entity: spinner,
                        other: puck,
                        point: p,
                        normal: local.normalize_or_zero(),
                    });
                }
            }
        }

        self.touching = touching;
        report
    }
}

/// Player 1 spins steadily; player 2 alternates direction and brakes in between
fn scripted_input(players: &[PlayerId], tick: u64) -> TickInput {
    let seconds = tick as f32 * SIM_DT;
    let mut spinners = BTreeMap::new();
    spinners.insert(
        players[0],
        SpinnerInput {
            rotation_direction: 1.0,
            brake: false,
        },
    );
    let phase = (seconds / 3.0) as u32 % 3;
    spinners.insert(
        players[1],
        SpinnerInput {
            rotation_direction: match phase {
                0 => 1.0,
                1 => 0.0,
                _ => -1.0,
            },
            brake: phase == 1,
        },
    );
    TickInput {
        connected: players.to_vec(),
        spinners,
        ..TickInput::default()
    }
}

fn main() {
    #[cfg(not(target_arch = "wasm32"))]
    env_logger::init();
    log::info!("Spin Arena (headless) starting...");

    let mut args = std::env::args().skip(1);
    let settings = match args.next() {
        Some(path) => match MatchSettings::load(&path) {
            Ok(settings) => settings,
            Err(e) => {
                log::error!("{}", e);
                std::process::exit(1);
            }
        },
        None => MatchSettings::default(),
    };
    let seconds: f32 = args.next().and_then(|s| s.parse().ok()).unwrap_or(60.0);

    let mut game = match Match::new(&settings) {
        Ok(game) => game,
        Err(e) => {
            log::error!("Invalid settings: {}", e);
            std::process::exit(1);
        }
    };
    let mut state = game.initial_state();
    let mut view = MatchView::new();
    let mut scanner = OverlapScanner::default();
    let mut report = PhysicsReport::default();

    let players = [PlayerId(1), PlayerId(2)];
    let ticks = (seconds / SIM_DT).max(0.0) as u64;

    let mut rounds_finished = 0u32;
    for t in 0..ticks {
        let input = scripted_input(&players, t);
        let events = game.tick(&mut state, &input, &report, SIM_DT);
        for event in &events {
            match event {
                SimEvent::Damaged { .. }
                | SimEvent::ArmImpact { .. }
                | SimEvent::Reflected { .. } => {
                    log::debug!("[{}] {:?}", state.tick, event)
                }
                SimEvent::RoundEnded { .. } => {
                    rounds_finished += 1;
                    log::info!("[{}] {:?}", state.tick, event);
                }
                _ => log::info!("[{}] {:?}", state.tick, event),
            }
        }

        let frame = view.update_view(&game, &state, true);
        for event in &frame.events {
            if let ViewEvent::PhaseEntered(_) = event {
                log::info!("{} ({:?})", frame.phase_name, frame.param);
            }
        }

        report = scanner.detect(&settings, &game, &state);
    }

    log::info!(
        "Simulated {} ticks, {} rounds finished, phase {:?}",
        state.tick,
        rounds_finished,
        state.round.phase
    );
}
