//! Puck velocity law, wall bounces, damage and teleports
//!
//! The physics body owns the live velocity; every entry point reads it,
//! applies the puck's rules and writes both the body and `PuckState`, so the
//! snapshot always matches what the body will integrate.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::entity::{EntityId, Predicted, Simulate};
use super::physics::Physics;
use super::player::Damageable;
use super::reflector::Reflector;
use super::rng::SimRng;
use super::zone::{TeleportExit, ZoneRegistry};
use crate::consts::PUCK_STOPPED_SPEED;
use crate::settings::PuckSettings;
use crate::{clamp_speed, move_towards, reflect};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PuckState {
    pub velocity: Vec3,
    pub is_active: bool,
    /// Seconds until the puck may teleport again
    pub teleport_cooldown: f32,
    /// Source for restart directions
    pub rng: SimRng,
}

/// Puck rules for one match
#[derive(Debug, Clone)]
pub struct Puck {
    settings: PuckSettings,
    seed: u32,
}

/// Per-call access to the puck's body
pub struct PuckContext<'a> {
    pub id: EntityId,
    pub body: &'a mut dyn Physics,
}

impl Puck {
    pub fn new(settings: &PuckSettings, seed: u32) -> Self {
        Self {
            settings: settings.clone(),
            seed,
        }
    }

    pub fn settings(&self) -> &PuckSettings {
        &self.settings
    }

    fn random_direction(rng: &mut SimRng) -> Vec3 {
        let angle = rng.next_unit() * std::f32::consts::TAU;
        Vec3::new(angle.cos(), 0.0, angle.sin())
    }

    /// The per-tick velocity law applied to a raw velocity
    pub fn apply_velocity_law(&self, state: &mut PuckState, velocity: Vec3, delta: f32) -> Vec3 {
        let s = &self.settings;
        if s.maintain_constant_speed {
            if velocity.length() > PUCK_STOPPED_SPEED {
                clamp_speed(velocity, s.constant_speed, s.max_speed)
            } else {
                Self::random_direction(&mut state.rng) * s.constant_speed
            }
        } else {
            move_towards(velocity, Vec3::ZERO, s.friction * delta.max(0.0))
        }
    }

    /// Reflect off a wall contact
    pub fn on_wall_contact(&self, state: &mut PuckState, ctx: &mut PuckContext<'_>, normal: Vec3) {
        let velocity = ctx.body.velocity(ctx.id);
        let speed = velocity.length();
        let reflected = reflect(velocity, normal);

        let bounced = if self.settings.maintain_constant_speed {
            let kept = speed.clamp(self.settings.constant_speed, self.settings.max_speed);
            reflected.normalize_or_zero() * kept
        } else {
            reflected * self.settings.wall_bounce_retention
        };

        ctx.body.set_velocity(ctx.id, bounced);
        state.velocity = bounced;
    }

    /// Redirect off a reflector; returns the new velocity
    pub fn on_reflector_contact(
        &self,
        state: &mut PuckState,
        ctx: &mut PuckContext<'_>,
        reflector: &Reflector,
        point: Vec3,
        normal: Vec3,
    ) -> Vec3 {
        let s = &self.settings;
        let deflected = reflector.deflect(ctx.body.velocity(ctx.id), point, normal);
        let velocity = if s.maintain_constant_speed {
            clamp_speed(deflected, s.constant_speed, s.max_speed)
        } else {
            deflected.clamp_length_max(s.max_speed)
        };

        ctx.body.set_velocity(ctx.id, velocity);
        state.velocity = velocity;
        velocity
    }

    /// Damage dealt to a target hit at `speed`, if any
    pub fn impact_damage(&self, speed: f32) -> Option<f32> {
        let s = &self.settings;
        if speed < s.damage_threshold {
            return None;
        }
        Some(((speed - s.damage_threshold) * s.damage_multiplier).min(s.max_damage))
    }

    /// Hit something that can take damage; returns the damage dealt
    pub fn on_damageable_contact(
        &self,
        ctx: &PuckContext<'_>,
        target: &mut dyn Damageable,
    ) -> Option<f32> {
        if !target.is_alive() {
            return None;
        }
        let speed = ctx.body.velocity(ctx.id).length();
        let damage = self.impact_damage(speed)?;
        target.take_damage(damage, Some(ctx.id));
        log::debug!("Puck dealt {:.2} damage at speed {:.2}", damage, speed);
        Some(damage)
    }

    /// Add an instantaneous velocity change from a spinner arm
    pub fn apply_impact(&self, state: &mut PuckState, ctx: &mut PuckContext<'_>, force: Vec3) {
        let s = &self.settings;
        let mut velocity = ctx.body.velocity(ctx.id) + force;
        if velocity.length() > s.max_speed {
            velocity = velocity.normalize_or_zero() * s.max_speed;
        }
        if s.maintain_constant_speed && velocity.length() < s.constant_speed {
            velocity = velocity.normalize_or_zero() * s.constant_speed;
        }
        ctx.body.set_velocity(ctx.id, velocity);
        state.velocity = velocity;
    }

    /// Enter a teleport zone
    ///
    /// Runs entirely within this call: the body is moved and given its exit
    /// velocity before returning. Returns `None` without touching anything
    /// while cooling down, while replaying verified ticks, or when the zone
    /// has no partner.
    pub fn on_teleport_trigger(
        &self,
        state: &mut PuckState,
        ctx: &mut PuckContext<'_>,
        zones: &ZoneRegistry,
        zone: EntityId,
        replaying_verified: bool,
    ) -> Option<TeleportExit> {
        if replaying_verified || !state.is_active || state.teleport_cooldown > 0.0 {
            return None;
        }

        let captured_speed = ctx.body.velocity(ctx.id).length();
        let exit = zones.try_teleport(zone, captured_speed)?;

        ctx.body.set_velocity(ctx.id, Vec3::ZERO);
        ctx.body.set_angular_velocity(ctx.id, Vec3::ZERO);

        // Keep the puck on its current plane
        let height = ctx.body.position(ctx.id).map_or(exit.position.y, |p| p.y);
        let position = Vec3::new(exit.position.x, height, exit.position.z);
        ctx.body.set_position(ctx.id, position);
        ctx.body.set_velocity(ctx.id, exit.velocity);

        state.velocity = exit.velocity;
        state.teleport_cooldown = self.settings.teleport_cooldown;

        log::info!(
            "Puck teleported to {:?} at {:?} with velocity {:?}",
            exit.exit_zone,
            position,
            exit.velocity
        );
        Some(TeleportExit { position, ..exit })
    }

    /// Place the puck and launch it; a zero launch picks a seeded direction
    pub fn reset(
        &self,
        state: &mut PuckState,
        ctx: &mut PuckContext<'_>,
        position: Vec3,
        initial_velocity: Vec3,
    ) {
        let velocity = if initial_velocity == Vec3::ZERO && self.settings.maintain_constant_speed {
            Self::random_direction(&mut state.rng) * self.settings.constant_speed
        } else {
            initial_velocity
        };
        ctx.body.set_position(ctx.id, position);
        ctx.body.set_velocity(ctx.id, velocity);
        ctx.body.set_angular_velocity(ctx.id, Vec3::ZERO);
        state.velocity = velocity;
        state.teleport_cooldown = 0.0;
        state.is_active = true;
    }

    /// Take the puck out of play; it holds still and ignores zones until reset
    pub fn deactivate(&self, state: &mut PuckState, ctx: &mut PuckContext<'_>) {
        ctx.body.set_velocity(ctx.id, Vec3::ZERO);
        ctx.body.set_angular_velocity(ctx.id, Vec3::ZERO);
        state.velocity = Vec3::ZERO;
        state.is_active = false;
    }

    /// 0 at rest, 1 at max speed (drives the speed color)
    pub fn speed_factor(&self, state: &PuckState) -> f32 {
        if self.settings.max_speed <= 0.0 {
            return 0.0;
        }
        (state.velocity.length() / self.settings.max_speed).clamp(0.0, 1.0)
    }
}

impl Predicted for Puck {
    type State = PuckState;

    fn initial_state(&self) -> PuckState {
        PuckState {
            velocity: Vec3::ZERO,
            is_active: true,
            teleport_cooldown: 0.0,
            rng: SimRng::new(self.seed),
        }
    }
}

impl Simulate for Puck {
    type Context<'a> = PuckContext<'a>;

    fn simulate(&self, state: &mut PuckState, ctx: &mut PuckContext<'_>, delta: f32) {
        if state.teleport_cooldown > 0.0 {
            state.teleport_cooldown = (state.teleport_cooldown - delta).max(0.0);
        }
        if !state.is_active {
            ctx.body.set_velocity(ctx.id, Vec3::ZERO);
            state.velocity = Vec3::ZERO;
            return;
        }

        let velocity = ctx.body.velocity(ctx.id);
        let velocity = self.apply_velocity_law(state, velocity, delta);
        ctx.body.set_velocity(ctx.id, velocity);
        state.velocity = velocity;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::ReflectorKind;
    use crate::sim::physics::{Body, BodyKind, BodyTable};
    use crate::sim::zone::{TeamSide, TeleportColorId, TeleportZone};

    const PUCK: EntityId = EntityId(1);

    fn setup(settings: PuckSettings, velocity: Vec3) -> (Puck, PuckState, BodyTable) {
        let puck = Puck::new(&settings, 1);
        let state = puck.initial_state();
        let mut bodies = BodyTable::default();
        bodies.insert(PUCK, Body::new(BodyKind::Dynamic, Vec3::new(0.0, 0.25, 0.0), 0.0));
        bodies.set_velocity(PUCK, velocity);
        (puck, state, bodies)
    }

    #[test]
    fn test_slow_puck_raised_to_constant_speed() {
        let (puck, mut state, mut bodies) =
            setup(PuckSettings::default(), Vec3::new(0.0, 0.0, 2.0));
        let mut ctx = PuckContext {
            id: PUCK,
            body: &mut bodies,
        };
        puck.simulate(&mut state, &mut ctx, 1.0 / 60.0);

        assert!((state.velocity.length() - 5.0).abs() < 1e-5);
        assert!((state.velocity.normalize() - Vec3::Z).length() < 1e-5);
        assert_eq!(bodies.velocity(PUCK), state.velocity);
    }

    #[test]
    fn test_fast_puck_capped() {
        let (puck, mut state, mut bodies) =
            setup(PuckSettings::default(), Vec3::new(100.0, 0.0, 0.0));
        let mut ctx = PuckContext {
            id: PUCK,
            body: &mut bodies,
        };
        puck.simulate(&mut state, &mut ctx, 1.0 / 60.0);
        assert!((state.velocity.length() - 30.0).abs() < 1e-4);
    }

    #[test]
    fn test_stopped_puck_restarts_deterministically() {
        let (puck, mut a, mut bodies_a) = setup(PuckSettings::default(), Vec3::ZERO);
        let (_, mut b, mut bodies_b) = setup(PuckSettings::default(), Vec3::ZERO);

        puck.simulate(
            &mut a,
            &mut PuckContext {
                id: PUCK,
                body: &mut bodies_a,
            },
            0.1,
        );
        puck.simulate(
            &mut b,
            &mut PuckContext {
                id: PUCK,
                body: &mut bodies_b,
            },
            0.1,
        );

        assert!((a.velocity.length() - 5.0).abs() < 1e-4);
        assert_eq!(a.velocity.y, 0.0);
        assert_eq!(a, b);
    }

    #[test]
    fn test_friction_mode_decays_to_rest() {
        let settings = PuckSettings {
            maintain_constant_speed: false,
            friction: 1.0,
            ..PuckSettings::default()
        };
        let (puck, mut state, mut bodies) = setup(settings, Vec3::new(0.0, 0.0, 1.5));
        let mut ctx = PuckContext {
            id: PUCK,
            body: &mut bodies,
        };
        puck.simulate(&mut state, &mut ctx, 1.0);
        assert!((state.velocity.z - 0.5).abs() < 1e-5);
        puck.simulate(&mut state, &mut ctx, 1.0);
        assert_eq!(state.velocity, Vec3::ZERO);
    }

    #[test]
    fn test_wall_bounce_modes() {
        let (puck, mut state, mut bodies) =
            setup(PuckSettings::default(), Vec3::new(8.0, 0.0, 0.0));
        let mut ctx = PuckContext {
            id: PUCK,
            body: &mut bodies,
        };
        puck.on_wall_contact(&mut state, &mut ctx, Vec3::new(-1.0, 0.0, 0.0));
        assert!((state.velocity - Vec3::new(-8.0, 0.0, 0.0)).length() < 1e-5);

        let settings = PuckSettings {
            maintain_constant_speed: false,
            wall_bounce_retention: 0.5,
            ..PuckSettings::default()
        };
        let (puck, mut state, mut bodies) = setup(settings, Vec3::new(8.0, 0.0, 0.0));
        let mut ctx = PuckContext {
            id: PUCK,
            body: &mut bodies,
        };
        puck.on_wall_contact(&mut state, &mut ctx, Vec3::new(-1.0, 0.0, 0.0));
        assert!((state.velocity - Vec3::new(-4.0, 0.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn test_reflector_output_stays_in_envelope() {
        let launcher = Reflector {
            id: EntityId(5),
            position: Vec3::new(5.0, 0.0, 0.0),
            kind: ReflectorKind::Diagonal {
                forward: Vec3::Z,
                angle_offset: 0.0,
                velocity_multiplier: 10.0,
                min_reflect_speed: 1.0,
            },
        };

        let (puck, mut state, mut bodies) =
            setup(PuckSettings::default(), Vec3::new(8.0, 0.0, 0.0));
        let mut ctx = PuckContext {
            id: PUCK,
            body: &mut bodies,
        };
        let out = puck.on_reflector_contact(&mut state, &mut ctx, &launcher, Vec3::X, Vec3::NEG_X);
        assert!((out - Vec3::new(0.0, 0.0, 30.0)).length() < 1e-4);
        assert_eq!(state.velocity, out);
        assert_eq!(bodies.velocity(PUCK), out);

        // Floor of the reflector is below the constant speed
        let (puck, mut state, mut bodies) =
            setup(PuckSettings::default(), Vec3::new(0.01, 0.0, 0.0));
        let mut ctx = PuckContext {
            id: PUCK,
            body: &mut bodies,
        };
        let out = puck.on_reflector_contact(&mut state, &mut ctx, &launcher, Vec3::X, Vec3::NEG_X);
        assert!((out - Vec3::new(0.0, 0.0, 5.0)).length() < 1e-4);

        let settings = PuckSettings {
            maintain_constant_speed: false,
            ..PuckSettings::default()
        };
        let (puck, mut state, mut bodies) = setup(settings, Vec3::new(0.01, 0.0, 0.0));
        let mut ctx = PuckContext {
            id: PUCK,
            body: &mut bodies,
        };
        let out = puck.on_reflector_contact(&mut state, &mut ctx, &launcher, Vec3::X, Vec3::NEG_X);
        assert!((out - Vec3::new(0.0, 0.0, 1.0)).length() < 1e-4);
    }

    #[test]
    fn test_impact_damage_threshold_and_cap() {
        let puck = Puck::new(
            &PuckSettings {
                damage_threshold: 10.0,
                damage_multiplier: 0.1,
                max_damage: 1.0,
                ..PuckSettings::default()
            },
            0,
        );
        assert_eq!(puck.impact_damage(9.9), None);
        assert_eq!(puck.impact_damage(10.0), Some(0.0));
        assert!((puck.impact_damage(15.0).unwrap() - 0.5).abs() < 1e-5);
        assert_eq!(puck.impact_damage(100.0), Some(1.0));
    }

    struct Dummy {
        taken: f32,
        alive: bool,
    }

    impl Damageable for Dummy {
        fn take_damage(&mut self, amount: f32, _source: Option<EntityId>) {
            self.taken += amount;
        }
        fn is_alive(&self) -> bool {
            self.alive
        }
    }

    #[test]
    fn test_damage_only_living_targets() {
        let (puck, _state, mut bodies) =
            setup(PuckSettings::default(), Vec3::new(20.0, 0.0, 0.0));
        let ctx = PuckContext {
            id: PUCK,
            body: &mut bodies,
        };
        let mut alive = Dummy {
            taken: 0.0,
            alive: true,
        };
        assert_eq!(puck.on_damageable_contact(&ctx, &mut alive), Some(1.0));
        assert_eq!(alive.taken, 1.0);

        let mut dead = Dummy {
            taken: 0.0,
            alive: false,
        };
        assert_eq!(puck.on_damageable_contact(&ctx, &mut dead), None);
    }

    #[test]
    fn test_apply_impact_respects_envelope() {
        let (puck, mut state, mut bodies) =
            setup(PuckSettings::default(), Vec3::new(5.0, 0.0, 0.0));
        let mut ctx = PuckContext {
            id: PUCK,
            body: &mut bodies,
        };
        puck.apply_impact(&mut state, &mut ctx, Vec3::new(100.0, 0.0, 0.0));
        assert!((state.velocity.length() - 30.0).abs() < 1e-4);

        puck.apply_impact(&mut state, &mut ctx, Vec3::new(-29.0, 0.0, 0.0));
        assert!((state.velocity.length() - 5.0).abs() < 1e-4);
    }

    fn zones() -> ZoneRegistry {
        ZoneRegistry::collect(vec![
            TeleportZone {
                id: EntityId(10),
                side: TeamSide::Left,
                position: Vec3::new(-10.0, 0.0, 0.0),
                exit_position: Vec3::new(-9.0, 0.0, 0.0),
                exit_forward: Vec3::new(-10.0, 0.0, 0.0),
                color: TeleportColorId::Red,
            },
            TeleportZone {
                id: EntityId(11),
                side: TeamSide::Right,
                position: Vec3::new(10.0, 0.0, 0.0),
                exit_position: Vec3::new(9.0, 0.0, 3.0),
                exit_forward: Vec3::new(1.0, 0.0, 0.0) * 10.0,
                color: TeleportColorId::Red,
            },
            TeleportZone {
                id: EntityId(12),
                side: TeamSide::Left,
                position: Vec3::new(-10.0, 0.0, 5.0),
                exit_position: Vec3::new(-9.0, 0.0, 5.0),
                exit_forward: Vec3::X,
                color: TeleportColorId::Green,
            },
        ])
    }

    #[test]
    fn test_teleport_keeps_entry_speed_along_exit_direction() {
        let (puck, mut state, mut bodies) =
            setup(PuckSettings::default(), Vec3::new(0.0, 0.0, -8.0));
        let registry = zones();
        let mut ctx = PuckContext {
            id: PUCK,
            body: &mut bodies,
        };

        let exit = puck
            .on_teleport_trigger(&mut state, &mut ctx, &registry, EntityId(10), false)
            .unwrap();
        assert!((exit.velocity - Vec3::new(8.0, 0.0, 0.0)).length() < 1e-5);
        assert_eq!(exit.position, Vec3::new(9.0, 0.25, 3.0));
        assert_eq!(bodies.position(PUCK), Some(Vec3::new(9.0, 0.25, 3.0)));
        assert_eq!(bodies.angular_velocity(PUCK), Vec3::ZERO);
        assert_eq!(state.teleport_cooldown, 0.5);
    }

    #[test]
    fn test_teleport_cooldown_blocks_bounce_back() {
        let (puck, mut state, mut bodies) =
            setup(PuckSettings::default(), Vec3::new(0.0, 0.0, -8.0));
        let registry = zones();
        let mut ctx = PuckContext {
            id: PUCK,
            body: &mut bodies,
        };
        assert!(puck
            .on_teleport_trigger(&mut state, &mut ctx, &registry, EntityId(10), false)
            .is_some());
        assert!(puck
            .on_teleport_trigger(&mut state, &mut ctx, &registry, EntityId(11), false)
            .is_none());

        // Cooldown runs out through simulate
        for _ in 0..31 {
            puck.simulate(&mut state, &mut ctx, 1.0 / 60.0);
        }
        assert_eq!(state.teleport_cooldown, 0.0);
        assert!(puck
            .on_teleport_trigger(&mut state, &mut ctx, &registry, EntityId(11), false)
            .is_some());
    }

    #[test]
    fn test_teleport_without_partner_is_noop() {
        let (puck, mut state, mut bodies) =
            setup(PuckSettings::default(), Vec3::new(6.0, 0.0, 0.0));
        let registry = zones();
        let before = state.clone();
        let mut ctx = PuckContext {
            id: PUCK,
            body: &mut bodies,
        };
        assert!(puck
            .on_teleport_trigger(&mut state, &mut ctx, &registry, EntityId(12), false)
            .is_none());
        assert_eq!(state, before);
        assert_eq!(bodies.velocity(PUCK), Vec3::new(6.0, 0.0, 0.0));
    }

    #[test]
    fn test_teleport_skipped_while_replaying() {
        let (puck, mut state, mut bodies) =
            setup(PuckSettings::default(), Vec3::new(6.0, 0.0, 0.0));
        let registry = zones();
        let mut ctx = PuckContext {
            id: PUCK,
            body: &mut bodies,
        };
        assert!(puck
            .on_teleport_trigger(&mut state, &mut ctx, &registry, EntityId(10), true)
            .is_none());
    }

    #[test]
    fn test_reset_with_zero_velocity_launches() {
        let (puck, mut state, mut bodies) = setup(PuckSettings::default(), Vec3::ZERO);
        let mut ctx = PuckContext {
            id: PUCK,
            body: &mut bodies,
        };
        puck.reset(&mut state, &mut ctx, Vec3::new(1.0, 0.25, 1.0), Vec3::ZERO);
        assert!((state.velocity.length() - 5.0).abs() < 1e-4);
        assert_eq!(bodies.position(PUCK), Some(Vec3::new(1.0, 0.25, 1.0)));
    }

    #[test]
    fn test_deactivated_puck_holds_still_until_reset() {
        let (puck, mut state, mut bodies) =
            setup(PuckSettings::default(), Vec3::new(6.0, 0.0, 0.0));
        let registry = zones();
        let mut ctx = PuckContext {
            id: PUCK,
            body: &mut bodies,
        };
        puck.deactivate(&mut state, &mut ctx);
        assert!(!state.is_active);

        // No constant-speed relaunch while out of play
        for _ in 0..10 {
            puck.simulate(&mut state, &mut ctx, 1.0 / 60.0);
        }
        assert_eq!(state.velocity, Vec3::ZERO);
        assert!(puck
            .on_teleport_trigger(&mut state, &mut ctx, &registry, EntityId(10), false)
            .is_none());

        puck.reset(&mut state, &mut ctx, Vec3::new(0.0, 0.25, 0.0), Vec3::ZERO);
        assert!(state.is_active);
        puck.simulate(&mut state, &mut ctx, 1.0 / 60.0);
        assert!((state.velocity.length() - 5.0).abs() < 1e-4);
        assert_eq!(bodies.velocity(PUCK), state.velocity);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn constant_speed_stays_in_envelope(
                vx in -200.0f32..200.0,
                vz in -200.0f32..200.0,
                ticks in 1usize..20,
                delta in 0.0f32..0.5,
            ) {
                let (puck, mut state, mut bodies) =
                    setup(PuckSettings::default(), Vec3::new(vx, 0.0, vz));
                let mut ctx = PuckContext {
                    id: PUCK,
                    body: &mut bodies,
                };
                for _ in 0..ticks {
                    puck.simulate(&mut state, &mut ctx, delta);
                    let speed = state.velocity.length();
                    prop_assert!(speed >= 5.0 - 1e-3 && speed <= 30.0 + 1e-3);
                }
            }

            #[test]
            fn friction_never_speeds_up(
                vx in -50.0f32..50.0,
                vz in -50.0f32..50.0,
                delta in 0.0f32..2.0,
            ) {
                let settings = PuckSettings {
                    maintain_constant_speed: false,
                    ..PuckSettings::default()
                };
                let (puck, mut state, mut bodies) = setup(settings, Vec3::new(vx, 0.0, vz));
                let before = Vec3::new(vx, 0.0, vz).length();
                let mut ctx = PuckContext {
                    id: PUCK,
                    body: &mut bodies,
                };
                puck.simulate(&mut state, &mut ctx, delta);
                prop_assert!(state.velocity.length() <= before + 1e-4);
            }
        }
    }
}
