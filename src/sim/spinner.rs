//! Spinner rotation dynamics
//!
//! Angular velocity is integrated from input in degrees per second and
//! pushed to the arm's physics body each tick. The body's yaw is read back
//! into the snapshot so solver drift is captured with everything else.
//!
//! Within a match a spinner dies with its core, and a dead core blocks
//! respawn until the round despawns it, so core death is elimination.
//! Respawn only happens for a spinner killed while its core still lives.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::collision::{ArmImpact, arm_impact};
use super::entity::{EntityId, Predicted, SimulateWithInput};
use super::physics::Physics;
use crate::consts::ROTATION_INPUT_DEADZONE;
use crate::settings::SpinnerSettings;
use crate::{decay_toward_zero, normalize_degrees};

/// Per-tick spinner input
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SpinnerInput {
    /// -1 (clockwise) to 1 (counter-clockwise)
    pub rotation_direction: f32,
    pub brake: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpinnerStateType {
    /// Waiting for the round to start
    #[default]
    Idle,
    /// In play, accepts input
    Active,
    /// Waiting for respawn
    Dead,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SpinnerState {
    /// deg/s, positive is counter-clockwise
    pub angular_velocity: f32,
    /// Body yaw, degrees in (-180, 180]
    pub current_angle: f32,
    /// Total rotation since spawn, degrees
    pub accumulated_angle: f32,
    pub state_type: SpinnerStateType,
    /// Seconds spent in `state_type`
    pub state_duration: f32,
    pub respawn_timer: f32,
}

/// Spinner rules for one match
#[derive(Debug, Clone)]
pub struct Spinner {
    settings: SpinnerSettings,
}

pub struct SpinnerContext<'a> {
    pub id: EntityId,
    pub body: &'a mut dyn Physics,
    /// False while the owning core is dead
    pub can_respawn: bool,
}

impl Spinner {
    pub fn new(settings: &SpinnerSettings) -> Self {
        Self {
            settings: settings.clone(),
        }
    }

    pub fn settings(&self) -> &SpinnerSettings {
        &self.settings
    }

    fn enter(state: &mut SpinnerState, state_type: SpinnerStateType) {
        state.state_type = state_type;
        state.state_duration = 0.0;
    }

    /// Round start: Idle → Active
    pub fn activate(&self, state: &mut SpinnerState) {
        if state.state_type == SpinnerStateType::Idle {
            Self::enter(state, SpinnerStateType::Active);
        }
    }

    /// Health depleted: Active → Dead, respawn countdown starts
    pub fn kill(&self, state: &mut SpinnerState) {
        if state.state_type == SpinnerStateType::Active {
            Self::enter(state, SpinnerStateType::Dead);
            state.respawn_timer = self.settings.respawn_time;
        }
    }

    /// Angular velocity after one tick of `input`
    pub fn next_angular_velocity(&self, angular_velocity: f32, input: &SpinnerInput, delta: f32) -> f32 {
        let s = &self.settings;
        let delta = delta.max(0.0);
        let max = s.max_angular_velocity;

        let next = if input.rotation_direction.abs() > ROTATION_INPUT_DEADZONE {
            angular_velocity + input.rotation_direction * s.angular_acceleration * delta
        } else if input.brake {
            decay_toward_zero(angular_velocity, s.brake_deceleration * delta)
        } else {
            decay_toward_zero(angular_velocity, s.natural_deceleration * delta)
        };

        if next.is_finite() { next.clamp(-max, max) } else { 0.0 }
    }

    /// Kick delivered to whatever the arm at `contact_point` hits
    pub fn arm_impact(&self, state: &SpinnerState, center: Vec3, contact_point: Vec3) -> ArmImpact {
        arm_impact(
            center,
            contact_point,
            state.angular_velocity,
            self.settings.impact_multiplier,
            self.settings.max_impact_velocity,
        )
    }

    fn apply_rotation_limit(&self, state: &mut SpinnerState, delta: f32) {
        let s = &self.settings;
        let next = state.accumulated_angle + state.angular_velocity * delta;
        if !s.use_rotation_limit {
            state.accumulated_angle = next;
            return;
        }
        let clamped = next.clamp(-s.max_right_rotation, s.max_left_rotation);
        if clamped != next {
            state.angular_velocity = 0.0;
        }
        state.accumulated_angle = clamped;
    }
}

impl Predicted for Spinner {
    type State = SpinnerState;

    fn initial_state(&self) -> SpinnerState {
        SpinnerState::default()
    }
}

impl SimulateWithInput for Spinner {
    type Input = SpinnerInput;
    type Context<'a> = SpinnerContext<'a>;

    fn sanitize_input(&self, input: &mut SpinnerInput) {
        input.rotation_direction = if input.rotation_direction.is_finite() {
            input.rotation_direction.clamp(-1.0, 1.0)
        } else {
            0.0
        };
    }

    fn extrapolate_input(&self, input: &mut SpinnerInput) {
        input.brake = false;
    }

    fn simulate(
        &self,
        input: &SpinnerInput,
        state: &mut SpinnerState,
        ctx: &mut SpinnerContext<'_>,
        delta: f32,
    ) {
        state.state_duration += delta;

        if state.state_type == SpinnerStateType::Dead && ctx.can_respawn {
            state.respawn_timer = (state.respawn_timer - delta).max(0.0);
            if state.respawn_timer <= 0.0 {
                Self::enter(state, SpinnerStateType::Active);
            }
        }

        let mut input = if state.state_type == SpinnerStateType::Active {
            *input
        } else {
            SpinnerInput::default()
        };
        self.sanitize_input(&mut input);

        state.angular_velocity = self.next_angular_velocity(state.angular_velocity, &input, delta);
        self.apply_rotation_limit(state, delta);

        ctx.body.set_angular_velocity(
            ctx.id,
            Vec3::new(0.0, state.angular_velocity.to_radians(), 0.0),
        );
        state.current_angle = normalize_degrees(ctx.body.yaw_degrees(ctx.id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::physics::{Body, BodyKind, BodyTable};

    const ARM: EntityId = EntityId(5);

    fn bodies() -> BodyTable {
        let mut table = BodyTable::default();
        table.insert(ARM, Body::new(BodyKind::Dynamic, Vec3::ZERO, 0.0));
        table
    }

    fn active_state(angular_velocity: f32) -> SpinnerState {
        SpinnerState {
            angular_velocity,
            state_type: SpinnerStateType::Active,
            ..SpinnerState::default()
        }
    }

    #[test]
    fn test_brake_floors_at_zero() {
        let spinner = Spinner::new(&SpinnerSettings {
            brake_deceleration: 2000.0,
            ..SpinnerSettings::default()
        });
        let mut body = bodies();
        let mut state = active_state(100.0);
        let input = SpinnerInput {
            rotation_direction: 0.0,
            brake: true,
        };
        spinner.simulate(
            &input,
            &mut state,
            &mut SpinnerContext {
                id: ARM,
                body: &mut body,
                can_respawn: true,
            },
            0.1,
        );
        assert_eq!(state.angular_velocity, 0.0);
        assert_eq!(body.angular_velocity(ARM), Vec3::ZERO);
    }

    #[test]
    fn test_acceleration_clamped_to_max() {
        let spinner = Spinner::new(&SpinnerSettings::default());
        let mut body = bodies();
        let mut ctx = SpinnerContext {
            id: ARM,
            body: &mut body,
            can_respawn: true,
        };
        let mut state = active_state(0.0);
        let input = SpinnerInput {
            rotation_direction: 1.0,
            brake: false,
        };
        for _ in 0..200 {
            spinner.simulate(&input, &mut state, &mut ctx, 1.0 / 60.0);
            assert!(state.angular_velocity <= 720.0);
        }
        assert_eq!(state.angular_velocity, 720.0);
        let rad = ctx.body.angular_velocity(ARM).y;
        assert!((rad - 720f32.to_radians()).abs() < 1e-4);
    }

    #[test]
    fn test_natural_decay_without_input() {
        let spinner = Spinner::new(&SpinnerSettings::default());
        let next = spinner.next_angular_velocity(-300.0, &SpinnerInput::default(), 0.5);
        assert_eq!(next, -200.0);
        let next = spinner.next_angular_velocity(-50.0, &SpinnerInput::default(), 0.5);
        assert_eq!(next, 0.0);
    }

    #[test]
    fn test_input_overrides_brake() {
        let spinner = Spinner::new(&SpinnerSettings::default());
        let input = SpinnerInput {
            rotation_direction: -0.5,
            brake: true,
        };
        assert_eq!(spinner.next_angular_velocity(0.0, &input, 0.1), -50.0);
    }

    #[test]
    fn test_sanitize_and_extrapolate() {
        let spinner = Spinner::new(&SpinnerSettings::default());
        let mut input = SpinnerInput {
            rotation_direction: 7.0,
            brake: true,
        };
        spinner.sanitize_input(&mut input);
        spinner.extrapolate_input(&mut input);
        assert_eq!(input.rotation_direction, 1.0);
        assert!(!input.brake);

        input.rotation_direction = f32::NAN;
        spinner.sanitize_input(&mut input);
        assert_eq!(input.rotation_direction, 0.0);
    }

    #[test]
    fn test_idle_spinner_ignores_input() {
        let spinner = Spinner::new(&SpinnerSettings::default());
        let mut body = bodies();
        let mut state = spinner.initial_state();
        spinner.simulate(
            &SpinnerInput {
                rotation_direction: 1.0,
                brake: false,
            },
            &mut state,
            &mut SpinnerContext {
                id: ARM,
                body: &mut body,
                can_respawn: true,
            },
            0.1,
        );
        assert_eq!(state.angular_velocity, 0.0);
        assert_eq!(state.state_type, SpinnerStateType::Idle);
    }

    #[test]
    fn test_lifecycle_idle_active_dead_active() {
        let spinner = Spinner::new(&SpinnerSettings {
            respawn_time: 1.0,
            ..SpinnerSettings::default()
        });
        let mut body = bodies();
        let mut ctx = SpinnerContext {
            id: ARM,
            body: &mut body,
            can_respawn: true,
        };
        let mut state = spinner.initial_state();

        spinner.kill(&mut state);
        assert_eq!(state.state_type, SpinnerStateType::Idle);

        spinner.activate(&mut state);
        assert_eq!(state.state_type, SpinnerStateType::Active);

        spinner.kill(&mut state);
        assert_eq!(state.state_type, SpinnerStateType::Dead);
        assert_eq!(state.respawn_timer, 1.0);

        spinner.simulate(&SpinnerInput::default(), &mut state, &mut ctx, 0.5);
        assert_eq!(state.state_type, SpinnerStateType::Dead);
        spinner.simulate(&SpinnerInput::default(), &mut state, &mut ctx, 0.5);
        assert_eq!(state.state_type, SpinnerStateType::Active);
        assert_eq!(state.state_duration, 0.0);
    }

    #[test]
    fn test_dead_core_blocks_respawn() {
        let spinner = Spinner::new(&SpinnerSettings {
            respawn_time: 0.1,
            ..SpinnerSettings::default()
        });
        let mut body = bodies();
        let mut state = active_state(300.0);
        spinner.kill(&mut state);
        for _ in 0..10 {
            spinner.simulate(
                &SpinnerInput::default(),
                &mut state,
                &mut SpinnerContext {
                    id: ARM,
                    body: &mut body,
                    can_respawn: false,
                },
                0.1,
            );
        }
        assert_eq!(state.state_type, SpinnerStateType::Dead);
        assert_eq!(state.respawn_timer, 0.1);
        // Still spins down: 300 - 10 * 200 * 0.1
        assert!((state.angular_velocity - 100.0).abs() < 1e-3);
    }

    #[test]
    fn test_rotation_limit_stops_at_bound() {
        let spinner = Spinner::new(&SpinnerSettings {
            use_rotation_limit: true,
            max_left_rotation: 90.0,
            max_right_rotation: 45.0,
            ..SpinnerSettings::default()
        });
        let mut body = bodies();
        let mut ctx = SpinnerContext {
            id: ARM,
            body: &mut body,
            can_respawn: true,
        };
        let mut state = active_state(0.0);
        let input = SpinnerInput {
            rotation_direction: 1.0,
            brake: false,
        };
        for _ in 0..120 {
            spinner.simulate(&input, &mut state, &mut ctx, 1.0 / 60.0);
            assert!(state.accumulated_angle <= 90.0);
        }
        assert_eq!(state.accumulated_angle, 90.0);
    }

    #[test]
    fn test_current_angle_read_from_body() {
        let spinner = Spinner::new(&SpinnerSettings::default());
        let mut body = bodies();
        body.insert(ARM, Body::new(BodyKind::Dynamic, Vec3::ZERO, 200.0));
        let mut state = active_state(0.0);
        spinner.simulate(
            &SpinnerInput::default(),
            &mut state,
            &mut SpinnerContext {
                id: ARM,
                body: &mut body,
                can_respawn: true,
            },
            1.0 / 60.0,
        );
        assert!((state.current_angle + 160.0).abs() < 1e-4);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn angular_velocity_stays_clamped(
                start in -5000.0f32..5000.0,
                direction in -10.0f32..10.0,
                brake in proptest::bool::ANY,
                delta in 0.0f32..0.5,
            ) {
                let spinner = Spinner::new(&SpinnerSettings::default());
                let mut body = bodies();
                let mut state = active_state(start);
                let input = SpinnerInput {
                    rotation_direction: direction,
                    brake,
                };
                spinner.simulate(
                    &input,
                    &mut state,
                    &mut SpinnerContext {
                        id: ARM,
                        body: &mut body,
                        can_respawn: true,
                    },
                    delta,
                );
                prop_assert!(state.angular_velocity.abs() <= 720.0);
            }

            #[test]
            fn brake_settles_at_exactly_zero(
                start in -720.0f32..720.0,
                delta in 0.001f32..1.0,
            ) {
                let spinner = Spinner::new(&SpinnerSettings::default());
                let input = SpinnerInput {
                    rotation_direction: 0.0,
                    brake: true,
                };
                let step = spinner.settings().brake_deceleration * delta;
                let limit = (start.abs() / step).ceil() as usize + 2;

                let mut angular_velocity = start;
                let mut steps = 0;
                while angular_velocity != 0.0 {
                    let next = spinner.next_angular_velocity(angular_velocity, &input, delta);
                    prop_assert!(next.abs() <= angular_velocity.abs());
                    prop_assert!(next * angular_velocity >= 0.0);
                    angular_velocity = next;
                    steps += 1;
                    prop_assert!(steps <= limit);
                }
                prop_assert_eq!(spinner.next_angular_velocity(0.0, &input, delta), 0.0);
            }
        }
    }
}
