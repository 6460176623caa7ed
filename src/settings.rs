//! Match settings
//!
//! Read-only configuration shared by every entity of a match. Loaded from
//! JSON (partial files fall back to defaults field by field) and validated
//! once before the first tick.

use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::sim::zone::{TeamSide, TeleportColorId};

/// Puck velocity law, damage and teleport tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PuckSettings {
    /// Speed cap
    pub max_speed: f32,
    /// Minimum speed held while `maintain_constant_speed` is on
    pub constant_speed: f32,
    /// Linear deceleration when not maintaining constant speed
    pub friction: f32,
    pub maintain_constant_speed: bool,
    /// Fraction of speed kept on a wall bounce (friction mode only)
    pub wall_bounce_retention: f32,

    // === Damage ===
    /// Minimum speed that deals damage
    pub damage_threshold: f32,
    pub damage_multiplier: f32,
    pub max_damage: f32,

    /// Seconds before the puck can teleport again
    pub teleport_cooldown: f32,
}

impl Default for PuckSettings {
    fn default() -> Self {
        Self {
            max_speed: 30.0,
            constant_speed: 5.0,
            friction: 0.5,
            maintain_constant_speed: true,
            wall_bounce_retention: 0.95,

            damage_threshold: 10.0,
            damage_multiplier: 1.0,
            max_damage: 1.0,

            teleport_cooldown: 0.5,
        }
    }
}

/// Spinner rotation and arm impact tuning (angles in degrees)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpinnerSettings {
    /// deg/s
    pub max_angular_velocity: f32,
    /// deg/s²
    pub angular_acceleration: f32,
    /// Decay with no input, deg/s²
    pub natural_deceleration: f32,
    /// Decay while braking, deg/s²
    pub brake_deceleration: f32,

    // === Rotation limit ===
    pub use_rotation_limit: bool,
    /// Furthest counter-clockwise travel from spawn (positive degrees)
    pub max_left_rotation: f32,
    /// Furthest clockwise travel from spawn (positive degrees)
    pub max_right_rotation: f32,

    // === Arms ===
    pub arm_length: f32,
    pub arm_width: f32,
    pub impact_multiplier: f32,
    pub max_impact_velocity: f32,

    /// Seconds spent dead before respawning
    pub respawn_time: f32,
}

impl Default for SpinnerSettings {
    fn default() -> Self {
        Self {
            max_angular_velocity: 720.0,
            angular_acceleration: 1000.0,
            natural_deceleration: 200.0,
            brake_deceleration: 2000.0,

            use_rotation_limit: false,
            max_left_rotation: 180.0,
            max_right_rotation: 180.0,

            arm_length: 2.0,
            arm_width: 0.5,
            impact_multiplier: 2.0,
            max_impact_velocity: 50.0,

            respawn_time: 3.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthSettings {
    pub max_health: f32,
}

impl Default for HealthSettings {
    fn default() -> Self {
        Self { max_health: 100.0 }
    }
}

/// Teleport color shuffle timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeleportSettings {
    pub shuffle_enabled: bool,
    /// Seconds between shuffles
    pub shuffle_interval: f32,
    /// Seconds before the first shuffle of a round
    pub initial_delay: f32,
    /// Seed of the shuffle seed stream
    pub shuffle_rng_seed: u32,
}

impl Default for TeleportSettings {
    fn default() -> Self {
        Self {
            shuffle_enabled: true,
            shuffle_interval: 15.0,
            initial_delay: 15.0,
            shuffle_rng_seed: 12345,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpawnPoint {
    pub position: Vec3,
    pub yaw_degrees: f32,
}

/// Round life-cycle tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoundSettings {
    /// Connected players needed to leave the lobby phase
    pub required_players: usize,
    /// Countdown before spawning, seconds
    pub start_delay: f32,
    /// Spawn points, used round-robin by player index
    pub spawn_points: Vec<SpawnPoint>,
    pub puck_spawn: Vec3,
    /// Seed of the puck's idle-redirect RNG
    pub puck_seed: u32,
}

impl Default for RoundSettings {
    fn default() -> Self {
        Self {
            required_players: 2,
            start_delay: 3.0,
            spawn_points: vec![
                SpawnPoint {
                    position: Vec3::new(-6.0, 0.0, 0.0),
                    yaw_degrees: 90.0,
                },
                SpawnPoint {
                    position: Vec3::new(6.0, 0.0, 0.0),
                    yaw_degrees: -90.0,
                },
            ],
            puck_spawn: Vec3::new(0.0, 0.25, 0.0),
            puck_seed: 0x5EED,
        }
    }
}

/// A teleport zone placed in the arena
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneLayout {
    pub side: TeamSide,
    pub color: TeleportColorId,
    pub position: Vec3,
    /// Where the puck reappears when this zone is the exit
    pub exit_position: Vec3,
    /// Exit launch direction (any length; normalized on use)
    pub exit_forward: Vec3,
}

/// A static wall plane bounding the arena
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WallLayout {
    pub position: Vec3,
    /// Points into the arena
    pub normal: Vec3,
}

/// How a reflector redirects the puck
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReflectorKind {
    /// Mirror bounce pulled toward `center`; never slows the puck
    Corner {
        /// 1.0 = plain reflection
        reflection_strength: f32,
        center_pull: f32,
        center: Vec3,
    },
    /// Sends the puck along a fixed heading
    Diagonal {
        forward: Vec3,
        /// Degrees about +Y applied to `forward`
        angle_offset: f32,
        velocity_multiplier: f32,
        min_reflect_speed: f32,
    },
}

impl ReflectorKind {
    pub fn corner() -> Self {
        ReflectorKind::Corner {
            reflection_strength: 1.2,
            center_pull: 5.0,
            center: Vec3::ZERO,
        }
    }

    pub fn diagonal(forward: Vec3) -> Self {
        ReflectorKind::Diagonal {
            forward,
            angle_offset: 0.0,
            velocity_multiplier: 1.1,
            min_reflect_speed: 5.0,
        }
    }
}

/// A static obstacle that redirects the puck
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReflectorLayout {
    pub position: Vec3,
    pub kind: ReflectorKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaLayout {
    pub zones: Vec<ZoneLayout>,
    pub walls: Vec<WallLayout>,
    pub reflectors: Vec<ReflectorLayout>,
}

impl Default for ArenaLayout {
    fn default() -> Self {
        use TeleportColorId::*;

        let mut zones = Vec::new();
        for (i, color) in [Red, Blue, Yellow].into_iter().enumerate() {
            let z = (i as f32 - 1.0) * 4.0;
            zones.push(ZoneLayout {
                side: TeamSide::Left,
                color,
                position: Vec3::new(-10.0, 0.0, z),
                exit_position: Vec3::new(-9.0, 0.0, z),
                exit_forward: Vec3::new(10.0, 0.0, 0.0),
            });
            zones.push(ZoneLayout {
                side: TeamSide::Right,
                color,
                position: Vec3::new(10.0, 0.0, z),
                exit_position: Vec3::new(9.0, 0.0, z),
                exit_forward: Vec3::new(-10.0, 0.0, 0.0),
            });
        }
        let walls = vec![
            WallLayout {
                position: Vec3::new(-12.0, 0.0, 0.0),
                normal: Vec3::X,
            },
            WallLayout {
                position: Vec3::new(12.0, 0.0, 0.0),
                normal: Vec3::NEG_X,
            },
            WallLayout {
                position: Vec3::new(0.0, 0.0, -8.0),
                normal: Vec3::Z,
            },
            WallLayout {
                position: Vec3::new(0.0, 0.0, 8.0),
                normal: Vec3::NEG_Z,
            },
        ];
        let reflectors = [(-11.0, -7.0), (11.0, -7.0), (-11.0, 7.0), (11.0, 7.0)]
            .into_iter()
            .map(|(x, z)| ReflectorLayout {
                position: Vec3::new(x, 0.0, z),
                kind: ReflectorKind::corner(),
            })
            .collect();
        Self {
            zones,
            walls,
            reflectors,
        }
    }
}

/// Complete match configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchSettings {
    pub puck: PuckSettings,
    pub spinner: SpinnerSettings,
    pub health: HealthSettings,
    pub teleport: TeleportSettings,
    pub round: RoundSettings,
    pub arena: ArenaLayout,
}

impl MatchSettings {
    /// Parse and validate settings from JSON
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load and validate settings from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let settings = Self::from_json_str(&json)?;
        log::info!("Loaded match settings from {}", path.display());
        Ok(settings)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject settings the simulation cannot clamp its way out of
    pub fn validate(&self) -> Result<(), ConfigError> {
        let puck = &self.puck;
        if puck.constant_speed < 0.0 || puck.max_speed <= 0.0 {
            return Err(ConfigError::invalid(
                "puck.max_speed",
                "speeds must be non-negative and max_speed positive",
            ));
        }
        if puck.constant_speed > puck.max_speed {
            return Err(ConfigError::invalid(
                "puck.constant_speed",
                format!(
                    "constant_speed {} exceeds max_speed {}",
                    puck.constant_speed, puck.max_speed
                ),
            ));
        }
        if !(puck.wall_bounce_retention > 0.0 && puck.wall_bounce_retention <= 1.0) {
            return Err(ConfigError::invalid(
                "puck.wall_bounce_retention",
                "must be in (0, 1]",
            ));
        }
        if puck.friction < 0.0 || puck.teleport_cooldown < 0.0 {
            return Err(ConfigError::invalid(
                "puck.friction",
                "friction and cooldown must be non-negative",
            ));
        }

        let spinner = &self.spinner;
        if spinner.max_angular_velocity <= 0.0 {
            return Err(ConfigError::invalid(
                "spinner.max_angular_velocity",
                "must be positive",
            ));
        }
        if spinner.angular_acceleration < 0.0
            || spinner.natural_deceleration < 0.0
            || spinner.brake_deceleration < 0.0
        {
            return Err(ConfigError::invalid(
                "spinner.angular_acceleration",
                "accelerations must be non-negative",
            ));
        }
        if spinner.max_left_rotation < 0.0 || spinner.max_right_rotation < 0.0 {
            return Err(ConfigError::invalid(
                "spinner.max_left_rotation",
                "rotation limits are positive magnitudes",
            ));
        }

        if self.health.max_health <= 0.0 {
            return Err(ConfigError::invalid("health.max_health", "must be positive"));
        }

        if self.teleport.shuffle_enabled && self.teleport.shuffle_interval <= 0.0 {
            return Err(ConfigError::invalid(
                "teleport.shuffle_interval",
                "must be positive when shuffling is enabled",
            ));
        }

        if self.round.required_players == 0 {
            return Err(ConfigError::invalid(
                "round.required_players",
                "at least one player is required",
            ));
        }
        if self.round.spawn_points.is_empty() {
            return Err(ConfigError::NoSpawnPoints);
        }

        if self
            .arena
            .walls
            .iter()
            .any(|w| w.normal.length_squared() < f32::EPSILON)
        {
            return Err(ConfigError::invalid(
                "arena.walls",
                "wall normals must be non-zero",
            ));
        }
        for reflector in &self.arena.reflectors {
            let valid = match reflector.kind {
                ReflectorKind::Corner {
                    reflection_strength,
                    center_pull,
                    ..
                } => reflection_strength >= 0.0 && center_pull >= 0.0,
                ReflectorKind::Diagonal {
                    forward,
                    velocity_multiplier,
                    min_reflect_speed,
                    ..
                } => {
                    forward.length_squared() >= f32::EPSILON
                        && velocity_multiplier >= 0.0
                        && min_reflect_speed >= 0.0
                }
            };
            if !valid {
                return Err(ConfigError::invalid(
                    "arena.reflectors",
                    format!(
                        "reflector at {:?} needs a non-zero heading and non-negative factors",
                        reflector.position
                    ),
                ));
            }
        }

        Ok(())
    }
}
