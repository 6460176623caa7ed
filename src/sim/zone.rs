//! Teleport zones and their color pairing
//!
//! A zone on the left side and a zone on the right side that share a color
//! form a bidirectional pair. Peers may discover zones in any order, so each
//! side is sorted by `(color, z, x)` before anything is indexed.

use std::cmp::Ordering;
use std::collections::HashMap;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::entity::EntityId;
use super::shuffle::shuffle_colors;
use crate::error::ConfigError;
use crate::settings::ZoneLayout;

/// Pair identifier; one zone per side carries each color
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TeleportColorId {
    Red,
    Blue,
    Yellow,
    Green,
    Purple,
}

impl TeleportColorId {
    pub const ALL: [TeleportColorId; 5] = [
        TeleportColorId::Red,
        TeleportColorId::Blue,
        TeleportColorId::Yellow,
        TeleportColorId::Green,
        TeleportColorId::Purple,
    ];

    /// Display color (linear RGB)
    pub fn rgb(self) -> [f32; 3] {
        match self {
            TeleportColorId::Red => [1.0, 0.0, 0.0],
            TeleportColorId::Blue => [0.2, 0.4, 1.0],
            TeleportColorId::Yellow => [1.0, 0.92, 0.016],
            TeleportColorId::Green => [0.0, 1.0, 0.0],
            TeleportColorId::Purple => [0.6, 0.2, 0.9],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TeamSide {
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeleportZone {
    pub id: EntityId,
    pub side: TeamSide,
    pub position: Vec3,
    pub exit_position: Vec3,
    pub exit_forward: Vec3,
    pub color: TeleportColorId,
}

impl TeleportZone {
    pub fn from_layout(id: EntityId, layout: &ZoneLayout) -> Self {
        Self {
            id,
            side: layout.side,
            position: layout.position,
            exit_position: layout.exit_position,
            exit_forward: layout.exit_forward,
            color: layout.color,
        }
    }
}

/// Result of a successful teleport request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TeleportExit {
    pub exit_zone: EntityId,
    pub position: Vec3,
    pub velocity: Vec3,
}

fn zone_order(a: &TeleportZone, b: &TeleportZone) -> Ordering {
    a.color
        .cmp(&b.color)
        .then_with(|| a.position.z.total_cmp(&b.position.z))
        .then_with(|| a.position.x.total_cmp(&b.position.x))
}

/// Sorted zones per side plus the derived pairing
#[derive(Debug, Clone, Default)]
pub struct ZoneRegistry {
    left: Vec<TeleportZone>,
    right: Vec<TeleportZone>,
    original_left: Vec<TeleportColorId>,
    original_right: Vec<TeleportColorId>,
    /// color -> (left, right)
    pairing: HashMap<TeleportColorId, (EntityId, EntityId)>,
    /// zone -> partner
    partner: HashMap<EntityId, EntityId>,
    /// zone -> slot in its side's list; fixed once collected
    index: HashMap<EntityId, (TeamSide, usize)>,
    /// Shuffle seed the current colors were derived from (0 = original colors)
    applied_seed: u32,
}

impl ZoneRegistry {
    /// Collect placed zones, fix their order and build the initial pairing
    pub fn collect(zones: impl IntoIterator<Item = TeleportZone>) -> Self {
        let mut registry = Self::default();
        for zone in zones {
            match zone.side {
                TeamSide::Left => registry.left.push(zone),
                TeamSide::Right => registry.right.push(zone),
            }
        }
        registry.left.sort_by(zone_order);
        registry.right.sort_by(zone_order);
        let slots = |zones: &[TeleportZone], side: TeamSide| {
            zones
                .iter()
                .enumerate()
                .map(move |(slot, zone)| (zone.id, (side, slot)))
                .collect::<Vec<_>>()
        };
        let mut index = slots(&registry.left, TeamSide::Left);
        index.extend(slots(&registry.right, TeamSide::Right));
        registry.index = index.into_iter().collect();

        registry.original_left = registry.left.iter().map(|z| z.color).collect();
        registry.original_right = registry.right.iter().map(|z| z.color).collect();

        registry.build_pairing();
        log::info!(
            "Collected teleport zones: {} left, {} right, {} pairs",
            registry.left.len(),
            registry.right.len(),
            registry.pairing.len()
        );
        registry
    }

    /// Zones in stable order
    pub fn zones(&self, side: TeamSide) -> &[TeleportZone] {
        match side {
            TeamSide::Left => &self.left,
            TeamSide::Right => &self.right,
        }
    }

    pub fn zone(&self, id: EntityId) -> Option<&TeleportZone> {
        let &(side, slot) = self.index.get(&id)?;
        self.zones(side).get(slot)
    }

    pub fn original_colors(&self, side: TeamSide) -> &[TeleportColorId] {
        match side {
            TeamSide::Left => &self.original_left,
            TeamSide::Right => &self.original_right,
        }
    }

    pub fn colors(&self, side: TeamSide) -> Vec<TeleportColorId> {
        self.zones(side).iter().map(|z| z.color).collect()
    }

    pub fn applied_seed(&self) -> u32 {
        self.applied_seed
    }

    pub fn pair_for_color(&self, color: TeleportColorId) -> Option<(EntityId, EntityId)> {
        self.pairing.get(&color).copied()
    }

    /// Rebuild the color pairing from the current zone colors
    pub fn build_pairing(&mut self) {
        self.pairing.clear();
        self.partner.clear();

        let first_per_color = |zones: &[TeleportZone], side: TeamSide| {
            let mut map: HashMap<TeleportColorId, EntityId> = HashMap::new();
            for zone in zones {
                if map.contains_key(&zone.color) {
                    log::warn!(
                        "Duplicate {:?} teleport zone on {:?} side ({:?} left unpaired)",
                        zone.color,
                        side,
                        zone.id
                    );
                    continue;
                }
                map.insert(zone.color, zone.id);
            }
            map
        };

        let left = first_per_color(&self.left, TeamSide::Left);
        let right = first_per_color(&self.right, TeamSide::Right);

        for (color, left_id) in left {
            if let Some(&right_id) = right.get(&color) {
                self.pairing.insert(color, (left_id, right_id));
                self.partner.insert(left_id, right_id);
                self.partner.insert(right_id, left_id);
            }
        }
    }

    /// Partner zone sharing this zone's color on the other side
    pub fn paired_zone(&self, id: EntityId) -> Option<&TeleportZone> {
        let partner = self.partner.get(&id)?;
        self.zone(*partner)
    }

    /// Exit placement for a puck entering `entry` at `entry_speed`
    ///
    /// `None` when the entry zone has no partner.
    pub fn try_teleport(&self, entry: EntityId, entry_speed: f32) -> Option<TeleportExit> {
        let exit = self.paired_zone(entry)?;
        let velocity = exit.exit_forward.normalize_or_zero() * entry_speed;
        log::debug!(
            "Teleport {:?} -> {:?} ({:?}) speed={:.2}",
            entry,
            exit.id,
            exit.color,
            entry_speed
        );
        Some(TeleportExit {
            exit_zone: exit.id,
            position: exit.exit_position,
            velocity,
        })
    }

    /// Overwrite one side's colors; the whole side is rejected on a length mismatch
    pub fn apply_colors(
        &mut self,
        side: TeamSide,
        colors: &[TeleportColorId],
    ) -> Result<(), ConfigError> {
        let zones = match side {
            TeamSide::Left => &mut self.left,
            TeamSide::Right => &mut self.right,
        };
        if zones.len() != colors.len() {
            return Err(ConfigError::ZoneCountMismatch {
                side,
                zones: zones.len(),
                colors: colors.len(),
            });
        }
        for (zone, &color) in zones.iter_mut().zip(colors) {
            zone.color = color;
        }
        Ok(())
    }

    /// Recolor every zone from a shuffle seed and rebuild the pairing
    ///
    /// Always starts from the collected colors, so the same seed gives the
    /// same layout no matter how often it is applied.
    pub fn apply_shuffle_seed(&mut self, seed: u32) {
        let (left, right) = shuffle_colors(&self.original_left, &self.original_right, seed);
        for (side, colors) in [(TeamSide::Left, left), (TeamSide::Right, right)] {
            if let Err(e) = self.apply_colors(side, &colors) {
                log::error!("Shuffle apply skipped: {}", e);
            }
        }
        self.build_pairing();
        self.applied_seed = seed;
    }

    /// Return every zone to its collected color
    pub fn restore_original_colors(&mut self) {
        let left = self.original_left.clone();
        let right = self.original_right.clone();
        for (side, colors) in [(TeamSide::Left, left), (TeamSide::Right, right)] {
            if let Err(e) = self.apply_colors(side, &colors) {
                log::error!("Color restore skipped: {}", e);
            }
        }
        self.build_pairing();
        self.applied_seed = 0;
    }
}
