//! Deterministic teleport color shuffle
//!
//! The shuffle timer and seed stream live in versioned state and tick like
//! any other simulated value. Applying a seed to the zones is idempotent, so
//! rollback and replay converge on the same colors; recoloring the visuals
//! is left to the view pass.

use serde::{Deserialize, Serialize};

use super::entity::Predicted;
use super::rng::SimRng;
use super::zone::TeleportColorId;
use crate::settings::TeleportSettings;

/// Fisher-Yates over a copy of `colors`, last index down to 1
fn shuffle_side(colors: &[TeleportColorId], rng: &mut SimRng) -> Vec<TeleportColorId> {
    let mut shuffled = colors.to_vec();
    if shuffled.len() <= 1 {
        return shuffled;
    }
    for i in (1..shuffled.len()).rev() {
        let j = rng.next_range(0, i as i32 + 1) as usize;
        shuffled.swap(i, j);
    }
    shuffled
}

/// Permute both sides' colors from one seed, left side first
///
/// Inputs are never modified; the same `(left, right, seed)` always yields
/// the same result.
pub fn shuffle_colors(
    left: &[TeleportColorId],
    right: &[TeleportColorId],
    seed: u32,
) -> (Vec<TeleportColorId>, Vec<TeleportColorId>) {
    let mut rng = SimRng::new(seed);
    let left = shuffle_side(left, &mut rng);
    let right = shuffle_side(right, &mut rng);
    (left, right)
}

/// Versioned shuffle timer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShuffleState {
    /// Seconds until the next reseed
    pub shuffle_timer: f32,
    pub rng: SimRng,
    /// Seed of the active layout; 0 means "original colors"
    pub current_seed: u32,
}

/// Tick-driven shuffle schedule
#[derive(Debug, Clone)]
pub struct TeleportShuffle {
    interval: f32,
    initial_delay: f32,
    enabled: bool,
    rng_seed: u32,
}

impl TeleportShuffle {
    pub fn new(settings: &TeleportSettings) -> Self {
        Self {
            interval: settings.shuffle_interval,
            initial_delay: settings.initial_delay,
            enabled: settings.shuffle_enabled,
            rng_seed: settings.shuffle_rng_seed,
        }
    }

    /// State for a round that is starting
    ///
    /// The opening layout is drawn immediately when shuffling is enabled, so
    /// a round never starts on the collected colors.
    pub fn start(&self) -> ShuffleState {
        let mut state = self.initial_state();
        if self.enabled {
            Self::draw_seed(&mut state);
        }
        state
    }

    // Zero is reserved for "unshuffled"
    fn draw_seed(state: &mut ShuffleState) {
        let mut seed = state.rng.next_u32();
        while seed == 0 {
            seed = state.rng.next_u32();
        }
        state.current_seed = seed;
    }

    /// Count down; when the timer lapses, draw the next seed
    ///
    /// Returns true on the tick a new seed was drawn.
    pub fn simulate(&self, state: &mut ShuffleState, delta: f32) -> bool {
        if !self.enabled {
            return false;
        }
        state.shuffle_timer -= delta;
        if state.shuffle_timer > 0.0 {
            return false;
        }
        state.shuffle_timer = self.interval;
        Self::draw_seed(state);
        true
    }
}

impl Predicted for TeleportShuffle {
    type State = ShuffleState;

    fn initial_state(&self) -> ShuffleState {
        ShuffleState {
            shuffle_timer: self.initial_delay,
            rng: SimRng::new(self.rng_seed),
            current_seed: 0,
        }
    }
}
