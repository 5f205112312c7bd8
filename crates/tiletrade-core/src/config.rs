//! Simulation tuning.
//!
//! Every field has a default; JSON files only need to name the values they
//! override.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading a configuration file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Step schedule for station reservation prices.
///
/// Claims 1-4 of a station kind add `small_step`, claims 5-7 add
/// `medium_step`, claims 8 and later add `large_step`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PriceSchedule {
    pub initial_price: f64,
    pub small_step: f64,
    pub medium_step: f64,
    pub large_step: f64,
    /// Claims whose price would exceed this are refused
    pub price_ceiling: f64,
}

impl Default for PriceSchedule {
    fn default() -> Self {
        Self {
            initial_price: 5.0,
            small_step: 0.5,
            medium_step: 1.0,
            large_step: 2.0,
            price_ceiling: 50.0,
        }
    }
}

impl PriceSchedule {
    /// Increment applied by the `nth` claim of a kind (1-based)
    pub fn step(&self, nth: u32) -> f64 {
        match nth {
            0..=4 => self.small_step,
            5..=7 => self.medium_step,
            _ => self.large_step,
        }
    }
}

/// Simulation parameters. Distances are world units, times are seconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimConfig {
    pub tile_size: f32,
    pub agent_speed: f32,
    /// Distance from a tile center at which an agent can work it
    pub interact_range: f32,
    /// Units a worker moves per pick-up
    pub carry_capacity: i32,
    pub harvest_time: f32,
    pub consume_time: f32,
    pub build_time: f64,
    pub tree_regen_time: f64,
    /// Minimum time between two purchases of one buyer
    pub purchase_interval: f64,
    /// Accumulated (rate-weighted) seconds before fresh stock rots
    pub rot_threshold: f32,
    pub damage_threshold: f32,
    pub separation_radius: f32,
    pub separation_strength: f32,
    pub mood_duration: f64,
    pub message_duration: f64,
    pub bailout_interval: f64,
    pub starting_money: f64,
    pub player_money: f64,
    pub starting_reputation: f32,
    /// Buyers pay up to this multiple of their table's claim price
    pub demand_markup: f64,
    pub fresh_reputation: f32,
    pub wasted_reputation_penalty: f32,
    /// Extra reputation for fresh sales in a room with seating
    pub seating_bonus: f32,
    pub grand_opening_bonus: f32,
    pub pricing: PriceSchedule,
    pub seed: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tile_size: 32.0,
            agent_speed: 64.0,
            interact_range: 48.0,
            carry_capacity: 4,
            harvest_time: 2.0,
            consume_time: 3.0,
            build_time: 5.0,
            tree_regen_time: 30.0,
            purchase_interval: 30.0,
            rot_threshold: 60.0,
            damage_threshold: 100.0,
            separation_radius: 12.0,
            separation_strength: 0.5,
            mood_duration: 5.0,
            message_duration: 4.0,
            bailout_interval: 10.0,
            starting_money: 100.0,
            player_money: 500.0,
            starting_reputation: 50.0,
            demand_markup: 2.0,
            fresh_reputation: 1.0,
            wasted_reputation_penalty: 10.0,
            seating_bonus: 2.0,
            grand_opening_bonus: 5.0,
            pricing: PriceSchedule::default(),
            seed: 7,
        }
    }
}

impl SimConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }
}
