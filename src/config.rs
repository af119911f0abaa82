//! Tunable game parameters, read from an optional JSON file.
//!
//! Any field missing from the file keeps its default, so `{}` is a valid
//! config and so is a file that only overrides `"seed"`.

use std::fs;
use std::path::Path;
use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Deserialize;

use crate::error::{GameError, GameResult};
use crate::types::VISIBILITY_RADIUS;

/// How many of each scattered tile a loaded map receives.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Placement {
    pub traps: usize,
    pub chests: usize,
    pub heal_spots: usize,
    pub trap_doors: usize,
}

impl Default for Placement {
    fn default() -> Self {
        Self {
            traps: 6,
            chests: 6,
            heal_spots: 3,
            trap_doors: 1,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Period of every enemy's timer
    pub enemy_tick_ms: u64,
    pub visibility_radius: u32,
    /// Wait before a heal spot starts healing
    pub heal_grace_ms: u64,
    pub heal_tick_ms: u64,
    /// How long chest outcomes hold the input loop
    pub status_pause_ms: u64,
    pub trap_damage: u8,
    pub key_chance_percent: u32,
    pub seed: Option<u64>,
    pub placement: Placement,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            enemy_tick_ms: 1000,
            visibility_radius: VISIBILITY_RADIUS,
            heal_grace_ms: 3000,
            heal_tick_ms: 1000,
            status_pause_ms: 3000,
            trap_damage: 3,
            key_chance_percent: 30,
            seed: None,
            placement: Placement::default(),
        }
    }
}

impl GameConfig {
    pub fn load(path: &Path) -> GameResult<Self> {
        let text = fs::read_to_string(path).map_err(|source| GameError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> GameResult<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values the timers cannot run with.
    pub fn validate(&self) -> GameResult<()> {
        let periods = [("enemy_tick_ms", self.enemy_tick_ms), ("heal_tick_ms", self.heal_tick_ms)];
        for (field, value) in periods {
            if value == 0 {
                return Err(GameError::InvalidConfig {
                    field,
                    reason: "must be greater than zero",
                });
            }
        }
        Ok(())
    }

    pub fn enemy_period(&self) -> Duration {
        Duration::from_millis(self.enemy_tick_ms)
    }

    pub fn heal_grace(&self) -> Duration {
        Duration::from_millis(self.heal_grace_ms)
    }

    pub fn heal_period(&self) -> Duration {
        Duration::from_millis(self.heal_tick_ms)
    }

    pub fn status_pause(&self) -> Duration {
        Duration::from_millis(self.status_pause_ms)
    }

    /// Random source for stream `stream`; a fixed seed makes every stream
    /// reproducible while keeping enemies independent of one another.
    pub fn rng(&self, stream: u64) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(stream)),
            None => StdRng::from_entropy(),
        }
    }
}
