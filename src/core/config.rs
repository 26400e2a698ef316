//! Environment configuration with documented defaults
//!
//! `EnvConfig` is fixed for the lifetime of an `Env`. `CurriculumSetting` is
//! owned by the external curriculum controller and swapped between episodes.

use crate::core::error::{EnvError, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for a single environment instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvConfig {
    // === WORLD ===
    /// Side length of the square grid
    ///
    /// Must be at least 2 so the Nexus has room for both resource sites.
    pub world_size: usize,

    /// Probability that an Assimilator already stands on the gas site
    pub assimilator_prob: f64,

    /// Per-tick probability that each standing non-Nexus building is destroyed
    pub destroy_building_prob: f64,

    /// Random buildings placed before the first tick
    pub num_initial_buildings: usize,

    // === TIME ===
    /// Ticks granted per instruction line during training
    ///
    /// Episode budget is `(1 + lines) * time_per_line`.
    pub time_per_line: u32,

    /// Episode budget while evaluating (the first state already spends one)
    pub eval_steps: u32,

    // === REWARD ===
    /// Reward emitted on every step
    pub step_penalty: f32,

    // === SEEDING / DEBUG ===
    /// Seed for the environment RNG; each episode draws its own seed from it
    pub random_seed: u64,

    /// Halt with `EnvError::FailedEpisode` when an episode ends unsuccessfully
    ///
    /// Debug only. Leave off for headless training runs.
    pub break_on_fail: bool,

    // === FAILURE BUFFER ===
    /// Replay failed episode seeds
    pub use_failure_buffer: bool,

    /// Maximum number of buffered failed seeds
    pub failure_buffer_capacity: usize,

    /// Target success rate used to pace failure-buffer replay
    pub tgt_success_rate: f64,

    /// Smoothing factor for the success-rate moving average
    pub alpha: f64,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            world_size: 6,
            assimilator_prob: 0.5,
            destroy_building_prob: 0.0,
            num_initial_buildings: 0,
            time_per_line: 4,
            eval_steps: 500,
            step_penalty: -0.1,
            random_seed: 0,
            break_on_fail: false,
            use_failure_buffer: false,
            failure_buffer_capacity: 1000,
            tgt_success_rate: 0.75,
            alpha: 0.05,
        }
    }
}

impl EnvConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.world_size < 2 {
            return Err(EnvError::InvalidConfig(format!(
                "world_size ({}) must be at least 2",
                self.world_size
            )));
        }

        // Nexus and both resource sites are always occupied
        let free_cells = self.world_size * self.world_size - 3;
        if self.num_initial_buildings > free_cells {
            return Err(EnvError::InvalidConfig(format!(
                "num_initial_buildings ({}) exceeds free cells ({})",
                self.num_initial_buildings, free_cells
            )));
        }

        for (name, p) in [
            ("assimilator_prob", self.assimilator_prob),
            ("destroy_building_prob", self.destroy_building_prob),
            ("tgt_success_rate", self.tgt_success_rate),
            ("alpha", self.alpha),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(EnvError::InvalidConfig(format!(
                    "{} ({}) must lie in [0, 1]",
                    name, p
                )));
            }
        }

        if self.time_per_line == 0 || self.eval_steps < 2 {
            return Err(EnvError::InvalidConfig(
                "time_per_line must be positive and eval_steps at least 2".into(),
            ));
        }

        if self.use_failure_buffer && self.failure_buffer_capacity == 0 {
            return Err(EnvError::InvalidConfig(
                "failure_buffer_capacity must be positive when the buffer is enabled".into(),
            ));
        }

        Ok(())
    }

    /// Training time budget for an episode with `n_lines` instructions
    ///
    /// `(1 + n_lines) * time_per_line`, or `InvalidConfig` when that does not
    /// fit a `u32`.
    pub fn training_budget(&self, n_lines: usize) -> Result<u32> {
        u32::try_from(n_lines)
            .ok()
            .and_then(|n| n.checked_add(1))
            .and_then(|n| n.checked_mul(self.time_per_line))
            .ok_or_else(|| {
                EnvError::InvalidConfig(format!(
                    "time budget (1 + {}) * {} overflows",
                    n_lines, self.time_per_line
                ))
            })
    }
}

/// Inclusive uniform distribution over instruction counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineCountSpace {
    pub low: usize,
    pub high: usize,
}

impl LineCountSpace {
    pub fn new(low: usize, high: usize) -> Self {
        Self { low, high }
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        rng.gen_range(self.low..=self.high)
    }
}

/// Task-difficulty knobs supplied by the curriculum controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurriculumSetting {
    /// Padded length of the instruction observation
    pub max_lines: usize,
    /// Distribution of per-episode instruction counts
    pub n_lines: LineCountSpace,
    /// How many shuffled buildings may receive a dependency
    pub max_build_tree_depth: usize,
    /// Curriculum level, reported back through `info`
    pub level: u32,
}

impl Default for CurriculumSetting {
    fn default() -> Self {
        Self {
            max_lines: 10,
            n_lines: LineCountSpace::new(1, 10),
            max_build_tree_depth: 4,
            level: 0,
        }
    }
}

impl CurriculumSetting {
    pub fn validate(&self) -> Result<()> {
        if self.n_lines.low == 0 {
            return Err(EnvError::InvalidConfig(
                "instruction count must be positive".into(),
            ));
        }
        if self.n_lines.low > self.n_lines.high {
            return Err(EnvError::InvalidConfig(format!(
                "n_lines range {}..={} is empty",
                self.n_lines.low, self.n_lines.high
            )));
        }
        if self.n_lines.high > self.max_lines {
            return Err(EnvError::InvalidConfig(format!(
                "n_lines.high ({}) exceeds max_lines ({})",
                self.n_lines.high, self.max_lines
            )));
        }
        Ok(())
    }
}

/// Top-level settings file: `[env]` and `[curriculum]` tables
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub env: EnvConfig,
    pub curriculum: CurriculumSetting,
}

impl Settings {
    /// Load settings from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse_toml(&content)
    }

    /// Parse settings from a TOML string and validate them
    pub fn parse_toml(content: &str) -> Result<Self> {
        let settings: Settings = toml::from_str(content)?;
        settings.env.validate()?;
        settings.curriculum.validate()?;
        Ok(settings)
    }
}
