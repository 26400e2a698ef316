//! Reward, termination and info stages

use std::collections::BTreeMap;

use crate::simulation::state::State;

/// Episode statistics keyed by name
pub type Info = BTreeMap<String, f64>;

/// Constant per-step reward
#[derive(Debug, Clone, Copy)]
pub struct RewardStage {
    step_penalty: f32,
}

impl RewardStage {
    pub fn new(step_penalty: f32) -> Self {
        Self { step_penalty }
    }

    pub fn advance(&self, _state: &State) -> f32 {
        self.step_penalty
    }
}

/// Episode ends on success or when time runs out
#[derive(Debug, Clone, Copy, Default)]
pub struct DoneStage;

impl DoneStage {
    pub fn advance(&self, state: &State) -> bool {
        state.success || state.time_remaining == 0
    }
}

/// Summary statistics emitted on the terminal step
#[derive(Debug, Clone)]
pub struct InfoStage {
    n_lines: usize,
    level: u32,
    evaluating: bool,
    initial_time: u32,
    /// Time the same episode would get in training
    training_budget: u32,
}

impl InfoStage {
    pub fn new(
        n_lines: usize,
        level: u32,
        evaluating: bool,
        initial_time: u32,
        training_budget: u32,
    ) -> Self {
        Self {
            n_lines,
            level,
            evaluating,
            initial_time,
            training_budget,
        }
    }

    pub fn advance(&self, state: &State, done: bool) -> Info {
        let mut info = Info::new();
        if !done {
            return info;
        }

        let success = f64::from(u8::from(state.success));
        info.insert("success".into(), success);
        info.insert(format!("len-{} success", self.n_lines), success);
        info.insert("len(instruction)".into(), self.n_lines as f64);
        info.insert("curriculum+success".into(), f64::from(self.level) + success);

        if self.evaluating {
            let elapsed = self.initial_time.saturating_sub(state.time_remaining);
            let train_time_success = state.success && elapsed <= self.training_budget;
            info.insert(
                "train_time_success".into(),
                f64::from(u8::from(train_time_success)),
            );
            info.insert(
                "normalized_elapsed_time".into(),
                f64::from(elapsed) / f64::from(self.initial_time.max(1)),
            );

            let bucket = 10 * (self.n_lines / 10);
            for key in ["success", "train_time_success", "normalized_elapsed_time"] {
                if let Some(value) = info.get(key).copied() {
                    info.insert(format!("{}{}", key, bucket), value);
                }
            }
        }
        info
    }
}
