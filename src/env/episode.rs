//! Episode orchestration - reset/step interface over the turn simulator
//!
//! Each step runs the stages in order:
//! decode raw action -> (complete?) simulator tick -> observation ->
//! reward -> done -> info -> failure-buffer bookkeeping

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::command::compound::RawAction;
use crate::core::config::{CurriculumSetting, EnvConfig};
use crate::core::error::{EnvError, Result};
use crate::env::failure_buffer::FailureBuffer;
use crate::env::observation::{Observation, ObservationEncoder, ObservationShape};
use crate::env::signals::{DoneStage, Info, InfoStage, RewardStage};
use crate::instructions::dependencies::{build_dependencies, Dependencies};
use crate::instructions::lines::{build_lines, Line};
use crate::simulation::state::State;
use crate::simulation::tick::TurnSimulator;
use crate::world::placement::{place_objects, PlacementParams};

/// Success rate assumed before any episode has finished
const INITIAL_SUCCESS_AVERAGE: f64 = 0.5;

/// Rotation bound applied before replaying from the failure buffer
const MAX_BUFFER_ROTATION: usize = 10;

/// Result of one `Env::step`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub observation: Observation,
    pub reward: f32,
    pub done: bool,
    pub info: Info,
}

/// Everything generated for and mutated during one episode
#[derive(Debug, Clone)]
struct Episode {
    seed: u64,
    from_failure_buffer: bool,
    rng: ChaCha8Rng,
    dependencies: Dependencies,
    lines: Vec<Line>,
    /// Padded line count this episode was generated and encoded with
    max_lines: usize,
    simulator: TurnSimulator,
    state: State,
    encoder: ObservationEncoder,
    reward: RewardStage,
    done: DoneStage,
    info: InfoStage,
    finished: bool,
}

/// Build-order environment
pub struct Env {
    config: EnvConfig,
    curriculum: CurriculumSetting,
    rng: ChaCha8Rng,
    evaluating: bool,
    success_average: f64,
    failure_buffer: Option<FailureBuffer>,
    episode: Option<Episode>,
}

impl Env {
    pub fn new(config: EnvConfig, curriculum: CurriculumSetting) -> Result<Self> {
        config.validate()?;
        curriculum.validate()?;
        config.training_budget(curriculum.max_lines)?;

        let failure_buffer = config
            .use_failure_buffer
            .then(|| FailureBuffer::new(config.failure_buffer_capacity));
        let rng = ChaCha8Rng::seed_from_u64(config.random_seed);

        Ok(Self {
            config,
            curriculum,
            rng,
            evaluating: false,
            success_average: INITIAL_SUCCESS_AVERAGE,
            failure_buffer,
            episode: None,
        })
    }

    /// Share a failure buffer with other environments
    ///
    /// Has no effect unless `use_failure_buffer` is enabled.
    pub fn with_failure_buffer(mut self, buffer: FailureBuffer) -> Self {
        if self.config.use_failure_buffer {
            self.failure_buffer = Some(buffer);
        }
        self
    }

    pub fn config(&self) -> &EnvConfig {
        &self.config
    }

    pub fn curriculum(&self) -> &CurriculumSetting {
        &self.curriculum
    }

    /// Takes effect at the next reset
    ///
    /// The running episode keeps the `max_lines` it was generated with, both
    /// for its observation padding and for the action bounds `step` enforces.
    pub fn set_curriculum(&mut self, curriculum: CurriculumSetting) -> Result<()> {
        curriculum.validate()?;
        self.config.training_budget(curriculum.max_lines)?;
        tracing::info!(
            "Curriculum level {} ({}..={} lines, depth {})",
            curriculum.level,
            curriculum.n_lines.low,
            curriculum.n_lines.high,
            curriculum.max_build_tree_depth
        );
        self.curriculum = curriculum;
        Ok(())
    }

    /// Takes effect at the next reset
    pub fn set_evaluating(&mut self, evaluating: bool) {
        self.evaluating = evaluating;
    }

    pub fn is_evaluating(&self) -> bool {
        self.evaluating
    }

    /// Moving average of success over episodes not replayed from the buffer
    pub fn success_average(&self) -> f64 {
        self.success_average
    }

    pub fn failure_buffer(&self) -> Option<&FailureBuffer> {
        self.failure_buffer.as_ref()
    }

    /// Upper bounds of `[delta, dg, a, ptr]` for the next episode
    pub fn action_nvec(&self) -> [usize; 4] {
        RawAction::nvec(self.curriculum.max_lines, self.config.world_size)
    }

    pub fn observation_shape(&self) -> ObservationShape {
        ObservationShape::new(self.config.world_size, self.curriculum.max_lines)
    }

    /// Seed the current episode was generated from
    pub fn episode_seed(&self) -> Option<u64> {
        self.episode.as_ref().map(|e| e.seed)
    }

    pub fn state(&self) -> Option<&State> {
        self.episode.as_ref().map(|e| &e.state)
    }

    pub fn lines(&self) -> Option<&[Line]> {
        self.episode.as_ref().map(|e| e.lines.as_slice())
    }

    pub fn dependencies(&self) -> Option<&Dependencies> {
        self.episode.as_ref().map(|e| &e.dependencies)
    }

    /// Text view of the current episode
    pub fn render(&self) -> Option<String> {
        self.episode
            .as_ref()
            .map(|e| e.encoder.render(&e.state))
    }

    /// Start a new episode
    pub fn reset(&mut self) -> Result<Observation> {
        let replay = self.draw_replay();
        let from_failure_buffer = replay.is_some();
        let seed = match replay {
            Some(seed) => seed,
            None => self.rng.gen(),
        };
        self.reset_with_seed(seed, from_failure_buffer)
    }

    /// Start the episode identified by `seed`
    ///
    /// Regenerates the same dependencies, lines and world as any earlier
    /// episode with this seed under the same configuration.
    pub fn reset_from_seed(&mut self, seed: u64) -> Result<Observation> {
        self.reset_with_seed(seed, false)
    }

    fn reset_with_seed(&mut self, seed: u64, from_failure_buffer: bool) -> Result<Observation> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let curriculum = &self.curriculum;

        let dependencies = build_dependencies(&mut rng, curriculum.max_build_tree_depth);
        let lines = build_lines(&mut rng, &dependencies, curriculum)?;
        let world = place_objects(
            &mut rng,
            &PlacementParams {
                world_size: self.config.world_size,
                assimilator_prob: self.config.assimilator_prob,
                num_initial_buildings: self.config.num_initial_buildings,
            },
        )?;

        let training_budget = self.config.training_budget(lines.len())?;
        let time_remaining = if self.evaluating {
            self.config.eval_steps - 1
        } else {
            training_budget
        };

        let mut simulator = TurnSimulator::new(
            world,
            &lines,
            dependencies.clone(),
            time_remaining,
            self.config.destroy_building_prob,
        );
        let state = simulator.start(&mut rng);
        let encoder = ObservationEncoder::new(&lines, self.config.world_size, curriculum.max_lines);
        let observation = encoder.advance(&state);

        tracing::debug!(
            "Reset episode seed={} lines={} time={} replay={}",
            seed,
            lines.len(),
            time_remaining,
            from_failure_buffer
        );

        self.episode = Some(Episode {
            seed,
            from_failure_buffer,
            rng,
            info: InfoStage::new(
                lines.len(),
                curriculum.level,
                self.evaluating,
                time_remaining,
                training_budget,
            ),
            dependencies,
            lines,
            max_lines: curriculum.max_lines,
            simulator,
            state,
            encoder,
            reward: RewardStage::new(self.config.step_penalty),
            done: DoneStage,
            finished: false,
        });
        Ok(observation)
    }

    /// Pick a failed seed to replay, if the buffer is in use this episode
    ///
    /// Replays with probability `max(0, 1 - tgt_success_rate / success_average)`
    /// after rotating the queue by a random count below `min(10, len)`.
    fn draw_replay(&mut self) -> Option<u64> {
        if self.evaluating {
            return None;
        }
        let buffer = self.failure_buffer.as_ref()?;
        let size = buffer.len();
        if size == 0 {
            return None;
        }

        let use_prob = (1.0 - self.config.tgt_success_rate / self.success_average).max(0.0);
        if self.rng.gen::<f64>() >= use_prob {
            return None;
        }
        buffer.rotate(self.rng.gen_range(0..size.min(MAX_BUFFER_ROTATION)));
        buffer.try_take()
    }

    /// Feed one raw action
    ///
    /// Only a complete compound action ticks the simulator; partial actions
    /// update the decoder and leave time, buildings and stockpile untouched.
    pub fn step(&mut self, raw: RawAction) -> Result<Step> {
        let episode = self.episode.as_mut().ok_or(EnvError::NotReset)?;
        if episode.finished {
            return Err(EnvError::EpisodeOver);
        }

        let [max_delta, _, _, max_ptr] =
            RawAction::nvec(episode.max_lines, self.config.world_size);
        if raw.delta >= max_delta {
            return Err(EnvError::InvalidAction(format!(
                "delta {} out of range 0..{}",
                raw.delta, max_delta
            )));
        }
        if raw.ptr >= max_ptr {
            return Err(EnvError::InvalidAction(format!(
                "pointer {} out of range 0..{}",
                raw.ptr, max_ptr
            )));
        }

        let action = episode.state.action.update(raw)?;
        if action.is_op() {
            episode.state = episode.simulator.advance(&action, &mut episode.rng)?;
        } else {
            episode.state.action = action;
            episode.state.events.clear();
        }

        let state = &episode.state;
        let observation = episode.encoder.advance(state);
        let reward = episode.reward.advance(state);
        let done = episode.done.advance(state);
        let mut info = episode.info.advance(state, done);

        let from_failure_buffer = episode.from_failure_buffer;
        if !from_failure_buffer {
            info.insert("reward_without_failure_buf".into(), f64::from(reward));
        }

        if done {
            episode.finished = true;
            let success = state.success;
            let success_value = f64::from(u8::from(success));

            if !from_failure_buffer {
                info.insert("success_without_failure_buf".into(), success_value);
                self.success_average += self.config.alpha * (success_value - self.success_average);
            }

            let put_failure_buffer = !self.evaluating && !success;
            if let Some(buffer) = &self.failure_buffer {
                if put_failure_buffer && !buffer.try_put(episode.seed) {
                    tracing::debug!("Failure buffer full, dropped seed {}", episode.seed);
                }
                if from_failure_buffer || put_failure_buffer {
                    info.insert("len(failure_buffer)".into(), buffer.len() as f64);
                }
            }
            info.insert(
                "use_failure_buf".into(),
                f64::from(u8::from(from_failure_buffer)),
            );

            tracing::info!(
                "Episode seed={} finished: success={} lines={} time_remaining={}",
                episode.seed,
                success,
                episode.lines.len(),
                state.time_remaining
            );

            if self.config.break_on_fail && !success {
                tracing::error!(
                    "Episode seed={} failed\n{}",
                    episode.seed,
                    episode.encoder.render(state)
                );
                return Err(EnvError::FailedEpisode { seed: episode.seed });
            }
        }

        Ok(Step {
            observation,
            reward,
            done,
            info,
        })
    }
}
