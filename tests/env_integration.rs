//! Integration tests for the episode layer
//!
//! These tests exercise `Env` through its public reset/step interface:
//! - Reset/step contract and error cases
//! - Partial compound actions holding time and world state
//! - Terminal info keys in training and evaluation
//! - Failure-buffer replay and break-on-fail

use build_order_env::command::{RawAction, Target};
use build_order_env::core::{CurriculumSetting, EnvConfig, EnvError, LineCountSpace, Settings};
use build_order_env::env::{Env, FailureBuffer, Step};
use build_order_env::world::{Building, Resource, Worker};

fn gather_minerals() -> RawAction {
    RawAction::select_worker_target(Worker::A, Target::Resource(Resource::Minerals), 0)
}

fn single_line() -> CurriculumSetting {
    CurriculumSetting {
        max_lines: 1,
        n_lines: LineCountSpace::new(1, 1),
        ..CurriculumSetting::default()
    }
}

/// Reset until the starting state is not already solved
fn reset_unsolved(env: &mut Env) {
    for seed in 0..100 {
        env.reset_from_seed(seed).unwrap();
        if !env.state().unwrap().success {
            return;
        }
    }
    panic!("every seed starts solved");
}

/// Gather until the episode ends, returning the terminal step and the count
fn play_out(env: &mut Env) -> (Step, usize) {
    let mut steps = 1;
    let mut step = env.step(gather_minerals()).unwrap();
    while !step.done {
        step = env.step(gather_minerals()).unwrap();
        steps += 1;
    }
    (step, steps)
}

// ============================================================================
// Reset / step contract
// ============================================================================

#[test]
fn test_reset_observation_shapes() {
    let mut env = Env::new(EnvConfig::default(), CurriculumSetting::default()).unwrap();
    let obs = env.reset().unwrap();
    let shape = env.observation_shape();

    assert_eq!(obs.grid.len(), shape.grid.iter().product::<usize>());
    assert_eq!(obs.lines.len(), shape.lines[0]);
    assert_eq!(obs.line_mask.len(), shape.lines[0]);
    assert_eq!(obs.resources, vec![0, 0]);
    assert_eq!(obs.next_actions.len(), shape.next_actions);
    assert_eq!(obs.action_mask.len(), shape.action_mask);
    assert_eq!(obs.partial_action.len(), shape.partial_action);

    let n_lines = env.lines().unwrap().len();
    assert_eq!(obs.line_mask.iter().filter(|m| !**m).count(), n_lines);
    assert_eq!(env.action_nvec(), [20, 2, shape.action_mask, 10]);
}

#[test]
fn test_step_requires_reset() {
    let mut env = Env::new(EnvConfig::default(), CurriculumSetting::default()).unwrap();
    assert!(matches!(env.step(gather_minerals()), Err(EnvError::NotReset)));
}

#[test]
fn test_invalid_config_rejected() {
    let config = EnvConfig {
        world_size: 1,
        ..EnvConfig::default()
    };
    assert!(matches!(
        Env::new(config, CurriculumSetting::default()),
        Err(EnvError::InvalidConfig(_))
    ));
}

#[test]
fn test_invalid_curriculum_rejected() {
    let mut env = Env::new(EnvConfig::default(), CurriculumSetting::default()).unwrap();
    let bad = CurriculumSetting {
        max_lines: 3,
        n_lines: LineCountSpace::new(1, 5),
        ..CurriculumSetting::default()
    };
    assert!(env.set_curriculum(bad).is_err());
    assert_eq!(env.curriculum(), &CurriculumSetting::default());
}

#[test]
fn test_episodes_reproducible_from_env_seed() {
    let config = EnvConfig {
        random_seed: 11,
        destroy_building_prob: 0.1,
        num_initial_buildings: 4,
        ..EnvConfig::default()
    };
    let mut a = Env::new(config.clone(), CurriculumSetting::default()).unwrap();
    let mut b = Env::new(config, CurriculumSetting::default()).unwrap();

    for _ in 0..3 {
        assert_eq!(a.reset().unwrap(), b.reset().unwrap());
        let (step_a, n_a) = play_out(&mut a);
        let (step_b, n_b) = play_out(&mut b);
        assert_eq!(step_a, step_b);
        assert_eq!(n_a, n_b);
    }
}

// ============================================================================
// Partial actions
// ============================================================================

#[test]
fn test_partial_action_holds_world_and_time() {
    let mut env = Env::new(EnvConfig::default(), CurriculumSetting::default()).unwrap();
    reset_unsolved(&mut env);
    let before = env.state().unwrap().clone();

    let raw = RawAction::select_worker_target(Worker::B, Target::Building(Building::Pylon), 0);
    let step = env.step(raw).unwrap();
    let after = env.state().unwrap();

    assert_eq!(after.time_remaining, before.time_remaining);
    assert_eq!(after.world, before.world);
    assert!(!step.done);
    assert_eq!(step.observation.partial_action, vec![2, 4, 0, 0]);
    // The location class is now active: one legal value per cell
    let size = EnvConfig::default().world_size;
    assert_eq!(
        step.observation.action_mask.iter().filter(|m| **m).count(),
        size * size
    );

    // A closed gate commits nothing either
    let step = env.step(RawAction::hold(0)).unwrap();
    assert_eq!(env.state().unwrap().time_remaining, before.time_remaining);
    assert_eq!(step.observation.partial_action, vec![2, 4, 0, 0]);
}

#[test]
fn test_completed_building_command_ticks_once() {
    let mut env = Env::new(EnvConfig::default(), CurriculumSetting::default()).unwrap();
    reset_unsolved(&mut env);
    let start = env.state().unwrap().time_remaining;

    let size = env.config().world_size;
    let location = build_order_env::core::types::Coord::new(0, 0);
    env.step(RawAction::select_worker_target(
        Worker::C,
        Target::Building(Building::Pylon),
        0,
    ))
    .unwrap();
    let step = env.step(RawAction::select_location(location, size, 0)).unwrap();

    assert_eq!(env.state().unwrap().time_remaining, start - 1);
    assert_eq!(step.observation.partial_action, vec![3, 4, 1, 1]);
}

// ============================================================================
// Terminal info
// ============================================================================

#[test]
fn test_training_episode_info() {
    let config = EnvConfig {
        time_per_line: 2,
        ..EnvConfig::default()
    };
    let mut curriculum = single_line();
    curriculum.level = 3;
    let mut env = Env::new(config, curriculum).unwrap();
    env.reset().unwrap();
    let budget = env.state().unwrap().time_remaining as usize;
    assert_eq!(budget, 4);

    let (step, steps) = play_out(&mut env);
    let success = step.info["success"];

    assert!(steps <= budget);
    if success == 0.0 {
        assert_eq!(steps, budget);
        assert_eq!(env.state().unwrap().time_remaining, 0);
    }
    assert_eq!(step.info["len-1 success"], success);
    assert_eq!(step.info["len(instruction)"], 1.0);
    assert_eq!(step.info["curriculum+success"], 3.0 + success);
    assert_eq!(step.info["success_without_failure_buf"], success);
    assert_eq!(step.info["use_failure_buf"], 0.0);
    assert!(step.info.contains_key("reward_without_failure_buf"));
    assert!(!step.info.contains_key("train_time_success"));
    assert!(!step.info.contains_key("len(failure_buffer)"));

    assert!(matches!(env.step(gather_minerals()), Err(EnvError::EpisodeOver)));
}

#[test]
fn test_evaluation_episode_info() {
    let config = EnvConfig {
        eval_steps: 20,
        ..EnvConfig::default()
    };
    let mut env = Env::new(config, single_line()).unwrap();
    env.set_evaluating(true);
    env.reset().unwrap();
    assert_eq!(env.state().unwrap().time_remaining, 19);

    let (step, _) = play_out(&mut env);
    for key in ["train_time_success", "normalized_elapsed_time"] {
        assert!(step.info.contains_key(key), "missing {}", key);
    }
    assert_eq!(step.info["success0"], step.info["success"]);
    assert_eq!(step.info["train_time_success0"], step.info["train_time_success"]);
    assert!(step.info["train_time_success"] <= step.info["success"]);
    let elapsed = step.info["normalized_elapsed_time"];
    assert!((0.0..=1.0).contains(&elapsed));
}

#[test]
fn test_success_average_moves_toward_outcomes() {
    let mut env = Env::new(EnvConfig::default(), single_line()).unwrap();
    assert_eq!(env.success_average(), 0.5);

    env.reset().unwrap();
    let (step, _) = play_out(&mut env);
    let expected = 0.5 + 0.05 * (step.info["success"] - 0.5);
    assert!((env.success_average() - expected).abs() < 1e-12);
}

// ============================================================================
// Failure buffer
// ============================================================================

fn buffered_config(tgt_success_rate: f64) -> EnvConfig {
    EnvConfig {
        use_failure_buffer: true,
        failure_buffer_capacity: 8,
        tgt_success_rate,
        assimilator_prob: 0.0,
        ..EnvConfig::default()
    }
}

#[test]
fn test_failed_seed_replayed() {
    // A target rate of zero replays whenever the buffer holds a seed
    let mut env = Env::new(buffered_config(0.0), single_line()).unwrap();

    let mut checked = false;
    for _ in 0..20 {
        env.reset().unwrap();
        let seed = env.episode_seed().unwrap();
        let (step, _) = play_out(&mut env);
        if step.info["success"] == 1.0 {
            continue;
        }
        assert_eq!(step.info["len(failure_buffer)"], 1.0);

        env.reset().unwrap();
        assert_eq!(env.episode_seed(), Some(seed));
        let (replayed, _) = play_out(&mut env);
        assert_eq!(replayed.info["use_failure_buf"], 1.0);
        assert!(!replayed.info.contains_key("success_without_failure_buf"));
        assert!(!replayed.info.contains_key("reward_without_failure_buf"));
        checked = true;
        break;
    }
    assert!(checked);
}

#[test]
fn test_failures_not_buffered_in_evaluation() {
    let mut env = Env::new(buffered_config(0.75), single_line()).unwrap();
    env.set_evaluating(true);
    for _ in 0..5 {
        env.reset().unwrap();
        play_out(&mut env);
    }
    assert_eq!(env.failure_buffer().map(FailureBuffer::len), Some(0));
}

#[test]
fn test_shared_failure_buffer() {
    let shared = FailureBuffer::new(16);
    let mut env = Env::new(buffered_config(0.75), single_line())
        .unwrap()
        .with_failure_buffer(shared.clone());

    let mut failures = 0;
    for _ in 0..10 {
        env.reset().unwrap();
        let (step, _) = play_out(&mut env);
        if step.info["success"] == 0.0 {
            failures += 1;
        }
    }
    // The success average cannot climb from 0.5 past the 0.75 target in ten
    // episodes, so nothing is drawn back out for replay
    assert!(failures > 0);
    assert_eq!(shared.len(), failures);
    assert_eq!(env.failure_buffer().map(FailureBuffer::len), Some(failures));
}

#[test]
fn test_break_on_fail_reports_seed() {
    let config = EnvConfig {
        break_on_fail: true,
        assimilator_prob: 0.0,
        ..EnvConfig::default()
    };
    let mut env = Env::new(config, single_line()).unwrap();

    for _ in 0..20 {
        env.reset().unwrap();
        loop {
            match env.step(gather_minerals()) {
                Ok(step) if step.done => break,
                Ok(_) => {}
                Err(EnvError::FailedEpisode { seed }) => {
                    assert_eq!(Some(seed), env.episode_seed());
                    return;
                }
                Err(e) => panic!("unexpected error: {}", e),
            }
        }
    }
    panic!("no failing episode in 20 tries");
}

// ============================================================================
// Configuration file
// ============================================================================

#[test]
fn test_sample_config_matches_defaults() {
    let settings = Settings::parse_toml(include_str!("../config/env.toml")).unwrap();
    assert_eq!(settings, Settings::default());
}
