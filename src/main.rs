//! Build Order - Interactive Play
//!
//! Drives one environment from stdin so episodes can be played and
//! inspected by hand. Each command is translated into the raw actions a
//! policy would emit.

use build_order_env::command::{RawAction, Target, NUM_TARGETS};
use build_order_env::core::error::{EnvError, Result};
use build_order_env::core::types::Coord;
use build_order_env::core::Settings;
use build_order_env::env::{Env, Step};
use build_order_env::world::Worker;

use clap::Parser;
use std::io::{self, Write};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "build-order-env")]
#[command(about = "Play build-order episodes interactively")]
struct Args {
    /// TOML settings file (env and curriculum tables)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the environment seed
    #[arg(long)]
    seed: Option<u64>,

    /// Use the evaluation time budget
    #[arg(long, default_value_t = false)]
    evaluating: bool,

    /// Log construction and destruction events
    #[arg(long, default_value_t = false)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = if args.verbose {
        "build_order_env=debug"
    } else {
        "build_order_env=info"
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut settings = match &args.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    if let Some(seed) = args.seed {
        settings.env.random_seed = seed;
    }

    let mut env = Env::new(settings.env, settings.curriculum)?;
    env.set_evaluating(args.evaluating);
    env.reset()?;

    println!("\n=== BUILD ORDER ===");
    println!();
    println!("Commands:");
    println!("  <worker> <target>          - Send a worker to gather (target 0 minerals, 1 gas)");
    println!("  <worker> <target> <i> <j>  - Send a worker to build target at (i, j)");
    println!("  ptr <n>                    - Set the instruction pointer");
    println!("  deps                       - Show the dependency forest");
    println!("  reset / r                  - Start a new episode");
    println!("  quit / q                   - Exit");
    println!();
    print_targets();

    let mut ptr = 0;
    loop {
        if let Some(view) = env.render() {
            println!("{}", view);
        }
        if let Some(state) = env.state() {
            let stockpile = state.world.stockpile.counts();
            println!(
                "Minerals: {}  Gas: {}  Time remaining: {}",
                stockpile[0], stockpile[1], state.time_remaining
            );
        }

        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();

        if input.is_empty() {
            continue;
        }
        if input == "quit" || input == "q" {
            break;
        }
        if input == "reset" || input == "r" {
            env.reset()?;
            continue;
        }
        if input == "deps" {
            print_dependencies(&env);
            continue;
        }
        if let Some(value) = input.strip_prefix("ptr ") {
            match value.trim().parse::<usize>() {
                Ok(p) if p < env.curriculum().max_lines => ptr = p,
                _ => println!("Usage: ptr <0..{}>", env.curriculum().max_lines),
            }
            continue;
        }

        let raws = match parse_command(input, env.config().world_size, ptr) {
            Ok(raws) => raws,
            Err(message) => {
                println!("{}", message);
                continue;
            }
        };

        for raw in raws {
            match env.step(raw) {
                Ok(step) if step.done => {
                    report(&step);
                    env.reset()?;
                    break;
                }
                Ok(_) => {}
                Err(EnvError::FailedEpisode { seed }) => {
                    println!("Episode {} failed; replay it with --seed", seed);
                    env.reset()?;
                    break;
                }
                Err(e) => {
                    println!("Rejected: {}", e);
                    break;
                }
            }
        }
    }

    println!("\nSuccess average: {:.3}", env.success_average());
    Ok(())
}

/// Translate `<worker> <target> [i j]` into raw actions
fn parse_command(
    input: &str,
    world_size: usize,
    ptr: usize,
) -> std::result::Result<Vec<RawAction>, String> {
    let values: Vec<usize> = input
        .split_whitespace()
        .map(|v| v.parse::<usize>().map_err(|e| format!("{}: {}", v, e)))
        .collect::<std::result::Result<_, _>>()?;

    let (worker, target, location) = match values.as_slice() {
        [w, t] => (*w, *t, None),
        [w, t, i, j] => (*w, *t, Some((*i, *j))),
        _ => return Err("Usage: <worker> <target> [i j]".into()),
    };

    let worker = worker
        .checked_sub(1)
        .and_then(Worker::from_index)
        .ok_or_else(|| format!("Worker must be 1..={}", Worker::ALL.len()))?;
    let target = Target::from_index(target)
        .ok_or_else(|| format!("Target must be 0..{}", NUM_TARGETS))?;

    let mut raws = vec![RawAction::select_worker_target(worker, target, ptr)];
    match (target.needs_location(), location) {
        (true, Some((i, j))) if i < world_size && j < world_size => {
            let coord = Coord::new(i as i32, j as i32);
            raws.push(RawAction::select_location(coord, world_size, ptr));
        }
        (true, Some(_)) => return Err(format!("i and j must be below {}", world_size)),
        (true, None) => return Err("Must specify i/j for buildings.".into()),
        (false, _) => {}
    }
    Ok(raws)
}

fn report(step: &Step) {
    let outcome = if step.info.get("success") == Some(&1.0) {
        "SUCCESS"
    } else {
        "FAILED"
    };
    println!("\nEpisode finished: {}", outcome);
    match serde_json::to_string_pretty(&step.info) {
        Ok(json) => println!("{}", json),
        Err(e) => println!("Could not encode info: {}", e),
    }
}

fn print_targets() {
    let names: Vec<String> = (0..NUM_TARGETS)
        .filter_map(|idx| Target::from_index(idx).map(|t| format!("{}={}", idx, t)))
        .collect();
    println!("Targets: {}", names.join(", "));
    println!();
}

fn print_dependencies(env: &Env) {
    let Some(dependencies) = env.dependencies() else {
        return;
    };
    for (building, dependency) in dependencies.pairs() {
        match dependency {
            Some(d) => println!("  {} <- {}", building, d),
            None => println!("  {}", building),
        }
    }
}
