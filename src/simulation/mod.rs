//! Simulation core: per-tick world updates driven by worker commands

pub mod state;
pub mod tick;

pub use state::{State, TickEvent};
pub use tick::TurnSimulator;
