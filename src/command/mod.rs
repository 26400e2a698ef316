//! Worker command pipeline
//!
//! RawAction -> CompoundAction (possibly over several calls) -> Assignment
//! -> per-tick WorkerAction

pub mod compound;
pub mod resolver;

pub use compound::{ActionClass, CompoundAction, RawAction, Target, NUM_TARGETS};
pub use resolver::Assignment;
