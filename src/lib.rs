//! Build Order - grid-world construction environment for reinforcement learning

pub mod command;
pub mod core;
pub mod env;
pub mod instructions;
pub mod simulation;
pub mod world;
