//! Procedural task generation: dependency forest and instruction lines

pub mod dependencies;
pub mod lines;

pub use dependencies::{build_dependencies, Dependencies};
pub use lines::{build_lines, Line};
