pub mod config;
pub mod error;
pub mod types;

pub use config::{CurriculumSetting, EnvConfig, LineCountSpace, Settings};
pub use error::{EnvError, Result};
pub use types::{Coord, Movement};
