//! Episode layer: reset/step interface, observation encoding and
//! per-episode signals

pub mod episode;
pub mod failure_buffer;
pub mod observation;
pub mod signals;

pub use episode::{Env, Step};
pub use failure_buffer::FailureBuffer;
pub use observation::{Observation, ObservationEncoder, ObservationShape};
pub use signals::{DoneStage, Info, InfoStage, RewardStage};
