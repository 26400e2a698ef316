use thiserror::Error;

#[derive(Error, Debug)]
pub enum EnvError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Instruction generation failed: {0}")]
    Generation(String),

    #[error("Object placement failed: {0}")]
    Placement(String),

    #[error("Invalid action: {0}")]
    InvalidAction(String),

    #[error("Compound action is not complete")]
    IncompleteAction,

    #[error("step() called before reset()")]
    NotReset,

    #[error("Episode is over, call reset()")]
    EpisodeOver,

    #[error("Episode with seed {seed} ended without success")]
    FailedEpisode { seed: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, EnvError>;
