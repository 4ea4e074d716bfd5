use std::num::ParseIntError;
use thiserror::Error;

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors that can occur while building or running a pipeline
#[derive(Error, Debug)]
pub enum PipelineError {
    /// No stages in pipeline
    #[error("Cannot start pipeline with no stages")]
    NoStages,

    /// Configuration error
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A stage thread could not be spawned
    #[error("Failed to spawn stage thread: {0}")]
    Spawn(#[from] std::io::Error),

    /// Thread join error
    #[error("Thread join error: {0}")]
    ThreadError(String),
}

/// Errors produced while turning raw input lines into values.
///
/// None of these are fatal: the offending line is dropped and reading
/// continues with the next one.
#[derive(Error, Debug)]
pub enum InputError {
    #[error("not an integer: {line:?}")]
    Parse {
        line: String,
        #[source]
        source: ParseIntError,
    },

    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),
}
