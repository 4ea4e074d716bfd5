//! A cancellable, multi-stage integer pipeline with a time-windowed aggregator.
//!
//! Values enter through a rendezvous channel, pass two filter stages, and are
//! collected by an aggregator that keeps the newest values in a fixed-size
//! ring buffer and flushes them downstream on a timer.
//!
//! # Features
//!
//! - One thread per stage, connected by zero-capacity crossbeam channels so a
//!   slow consumer throttles every producer upstream of it
//! - Overwrite-oldest ring buffer with atomic flush
//! - Broadcast shutdown: one trigger wakes every waiting stage, later triggers
//!   are no-ops
//! - Per-stage metrics: received, forwarded, discarded, overwritten, flushes
//! - Builder pattern for custom chains
//!
//! # Example
//!
//! ```no_run
//! use windowed_pipeline::{Pipeline, PipelineConfig};
//!
//! # fn main() -> windowed_pipeline::Result<()> {
//! let mut running = Pipeline::standard(&PipelineConfig::default())?.start()?;
//! let input = running.take_input().expect("input is available once");
//!
//! for value in [-2, 3, 4, 9, 0, 6] {
//!     let _ = input.send(value);
//! }
//! drop(input);
//!
//! let (values, _reports) = running.drain()?;
//! assert_eq!(values, vec![3, 9, 6]);
//! # Ok(())
//! # }
//! ```

pub mod aggregator;
pub mod buffer;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod shutdown;
pub mod source;
pub mod stage;

/// A value flowing through the pipeline
pub type Value = i64;

// Re-exports for convenience
pub use aggregator::AggregatorStage;
pub use buffer::RingBuffer;
pub use config::{PipelineConfig, DEFAULT_BUFFER_SIZE, DEFAULT_FLUSH_INTERVAL};
pub use error::{InputError, PipelineError, Result};
pub use metrics::{MetricsSnapshot, StageMetrics};
pub use pipeline::{Pipeline, PipelineBuilder, RunningPipeline, StageReport};
pub use shutdown::Shutdown;
pub use source::{parse_value, LineSource, SourceReport};
pub use stage::{
    is_non_negative, keep_multiple_of_three_excluding_zero, FilterStage, Stage, StageContext,
    StageExit,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
