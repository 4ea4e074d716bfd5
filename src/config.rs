use crate::error::{PipelineError, Result};
use std::time::Duration;

/// Ring buffer capacity used when none is given
pub const DEFAULT_BUFFER_SIZE: usize = 5;

/// Flush period used when none is given
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(5);

/// Settings for the standard pipeline, fixed for the lifetime of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Capacity of the aggregator's ring buffer
    pub buffer_size: usize,
    /// Period of the aggregator's flush timer
    pub flush_interval: Duration,
}

impl PipelineConfig {
    /// Set the ring buffer capacity
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    /// Set the flush period
    pub fn with_flush_interval(mut self, flush_interval: Duration) -> Self {
        self.flush_interval = flush_interval;
        self
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.buffer_size == 0 {
            return Err(PipelineError::InvalidConfig(
                "buffer_size must be greater than zero".into(),
            ));
        }
        if self.flush_interval.is_zero() {
            return Err(PipelineError::InvalidConfig(
                "flush_interval must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.buffer_size, 5);
        assert_eq!(config.flush_interval, Duration::from_secs(5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_buffer_rejected() {
        let config = PipelineConfig::default().with_buffer_size(0);
        assert!(matches!(
            config.validate(),
            Err(PipelineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let config = PipelineConfig::default().with_flush_interval(Duration::ZERO);
        assert!(matches!(
            config.validate(),
            Err(PipelineError::InvalidConfig(_))
        ));
    }
}
