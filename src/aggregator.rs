//! Time-windowed batching stage.
//!
//! Every value from upstream lands in a [`RingBuffer`]; a repeating tick drains
//! it downstream. On cancellation or end of input the buffer is drained one
//! last time before the output closes.

use crate::buffer::RingBuffer;
use crate::metrics::StageMetrics;
use crate::stage::{Stage, StageContext, StageExit};
use crate::Value;
use crossbeam::channel::{tick, Sender};
use crossbeam::select;
use std::time::Duration;
use tracing::{debug, trace};

/// Last stage of a pipeline: buffers values and emits them in timed batches
pub struct AggregatorStage {
    name: String,
    buffer: RingBuffer,
    flush_interval: Duration,
}

impl AggregatorStage {
    /// Create an aggregator with a ring buffer of `buffer_size` values
    pub fn new(name: impl Into<String>, buffer_size: usize, flush_interval: Duration) -> Self {
        Self {
            name: name.into(),
            buffer: RingBuffer::new(buffer_size),
            flush_interval,
        }
    }

    /// Handle to the stage's buffer
    pub fn buffer(&self) -> &RingBuffer {
        &self.buffer
    }

    /// Drain the buffer downstream, one blocking handoff per value.
    fn emit(&self, output: &Sender<Value>, metrics: &StageMetrics) -> Result<(), StageExit> {
        let batch = self.buffer.flush();
        if batch.is_empty() {
            return Ok(());
        }

        debug!(stage = %self.name, len = batch.len(), "flushing batch");
        metrics.record_flush();
        for value in batch {
            output
                .send(value)
                .map_err(|_| StageExit::DownstreamClosed)?;
            metrics.record_forwarded();
        }
        Ok(())
    }
}

impl Stage for AggregatorStage {
    fn run(self: Box<Self>, ctx: StageContext) -> StageExit {
        let StageContext {
            input,
            output,
            shutdown,
            metrics,
        } = ctx;
        // tick() keeps at most one pending tick, so a slow flush never queues a backlog
        let ticker = tick(self.flush_interval);

        let exit = loop {
            select! {
                recv(input) -> msg => match msg {
                    Ok(value) => {
                        metrics.record_received();
                        if let Some(evicted) = self.buffer.push(value) {
                            trace!(stage = %self.name, evicted, "ring buffer full, dropped oldest");
                            metrics.record_overwritten();
                        }
                    }
                    Err(_) => break StageExit::UpstreamClosed,
                },
                recv(ticker) -> _ => {
                    if let Err(exit) = self.emit(&output, &metrics) {
                        break exit;
                    }
                },
                recv(shutdown.receiver()) -> _ => break StageExit::Cancelled,
            }
        };

        let exit = match exit {
            StageExit::DownstreamClosed => exit,
            _ => self.emit(&output, &metrics).err().unwrap_or(exit),
        };
        debug!(stage = %self.name, ?exit, "aggregator stage stopped");
        exit
    }

    fn name(&self) -> &str {
        &self.name
    }
}
