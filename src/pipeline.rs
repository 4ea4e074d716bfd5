use crate::aggregator::AggregatorStage;
use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::metrics::{MetricsSnapshot, StageMetrics};
use crate::shutdown::Shutdown;
use crate::stage::{
    is_non_negative, keep_multiple_of_three_excluding_zero, FilterStage, Stage, StageContext,
    StageExit,
};
use crate::Value;
use crossbeam::channel::{bounded, Receiver, Sender};
use std::thread::{Builder, JoinHandle};
use std::time::Duration;
use tracing::{debug, warn};

/// Builder for constructing pipelines
pub struct PipelineBuilder {
    stages: Vec<Box<dyn Stage>>,
}

impl PipelineBuilder {
    /// Create a new pipeline builder
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    /// Append a stage to the end of the chain
    pub fn add_stage(mut self, stage: impl Stage) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    /// Append a [`FilterStage`] built from `predicate`
    pub fn add_filter<F>(self, name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(Value) -> bool + Send + 'static,
    {
        self.add_stage(FilterStage::new(name, predicate))
    }

    /// Append an [`AggregatorStage`]
    pub fn add_aggregator(
        self,
        name: impl Into<String>,
        buffer_size: usize,
        flush_interval: Duration,
    ) -> Self {
        self.add_stage(AggregatorStage::new(name, buffer_size, flush_interval))
    }

    /// Build the pipeline
    pub fn build(self) -> Result<Pipeline> {
        if self.stages.is_empty() {
            return Err(PipelineError::NoStages);
        }

        let metrics = self.stages.iter().map(|_| StageMetrics::new()).collect();
        Ok(Pipeline {
            stages: self.stages,
            metrics,
            shutdown: Shutdown::new(),
        })
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A chain of stages sharing one shutdown signal, not yet running
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
    metrics: Vec<StageMetrics>,
    shutdown: Shutdown,
}

impl Pipeline {
    /// non-negative filter → nonzero multiple-of-three filter → aggregator
    pub fn standard(config: &PipelineConfig) -> Result<Self> {
        config.validate()?;
        PipelineBuilder::new()
            .add_filter("non_negative", is_non_negative)
            .add_filter("multiple_of_three", keep_multiple_of_three_excluding_zero)
            .add_aggregator("aggregator", config.buffer_size, config.flush_interval)
            .build()
    }

    /// Names of the stages, in pipeline order
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    /// Get metrics for a specific stage
    pub fn stage_metrics(&self, index: usize) -> Option<&StageMetrics> {
        self.metrics.get(index)
    }

    /// The signal every stage of this pipeline listens to
    pub fn shutdown_signal(&self) -> Shutdown {
        self.shutdown.clone()
    }

    /// Wire the stages with rendezvous channels and spawn one thread per stage
    pub fn start(self) -> Result<RunningPipeline> {
        let Pipeline {
            stages,
            metrics,
            shutdown,
        } = self;

        let (input, mut upstream) = bounded::<Value>(0);
        let mut workers: Vec<Worker> = Vec::with_capacity(stages.len());

        for (stage, metrics) in stages.into_iter().zip(metrics) {
            let (output, next_upstream) = bounded::<Value>(0);
            let name = stage.name().to_string();
            let ctx = StageContext {
                input: upstream,
                output,
                shutdown: shutdown.clone(),
                metrics: metrics.clone(),
            };

            let spawned = Builder::new().name(name.clone()).spawn(move || {
                debug!(stage = %stage.name(), "stage started");
                stage.run(ctx)
            });
            let handle = match spawned {
                Ok(handle) => handle,
                Err(err) => {
                    // Stop whatever is already running before reporting
                    shutdown.trigger();
                    for worker in workers {
                        let _ = worker.handle.join();
                    }
                    return Err(PipelineError::Spawn(err));
                }
            };

            workers.push(Worker {
                name,
                metrics,
                handle,
            });
            upstream = next_upstream;
        }

        Ok(RunningPipeline {
            input: Some(input),
            output: upstream,
            shutdown,
            workers,
        })
    }
}

struct Worker {
    name: String,
    metrics: StageMetrics,
    handle: JoinHandle<StageExit>,
}

/// Outcome of one stage after the pipeline has been joined
#[derive(Debug, Clone)]
pub struct StageReport {
    pub name: String,
    pub exit: StageExit,
    pub metrics: MetricsSnapshot,
}

/// A running pipeline that can be fed, drained, and shut down
pub struct RunningPipeline {
    input: Option<Sender<Value>>,
    output: Receiver<Value>,
    shutdown: Shutdown,
    workers: Vec<Worker>,
}

impl RunningPipeline {
    /// Take the sender feeding the first stage.
    ///
    /// Dropping every clone of it is end-of-stream for the pipeline.
    pub fn take_input(&mut self) -> Option<Sender<Value>> {
        self.input.take()
    }

    /// Receiver for the last stage's output
    pub fn output(&self) -> Receiver<Value> {
        self.output.clone()
    }

    /// The signal every running stage listens to
    pub fn shutdown_signal(&self) -> Shutdown {
        self.shutdown.clone()
    }

    /// Broadcast cancellation to every stage.
    ///
    /// Returns `false` if shutdown had already been triggered, in which case
    /// nothing happens.
    pub fn shutdown(&self) -> bool {
        self.shutdown.trigger()
    }

    /// Get metrics for a stage
    pub fn stage_metrics(&self, index: usize) -> Option<&StageMetrics> {
        self.workers.get(index).map(|worker| &worker.metrics)
    }

    /// Get a summary of all metrics
    pub fn metrics_summary(&self) -> String {
        let mut summary = String::from("Pipeline Metrics Summary:\n");
        for (i, worker) in self.workers.iter().enumerate() {
            summary.push_str(&format!(
                "  Stage {} ({}): {}\n",
                i,
                worker.name,
                worker.metrics.snapshot().format()
            ));
        }
        summary
    }

    /// Close the input, collect everything still emitted, then join.
    ///
    /// Returns once the last stage has closed its output, which happens after
    /// shutdown or after every input sender is dropped.
    pub fn drain(mut self) -> Result<(Vec<Value>, Vec<StageReport>)> {
        self.input = None;
        let values = self.output.iter().collect();
        let reports = self.wait()?;
        Ok((values, reports))
    }

    /// Close the input and this handle's output, then join every stage.
    ///
    /// Values still in flight go to other clones of [`output`](Self::output),
    /// or are dropped if there are none.
    pub fn wait(self) -> Result<Vec<StageReport>> {
        let RunningPipeline {
            input,
            output,
            shutdown: _,
            workers,
        } = self;
        drop(input);
        drop(output);

        let mut reports = Vec::with_capacity(workers.len());
        let mut panicked = None;
        for worker in workers {
            match worker.handle.join() {
                Ok(exit) => {
                    debug!(stage = %worker.name, ?exit, "stage joined");
                    reports.push(StageReport {
                        name: worker.name,
                        exit,
                        metrics: worker.metrics.snapshot(),
                    });
                }
                Err(_) => {
                    warn!(stage = %worker.name, "stage thread panicked");
                    panicked.get_or_insert(worker.name);
                }
            }
        }

        match panicked {
            Some(name) => Err(PipelineError::ThreadError(format!(
                "stage {name} panicked"
            ))),
            None => Ok(reports),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_builder() {
        let result = PipelineBuilder::new()
            .add_filter("stage1", |_| true)
            .add_filter("stage2", |_| true)
            .build();
        assert!(result.is_ok());
    }

    #[test]
    fn test_no_stages_error() {
        let result = PipelineBuilder::new().build();
        assert!(matches!(result, Err(PipelineError::NoStages)));
    }

    #[test]
    fn test_standard_stage_order() {
        let pipeline = Pipeline::standard(&PipelineConfig::default()).unwrap();
        assert_eq!(
            pipeline.stage_names(),
            vec!["non_negative", "multiple_of_three", "aggregator"]
        );
        assert!(pipeline.stage_metrics(2).is_some());
        assert!(pipeline.stage_metrics(3).is_none());
    }

    #[test]
    fn test_standard_rejects_invalid_config() {
        let config = PipelineConfig::default().with_buffer_size(0);
        assert!(matches!(
            Pipeline::standard(&config),
            Err(PipelineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_input_taken_once() {
        let mut running = PipelineBuilder::new()
            .add_filter("pass", |_| true)
            .build()
            .unwrap()
            .start()
            .unwrap();
        assert!(running.take_input().is_some());
        assert!(running.take_input().is_none());
        running.shutdown();
        running.wait().unwrap();
    }
}
