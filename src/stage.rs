use crate::metrics::StageMetrics;
use crate::shutdown::Shutdown;
use crate::Value;
use crossbeam::channel::{Receiver, Sender};
use crossbeam::select;
use tracing::debug;

/// Why a stage stopped running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageExit {
    /// The shared shutdown signal fired
    Cancelled,
    /// Every upstream sender was dropped
    UpstreamClosed,
    /// The downstream receiver was dropped
    DownstreamClosed,
}

/// Channels and shared state handed to a stage when its thread starts.
///
/// The stage owns `output`; dropping it when the stage returns is what closes
/// the downstream channel.
pub struct StageContext {
    pub input: Receiver<Value>,
    pub output: Sender<Value>,
    pub shutdown: Shutdown,
    pub metrics: StageMetrics,
}

/// Trait for a processing stage in the pipeline
pub trait Stage: Send + 'static {
    /// Run until cancelled or until either neighbour goes away.
    ///
    /// Called once, on the stage's own thread.
    fn run(self: Box<Self>, ctx: StageContext) -> StageExit;

    /// Get a human-readable name for this stage
    fn name(&self) -> &str {
        "stage"
    }
}

/// Keep only values >= 0
pub fn is_non_negative(value: Value) -> bool {
    value >= 0
}

/// Keep only nonzero multiples of three; everything else is dropped
pub fn keep_multiple_of_three_excluding_zero(value: Value) -> bool {
    value != 0 && value % 3 == 0
}

/// A filtering stage that forwards values matching a predicate
#[derive(Debug)]
pub struct FilterStage<F>
where
    F: Fn(Value) -> bool + Send + 'static,
{
    name: String,
    predicate: F,
}

impl<F> FilterStage<F>
where
    F: Fn(Value) -> bool + Send + 'static,
{
    /// Create a new filter stage
    pub fn new(name: impl Into<String>, predicate: F) -> Self {
        Self {
            name: name.into(),
            predicate,
        }
    }

    /// Check a single value against the predicate
    pub fn accepts(&self, value: Value) -> bool {
        (self.predicate)(value)
    }
}

impl<F> Stage for FilterStage<F>
where
    F: Fn(Value) -> bool + Send + 'static,
{
    fn run(self: Box<Self>, ctx: StageContext) -> StageExit {
        let StageContext {
            input,
            output,
            shutdown,
            metrics,
        } = ctx;

        let exit = loop {
            let value = select! {
                recv(input) -> msg => match msg {
                    Ok(value) => value,
                    Err(_) => break StageExit::UpstreamClosed,
                },
                recv(shutdown.receiver()) -> _ => break StageExit::Cancelled,
            };
            metrics.record_received();

            if !self.accepts(value) {
                metrics.record_discarded();
                continue;
            }

            // The handoff blocks until downstream is ready, unless cancelled first
            select! {
                send(output, value) -> res => match res {
                    Ok(()) => metrics.record_forwarded(),
                    Err(_) => break StageExit::DownstreamClosed,
                },
                recv(shutdown.receiver()) -> _ => break StageExit::Cancelled,
            }
        };

        debug!(stage = %self.name, ?exit, "filter stage stopped");
        exit
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam::channel::bounded;
    use proptest::prelude::*;
    use std::thread;
    use std::time::Duration;

    fn spawn_filter<F>(
        predicate: F,
        shutdown: &Shutdown,
    ) -> (Sender<Value>, Receiver<Value>, thread::JoinHandle<StageExit>)
    where
        F: Fn(Value) -> bool + Send + 'static,
    {
        let (in_tx, in_rx) = bounded(0);
        let (out_tx, out_rx) = bounded(0);
        let ctx = StageContext {
            input: in_rx,
            output: out_tx,
            shutdown: shutdown.clone(),
            metrics: StageMetrics::new(),
        };
        let stage = Box::new(FilterStage::new("test_filter", predicate));
        let handle = thread::spawn(move || stage.run(ctx));
        (in_tx, out_rx, handle)
    }

    #[test]
    fn test_predicates_on_known_values() {
        assert!(is_non_negative(0));
        assert!(is_non_negative(7));
        assert!(!is_non_negative(-1));

        assert!(keep_multiple_of_three_excluding_zero(3));
        assert!(keep_multiple_of_three_excluding_zero(-9));
        assert!(!keep_multiple_of_three_excluding_zero(0));
        assert!(!keep_multiple_of_three_excluding_zero(4));
    }

    #[test]
    fn test_filter_forwards_matching_values_in_order() {
        let shutdown = Shutdown::new();
        let (tx, rx, handle) = spawn_filter(is_non_negative, &shutdown);

        let producer = thread::spawn(move || {
            for value in [-2, 3, 4, 9, 0, 6] {
                tx.send(value).unwrap();
            }
        });

        let forwarded: Vec<_> = rx.iter().collect();
        producer.join().unwrap();
        assert_eq!(forwarded, vec![3, 4, 9, 0, 6]);
        assert_eq!(handle.join().unwrap(), StageExit::UpstreamClosed);
    }

    #[test]
    fn test_cancel_while_blocked_on_forward() {
        let shutdown = Shutdown::new();
        let (tx, rx, handle) = spawn_filter(|_| true, &shutdown);

        // Nobody reads `rx`, so the filter parks in its forward handoff
        tx.send(5).unwrap();
        thread::sleep(Duration::from_millis(20));
        shutdown.trigger();

        assert_eq!(handle.join().unwrap(), StageExit::Cancelled);
        assert!(rx.recv().is_err());
    }

    #[test]
    fn test_downstream_gone() {
        let shutdown = Shutdown::new();
        let (tx, rx, handle) = spawn_filter(|_| true, &shutdown);
        drop(rx);
        tx.send(1).unwrap();
        assert_eq!(handle.join().unwrap(), StageExit::DownstreamClosed);
    }

    proptest! {
        #[test]
        fn prop_non_negative_matches_sign(n in any::<i64>()) {
            prop_assert_eq!(is_non_negative(n), n >= 0);
        }

        #[test]
        fn prop_multiple_of_three_excluding_zero(n in any::<i64>()) {
            let stage = FilterStage::new("mod3", keep_multiple_of_three_excluding_zero);
            prop_assert_eq!(stage.accepts(n), n != 0 && n % 3 == 0);
        }
    }
}
