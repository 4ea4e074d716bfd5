//! Line-oriented input feeding the head of a pipeline.

use crate::error::InputError;
use crate::shutdown::Shutdown;
use crate::stage::StageExit;
use crate::Value;
use crossbeam::channel::Sender;
use crossbeam::select;
use std::io::BufRead;
use tracing::{debug, warn};

/// Parse one input line as a decimal integer, ignoring surrounding whitespace
pub fn parse_value(line: &str) -> Result<Value, InputError> {
    let trimmed = line.trim();
    trimmed.parse::<Value>().map_err(|source| InputError::Parse {
        line: trimmed.to_string(),
        source,
    })
}

/// What a [`LineSource`] did before it stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceReport {
    pub accepted: u64,
    pub rejected: u64,
    /// `UpstreamClosed` here means the reader hit end of input
    pub exit: StageExit,
}

/// Reads lines, parses them, and hands accepted values to the pipeline.
///
/// The handoff is raced against the shutdown signal, so a source never stays
/// parked on a pipeline that has stopped reading.
pub struct LineSource<R> {
    reader: R,
    output: Sender<Value>,
    shutdown: Shutdown,
}

impl<R: BufRead> LineSource<R> {
    /// Create a source reading from `reader` into `output`
    pub fn new(reader: R, output: Sender<Value>, shutdown: Shutdown) -> Self {
        Self {
            reader,
            output,
            shutdown,
        }
    }

    /// Run until end of input, shutdown, or the pipeline closing.
    ///
    /// `on_reject` is called for every line that is not an integer or cannot
    /// be read; reading then carries on.
    pub fn run<F>(mut self, mut on_reject: F) -> SourceReport
    where
        F: FnMut(&InputError),
    {
        let mut report = SourceReport {
            accepted: 0,
            rejected: 0,
            exit: StageExit::UpstreamClosed,
        };
        let mut line = String::new();

        loop {
            if self.shutdown.is_triggered() {
                report.exit = StageExit::Cancelled;
                break;
            }

            line.clear();
            let value = match self.reader.read_line(&mut line) {
                Ok(0) => break,
                Ok(_) => parse_value(&line),
                Err(err) => Err(InputError::Io(err)),
            };
            let value = match value {
                Ok(value) => value,
                Err(err) => {
                    warn!(error = %err, "rejected input line");
                    report.rejected += 1;
                    on_reject(&err);
                    continue;
                }
            };

            select! {
                send(self.output, value) -> res => match res {
                    Ok(()) => report.accepted += 1,
                    Err(_) => {
                        report.exit = StageExit::DownstreamClosed;
                        break;
                    }
                },
                recv(self.shutdown.receiver()) -> _ => {
                    report.exit = StageExit::Cancelled;
                    break;
                },
            }
        }

        debug!(?report, "line source stopped");
        report
    }
}
