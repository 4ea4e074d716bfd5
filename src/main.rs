use anyhow::{Context, Result};
use clap::Parser;
use std::io;
use std::thread;
use std::time::Duration;
use tokio::signal;
use tracing::{debug, info};
use windowed_pipeline::logging::init_tracing;
use windowed_pipeline::{
    LineSource, Pipeline, PipelineConfig, DEFAULT_BUFFER_SIZE, DEFAULT_FLUSH_INTERVAL,
};

/// Filter integers read from stdin and print them in timed batches
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Capacity of the aggregator's ring buffer
    #[arg(long, default_value_t = DEFAULT_BUFFER_SIZE)]
    buffer_size: usize,

    /// Milliseconds between aggregator flushes
    #[arg(long, default_value_t = DEFAULT_FLUSH_INTERVAL.as_millis() as u64)]
    flush_interval_ms: u64,
}

impl Args {
    fn config(&self) -> PipelineConfig {
        PipelineConfig::default()
            .with_buffer_size(self.buffer_size)
            .with_flush_interval(Duration::from_millis(self.flush_interval_ms))
    }
}

/// Interrupt listeners, registered once so a signal that arrives before the
/// main loop first polls them is still delivered here.
struct ShutdownSignals {
    #[cfg(unix)]
    interrupt: signal::unix::Signal,
    #[cfg(unix)]
    terminate: signal::unix::Signal,
    #[cfg(not(unix))]
    ctrl_c: signal::windows::CtrlC,
}

impl ShutdownSignals {
    /// Install the handlers for SIGINT and SIGTERM (Ctrl+C elsewhere)
    #[cfg(unix)]
    fn install() -> Result<Self> {
        use signal::unix::{signal, SignalKind};
        Ok(Self {
            interrupt: signal(SignalKind::interrupt())
                .context("failed to install SIGINT handler")?,
            terminate: signal(SignalKind::terminate())
                .context("failed to install SIGTERM handler")?,
        })
    }

    /// Install the handlers for SIGINT and SIGTERM (Ctrl+C elsewhere)
    #[cfg(not(unix))]
    fn install() -> Result<Self> {
        Ok(Self {
            ctrl_c: signal::windows::ctrl_c().context("failed to install Ctrl+C handler")?,
        })
    }

    /// Wait for the next interrupt
    async fn recv(&mut self) {
        #[cfg(unix)]
        tokio::select! {
            _ = self.interrupt.recv() => {},
            _ = self.terminate.recv() => {},
        }

        #[cfg(not(unix))]
        self.ctrl_c.recv().await;
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let config = args.config();
    info!(?config, "starting pipeline");

    // Before anything starts, so an early Ctrl+C still drains the pipeline
    let mut signals = ShutdownSignals::install()?;

    let mut running = Pipeline::standard(&config)?
        .start()
        .context("failed to start pipeline")?;
    let input = running
        .take_input()
        .context("pipeline input already taken")?;
    let shutdown = running.shutdown_signal();

    println!("Program started. Enter integers:");

    // Blocked on stdin it cannot be joined; it stops on its own at EOF or on
    // its next handoff after shutdown.
    thread::Builder::new()
        .name("stdin-source".into())
        .spawn(move || {
            let source = LineSource::new(io::stdin().lock(), input, shutdown);
            source.run(|_| println!("Invalid input. Enter an integer:"));
            println!("Input finished.");
        })
        .context("failed to spawn input thread")?;

    println!("Processed data:");

    let output = running.output();
    let mut sink = tokio::task::spawn_blocking(move || {
        for value in output.iter() {
            println!("Received data: {value}");
        }
    });

    loop {
        tokio::select! {
            _ = signals.recv() => {
                if running.shutdown() {
                    println!("\nProgram terminated at user request.");
                } else {
                    debug!("shutdown already in progress");
                }
            }
            res = &mut sink => {
                res.context("output task failed")?;
                break;
            }
        }
    }

    info!("{}", running.metrics_summary().trim_end());
    let reports = tokio::task::spawn_blocking(move || running.wait())
        .await
        .context("join task failed")??;
    for report in reports {
        debug!(stage = %report.name, exit = ?report.exit, "stage finished");
    }

    Ok(())
}
