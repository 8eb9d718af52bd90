//! Drives the operation loop of a single logical client.

use std::fmt;
use std::sync::Arc;

use sketches_ddsketch::DDSketch;
use tokio::time::Instant;

use crate::command::MapCommand;
use crate::config::RunConfig;
use crate::error::{Error, Result};
use crate::remote::{Connection, Connector};
use crate::report::ReportSink;
use crate::window::{Residual, Window};
use crate::workload::Workload;

/// Terminal state of a client.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunnerState {
    /// All operations completed.
    Done,
    /// The run deadline passed before all operations completed.
    Cutoff,
    /// Connecting or executing an operation failed. See [`RunnerSummary::failure`].
    Failed,
}

/// What a client accomplished before it stopped.
pub struct RunnerSummary {
    /// Identifier of the client. The client on the main task is `0`.
    pub client: usize,
    /// How the client stopped.
    pub state: RunnerState,
    /// The error that stopped the client, if it failed.
    pub failure: Option<Error>,
    /// Number of operations that completed successfully.
    pub completed: u64,
    /// Number of window reports emitted.
    pub reports: u64,
    /// Operations of the last window, which closed without a report.
    pub residual: Residual,
    /// Round-trip latencies of all completed operations, in microseconds.
    pub latencies: DDSketch,
}

impl fmt::Debug for RunnerSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunnerSummary")
            .field("client", &self.client)
            .field("state", &self.state)
            .field("failure", &self.failure)
            .field("completed", &self.completed)
            .field("reports", &self.reports)
            .field("residual", &self.residual)
            .field("latencies", &self.latencies.count())
            .finish_non_exhaustive()
    }
}

impl RunnerSummary {
    fn new(client: usize) -> Self {
        Self {
            client,
            state: RunnerState::Done,
            failure: None,
            completed: 0,
            reports: 0,
            residual: Residual::default(),
            latencies: DDSketch::default(),
        }
    }

    fn fail(&mut self, error: Error) {
        self.state = RunnerState::Failed;
        self.failure = Some(error);
    }

    /// Returns the summary, or the error if the client failed.
    pub fn into_result(mut self) -> Result<Self> {
        match self.failure.take() {
            Some(error) => Err(error),
            None => Ok(self),
        }
    }
}

/// A single logical client.
///
/// The runner connects to the service, then issues the operations of its own [`Workload`]
/// strictly one after another, timing each round trip. A failed operation is never retried and
/// stops the runner.
#[derive(Debug)]
pub struct Runner<C> {
    client: usize,
    config: Arc<RunConfig>,
    connector: Arc<C>,
    sink: Arc<dyn ReportSink>,
}

impl<C: Connector> Runner<C> {
    /// Creates the runner for the client with the given identifier.
    pub fn new(
        client: usize,
        config: Arc<RunConfig>,
        connector: Arc<C>,
        sink: Arc<dyn ReportSink>,
    ) -> Self {
        Self {
            client,
            config,
            connector,
            sink,
        }
    }

    /// Runs the client to completion.
    ///
    /// Connection and replication failures are recorded in the returned summary.
    pub async fn run(self) -> RunnerSummary {
        let mut summary = RunnerSummary::new(self.client);
        let deadline = self.config.max_duration.map(|d| Instant::now() + d);

        let mut connection = match self.connector.connect().await {
            Ok(connection) => connection,
            Err(error) => {
                summary.fail(error);
                return summary;
            }
        };

        let workload = Workload::builder(self.config.total)
            .key_distribution(self.config.keys)
            .build();
        let mut window = Window::new(self.config.window, Instant::now());

        for operation in workload {
            let payload = MapCommand::from(operation).to_bytes();

            let start = Instant::now();
            let result = match deadline {
                Some(deadline) => tokio::select! {
                    result = connection.execute(payload) => result,
                    _ = tokio::time::sleep_until(deadline) => {
                        tracing::debug!(completed = summary.completed, "deadline reached");
                        summary.state = RunnerState::Cutoff;
                        break;
                    }
                },
                None => connection.execute(payload).await,
            };
            let end = Instant::now();

            if let Err(error) = result {
                summary.fail(error);
                break;
            }

            summary.completed += 1;
            window.record(start, end);
            summary
                .latencies
                .add(end.saturating_duration_since(start).as_micros() as f64);

            if let Some(report) = window.observe(end) {
                self.sink.emit(self.client, &report);
            }
        }

        summary.reports = window.reports();
        summary.residual = window.finish();
        summary
    }
}
