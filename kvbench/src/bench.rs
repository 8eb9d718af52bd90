//! Run multiple independent clients concurrently against the replicated service.

use std::sync::Arc;

use tracing::Instrument;

use crate::config::{RunConfig, WaitFor};
use crate::error::Result;
use crate::remote::Connector;
use crate::report::{self, ReportSink};
use crate::runner::{Runner, RunnerSummary};

/// Runs the configured number of clients against the service behind `connector`.
///
/// Client `0` runs on the calling task, all others are spawned onto the runtime. Clients share
/// nothing but the configuration, the connector and the report sink; each one opens its own
/// connection and aggregates its own statistics.
///
/// Failures of spawned clients never affect the others and are not returned. With
/// [`WaitFor::Main`], this function returns as soon as client `0` has finished and the returned
/// list contains only its summary. With [`WaitFor::All`], it also waits for every spawned client
/// and prints a summary of all of them to stderr.
///
/// Returns the error of client `0` if it failed.
pub async fn run<C: Connector>(
    config: RunConfig,
    connector: C,
    sink: Arc<dyn ReportSink>,
) -> Result<Vec<RunnerSummary>> {
    let config = Arc::new(config);
    let connector = Arc::new(connector);

    tracing::info!(
        total = config.total,
        clients = config.clients,
        "starting benchmark"
    );

    let spawned: Vec<_> = (1..config.clients)
        .map(|client| {
            let runner = Runner::new(
                client,
                Arc::clone(&config),
                Arc::clone(&connector),
                Arc::clone(&sink),
            );
            tokio::spawn(run_spawned(runner).instrument(tracing::info_span!("client", client)))
        })
        .collect();

    let main = Runner::new(0, Arc::clone(&config), connector, sink)
        .run()
        .instrument(tracing::info_span!("client", client = 0))
        .await;
    tracing::debug!(completed = main.completed, state = ?main.state, "main client finished");

    let mut finished = Vec::new();
    if config.wait_for == WaitFor::All {
        for task in futures::future::join_all(spawned).await {
            match task {
                Ok(summary) => finished.push(summary),
                Err(error) => tracing::debug!(
                    error = &error as &dyn std::error::Error,
                    "client task aborted"
                ),
            }
        }
        report::print_summary(std::iter::once(&main).chain(&finished));
    }

    let main = main.into_result()?;
    Ok(std::iter::once(main).chain(finished).collect())
}

async fn run_spawned<C: Connector>(runner: Runner<C>) -> RunnerSummary {
    let summary = runner.run().await;
    if let Some(error) = &summary.failure {
        tracing::debug!(
            error = error as &dyn std::error::Error,
            completed = summary.completed,
            "client failed"
        );
    }
    summary
}
