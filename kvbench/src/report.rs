//! Destinations for window reports and the end-of-run summary.

use std::fmt::Debug;

use sketches_ddsketch::DDSketch;
use yansi::Paint;

use crate::runner::{RunnerState, RunnerSummary};
use crate::window::WindowReport;

/// Receives the report of every closed window, from all clients.
///
/// Clients emit concurrently and independently, so reports of different clients interleave in
/// no particular order.
pub trait ReportSink: Debug + Send + Sync + 'static {
    /// Called once for every window a client closes.
    fn emit(&self, client: usize, report: &WindowReport);
}

/// Prints every report as one line to stdout.
///
/// The line format is `<avg latency us> <throughput per s> <window index>`, without any
/// indication of the client.
#[derive(Debug, Default)]
pub struct StdoutSink;

impl ReportSink for StdoutSink {
    fn emit(&self, _client: usize, report: &WindowReport) {
        println!("{report}");
    }
}

/// Prints the outcome of every client to stderr.
pub fn print_summary<'a>(summaries: impl IntoIterator<Item = &'a RunnerSummary>) {
    eprintln!();
    eprintln!("{}", "## CLIENTS".bold());

    for summary in summaries {
        let state = match summary.state {
            RunnerState::Done => "done".green(),
            RunnerState::Cutoff => "cut off".yellow(),
            RunnerState::Failed => "FAILED".red(),
        };

        eprint!(
            "{} {}: {} ops, {} windows",
            "client".bold(),
            summary.client.bold().blue(),
            summary.completed.bold(),
            summary.reports,
        );
        if summary.residual.requests > 0 {
            eprint!(" (+{} unreported)", summary.residual.requests);
        }
        eprintln!(", {}", state.bold());

        if let Some(failure) = &summary.failure {
            eprintln!("  {}", failure.red());
        }
        if summary.latencies.count() > 0 {
            print_percentiles(&summary.latencies);
        }
    }
}

fn print_percentiles(sketch: &DDSketch) {
    let quantile = |q| sketch.quantile(q).ok().flatten().unwrap_or_default();

    let avg = sketch.sum().unwrap_or_default() / sketch.count() as f64;
    eprintln!(
        "  latency avg: {:.0}us; p50: {:.0}us; p90: {:.0}us; p99: {:.0}us",
        avg.bold(),
        quantile(0.5),
        quantile(0.9),
        quantile(0.99),
    );
}
