//! Command line interface of the `kvbench` binary.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use argh::FromArgs;

use crate::config::Config;
use crate::remote::TcpConnector;
use crate::report::StdoutSink;
use crate::{bench, observability};

/// Closed-loop benchmark for replicated key-value services.
#[derive(Debug, FromArgs)]
struct Args {
    /// path to the YAML configuration file
    #[argh(option, short = 'c')]
    pub config: Option<PathBuf>,

    #[argh(subcommand)]
    pub command: Command,
}

#[derive(Debug, FromArgs)]
#[argh(subcommand)]
enum Command {
    Run(RunCommand),
    Version(VersionCommand),
}

/// run concurrent clients against the service and report latency and throughput
///
/// Every closed window of every client prints one line to stdout:
/// `<avg latency us> <throughput per s> <window index>`.
#[derive(Debug, FromArgs)]
#[argh(subcommand, name = "run")]
struct RunCommand {
    /// number of operations each client issues
    #[argh(positional)]
    total: u64,

    /// number of concurrent clients, including the one on the main task
    #[argh(positional)]
    clients: usize,
}

/// print the kvbench version
#[derive(Default, Debug, FromArgs)]
#[argh(subcommand, name = "version")]
struct VersionCommand {}

/// Bootstrap the runtime and execute the CLI command.
pub fn execute() -> Result<()> {
    let args: Args = argh::from_env();

    let RunCommand { total, clients } = match args.command {
        Command::Run(command) => command,
        Command::Version(VersionCommand {}) => {
            println!("kvbench {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
    };

    let config = Config::load(args.config.as_deref()).context("failed to load config")?;
    observability::init_tracing(&config);
    tracing::debug!(?config);

    let connector = TcpConnector::new(config.remote);
    let run_config = config.into_run_config(total, clients)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .thread_name("kvbench-rt")
        .enable_all()
        .build()?;

    let result = runtime.block_on(bench::run(run_config, connector, Arc::new(StdoutSink)));

    // Clients that are still running when only the main client is awaited are abandoned.
    runtime.shutdown_background();

    result?;
    Ok(())
}
