//! Benchmark client for replicated key-value services.
//!
//! Run `kvbench run <total> <clients>` to start `<clients>` concurrent clients that each write
//! `<total>` keys and report latency and throughput every two seconds.
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

fn main() -> anyhow::Result<()> {
    kvbench::cli::execute()
}
