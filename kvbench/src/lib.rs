//! A closed-loop benchmark for replicated key-value services.
//!
//! Every logical client connects to the service on its own and issues a fixed number of map
//! writes strictly one after another, waiting for each to be executed before issuing the next.
//! Each client times its round trips and reports average latency and throughput once per
//! reporting [`Window`](window::Window). Clients run concurrently and share no state, so their
//! reports interleave.
//!
//! See [`bench::run`] for the entry point.
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod bench;
pub mod cli;
pub mod command;
pub mod config;
pub mod error;
pub mod observability;
pub mod remote;
pub mod report;
pub mod runner;
pub mod window;
pub mod workload;

pub use crate::bench::run;
pub use crate::error::{Error, Result};
pub use crate::workload::{Operation, Workload};
