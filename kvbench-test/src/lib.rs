//! Test utilities for kvbench.
//!
//! This crate provides utilities to run benchmarks against a local service in tests. See the
//! modules for all available utilities.

pub mod server;
pub mod sink;
pub mod tracing;
