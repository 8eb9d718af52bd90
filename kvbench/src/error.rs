//! Error types for the benchmark harness.

use std::io;

use thiserror::Error;

/// Errors that can happen while setting up or running a benchmark.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid or missing command line arguments.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// The configuration could not be loaded.
    #[error("failed to load configuration: {0}")]
    LoadConfig(#[from] Box<figment::Error>),

    /// The configuration was loaded but contains unusable values.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Failed to establish a connection to the service.
    #[error("failed to connect to {remote}")]
    Connect {
        /// The address that was dialed.
        remote: String,
        #[source]
        cause: io::Error,
    },

    /// A single command was not executed by the replicated service.
    ///
    /// This covers consensus failures reported by the service as well as transport errors and
    /// connections closed while a command was in flight.
    #[error("replication failure: {0}")]
    Replication(String),

    /// A payload did not have the expected command layout.
    #[error("malformed command: expected {expected} bytes, got {actual}")]
    Decode {
        /// The required payload length.
        expected: usize,
        /// The length that was received.
        actual: usize,
    },
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::LoadConfig(Box::new(err))
    }
}

/// A convenience alias that defaults our [`Error`] type.
pub type Result<T, E = Error> = std::result::Result<T, E>;
