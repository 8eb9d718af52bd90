//! Exposes an in-process stub of the replicated map service for use in integration tests.
//!
//! ```
//! use kvbench_test::server::StubServer;
//!
//! #[tokio::main]
//! async fn main() {
//!    let server = StubServer::builder().start().await;
//!    let connector = server.connector();
//!    // run a benchmark against the connector...
//! }
//! ```
//!
//! The stub executes every command immediately against a single in-memory map and replies with
//! the previous value of the key. It performs no replication.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use kvbench::command::MapCommand;
use kvbench::remote::{self, STATUS_FAILED, STATUS_OK, TcpConnector};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::Framed;

/// Pause after a failed `accept` before listening again.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(10);

/// A builder for creating a [`StubServer`].
#[derive(Debug, Default)]
pub struct StubServerBuilder {
    latency: Duration,
    failures: HashMap<usize, u64>,
}

impl StubServerBuilder {
    /// Delays every reply by the given duration.
    pub fn latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Fails the `call`-th command (starting at 1) on the `connection`-th accepted connection
    /// (starting at 0).
    pub fn fail_call(mut self, connection: usize, call: u64) -> Self {
        self.failures.insert(connection, call);
        self
    }

    /// Binds to a random port on localhost and starts serving in the background.
    pub async fn start(self) -> StubServer {
        let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
            .await
            .unwrap();
        let addr = listener.local_addr().unwrap();

        let state = Arc::new(State {
            latency: self.latency,
            failures: self.failures,
            map: Mutex::default(),
            connections: Mutex::default(),
        });

        let handle = tokio::spawn(accept_loop(listener, Arc::clone(&state)));

        StubServer {
            handle,
            addr,
            state,
        }
    }
}

#[derive(Debug)]
struct State {
    latency: Duration,
    failures: HashMap<usize, u64>,
    map: Mutex<HashMap<i64, i64>>,
    connections: Mutex<Vec<Vec<MapCommand>>>,
}

/// An in-process stub of the map service.
///
/// The server records every successfully executed command per connection. It stops serving when
/// dropped.
#[derive(Debug)]
pub struct StubServer {
    handle: tokio::task::JoinHandle<()>,
    addr: SocketAddr,
    state: Arc<State>,
}

impl StubServer {
    /// Constructs a new server builder.
    pub fn builder() -> StubServerBuilder {
        StubServerBuilder::default()
    }

    /// The address the server listens on.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Creates a connector for this server.
    pub fn connector(&self) -> TcpConnector {
        TcpConnector::new(self.addr)
    }

    /// Returns the executed commands of every connection, in order of acceptance.
    pub fn connections(&self) -> Vec<Vec<MapCommand>> {
        self.state.connections.lock().unwrap().clone()
    }

    /// Returns the current value of `key` in the map.
    pub fn get(&self, key: i64) -> Option<i64> {
        self.state.map.lock().unwrap().get(&key).copied()
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn accept_loop(listener: TcpListener, state: Arc<State>) {
    loop {
        let stream = match listener.accept().await {
            Ok((stream, _)) => stream,
            Err(error) => {
                // Errors such as EMFILE persist until other connections close.
                tracing::warn!(error = &error as &dyn std::error::Error, "stub accept failed");
                tokio::time::sleep(ACCEPT_BACKOFF).await;
                continue;
            }
        };

        let connection = {
            let mut connections = state.connections.lock().unwrap();
            connections.push(Vec::new());
            connections.len() - 1
        };

        tracing::trace!(connection, "accepted stub connection");
        tokio::spawn(serve(stream, connection, Arc::clone(&state)));
    }
}

async fn serve(stream: TcpStream, connection: usize, state: Arc<State>) {
    let mut framed = Framed::new(stream, remote::codec());
    let mut calls = 0;

    while let Some(Ok(request)) = framed.next().await {
        calls += 1;

        if !state.latency.is_zero() {
            tokio::time::sleep(state.latency).await;
        }

        let reply = if state.failures.get(&connection) == Some(&calls) {
            remote::encode_reply(STATUS_FAILED, b"injected failure")
        } else {
            match MapCommand::decode(&request) {
                Ok(command) => {
                    let previous = state.execute(connection, command);
                    remote::encode_reply(STATUS_OK, &previous)
                }
                Err(err) => remote::encode_reply(STATUS_FAILED, err.to_string().as_bytes()),
            }
        };

        if framed.send(reply).await.is_err() {
            break;
        }
    }
}

impl State {
    fn execute(&self, connection: usize, command: MapCommand) -> Bytes {
        let previous = self.map.lock().unwrap().insert(command.key, command.value);
        self.connections.lock().unwrap()[connection].push(command);

        match previous {
            Some(value) => Bytes::copy_from_slice(&value.to_be_bytes()),
            None => Bytes::new(),
        }
    }
}
