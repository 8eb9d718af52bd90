//! Contains the client side of the replicated service: the [`Connector`] and [`Connection`]
//! traits the benchmark runs against, and a TCP implementation of both.
//!
//! # Framing
//!
//! Requests and replies are frames prefixed with a 4-byte big-endian length. A request frame
//! carries an encoded command. A reply frame starts with a status byte: [`STATUS_OK`] is followed
//! by the service's response, any other status by a UTF-8 failure reason.

use std::fmt::Debug;
use std::net::SocketAddr;

use bytes::{BufMut, Bytes, BytesMut};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_util::codec::{Framed, LengthDelimitedCodec};

use crate::error::{Error, Result};

/// Reply status for a command that was executed by the service.
pub const STATUS_OK: u8 = 0;
/// Reply status for a command the service failed to replicate.
pub const STATUS_FAILED: u8 = 1;

/// Establishes connections to the replicated service.
///
/// A connector is shared by all clients of a benchmark, each of which opens its own
/// [`Connection`].
#[async_trait::async_trait]
pub trait Connector: Debug + Send + Sync + 'static {
    /// The connection type produced by this connector.
    type Connection: Connection;

    /// Opens a new connection, failing with [`Error::Connect`].
    async fn connect(&self) -> Result<Self::Connection>;
}

/// An exclusive connection to the replicated service.
#[async_trait::async_trait]
pub trait Connection: Send + 'static {
    /// Submits a command and waits until the service has executed it.
    ///
    /// Returns the service's response, or [`Error::Replication`] if the command was not
    /// executed. There is no timeout.
    async fn execute(&mut self, payload: Bytes) -> Result<Bytes>;
}

/// Creates the codec used on both ends of a service connection.
pub fn codec() -> LengthDelimitedCodec {
    LengthDelimitedCodec::new()
}

/// Encodes a reply frame body with the given status and data.
pub fn encode_reply(status: u8, data: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(1 + data.len());
    buf.put_u8(status);
    buf.put_slice(data);
    buf.freeze()
}

/// Connects to the service over TCP.
#[derive(Clone, Debug)]
pub struct TcpConnector {
    remote: SocketAddr,
}

impl TcpConnector {
    /// Creates a connector for the service listening on `remote`.
    pub fn new(remote: SocketAddr) -> Self {
        Self { remote }
    }
}

#[async_trait::async_trait]
impl Connector for TcpConnector {
    type Connection = TcpConnection;

    async fn connect(&self) -> Result<TcpConnection> {
        let stream = TcpStream::connect(self.remote)
            .await
            .map_err(|cause| Error::Connect {
                remote: self.remote.to_string(),
                cause,
            })?;
        // Commands are tiny and latency is what we measure.
        stream.set_nodelay(true).map_err(|cause| Error::Connect {
            remote: self.remote.to_string(),
            cause,
        })?;

        tracing::debug!(remote = %self.remote, "connected");
        Ok(TcpConnection {
            framed: Framed::new(stream, codec()),
        })
    }
}

/// A framed TCP connection to the service.
#[derive(Debug)]
pub struct TcpConnection {
    framed: Framed<TcpStream, LengthDelimitedCodec>,
}

#[async_trait::async_trait]
impl Connection for TcpConnection {
    async fn execute(&mut self, payload: Bytes) -> Result<Bytes> {
        self.framed
            .send(payload)
            .await
            .map_err(|err| Error::Replication(format!("failed to send command: {err}")))?;

        let mut reply = match self.framed.next().await {
            Some(Ok(reply)) => reply,
            Some(Err(err)) => {
                return Err(Error::Replication(format!("failed to read reply: {err}")));
            }
            None => return Err(Error::Replication("connection closed".into())),
        };

        if reply.is_empty() {
            return Err(Error::Replication("empty reply".into()));
        }

        let data = reply.split_off(1).freeze();
        match reply[0] {
            STATUS_OK => Ok(data),
            _ => Err(Error::Replication(
                String::from_utf8_lossy(&data).into_owned(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::net::TcpListener;

    use super::*;

    async fn serve_once(reply: Bytes) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut framed = Framed::new(stream, codec());
            let _request = framed.next().await.unwrap().unwrap();
            framed.send(reply).await.unwrap();
        });

        addr
    }

    #[tokio::test]
    async fn execute_returns_response() {
        let addr = serve_once(encode_reply(STATUS_OK, b"prev")).await;
        let mut conn = TcpConnector::new(addr).connect().await.unwrap();

        let response = conn.execute(Bytes::from_static(b"cmd")).await.unwrap();
        assert_eq!(response.as_ref(), b"prev");
    }

    #[tokio::test]
    async fn failed_status_is_replication_failure() {
        let addr = serve_once(encode_reply(STATUS_FAILED, b"no quorum")).await;
        let mut conn = TcpConnector::new(addr).connect().await.unwrap();

        let err = conn.execute(Bytes::from_static(b"cmd")).await.unwrap_err();
        assert!(matches!(err, Error::Replication(reason) if reason == "no quorum"));
    }

    #[tokio::test]
    async fn closed_connection_is_replication_failure() {
        let addr = serve_once(encode_reply(STATUS_OK, b"")).await;
        let mut conn = TcpConnector::new(addr).connect().await.unwrap();

        conn.execute(Bytes::from_static(b"cmd")).await.unwrap();
        let err = conn.execute(Bytes::from_static(b"cmd")).await.unwrap_err();
        assert!(matches!(err, Error::Replication(_)));
    }

    #[tokio::test]
    async fn connect_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = TcpConnector::new(addr).connect().await.unwrap_err();
        assert!(matches!(err, Error::Connect { .. }));
    }
}
