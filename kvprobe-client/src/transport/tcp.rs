//! TcpTransport - plaintext line protocol over tokio TCP.

use super::{Connection, Transport, TransportError};
use async_trait::async_trait;
use kvprobe_core::READ_CHUNK_SIZE;
use kvprobe_types::NodeEndpoint;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// TcpTransport opens one `TcpStream` per `connect()`.
///
/// It holds no connection state itself, so one transport can serve any
/// number of concurrent callers.
///
/// # Example
///
/// ```ignore
/// let transport = TcpTransport::new();
/// let mut conn = transport.connect(&NodeEndpoint::new("localhost", 8081)?).await?;
/// conn.send(b"GET session:user1\n").await?;
/// let chunk = conn.recv().await?;
/// conn.close().await?;
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpTransport;

impl TcpTransport {
    /// Create a transport.
    pub fn new() -> Self {
        Self
    }
}

/// One TCP connection to a node. The socket is released on drop.
#[derive(Debug)]
pub struct TcpConnection {
    stream: TcpStream,
}

#[async_trait]
impl Transport for TcpTransport {
    type Connection = TcpConnection;

    async fn connect(&self, endpoint: &NodeEndpoint) -> Result<TcpConnection, TransportError> {
        let stream = TcpStream::connect((endpoint.host(), endpoint.port()))
            .await
            .map_err(|e| TransportError::ConnectionFailed(format!("{endpoint}: {e}")))?;
        stream.set_nodelay(true).ok();

        Ok(TcpConnection { stream })
    }
}

#[async_trait]
impl Connection for TcpConnection {
    async fn send(&mut self, data: &[u8]) -> Result<(), TransportError> {
        self.stream
            .write_all(data)
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))?;
        self.stream
            .flush()
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }

    async fn recv(&mut self) -> Result<Vec<u8>, TransportError> {
        let mut buf = vec![0u8; READ_CHUNK_SIZE];
        let n = self
            .stream
            .read(&mut buf)
            .await
            .map_err(|e| TransportError::ReceiveFailed(e.to_string()))?;
        buf.truncate(n);
        Ok(buf)
    }

    async fn close(mut self) -> Result<(), TransportError> {
        // The socket is released on drop even if shutdown fails.
        self.stream.shutdown().await.ok();
        Ok(())
    }
}
