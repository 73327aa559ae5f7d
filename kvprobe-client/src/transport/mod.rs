//! Transport abstraction for kvprobe.
//!
//! This module provides a pluggable transport layer that abstracts
//! the underlying connection mechanism (TCP, mock for testing).
//!
//! # Design
//!
//! A [`Transport`] is a connector. Every `connect()` yields a fresh, owned
//! [`Connection`] that belongs to the caller for its whole lifetime:
//! - `send()` writes and flushes a full request line
//! - `recv()` returns the next chunk of bytes; an empty chunk means the
//!   peer closed the stream
//! - `close()` consumes the connection; dropping it also releases it
//!
//! Connections are never shared or reused, so concurrent callers on one
//! transport cannot disturb each other.
//!
//! Timeouts are not the transport's concern: the dispatcher bounds every
//! call it makes.
//!
//! # Example
//!
//! ```ignore
//! let transport = MockTransport::new();
//! let mut conn = transport.connect(&node).await?;
//! conn.send(b"GET key\n").await?;
//! let chunk = conn.recv().await?;
//! conn.close().await?;
//! ```

mod mock;
mod tcp;

pub use mock::{MockConnection, MockTransport};
pub use tcp::{TcpConnection, TcpTransport};

use async_trait::async_trait;
use kvprobe_types::NodeEndpoint;
use thiserror::Error;

/// Transport errors.
///
/// Every variant is retryable from the dispatcher's point of view.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection failed (refused, unreachable, DNS failure).
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// No open connection to use.
    #[error("not connected")]
    NotConnected,

    /// Send failed.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// Receive failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(String),

    /// Operation timed out.
    #[error("operation timed out")]
    Timeout,
}

/// Transport trait for opening connections to a node.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Connection handed out by [`connect`](Self::connect).
    type Connection: Connection;

    /// Open a new connection to `endpoint`.
    async fn connect(&self, endpoint: &NodeEndpoint) -> Result<Self::Connection, TransportError>;
}

/// One open connection, owned by whoever called `connect()`.
#[async_trait]
pub trait Connection: Send {
    /// Write all of `data` and flush it.
    async fn send(&mut self, data: &[u8]) -> Result<(), TransportError>;

    /// Read the next available bytes.
    ///
    /// Returns an empty vector once the peer has closed the stream.
    async fn recv(&mut self) -> Result<Vec<u8>, TransportError>;

    /// Shut the connection down and release it.
    async fn close(self) -> Result<(), TransportError>;
}
