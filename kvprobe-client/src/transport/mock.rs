//! Mock transport for testing.
//!
//! Allows scripting failures per operation or per node, queueing response
//! chunks, and counting connections opened and closed. Every connection
//! handed out is a [`MockConnection`] that reports its own release, whether
//! it was closed explicitly or dropped.

use super::{Connection, Transport, TransportError};
use async_trait::async_trait;
use kvprobe_types::NodeEndpoint;
use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};

/// Mock transport for testing.
///
/// Clones share state, so a test can keep a handle after giving the
/// transport to a dispatcher.
#[derive(Debug, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
}

#[derive(Debug, Default)]
struct MockTransportInner {
    connect_log: Vec<NodeEndpoint>,
    opened: usize,
    closed: usize,
    sent_messages: Vec<Vec<u8>>,
    receive_queue: VecDeque<Vec<u8>>,
    default_response: Option<Vec<u8>>,
    unreachable: HashSet<NodeEndpoint>,
    fail_next_connect: Option<String>,
    fail_next_send: Option<String>,
    fail_next_recv: Option<String>,
    stalled_connects: u32,
    stalled_recvs: u32,
}

impl MockTransport {
    /// Create a new mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a chunk to be returned by a later `recv()` call.
    pub fn queue_response(&self, data: &[u8]) {
        let mut inner = self.inner.lock().unwrap();
        inner.receive_queue.push_back(data.to_vec());
    }

    /// Chunk returned by `recv()` whenever the queue is empty.
    ///
    /// Without one, an empty queue reads as the peer closing the stream.
    pub fn set_default_response(&self, data: &[u8]) {
        let mut inner = self.inner.lock().unwrap();
        inner.default_response = Some(data.to_vec());
    }

    /// Refuse every connection to `endpoint`.
    pub fn set_unreachable(&self, endpoint: &NodeEndpoint) {
        let mut inner = self.inner.lock().unwrap();
        inner.unreachable.insert(endpoint.clone());
    }

    /// Make `endpoint` reachable again.
    pub fn set_reachable(&self, endpoint: &NodeEndpoint) {
        let mut inner = self.inner.lock().unwrap();
        inner.unreachable.remove(endpoint);
    }

    /// Cause the next connect() to fail with the given error.
    pub fn fail_next_connect(&self, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_next_connect = Some(error.to_string());
    }

    /// Cause the next send() to fail with the given error.
    pub fn fail_next_send(&self, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_next_send = Some(error.to_string());
    }

    /// Cause the next recv() to fail with the given error.
    pub fn fail_next_recv(&self, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_next_recv = Some(error.to_string());
    }

    /// Make the next `count` connect() calls never complete.
    pub fn stall_connects(&self, count: u32) {
        let mut inner = self.inner.lock().unwrap();
        inner.stalled_connects = count;
    }

    /// Make the next `count` recv() calls never complete.
    pub fn stall_recvs(&self, count: u32) {
        let mut inner = self.inner.lock().unwrap();
        inner.stalled_recvs = count;
    }

    /// Every endpoint connect() was called with, in order.
    pub fn connect_log(&self) -> Vec<NodeEndpoint> {
        let inner = self.inner.lock().unwrap();
        inner.connect_log.clone()
    }

    /// Number of connect() calls made.
    pub fn connect_attempts(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.connect_log.len()
    }

    /// Number of connections successfully opened.
    pub fn opened(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.opened
    }

    /// Number of connections released (closed or dropped).
    pub fn closed(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.closed
    }

    /// Connections opened but not yet closed.
    pub fn open_connections(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.opened.saturating_sub(inner.closed)
    }

    /// Get all messages that were sent.
    pub fn sent_messages(&self) -> Vec<Vec<u8>> {
        let inner = self.inner.lock().unwrap();
        inner.sent_messages.clone()
    }

    /// Clear all state (messages, queue, scripts, counters).
    pub fn reset(&self) {
        let mut inner = self.inner.lock().unwrap();
        *inner = MockTransportInner::default();
    }
}

impl Clone for MockTransport {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

enum Scripted<T> {
    Ready(Result<T, TransportError>),
    Stall,
}

impl<T> Scripted<T> {
    async fn resolve(self) -> Result<T, TransportError> {
        match self {
            Self::Ready(result) => result,
            Self::Stall => std::future::pending().await,
        }
    }
}

/// Connection handed out by [`MockTransport`].
#[derive(Debug)]
pub struct MockConnection {
    inner: Arc<Mutex<MockTransportInner>>,
    endpoint: NodeEndpoint,
}

impl MockConnection {
    /// Endpoint this connection was opened to.
    pub fn endpoint(&self) -> &NodeEndpoint {
        &self.endpoint
    }
}

impl Drop for MockConnection {
    fn drop(&mut self) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.closed += 1;
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    type Connection = MockConnection;

    async fn connect(&self, endpoint: &NodeEndpoint) -> Result<MockConnection, TransportError> {
        let scripted = {
            let mut inner = self.inner.lock().unwrap();
            inner.connect_log.push(endpoint.clone());

            if inner.stalled_connects > 0 {
                inner.stalled_connects -= 1;
                Scripted::Stall
            } else if let Some(error) = inner.fail_next_connect.take() {
                Scripted::Ready(Err(TransportError::ConnectionFailed(error)))
            } else if inner.unreachable.contains(endpoint) {
                Scripted::Ready(Err(TransportError::ConnectionFailed(format!(
                    "{endpoint}: connection refused"
                ))))
            } else {
                inner.opened += 1;
                Scripted::Ready(Ok(()))
            }
        };
        scripted.resolve().await?;

        Ok(MockConnection {
            inner: Arc::clone(&self.inner),
            endpoint: endpoint.clone(),
        })
    }
}

#[async_trait]
impl Connection for MockConnection {
    async fn send(&mut self, data: &[u8]) -> Result<(), TransportError> {
        let mut inner = self.inner.lock().unwrap();

        // Check for forced failure
        if let Some(error) = inner.fail_next_send.take() {
            return Err(TransportError::SendFailed(error));
        }

        inner.sent_messages.push(data.to_vec());
        Ok(())
    }

    async fn recv(&mut self) -> Result<Vec<u8>, TransportError> {
        let scripted = {
            let mut inner = self.inner.lock().unwrap();

            if let Some(error) = inner.fail_next_recv.take() {
                Scripted::Ready(Err(TransportError::ReceiveFailed(error)))
            } else if inner.stalled_recvs > 0 {
                inner.stalled_recvs -= 1;
                Scripted::Stall
            } else {
                let chunk = inner
                    .receive_queue
                    .pop_front()
                    .or_else(|| inner.default_response.clone())
                    .unwrap_or_default();
                Scripted::Ready(Ok(chunk))
            }
        };
        scripted.resolve().await
    }

    async fn close(self) -> Result<(), TransportError> {
        // Release is counted on drop.
        Ok(())
    }
}
