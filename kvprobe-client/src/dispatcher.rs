//! Dispatcher - delivers one command to one node.
//!
//! The dispatcher interprets the actions produced by the pure
//! [`DispatchState`] machine from kvprobe-core and performs the I/O through
//! a [`Transport`]:
//!
//! ```text
//! Sequencer → Dispatcher → Transport → Network
//!                 ↓
//!          kvprobe-core (retry state machine)
//! ```
//!
//! Transport faults never leave [`Dispatcher::dispatch`]. They are logged
//! and retried; when every attempt has failed the call returns
//! [`DispatchOutcome::Exhausted`].

use std::collections::VecDeque;
use std::future::Future;

use kvprobe_core::{Action, DispatchState, Event, ResponseAccumulator, RetryPolicy};
use kvprobe_types::{Command, DispatchOutcome, NodeEndpoint, TypesError};
use tracing::{debug, info, warn};

use crate::sequencer::millis;
use crate::transport::{Connection, Transport, TransportError};

/// Sends commands over a transport with bounded retries.
#[derive(Debug)]
pub struct Dispatcher<T: Transport> {
    transport: T,
    policy: RetryPolicy,
}

impl<T: Transport> Dispatcher<T> {
    /// Create a dispatcher.
    pub fn new(transport: T, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    /// The retry policy in use.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Send `command` to `node` and wait for its one-line response.
    ///
    /// Each attempt opens a fresh connection, writes the command plus `\n`,
    /// reads until a chunk carries a newline or the peer closes, and always
    /// closes the connection. Failed attempts are retried after the policy's
    /// fixed backoff, up to `max_attempts` in total.
    pub async fn dispatch(&self, node: &NodeEndpoint, command: &Command) -> DispatchOutcome {
        let wire = command.wire_bytes();
        let mut response = ResponseAccumulator::new();
        // Owned by this call alone; dropped on every exit path.
        let mut connection: Option<T::Connection> = None;

        let (mut state, actions) = DispatchState::new().on_event(&self.policy, Event::Start);
        let mut pending: VecDeque<Action> = actions.into();

        while let Some(action) = pending.pop_front() {
            let attempt = state.attempt();
            let result = match action {
                Action::Connect { attempt } => {
                    response.clear();
                    info!(attempt, node = %node, "connecting");
                    self.bounded(self.transport.connect(node))
                        .await
                        .map(|conn| {
                            connection = Some(conn);
                            Event::Connected
                        })
                }
                Action::Send => match connection.as_mut() {
                    Some(conn) => self.bounded(conn.send(&wire)).await.map(|()| {
                        info!(attempt, node = %node, command = %command, "sent");
                        Event::Sent
                    }),
                    None => Err(TransportError::NotConnected),
                },
                Action::Receive => match connection.as_mut() {
                    Some(conn) => self
                        .receive(conn, &mut response)
                        .await
                        .map(|()| Event::ResponseComplete),
                    None => Err(TransportError::NotConnected),
                },
                Action::Close => {
                    if let Some(conn) = connection.take() {
                        if let Err(error) = self.bounded(conn.close()).await {
                            debug!(attempt, node = %node, %error, "close failed");
                        }
                    }
                    continue;
                }
                Action::Wait { delay } => {
                    debug!(attempt, node = %node, delay_ms = millis(delay), "backing off");
                    tokio::time::sleep(delay).await;
                    Ok(Event::BackoffElapsed)
                }
            };

            let event = result.unwrap_or_else(|error| {
                warn!(attempt, node = %node, %error, "attempt failed");
                Event::Failed
            });
            let (next, actions) = state.on_event(&self.policy, event);
            state = next;
            pending.extend(actions);
        }

        let outcome = match state {
            DispatchState::Succeeded { attempt } => {
                if response.truncated() {
                    warn!(
                        attempt,
                        node = %node,
                        bytes = response.len(),
                        "peer closed before sending a newline; returning partial response"
                    );
                }
                DispatchOutcome::Answered {
                    response: response.finish(),
                    attempts: attempt,
                }
            }
            other => DispatchOutcome::Exhausted {
                attempts: other.attempt(),
            },
        };

        match &outcome {
            DispatchOutcome::Answered { attempts, .. } => {
                info!(attempts, node = %node, outcome = "answered", "dispatch finished");
            }
            DispatchOutcome::Exhausted { attempts } => {
                warn!(attempts, node = %node, outcome = "exhausted", "dispatch finished");
            }
        }
        outcome
    }

    /// Text form of [`dispatch`](Self::dispatch): the response, or `""` when
    /// every attempt failed.
    ///
    /// Invalid input (empty host, port 0, a newline in the command) is a
    /// configuration fault and is returned as an error without any I/O.
    pub async fn send_command(
        &self,
        host: &str,
        port: u16,
        command: &str,
    ) -> Result<String, TypesError> {
        let node = NodeEndpoint::new(host, port)?;
        let command = Command::new(command)?;
        let outcome = self.dispatch(&node, &command).await;
        Ok(outcome.response_text().to_string())
    }

    async fn receive(
        &self,
        connection: &mut T::Connection,
        response: &mut ResponseAccumulator,
    ) -> Result<(), TransportError> {
        loop {
            let chunk = self.bounded(connection.recv()).await?;
            if response.push(&chunk).is_done() {
                return Ok(());
            }
        }
    }

    async fn bounded<F, R>(&self, op: F) -> Result<R, TransportError>
    where
        F: Future<Output = Result<R, TransportError>>,
    {
        tokio::time::timeout(self.policy.io_timeout, op)
            .await
            .map_err(|_| TransportError::Timeout)?
    }
}
