//! # kvprobe-client
//!
//! Command delivery for the kvprobe test harness.
//!
//! ## Features
//!
//! - **Dispatcher**: one command, one node, bounded retries with a fixed
//!   backoff, every I/O step bounded by a timeout
//! - **Sequencer**: warm-up, then each command to a uniformly random node
//!   with fixed pacing
//! - **Transport Abstraction**: Pluggable transport layer (TCP, mock)
//! - **Pure State Machine**: Uses kvprobe-core for side-effect-free retry logic
//!
//! ## Example
//!
//! ```ignore
//! use kvprobe_client::{Dispatcher, TcpTransport};
//! use kvprobe_core::RetryPolicy;
//! use kvprobe_types::{Command, NodeEndpoint};
//!
//! let dispatcher = Dispatcher::new(TcpTransport::new(), RetryPolicy::default());
//! let node = NodeEndpoint::new("localhost", 8081)?;
//! let outcome = dispatcher.dispatch(&node, &Command::get("session:user1")?).await;
//! println!("Response: {}", outcome.response_text());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod dispatcher;
pub mod sequencer;
pub mod transport;

pub use dispatcher::Dispatcher;
pub use sequencer::{Sequencer, SequencerConfig};
pub use transport::{
    Connection, MockConnection, MockTransport, TcpConnection, TcpTransport, Transport,
    TransportError,
};
