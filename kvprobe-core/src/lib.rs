//! # kvprobe-core
//!
//! Pure logic for kvprobe (no I/O, instant tests).
//!
//! This crate implements the retry state machine, response framing,
//! node selection, and outcome assertions without any network I/O.
//!
//! ## Design Philosophy
//!
//! All modules in this crate are **pure** - they take input and produce output
//! without side effects. The socket work is done by `kvprobe-client`, which
//! interprets the actions produced by [`DispatchState`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod assertions;
pub mod dispatch;
pub mod response;
pub mod selection;

pub use assertions::{
    assert_all_answered, assert_outcome_count, assert_response_eq, AssertionResult,
};
pub use dispatch::{Action, DispatchState, Event, RetryPolicy};
pub use response::{trim_response, ReadStatus, ResponseAccumulator, READ_CHUNK_SIZE};
pub use selection::select_node;
