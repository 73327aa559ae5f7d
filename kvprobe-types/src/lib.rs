//! # kvprobe-types
//!
//! Data model for the kvprobe test harness.
//!
//! This crate provides the types shared by every kvprobe crate:
//! - [`NodeEndpoint`], [`NodeSet`] - Addresses of the key-value nodes under test
//! - [`Command`] - An opaque request line sent to a node
//! - [`DispatchOutcome`], [`CommandOutcome`], [`RunReport`] - What came back
//! - [`TypesError`] - Validation errors

#![warn(missing_docs)]
#![warn(clippy::all)]

mod command;
mod endpoint;
mod error;
mod outcome;

pub use command::Command;
pub use endpoint::{NodeEndpoint, NodeSet};
pub use error::TypesError;
pub use outcome::{CommandOutcome, DispatchOutcome, RunReport};
