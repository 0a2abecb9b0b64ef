//! Core types for eventlist
//!
//! This crate defines the foundational types used throughout the system:
//! - ChangeKind / ChangeBlock: the records a list transaction is made of
//! - Payload: opaque binary snapshot/delta exchanged between replicas
//! - ResourceName: identity of a replicated resource
//! - ListStorage: backing storage strategy owned by an event list
//! - EventListConfig: coalescing and consistency-check settings
//! - Error: Error type hierarchy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod change;
pub mod config;
pub mod error;
pub mod payload;
pub mod storage;

pub use change::{coverage, net_size_delta, ChangeBlock, ChangeKind};
pub use config::{Coalescing, EventListConfig};
pub use error::{Error, Result};
pub use payload::{decode_exact, Payload, ResourceName};
pub use storage::ListStorage;
