//! Concurrency layer for eventlist
//!
//! This crate implements the transactional machinery shared by every
//! observable container:
//! - ReadWriteLock: re-entrant reader/writer concurrency guard
//! - ChangeAssembler: begin/record/commit of change blocks with coalescing
//! - ListenerRegistry: owned listener sets with panic-isolated dispatch

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod assembler;
pub mod lock;
pub mod registry;

pub use assembler::{ChangeAssembler, ChangeSet, Commit};
pub use lock::{ReadGuard, ReadWriteLock, WriteGuard};
pub use registry::{dispatch, DispatchReport, ListenerRegistry};
