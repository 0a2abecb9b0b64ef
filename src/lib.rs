//! EventList - observable lists and replicated resources
//!
//! An [`EventList`] publishes every transaction as one [`ListEvent`]: an
//! ordered sequence of insert, delete and update [`ChangeBlock`]s that a
//! listener can replay to mirror the list. Several mutations can be grouped
//! into one event with [`EventList::batch`].
//!
//! A [`Resource`] is named state exchanged between peers as opaque
//! snapshots and deltas; [`ResourcePublisher`] and [`LocalReplica`] move
//! [`ResourceUpdate`] envelopes between them.
//!
//! # Quick Start
//!
//! ```
//! use eventlist::{ChangeBlock, EventList, ListEvent};
//! use std::sync::{Arc, Mutex};
//!
//! let list: EventList<char> = "ABC".chars().collect();
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let sink = Arc::clone(&seen);
//! list.add_listener(Arc::new(move |e: &ListEvent<'_, char>| {
//!     sink.lock().unwrap().extend_from_slice(e.blocks());
//! }));
//!
//! list.remove_at(1)?;
//! assert_eq!(list.to_vec(), vec!['A', 'C']);
//! assert_eq!(*seen.lock().unwrap(), vec![ChangeBlock::delete(1, 1)]);
//! # Ok::<(), eventlist::Error>(())
//! ```
//!
//! # Architecture
//!
//! - `eventlist-core`: change blocks, payloads, storage strategies, config,
//!   errors
//! - `eventlist-concurrency`: the re-entrant lock, the change assembler and
//!   listener dispatch
//! - `eventlist-primitives`: the containers themselves

pub use eventlist_concurrency::{ChangeAssembler, ChangeSet, Commit};
pub use eventlist_core::*;
pub use eventlist_primitives::*;
