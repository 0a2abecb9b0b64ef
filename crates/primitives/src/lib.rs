//! Observable containers for eventlist
//!
//! Provides the containers applications observe and replicate:
//! - **EventList**: list whose every transaction is published as one event
//!   of index-range change blocks
//! - **Resource**: named state exchanged as opaque snapshots and deltas
//! - **ValueResource / StringResource**: resource holding one serializable
//!   value
//! - **ResourcePublisher / LocalReplica**: forward resource changes to peers
//!   and apply them on the other side
//!
//! ## Design Principle: One Guard Per Container
//!
//! Every container owns (or shares) a re-entrant [`ReadWriteLock`]. Writers
//! hold it exclusively from the first edit until all listeners have been
//! notified, so events arrive in commit order and never interleave.
//! Containers created on the same lock serialize with each other.
//!
//! ```rust
//! use eventlist_primitives::{EventList, ListEvent};
//! use std::sync::Arc;
//!
//! let list: EventList<char> = "ABAC".chars().collect();
//! list.add_listener(Arc::new(|event: &ListEvent<'_, char>| {
//!     assert_eq!(event.len(), 2);
//! }));
//! list.remove_all(&['A']).unwrap();
//! assert_eq!(list.to_vec(), vec!['B', 'C']);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod event_list;
pub mod replication;
pub mod resource;

pub use event_list::{EventList, ListEvent, ListEventListener, SharedListEventListener};
pub use replication::{LocalReplica, ResourcePublisher, ResourceUpdate, UpdateKind, UpdateSink};
pub use resource::{
    Resource, ResourceListener, ResourceState, SharedResourceListener, StringResource,
    ValueResource,
};

pub use eventlist_concurrency::ReadWriteLock;
