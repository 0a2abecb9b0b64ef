//! Replication of resources between peers
//!
//! Peers exchange [`ResourceUpdate`] envelopes: a resource name, the kind of
//! payload (full snapshot or delta), the source version the payload was
//! taken at, and the payload itself. Envelopes travel as MessagePack bytes.
//!
//! - [`ResourcePublisher`] listens to a local resource and forwards every
//!   change to its [`UpdateSink`]s.
//! - [`LocalReplica`] is a sink that applies updates to another resource in
//!   the same process, skipping anything at or below the version it has
//!   already applied.
//!
//! Transport is out of scope here. A networked peer implements
//! [`UpdateSink`] by writing [`ResourceUpdate::to_bytes`] to its connection
//! and feeding received bytes to [`ResourceUpdate::from_bytes`] and
//! [`ResourceUpdate::apply_to`].

use crate::resource::{Resource, ResourceListener};
use eventlist_core::{decode_exact, Error, Payload, ResourceName, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// What an update's payload contains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateKind {
    /// Full state, applied with `from_snapshot`
    Snapshot,
    /// Change, applied with `update`
    Delta,
}

/// Replication envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceUpdate {
    /// Target resource
    pub resource: ResourceName,
    /// Payload kind
    pub kind: UpdateKind,
    /// Source version the payload reflects
    pub sequence: u64,
    /// Encoded state or change
    pub payload: Payload,
}

impl ResourceUpdate {
    /// Full-state envelope
    pub fn snapshot(resource: ResourceName, sequence: u64, payload: Payload) -> Self {
        Self {
            resource,
            kind: UpdateKind::Snapshot,
            sequence,
            payload,
        }
    }

    /// Change envelope
    pub fn delta(resource: ResourceName, sequence: u64, payload: Payload) -> Self {
        Self {
            resource,
            kind: UpdateKind::Delta,
            sequence,
            payload,
        }
    }

    /// Capture `resource`'s current state as a snapshot envelope
    pub fn capture(resource: &dyn Resource) -> Result<Self> {
        let _read = resource.lock().read();
        Ok(Self::snapshot(
            resource.name().clone(),
            resource.version(),
            resource.to_snapshot()?,
        ))
    }

    /// Encode for the wire
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(rmp_serde::to_vec_named(self)?)
    }

    /// Decode from the wire; `bytes` must hold exactly one envelope
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        decode_exact(bytes)
    }

    /// Apply to `resource`, which must carry the same name
    pub fn apply_to(&self, resource: &dyn Resource) -> Result<()> {
        if resource.name() != &self.resource {
            return Err(Error::ResourceMismatch {
                expected: resource.name().to_string(),
                actual: self.resource.to_string(),
            });
        }
        match self.kind {
            UpdateKind::Snapshot => resource.from_snapshot(&self.payload),
            UpdateKind::Delta => resource.update(&self.payload),
        }
    }
}

/// Destination for outgoing updates
pub trait UpdateSink: Send + Sync {
    /// Deliver one update
    fn send(&self, update: &ResourceUpdate) -> Result<()>;
}

/// Forwards every change of the resources it listens to.
///
/// Register it on a resource with `add_resource_listener` (or use
/// [`ResourcePublisher::attach_peer`] for a peer that needs a baseline).
/// Each change becomes a [`UpdateKind::Delta`] envelope numbered with the
/// resource's version. A sink that fails is logged and skipped.
#[derive(Default)]
pub struct ResourcePublisher {
    sinks: Mutex<Vec<Arc<dyn UpdateSink>>>,
}

impl ResourcePublisher {
    /// Create a publisher without sinks
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sink that receives subsequent changes only
    pub fn add_sink(&self, sink: Arc<dyn UpdateSink>) {
        self.sinks.lock().push(sink);
    }

    /// Remove a sink by identity; returns whether it was present
    pub fn remove_sink(&self, sink: &Arc<dyn UpdateSink>) -> bool {
        let mut sinks = self.sinks.lock();
        let target = Arc::as_ptr(sink) as *const ();
        match sinks.iter().position(|s| Arc::as_ptr(s) as *const () == target) {
            Some(index) => {
                sinks.remove(index);
                true
            }
            None => false,
        }
    }

    /// Number of sinks
    pub fn sink_count(&self) -> usize {
        self.sinks.lock().len()
    }

    /// Send `resource`'s current snapshot to `sink`, then add the sink.
    ///
    /// Both steps happen under the resource's exclusive lock, so the sink
    /// receives every change after its baseline and none before it.
    pub fn attach_peer(&self, resource: &dyn Resource, sink: Arc<dyn UpdateSink>) -> Result<()> {
        let _write = resource.lock().write();
        let baseline = ResourceUpdate::capture(resource)?;
        sink.send(&baseline)?;
        self.add_sink(sink);
        debug!(resource = %baseline.resource, version = baseline.sequence, "peer attached");
        Ok(())
    }
}

impl ResourceListener for ResourcePublisher {
    fn resource_updated(&self, resource: &dyn Resource, snapshot: &Payload) {
        let update =
            ResourceUpdate::delta(resource.name().clone(), resource.version(), snapshot.clone());
        let sinks = self.sinks.lock().clone();
        for sink in &sinks {
            if let Err(e) = sink.send(&update) {
                error!(
                    resource = %update.resource,
                    sequence = update.sequence,
                    error = %e,
                    "failed to deliver resource update"
                );
            }
        }
    }
}

/// Sink applying updates to a resource in this process
pub struct LocalReplica {
    target: Arc<dyn Resource>,
    last_applied: Mutex<Option<u64>>,
}

impl LocalReplica {
    /// Replica writing into `target`
    pub fn new(target: Arc<dyn Resource>) -> Self {
        Self {
            target,
            last_applied: Mutex::new(None),
        }
    }

    /// The replicated resource
    pub fn target(&self) -> &Arc<dyn Resource> {
        &self.target
    }

    /// Sequence of the newest applied update
    pub fn last_applied(&self) -> Option<u64> {
        *self.last_applied.lock()
    }
}

impl UpdateSink for LocalReplica {
    fn send(&self, update: &ResourceUpdate) -> Result<()> {
        let mut last = self.last_applied.lock();
        if let Some(applied) = *last {
            if update.sequence <= applied {
                warn!(
                    resource = %update.resource,
                    sequence = update.sequence,
                    last_applied = applied,
                    "ignoring stale resource update"
                );
                return Ok(());
            }
        }
        update.apply_to(&*self.target)?;
        *last = Some(update.sequence);
        Ok(())
    }
}
