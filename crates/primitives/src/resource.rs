//! Replicated resources
//!
//! A [`Resource`] is a named piece of state that can be captured as an opaque
//! snapshot, rebuilt from one, and advanced by a delta. Local writes and
//! remote updates go through the same path: the value is replaced under the
//! resource's exclusive lock, the version is bumped, and every
//! [`ResourceListener`] receives the new full snapshot before the lock is
//! released.
//!
//! [`Resource::subscribe`] registers a listener and returns the current
//! snapshot in one exclusive section. A subscriber therefore never misses an
//! update that lands between reading the baseline and registering.

use eventlist_concurrency::{dispatch, ListenerRegistry, ReadWriteLock};
use eventlist_core::{Payload, ResourceName, Result};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Synchronization state of a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceState {
    /// Holds its initial default value
    Uninitialized,
    /// Has received at least one write or update
    Synchronized,
}

/// Notified after every change of a resource
pub trait ResourceListener: Send + Sync {
    /// `snapshot` is the resource's full state after the change
    fn resource_updated(&self, resource: &dyn Resource, snapshot: &Payload);
}

impl<F> ResourceListener for F
where
    F: Fn(&dyn Resource, &Payload) + Send + Sync,
{
    fn resource_updated(&self, resource: &dyn Resource, snapshot: &Payload) {
        self(resource, snapshot)
    }
}

/// Registered resource listener handle
pub type SharedResourceListener = Arc<dyn ResourceListener>;

/// Named state that can be snapshotted, restored and updated
pub trait Resource: Send + Sync {
    /// Identity used to route replication traffic
    fn name(&self) -> &ResourceName;

    /// Serialize the full current state
    fn to_snapshot(&self) -> Result<Payload>;

    /// Replace the state from a snapshot and notify listeners.
    ///
    /// A payload that does not decode leaves the state unchanged and
    /// notifies nobody.
    fn from_snapshot(&self, snapshot: &Payload) -> Result<()>;

    /// Apply a delta and notify listeners
    fn update(&self, delta: &Payload) -> Result<()>;

    /// Register a listener
    fn add_resource_listener(&self, listener: SharedResourceListener);

    /// Deregister a listener; returns whether it was registered
    fn remove_resource_listener(&self, listener: &SharedResourceListener) -> bool;

    /// Register `listener` and return the snapshot it starts from
    fn subscribe(&self, listener: SharedResourceListener) -> Result<Payload>;

    /// Current synchronization state
    fn state(&self) -> ResourceState;

    /// Number of applied changes
    fn version(&self) -> u64;

    /// Concurrency guard ordering this resource's changes
    fn lock(&self) -> &ReadWriteLock;
}

struct Inner<T> {
    value: T,
    state: ResourceState,
    version: u64,
    listeners: ListenerRegistry<dyn ResourceListener>,
}

/// Resource holding a single serializable value.
///
/// Snapshots and deltas both carry the whole value, encoded with
/// MessagePack.
pub struct ValueResource<T> {
    name: ResourceName,
    lock: Arc<ReadWriteLock>,
    inner: RwLock<Inner<T>>,
}

/// Replicated text value
pub type StringResource = ValueResource<String>;

impl<T> ValueResource<T>
where
    T: Serialize + DeserializeOwned + Clone + Default + Send + Sync + 'static,
{
    /// Create an uninitialized resource holding `T::default()`
    pub fn new(name: impl Into<ResourceName>) -> Self {
        Self::with_lock(name, Arc::new(ReadWriteLock::new()))
    }

    /// Create an uninitialized resource on a shared lock
    pub fn with_lock(name: impl Into<ResourceName>, lock: Arc<ReadWriteLock>) -> Self {
        Self {
            name: name.into(),
            lock,
            inner: RwLock::new(Inner {
                value: T::default(),
                state: ResourceState::Uninitialized,
                version: 0,
                listeners: ListenerRegistry::new(),
            }),
        }
    }

    /// Clone of the current value
    pub fn value(&self) -> T {
        let _read = self.lock.read();
        self.inner.read().value.clone()
    }

    /// Replace the value locally and notify listeners
    pub fn set_value(&self, value: T) -> Result<()> {
        self.replace(value, "local")
    }

    /// Number of registered listeners
    pub fn listener_count(&self) -> usize {
        let _read = self.lock.read();
        self.inner.read().listeners.len()
    }

    fn decode(&self, payload: &Payload, what: &str) -> Result<T> {
        payload.decode().map_err(|e| {
            warn!(
                resource = %self.name,
                payload = what,
                bytes = payload.len(),
                error = %e,
                "rejected undecodable payload"
            );
            e
        })
    }

    fn replace(&self, value: T, origin: &str) -> Result<()> {
        let _write = self.lock.write();
        let snapshot = Payload::encode(&value)?;
        let (version, listeners) = {
            let mut inner = self.inner.write();
            inner.value = value;
            inner.state = ResourceState::Synchronized;
            inner.version += 1;
            (inner.version, inner.listeners.snapshot())
        };
        let report = dispatch(&listeners, "resource", |l| l.resource_updated(self, &snapshot));
        debug!(
            resource = %self.name,
            origin,
            version,
            listeners = report.invoked(),
            failed = report.failed,
            "resource updated"
        );
        Ok(())
    }
}

impl<T> Resource for ValueResource<T>
where
    T: Serialize + DeserializeOwned + Clone + Default + Send + Sync + 'static,
{
    fn name(&self) -> &ResourceName {
        &self.name
    }

    fn to_snapshot(&self) -> Result<Payload> {
        let _read = self.lock.read();
        Payload::encode(&self.inner.read().value)
    }

    fn from_snapshot(&self, snapshot: &Payload) -> Result<()> {
        let value = self.decode(snapshot, "snapshot")?;
        self.replace(value, "snapshot")
    }

    fn update(&self, delta: &Payload) -> Result<()> {
        let value = self.decode(delta, "delta")?;
        self.replace(value, "delta")
    }

    fn add_resource_listener(&self, listener: SharedResourceListener) {
        let _write = self.lock.write();
        self.inner.write().listeners.add(listener);
    }

    fn remove_resource_listener(&self, listener: &SharedResourceListener) -> bool {
        let _write = self.lock.write();
        self.inner.write().listeners.remove(listener)
    }

    fn subscribe(&self, listener: SharedResourceListener) -> Result<Payload> {
        let _write = self.lock.write();
        let mut inner = self.inner.write();
        let snapshot = Payload::encode(&inner.value)?;
        inner.listeners.add(listener);
        Ok(snapshot)
    }

    fn state(&self) -> ResourceState {
        let _read = self.lock.read();
        self.inner.read().state
    }

    fn version(&self) -> u64 {
        let _read = self.lock.read();
        self.inner.read().version
    }

    fn lock(&self) -> &ReadWriteLock {
        &self.lock
    }
}

impl<T: fmt::Debug> fmt::Debug for ValueResource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let _read = self.lock.read();
        let inner = self.inner.read();
        f.debug_struct("ValueResource")
            .field("name", &self.name)
            .field("value", &inner.value)
            .field("state", &inner.state)
            .field("version", &inner.version)
            .finish()
    }
}
