//! EventList: observable list with transactional change events
//!
//! ## Design Principles
//!
//! 1. **One Event Per Transaction**: every mutator opens a transaction on the
//!    list's [`ChangeAssembler`], edits storage, and commits. Listeners see
//!    exactly one [`ListEvent`] per outermost commit, never an empty one.
//! 2. **Exclusive Writers**: mutators hold the list's [`ReadWriteLock`] in
//!    exclusive mode from before `begin` until after dispatch, so
//!    transactions never interleave and listeners observe them in commit
//!    order. Readers take shared mode.
//! 3. **Owned Storage**: the list owns its [`ListStorage`]. There is no way to
//!    reach the storage except through the list.
//!
//! ## Dispatch
//!
//! Listeners run synchronously before the mutator returns, with the
//! exclusive lock still held but the internal state lock released. A
//! listener may therefore read the list, and may even mutate it (the
//! mutation is a new, separately dispatched transaction). A listener that
//! panics is logged and skipped; the mutation stays applied.
//!
//! ## Consistency Check
//!
//! The list tracks the size it expects after every edit. When
//! `check_consistency` is on and storage disagrees, the transaction is
//! aborted and the mutator returns `ConcurrentAccessViolation`.
//!
//! ## Panics
//!
//! If element comparison or the storage panics while a mutator's
//! transaction is open, the transaction is aborted as the panic unwinds.
//! Edits already applied stay applied but are never announced, and the next
//! mutation starts a fresh top-level transaction.
//!
//! ## Example
//!
//! ```rust
//! use eventlist_primitives::{EventList, ListEvent};
//! use std::sync::Arc;
//!
//! let list: EventList<&str> = EventList::new();
//! list.add_listener(Arc::new(|event: &ListEvent<'_, &str>| {
//!     for block in event.blocks() {
//!         println!("{}", block);
//!     }
//! }));
//! list.append_all(["x", "y", "z"]).unwrap(); // prints INSERT[0,2]
//! ```

use eventlist_concurrency::{
    dispatch, ChangeAssembler, ChangeSet, Commit, ListenerRegistry, ReadWriteLock,
};
use eventlist_core::{ChangeBlock, EventListConfig, Error, ListStorage, Result};
use parking_lot::{RwLock, RwLockWriteGuard};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::panic::{catch_unwind, resume_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error};

/// Receives one call per committed list transaction
pub trait ListEventListener<E, S = Vec<E>>: Send + Sync {
    /// Called after the transaction's edits are applied
    fn list_changed(&self, event: &ListEvent<'_, E, S>);
}

impl<E, S, F> ListEventListener<E, S> for F
where
    F: Fn(&ListEvent<'_, E, S>) + Send + Sync,
{
    fn list_changed(&self, event: &ListEvent<'_, E, S>) {
        self(event)
    }
}

/// Registered list listener handle
pub type SharedListEventListener<E, S = Vec<E>> = Arc<dyn ListEventListener<E, S>>;

/// One committed transaction as seen by a listener
pub struct ListEvent<'a, E, S = Vec<E>> {
    source: &'a EventList<E, S>,
    sequence: u64,
    blocks: Arc<[ChangeBlock]>,
}

impl<'a, E, S> ListEvent<'a, E, S> {
    /// The list that changed
    pub fn source(&self) -> &'a EventList<E, S> {
        self.source
    }

    /// Commit number of this transaction on its list, starting at 1
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Blocks in emission order
    pub fn blocks(&self) -> &[ChangeBlock] {
        &self.blocks
    }

    /// The frozen block sequence shared by every listener of this event
    pub fn shared_blocks(&self) -> Arc<[ChangeBlock]> {
        Arc::clone(&self.blocks)
    }

    /// Number of blocks
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Never true for a dispatched event
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

impl<E, S> fmt::Debug for ListEvent<'_, E, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListEvent")
            .field("sequence", &self.sequence)
            .field("blocks", &self.blocks)
            .finish()
    }
}

struct Inner<E, S> {
    storage: S,
    expected_len: usize,
    assembler: ChangeAssembler,
    listeners: ListenerRegistry<dyn ListEventListener<E, S>>,
}

impl<E, S: ListStorage<E>> Inner<E, S> {
    fn insert_one(&mut self, index: usize, value: E) -> Result<()> {
        self.assembler.add_insert(index, index)?;
        self.storage.insert(index, value);
        self.expected_len += 1;
        Ok(())
    }

    fn insert_many(&mut self, index: usize, values: Vec<E>) -> Result<()> {
        let count = values.len();
        self.assembler.add_insert(index, index + count - 1)?;
        self.storage.insert_all(index, values);
        self.expected_len += count;
        Ok(())
    }

    fn delete_at(&mut self, index: usize) -> Result<E> {
        self.assembler.add_delete(index, index)?;
        let removed = self.storage.remove(index);
        self.expected_len -= 1;
        Ok(removed)
    }
}

/// Write access to the list state held by one mutator.
///
/// Dropped while unwinding with a deeper transaction than it started with,
/// it aborts the assembler.
struct StateGuard<'a, E, S> {
    inner: RwLockWriteGuard<'a, Inner<E, S>>,
    entry_depth: usize,
}

impl<E, S> Deref for StateGuard<'_, E, S> {
    type Target = Inner<E, S>;

    fn deref(&self) -> &Inner<E, S> {
        &self.inner
    }
}

impl<E, S> DerefMut for StateGuard<'_, E, S> {
    fn deref_mut(&mut self) -> &mut Inner<E, S> {
        &mut self.inner
    }
}

impl<E, S> Drop for StateGuard<'_, E, S> {
    fn drop(&mut self) {
        if std::thread::panicking() && self.inner.assembler.depth() > self.entry_depth {
            let discarded = self.inner.assembler.abort();
            error!(
                discarded = discarded.len(),
                "list mutation panicked; transaction aborted"
            );
        }
    }
}

fn check_index(index: usize, size: usize) -> Result<()> {
    if index < size {
        Ok(())
    } else {
        Err(Error::IndexOutOfRange { index, size })
    }
}

fn check_insert_index(index: usize, size: usize) -> Result<()> {
    if index <= size {
        Ok(())
    } else {
        Err(Error::IndexOutOfRange { index, size })
    }
}

/// Observable list backed by an owned storage strategy `S`
pub struct EventList<E, S = Vec<E>> {
    lock: Arc<ReadWriteLock>,
    inner: RwLock<Inner<E, S>>,
    config: EventListConfig,
}

impl<E: Send + Sync> EventList<E> {
    /// Create an empty list with default configuration
    pub fn new() -> Self {
        Self::with_config(EventListConfig::default())
    }

    /// Create an empty list with the given configuration
    pub fn with_config(config: EventListConfig) -> Self {
        let storage = Vec::with_capacity(config.initial_capacity);
        Self::with_storage(storage, config)
    }

    /// Create an empty list that shares `lock` with other containers.
    ///
    /// Every container on the same lock serializes its transactions with the
    /// others.
    pub fn with_lock(lock: Arc<ReadWriteLock>) -> Self {
        Self::with_storage_and_lock(Vec::new(), EventListConfig::default(), lock)
    }
}

impl<E: Send + Sync> Default for EventList<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Send + Sync> FromIterator<E> for EventList<E> {
    fn from_iter<I: IntoIterator<Item = E>>(iter: I) -> Self {
        Self::with_storage(iter.into_iter().collect(), EventListConfig::default())
    }
}

impl<E, S: ListStorage<E>> EventList<E, S> {
    /// Create a list that takes ownership of `storage`
    pub fn with_storage(storage: S, config: EventListConfig) -> Self {
        Self::with_storage_and_lock(storage, config, Arc::new(ReadWriteLock::new()))
    }

    /// Create a list that takes ownership of `storage` and shares `lock`
    pub fn with_storage_and_lock(
        storage: S,
        config: EventListConfig,
        lock: Arc<ReadWriteLock>,
    ) -> Self {
        let expected_len = storage.len();
        Self {
            lock,
            inner: RwLock::new(Inner {
                storage,
                expected_len,
                assembler: ChangeAssembler::new(config.coalescing),
                listeners: ListenerRegistry::new(),
            }),
            config,
        }
    }

    /// The concurrency guard ordering this list's transactions.
    ///
    /// Hold `lock().read()` to make several reads observe one state.
    pub fn lock(&self) -> &Arc<ReadWriteLock> {
        &self.lock
    }

    /// Configuration the list was created with
    pub fn config(&self) -> &EventListConfig {
        &self.config
    }

    // ========== Listeners ==========

    /// Register a listener for all subsequent transactions
    pub fn add_listener(&self, listener: SharedListEventListener<E, S>) {
        let _write = self.lock.write();
        self.inner.write().listeners.add(listener);
    }

    /// Deregister a listener; returns whether it was registered
    pub fn remove_listener(&self, listener: &SharedListEventListener<E, S>) -> bool {
        let _write = self.lock.write();
        self.inner.write().listeners.remove(listener)
    }

    /// Number of registered listeners
    pub fn listener_count(&self) -> usize {
        let _read = self.lock.read();
        self.inner.read().listeners.len()
    }

    // ========== Reads ==========

    /// Number of elements
    pub fn size(&self) -> usize {
        let _read = self.lock.read();
        self.inner.read().storage.len()
    }

    /// True when the list has no elements
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Clone of the element at `index`
    pub fn get(&self, index: usize) -> Option<E>
    where
        E: Clone,
    {
        let _read = self.lock.read();
        self.inner.read().storage.get(index).cloned()
    }

    /// Index of the first element equal to `value`
    pub fn index_of(&self, value: &E) -> Option<usize>
    where
        E: PartialEq,
    {
        let _read = self.lock.read();
        self.inner.read().storage.position(&mut |e| e == value)
    }

    /// True if some element equals `value`
    pub fn contains(&self, value: &E) -> bool
    where
        E: PartialEq,
    {
        self.index_of(value).is_some()
    }

    /// Copy of every element, in order
    pub fn to_vec(&self) -> Vec<E>
    where
        E: Clone,
    {
        let _read = self.lock.read();
        let inner = self.inner.read();
        (0..inner.storage.len())
            .filter_map(|i| inner.storage.get(i).cloned())
            .collect()
    }

    // ========== Inserts ==========

    /// Insert `value` at `index` (`0..=size`); returns the new size
    pub fn insert(&self, index: usize, value: E) -> Result<usize> {
        let _write = self.lock.write();
        let mut inner = self.state();
        check_insert_index(index, inner.storage.len())?;
        inner.assembler.begin(true)?;
        inner.insert_one(index, value)?;
        let size = inner.expected_len;
        self.finish(inner)?;
        Ok(size)
    }

    /// Append `value`; returns the new size
    pub fn push(&self, value: E) -> Result<usize> {
        let _write = self.lock.write();
        let mut inner = self.state();
        let index = inner.storage.len();
        inner.assembler.begin(true)?;
        inner.insert_one(index, value)?;
        let size = inner.expected_len;
        self.finish(inner)?;
        Ok(size)
    }

    /// Insert every value at `index`, in order.
    ///
    /// Returns `Ok(false)` without opening a transaction when `values` is
    /// empty.
    pub fn insert_all(&self, index: usize, values: impl IntoIterator<Item = E>) -> Result<bool> {
        let values: Vec<E> = values.into_iter().collect();
        if values.is_empty() {
            return Ok(false);
        }
        let _write = self.lock.write();
        let mut inner = self.state();
        check_insert_index(index, inner.storage.len())?;
        inner.assembler.begin(true)?;
        inner.insert_many(index, values)?;
        self.finish(inner)?;
        Ok(true)
    }

    /// Append every value, in order.
    ///
    /// Returns `Ok(false)` without opening a transaction when `values` is
    /// empty.
    pub fn append_all(&self, values: impl IntoIterator<Item = E>) -> Result<bool> {
        let values: Vec<E> = values.into_iter().collect();
        if values.is_empty() {
            return Ok(false);
        }
        let _write = self.lock.write();
        let mut inner = self.state();
        let index = inner.storage.len();
        inner.assembler.begin(true)?;
        inner.insert_many(index, values)?;
        self.finish(inner)?;
        Ok(true)
    }

    // ========== Removes ==========

    /// Remove and return the element at `index` (`0..size`)
    pub fn remove_at(&self, index: usize) -> Result<E> {
        let _write = self.lock.write();
        let mut inner = self.state();
        check_index(index, inner.storage.len())?;
        inner.assembler.begin(true)?;
        let removed = inner.delete_at(index)?;
        self.finish(inner)?;
        Ok(removed)
    }

    /// Remove the first element equal to `value`.
    ///
    /// Returns `Ok(None)` without opening a transaction when no element
    /// matches.
    pub fn remove_value(&self, value: &E) -> Result<Option<E>>
    where
        E: PartialEq,
    {
        let _write = self.lock.write();
        let mut inner = self.state();
        let index = match inner.storage.position(&mut |e| e == value) {
            Some(index) => index,
            None => return Ok(None),
        };
        inner.assembler.begin(true)?;
        let removed = inner.delete_at(index)?;
        self.finish(inner)?;
        Ok(Some(removed))
    }

    /// Remove every occurrence of every value in `values`, in one
    /// transaction with one delete per removed occurrence.
    ///
    /// Returns whether anything was removed. An empty `values` opens no
    /// transaction.
    pub fn remove_all(&self, values: &[E]) -> Result<bool>
    where
        E: PartialEq,
    {
        if values.is_empty() {
            return Ok(false);
        }
        let _write = self.lock.write();
        let mut inner = self.state();
        inner.assembler.begin(true)?;
        let mut changed = false;
        for value in values {
            while let Some(index) = inner.storage.position(&mut |e| e == value) {
                inner.delete_at(index)?;
                changed = true;
            }
        }
        self.finish(inner)?;
        Ok(changed)
    }

    /// Remove every element not present in `values`, in one transaction.
    ///
    /// Scans from index 0; after a deletion the same index is tested again
    /// since later elements shifted left. Returns whether anything was
    /// removed.
    pub fn retain_all(&self, values: &[E]) -> Result<bool>
    where
        E: PartialEq,
    {
        let _write = self.lock.write();
        let mut inner = self.state();
        inner.assembler.begin(true)?;
        let mut changed = false;
        let mut index = 0;
        while index < inner.storage.len() {
            let keep = inner
                .storage
                .get(index)
                .map_or(false, |e| values.contains(e));
            if keep {
                index += 1;
            } else {
                inner.delete_at(index)?;
                changed = true;
            }
        }
        self.finish(inner)?;
        Ok(changed)
    }

    /// Remove every element; a no-op on an empty list
    pub fn clear(&self) -> Result<()> {
        let _write = self.lock.write();
        let mut inner = self.state();
        let size = inner.storage.len();
        if size == 0 {
            return Ok(());
        }
        inner.assembler.begin(true)?;
        inner.assembler.add_delete(0, size - 1)?;
        inner.storage.clear();
        inner.expected_len = 0;
        self.finish(inner)
    }

    // ========== Updates ==========

    /// Replace the element at `index` (`0..size`); returns the previous value
    pub fn set(&self, index: usize, value: E) -> Result<E> {
        let _write = self.lock.write();
        let mut inner = self.state();
        check_index(index, inner.storage.len())?;
        inner.assembler.begin(true)?;
        inner.assembler.add_update(index, index)?;
        let previous = inner.storage.set(index, value);
        self.finish(inner)?;
        Ok(previous)
    }

    // ========== Batches ==========

    /// Run several mutations as one transaction.
    ///
    /// Every mutation made through `list` inside `f` nests into one outer
    /// transaction, and listeners receive a single event when `f` returns.
    /// The transaction is committed even if `f` fails, since applied edits
    /// cannot be undone; `f`'s error is then returned. If `f` panics, the
    /// open transaction is aborted without notification and the panic
    /// resumes.
    ///
    /// ```rust
    /// use eventlist_primitives::EventList;
    ///
    /// let list: EventList<u32> = EventList::new();
    /// list.batch(|l| {
    ///     l.push(1)?;
    ///     l.push(2)?;
    ///     l.set(0, 10)
    /// })
    /// .unwrap();
    /// assert_eq!(list.to_vec(), vec![10, 2]);
    /// ```
    pub fn batch<T>(&self, f: impl FnOnce(&Self) -> Result<T>) -> Result<T> {
        let _write = self.lock.write();
        self.inner.write().assembler.begin(true)?;
        let result = match catch_unwind(AssertUnwindSafe(|| f(self))) {
            Ok(result) => result,
            Err(panic) => {
                let discarded = self.inner.write().assembler.abort();
                error!(
                    discarded = discarded.len(),
                    "batch closure panicked; transaction aborted"
                );
                resume_unwind(panic)
            }
        };

        let inner = self.state();
        // A consistency failure inside `f` already closed the transaction
        if !inner.assembler.is_open() {
            return result;
        }
        let finished = self.finish(inner);
        match (result, finished) {
            (Err(e), _) => Err(e),
            (Ok(_), Err(e)) => Err(e),
            (Ok(value), Ok(())) => Ok(value),
        }
    }

    // ========== Commit ==========

    fn state(&self) -> StateGuard<'_, E, S> {
        let inner = self.inner.write();
        let entry_depth = inner.assembler.depth();
        StateGuard { inner, entry_depth }
    }

    fn finish(&self, mut inner: StateGuard<'_, E, S>) -> Result<()> {
        if self.config.check_consistency {
            let actual = inner.storage.len();
            let expected = inner.expected_len;
            if actual != expected {
                let discarded = inner.assembler.abort();
                inner.expected_len = actual;
                error!(
                    expected,
                    actual,
                    discarded = discarded.len(),
                    "event list storage diverged from tracked size; transaction aborted"
                );
                return Err(Error::ConcurrentAccessViolation { expected, actual });
            }
        }

        let commit = inner.assembler.commit()?;
        match commit {
            Commit::Ready(changes) => {
                let listeners = inner.listeners.snapshot();
                drop(inner);
                self.notify(changes, &listeners);
            }
            Commit::Nested | Commit::Empty => {}
        }
        Ok(())
    }

    fn notify(&self, changes: ChangeSet, listeners: &[SharedListEventListener<E, S>]) {
        let event = ListEvent {
            source: self,
            sequence: changes.sequence,
            blocks: changes.blocks,
        };
        let report = dispatch(listeners, "event_list", |l| l.list_changed(&event));
        debug!(
            sequence = event.sequence,
            blocks = event.blocks.len(),
            listeners = report.invoked(),
            failed = report.failed,
            "dispatched list change"
        );
    }
}

impl<E, S: ListStorage<E>> fmt::Debug for EventList<E, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventList")
            .field("size", &self.size())
            .field("listeners", &self.listener_count())
            .field("config", &self.config)
            .finish()
    }
}
