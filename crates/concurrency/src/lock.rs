//! Reader/writer lock shared by event lists and resources
//!
//! `ReadWriteLock` is the concurrency guard every mutable container acquires:
//! shared mode for reads, exclusive mode for the whole duration of a
//! mutation (begin, edit, commit, listener dispatch).
//!
//! ## Semantics
//!
//! - Exclusive mode is re-entrant for the thread holding it.
//! - The writing thread may also take shared mode; the read nests inside the
//!   write hold and releases back into it.
//! - Shared mode is re-entrant for a thread already reading, even when a
//!   writer is queued. Without this a listener reading the list from inside
//!   a read section would deadlock behind the queued writer.
//! - A queued writer blocks *new* readers (writer preference).
//! - Upgrading a read hold to a write hold is rejected with a panic: the
//!   upgrade can never be granted while the caller itself holds a read.
//!
//! Guards release on drop, so every exit path (return, `?`, unwinding)
//! releases. Guards are `!Send`: ownership is tracked per thread.
//!
//! The lock carries no data. Containers keep their state behind their own
//! short-lived inner lock and use this one to order whole transactions.

use parking_lot::{Condvar, Mutex, MutexGuard};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

#[derive(Default)]
struct LockState {
    /// Thread currently holding exclusive mode
    writer: Option<ThreadId>,
    /// Re-entrant exclusive holds (including reads nested in the write)
    write_holds: usize,
    /// Shared holds per reading thread
    readers: HashMap<ThreadId, usize>,
    /// Writers blocked waiting for exclusive mode
    queued_writers: usize,
}

impl LockState {
    fn can_read(&self) -> bool {
        self.writer.is_none() && self.queued_writers == 0
    }

    fn can_write(&self) -> bool {
        self.writer.is_none() && self.readers.is_empty()
    }
}

/// Re-entrant reader/writer lock
pub struct ReadWriteLock {
    state: Mutex<LockState>,
    readers_cv: Condvar,
    writers_cv: Condvar,
}

impl Default for ReadWriteLock {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ReadWriteLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ReadWriteLock")
            .field("writer", &state.writer)
            .field("write_holds", &state.write_holds)
            .field("readers", &state.readers.len())
            .field("queued_writers", &state.queued_writers)
            .finish()
    }
}

impl ReadWriteLock {
    /// Create an unlocked lock
    pub fn new() -> Self {
        Self {
            state: Mutex::new(LockState::default()),
            readers_cv: Condvar::new(),
            writers_cv: Condvar::new(),
        }
    }

    // ========== Shared Mode ==========

    /// Acquire shared mode, blocking while a writer holds or waits.
    pub fn read(&self) -> ReadGuard<'_> {
        loop {
            if let Some(guard) = self.acquire_read(None) {
                return guard;
            }
        }
    }

    /// Acquire shared mode without blocking
    pub fn try_read(&self) -> Option<ReadGuard<'_>> {
        self.acquire_read(Some(Instant::now()))
    }

    /// Acquire shared mode, giving up after `timeout`
    pub fn try_read_for(&self, timeout: Duration) -> Option<ReadGuard<'_>> {
        self.acquire_read(Some(Instant::now() + timeout))
    }

    fn acquire_read(&self, deadline: Option<Instant>) -> Option<ReadGuard<'_>> {
        let me = thread::current().id();
        let mut state = self.state.lock();

        if state.writer == Some(me) {
            state.write_holds += 1;
            return Some(ReadGuard::new(self, me, true));
        }
        if let Some(holds) = state.readers.get_mut(&me) {
            *holds += 1;
            return Some(ReadGuard::new(self, me, false));
        }

        while !state.can_read() {
            if !Self::wait(&self.readers_cv, &mut state, deadline) && !state.can_read() {
                return None;
            }
        }
        *state.readers.entry(me).or_insert(0) += 1;
        Some(ReadGuard::new(self, me, false))
    }

    fn release_read(&self, owner: ThreadId, nested_in_write: bool) {
        if nested_in_write {
            self.release_write();
            return;
        }
        let mut state = self.state.lock();
        if let Some(holds) = state.readers.get_mut(&owner) {
            *holds -= 1;
            if *holds == 0 {
                state.readers.remove(&owner);
            }
        }
        if state.readers.is_empty() && state.queued_writers > 0 {
            self.writers_cv.notify_one();
        }
    }

    // ========== Exclusive Mode ==========

    /// Acquire exclusive mode, blocking until every reader and any other
    /// writer has released.
    ///
    /// # Panics
    ///
    /// Panics if the calling thread holds shared mode without holding
    /// exclusive mode (the upgrade could never be granted).
    pub fn write(&self) -> WriteGuard<'_> {
        loop {
            if let Some(guard) = self.acquire_write(None) {
                return guard;
            }
        }
    }

    /// Acquire exclusive mode without blocking
    ///
    /// # Panics
    ///
    /// Same upgrade rule as [`ReadWriteLock::write`].
    pub fn try_write(&self) -> Option<WriteGuard<'_>> {
        self.acquire_write(Some(Instant::now()))
    }

    /// Acquire exclusive mode, giving up after `timeout`
    ///
    /// # Panics
    ///
    /// Same upgrade rule as [`ReadWriteLock::write`].
    pub fn try_write_for(&self, timeout: Duration) -> Option<WriteGuard<'_>> {
        self.acquire_write(Some(Instant::now() + timeout))
    }

    fn acquire_write(&self, deadline: Option<Instant>) -> Option<WriteGuard<'_>> {
        let me = thread::current().id();
        let mut state = self.state.lock();

        if state.writer == Some(me) {
            state.write_holds += 1;
            return Some(WriteGuard::new(self));
        }
        if state.readers.contains_key(&me) {
            drop(state);
            panic!("ReadWriteLock: cannot upgrade a read hold to a write hold");
        }

        state.queued_writers += 1;
        while !state.can_write() {
            if !Self::wait(&self.writers_cv, &mut state, deadline) && !state.can_write() {
                state.queued_writers -= 1;
                if state.queued_writers == 0 && state.writer.is_none() {
                    self.readers_cv.notify_all();
                } else if state.can_write() {
                    // Pass the wakeup on to the next queued writer
                    self.writers_cv.notify_one();
                }
                return None;
            }
        }
        state.queued_writers -= 1;
        state.writer = Some(me);
        state.write_holds = 1;
        Some(WriteGuard::new(self))
    }

    fn release_write(&self) {
        let mut state = self.state.lock();
        state.write_holds -= 1;
        if state.write_holds > 0 {
            return;
        }
        state.writer = None;
        if state.queued_writers > 0 {
            self.writers_cv.notify_one();
        } else {
            self.readers_cv.notify_all();
        }
    }

    fn wait(
        cv: &Condvar,
        state: &mut MutexGuard<'_, LockState>,
        deadline: Option<Instant>,
    ) -> bool {
        match deadline {
            None => {
                cv.wait(state);
                true
            }
            Some(deadline) => !cv.wait_until(state, deadline).timed_out(),
        }
    }

    // ========== Introspection ==========

    /// True if any thread holds exclusive mode
    pub fn is_write_locked(&self) -> bool {
        self.state.lock().writer.is_some()
    }

    /// True if the calling thread holds exclusive mode
    pub fn is_write_locked_by_current_thread(&self) -> bool {
        self.state.lock().writer == Some(thread::current().id())
    }

    /// Exclusive holds of the calling thread (0 when it is not the writer)
    pub fn write_hold_count(&self) -> usize {
        let state = self.state.lock();
        if state.writer == Some(thread::current().id()) {
            state.write_holds
        } else {
            0
        }
    }

    /// Number of distinct threads holding shared mode
    pub fn reader_count(&self) -> usize {
        self.state.lock().readers.len()
    }

    /// Number of writers blocked waiting for exclusive mode
    pub fn queued_writers(&self) -> usize {
        self.state.lock().queued_writers
    }
}

/// Shared-mode hold, released on drop
#[must_use = "the read lock is released as soon as the guard is dropped"]
pub struct ReadGuard<'a> {
    lock: &'a ReadWriteLock,
    owner: ThreadId,
    nested_in_write: bool,
    _not_send: PhantomData<*const ()>,
}

impl<'a> ReadGuard<'a> {
    fn new(lock: &'a ReadWriteLock, owner: ThreadId, nested_in_write: bool) -> Self {
        Self {
            lock,
            owner,
            nested_in_write,
            _not_send: PhantomData,
        }
    }
}

impl Drop for ReadGuard<'_> {
    fn drop(&mut self) {
        self.lock.release_read(self.owner, self.nested_in_write);
    }
}

impl fmt::Debug for ReadGuard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadGuard")
            .field("nested_in_write", &self.nested_in_write)
            .finish()
    }
}

/// Exclusive-mode hold, released on drop
#[must_use = "the write lock is released as soon as the guard is dropped"]
pub struct WriteGuard<'a> {
    lock: &'a ReadWriteLock,
    _not_send: PhantomData<*const ()>,
}

impl<'a> WriteGuard<'a> {
    fn new(lock: &'a ReadWriteLock) -> Self {
        Self {
            lock,
            _not_send: PhantomData,
        }
    }
}

impl Drop for WriteGuard<'_> {
    fn drop(&mut self) {
        self.lock.release_write();
    }
}

impl fmt::Debug for WriteGuard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WriteGuard")
    }
}
