//! Listener registry and isolated dispatch
//!
//! Every event list and resource owns one `ListenerRegistry`. The registry is
//! only mutated while its owner's exclusive lock is held, and dispatch always
//! runs over a snapshot taken beforehand, so a listener that removes itself
//! (or registers another) mid-notification cannot disturb the iteration.
//!
//! Identity is the `Arc` allocation: removing a listener requires the same
//! `Arc` (or a clone of it) that was registered.

use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::error;

/// Set of registered listeners of type `L`
pub struct ListenerRegistry<L: ?Sized> {
    listeners: Vec<Arc<L>>,
}

impl<L: ?Sized> Default for ListenerRegistry<L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: ?Sized> fmt::Debug for ListenerRegistry<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl<L: ?Sized> ListenerRegistry<L> {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    /// Register a listener. Registering the same `Arc` twice notifies it twice.
    pub fn add(&mut self, listener: Arc<L>) {
        self.listeners.push(listener);
    }

    /// Remove one registration of `listener`; returns whether one was found
    pub fn remove(&mut self, listener: &Arc<L>) -> bool {
        match self.listeners.iter().position(|l| same_listener(l, listener)) {
            Some(index) => {
                self.listeners.remove(index);
                true
            }
            None => false,
        }
    }

    /// True if `listener` is registered
    pub fn contains(&self, listener: &Arc<L>) -> bool {
        self.listeners.iter().any(|l| same_listener(l, listener))
    }

    /// Number of registrations
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// True when nothing is registered
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Copy of the current registrations, used for dispatch
    pub fn snapshot(&self) -> Vec<Arc<L>> {
        self.listeners.clone()
    }
}

// Compare data addresses only; vtable pointers of the same type may differ
// between codegen units.
fn same_listener<L: ?Sized>(a: &Arc<L>, b: &Arc<L>) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

/// Outcome of one dispatch round
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Listeners that returned normally
    pub notified: usize,
    /// Listeners that panicked
    pub failed: usize,
}

impl DispatchReport {
    /// Total listeners invoked
    pub fn invoked(&self) -> usize {
        self.notified + self.failed
    }
}

/// Invoke `call` for every listener in `listeners`.
///
/// A panicking listener is caught and logged; the remaining listeners are
/// still notified.
pub fn dispatch<L: ?Sized>(
    listeners: &[Arc<L>],
    context: &str,
    mut call: impl FnMut(&L),
) -> DispatchReport {
    let mut report = DispatchReport::default();
    for listener in listeners {
        match catch_unwind(AssertUnwindSafe(|| call(&**listener))) {
            Ok(()) => report.notified += 1,
            Err(panic) => {
                report.failed += 1;
                error!(
                    context = context,
                    panic = panic_message(&*panic),
                    "listener panicked during notification"
                );
            }
        }
    }
    report
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("(non-string panic)")
}
