//! Tracks the live cancellation handle of every session.
//!
//! The registry is a shared lookup table, not an owner: each entry belongs to
//! the session's newest request, whether it is still queued or already
//! running. Its worker removes the entry on exit; shutdown removes the
//! entries of requests that never got a worker.

use parking_lot::Mutex;
use portable_atomic::{AtomicU64, Ordering};
use std::collections::{HashMap, hash_map::Entry};
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

/// Cancellation signal for one registered request.
///
/// Cloning a handle shares the underlying token. Two handles are the same
/// registration only if their [`id`](Self::id)s match.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    id: u64,
    token: CancellationToken,
}

impl CancelHandle {
    /// Process-unique registration id.
    pub const fn id(&self) -> u64 {
        self.id
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once this handle, or the token it was derived from, is
    /// cancelled.
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }

    fn same_registration(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

/// Mapping from session id to the session's live [`CancelHandle`].
///
/// Every handle is a child of the registry's parent token, so cancelling the
/// parent (on shutdown) signals every registered worker at once.
#[derive(Debug)]
pub struct CancellationRegistry {
    parent: CancellationToken,
    entries: Mutex<HashMap<String, CancelHandle>>,
    next_id: AtomicU64,
}

impl CancellationRegistry {
    /// Creates an empty registry whose handles derive from `parent`.
    pub fn new(parent: CancellationToken) -> Self {
        Self {
            parent,
            entries: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Installs a fresh handle for `session_id` and returns it.
    ///
    /// Any handle previously installed for the session is cancelled before it
    /// is replaced, so its worker observes cancellation at its next
    /// suspension point.
    pub fn register(&self, session_id: &str) -> CancelHandle {
        let handle = CancelHandle {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            token: self.parent.child_token(),
        };

        let previous = self
            .entries
            .lock()
            .insert(session_id.to_owned(), handle.clone());

        if let Some(previous) = previous {
            previous.cancel();
            #[cfg(feature = "tracing")]
            tracing::debug!(
                session_id,
                superseded = previous.id,
                current = handle.id,
                "Superseded previous registration"
            );
        }

        handle
    }

    /// Signals the live handle for `session_id`, if there is one.
    ///
    /// Returns whether a handle was found. Cancelling an idle session is not
    /// an error.
    pub fn cancel(&self, session_id: &str) -> bool {
        match self.entries.lock().get(session_id) {
            Some(handle) => {
                handle.cancel();
                true
            }
            None => false,
        }
    }

    /// Removes the entry for `session_id` only if it is still `handle`.
    ///
    /// A worker that was superseded must not delete its successor's entry, so
    /// a mismatch leaves the map untouched. Returns whether an entry was
    /// removed.
    pub fn remove(&self, session_id: &str, handle: &CancelHandle) -> bool {
        match self.entries.lock().entry(session_id.to_owned()) {
            Entry::Occupied(entry) if entry.get().same_registration(handle) => {
                entry.remove();
                true
            }
            _ => false,
        }
    }

    /// Whether `handle` is still the live registration for `session_id`.
    pub fn is_current(&self, session_id: &str, handle: &CancelHandle) -> bool {
        self.entries
            .lock()
            .get(session_id)
            .is_some_and(|current| current.same_registration(handle))
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.entries.lock().contains_key(session_id)
    }

    /// Number of sessions with a live registration.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl Default for CancellationRegistry {
    fn default() -> Self {
        Self::new(CancellationToken::new())
    }
}
