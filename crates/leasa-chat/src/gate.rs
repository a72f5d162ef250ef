//! Per-session mutual exclusion.
//!
//! Turns on the same session run one at a time; turns on different sessions
//! never wait on each other. Entries are removed once no turn holds or waits
//! for them, so the map only ever holds active sessions.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};

use tokio::sync::{Mutex, OwnedMutexGuard};

type EntryMap = Arc<StdMutex<HashMap<String, Arc<GateEntry>>>>;

#[derive(Default)]
struct GateEntry {
    lock: Arc<Mutex<()>>,
    permits: AtomicUsize,
}

/// Keyed async lock over session ids.
#[derive(Clone, Default)]
pub struct SessionGate {
    inner: EntryMap,
}

/// Exclusive access to one session. Released on drop.
pub struct SessionGuard {
    // Field order matters: the lock is released before the permit.
    _lock_guard: OwnedMutexGuard<()>,
    _permit: Permit,
}

struct Permit {
    session_id: String,
    inner: EntryMap,
    entry: Arc<GateEntry>,
}

impl SessionGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other turn holds `session_id`, then hold it.
    pub async fn acquire(&self, session_id: &str) -> SessionGuard {
        let entry = {
            let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(
                map.entry(session_id.to_string())
                    .or_insert_with(|| Arc::new(GateEntry::default())),
            )
        };

        entry.permits.fetch_add(1, Ordering::AcqRel);
        // Built before awaiting so a cancelled acquire still gives back its permit.
        let permit = Permit {
            session_id: session_id.to_string(),
            inner: Arc::clone(&self.inner),
            entry: Arc::clone(&entry),
        };
        let lock_guard = Arc::clone(&entry.lock).lock_owned().await;

        SessionGuard {
            _lock_guard: lock_guard,
            _permit: permit,
        }
    }

    /// Number of sessions currently held or waited on.
    pub fn active_sessions(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Drop for Permit {
    fn drop(&mut self) {
        let previous = self.entry.permits.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(previous > 0, "session gate permit underflow");
        if previous != 1 {
            return;
        }

        let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let should_remove = map
            .get(&self.session_id)
            .is_some_and(|current| Arc::ptr_eq(current, &self.entry))
            && self.entry.permits.load(Ordering::Acquire) == 0;
        if should_remove {
            map.remove(&self.session_id);
        }
    }
}
