//! Suppression of redelivered events.
//!
//! The transport delivers at least once, so the same message can arrive several times
//! in quick succession.  The guard remembers when each fingerprint was last let
//! through and drops repeats inside the suppression window.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use tokio::{task::JoinHandle, time::Instant};
use tracing::{debug, instrument};

/// Time-windowed record of recently processed fingerprints.
///
/// This is trivially cloneable; clones share the same record.
#[derive(Clone)]
pub struct DedupGuard {
    inner: Arc<DedupGuardInner>,
}

struct DedupGuardInner {
    suppression: Duration,
    retention: Duration,
    seen: Mutex<HashMap<String, Instant>>,
}

impl DedupGuard {
    pub fn new(suppression: Duration, retention: Duration) -> Self {
        Self {
            inner: Arc::new(DedupGuardInner {
                suppression,
                retention,
                seen: Mutex::new(HashMap::new()),
            }),
        }
    }

    fn seen(&self) -> MutexGuard<'_, HashMap<String, Instant>> {
        self.inner.seen.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Check-and-set for a fingerprint observed at `now`.
    ///
    /// Returns false, leaving the record untouched, when the fingerprint was let through
    /// less than the suppression window ago.  Otherwise records `now` and returns true.
    pub fn should_process(&self, fingerprint: &str, now: Instant) -> bool {
        let mut seen = self.seen();

        if let Some(last) = seen.get(fingerprint)
            && now.saturating_duration_since(*last) < self.inner.suppression
        {
            return false;
        }

        seen.insert(fingerprint.to_string(), now);
        true
    }

    /// Drop every entry older than the retention window.  Returns how many were removed.
    pub fn purge_expired(&self, now: Instant) -> usize {
        let retention = self.inner.retention;
        let mut seen = self.seen();
        let before = seen.len();

        seen.retain(|_, recorded| now.saturating_duration_since(*recorded) <= retention);

        before - seen.len()
    }

    /// Number of fingerprints currently remembered.
    pub fn len(&self) -> usize {
        self.seen().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Start the periodic purge.  It runs until the returned handle is aborted.
    #[instrument(name = "DedupGuard::spawn_sweeper", skip(self))]
    pub fn spawn_sweeper(&self, period: Duration) -> JoinHandle<()> {
        let guard = self.clone();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);

            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                ticker.tick().await;

                let purged = guard.purge_expired(Instant::now());
                debug!(purged, remaining = guard.len(), "Swept dedup entries.");
            }
        })
    }
}

// Tests.
