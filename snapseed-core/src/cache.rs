//! Decoded-document cache with single-flight loading.
//!
//! Concurrent requests for the same key share one load: the first caller
//! (the leader) runs it, the others block until it publishes. Successful
//! results are kept; errors reach every waiter and are not kept, so the next
//! request retries.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex, RwLock};

use crate::error::SnapError;
use crate::model::Document;

/// Both cache tiers used by the loader.
#[derive(Debug, Default)]
pub(crate) struct DocumentCache {
    /// Request spec as given by the caller → merged document.
    pub(crate) specs: CacheTier<String>,
    /// Fixture file path → decoded document.
    pub(crate) files: CacheTier<PathBuf>,
}

impl DocumentCache {
    pub(crate) fn clear(&self) {
        self.specs.clear();
        self.files.clear();
    }
}

/// One key → document map guarded by its own flight group.
pub(crate) struct CacheTier<K> {
    docs: RwLock<HashMap<K, Document>>,
    flights: SingleFlight<K>,
}

impl<K> Default for CacheTier<K> {
    fn default() -> Self {
        Self {
            docs: RwLock::new(HashMap::new()),
            flights: SingleFlight::default(),
        }
    }
}

impl<K> fmt::Debug for CacheTier<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheTier")
            .field("entries", &self.docs.read().len())
            .finish()
    }
}

impl<K: Eq + Hash + Clone + fmt::Debug> CacheTier<K> {
    pub(crate) fn get(&self, key: &K) -> Option<Document> {
        self.docs.read().get(key).cloned()
    }

    pub(crate) fn len(&self) -> usize {
        self.docs.read().len()
    }

    fn clear(&self) {
        self.docs.write().clear();
    }

    /// Return the cached document for `key`, or run `load` once for all
    /// concurrent callers and cache its success.
    pub(crate) fn get_or_load<F>(&self, key: &K, load: F) -> Result<Document, SnapError>
    where
        F: FnOnce() -> Result<Document, SnapError>,
    {
        if let Some(doc) = self.get(key) {
            log::debug!("Cache hit for {:?}", key);
            return Ok(doc);
        }

        self.flights.run(key, || {
            // Another flight may have published between our miss and
            // becoming leader.
            if let Some(doc) = self.get(key) {
                log::debug!("Cache hit for {:?} after acquiring flight", key);
                return Ok(doc);
            }
            log::debug!("Cache miss for {:?}", key);
            let doc = load()?;
            self.docs.write().insert(key.clone(), doc.clone());
            Ok(doc)
        })
    }
}

/// Deduplicates concurrent work per key.
pub(crate) struct SingleFlight<K> {
    calls: Mutex<HashMap<K, Arc<Call>>>,
}

impl<K> Default for SingleFlight<K> {
    fn default() -> Self {
        Self {
            calls: Mutex::new(HashMap::new()),
        }
    }
}

#[derive(Clone)]
enum Outcome {
    Finished(Result<Document, SnapError>),
    /// The leader unwound without publishing.
    Abandoned,
}

#[derive(Default)]
struct Call {
    outcome: Mutex<Option<Outcome>>,
    done: Condvar,
    #[cfg(test)]
    waiters: std::sync::atomic::AtomicUsize,
}

impl Call {
    fn publish(&self, outcome: Outcome) {
        *self.outcome.lock() = Some(outcome);
        self.done.notify_all();
    }

    fn wait(&self) -> Outcome {
        let mut outcome = self.outcome.lock();
        loop {
            if let Some(result) = outcome.as_ref() {
                return result.clone();
            }
            self.done.wait(&mut outcome);
        }
    }
}

impl<K: Eq + Hash + Clone + fmt::Debug> SingleFlight<K> {
    /// Run `work` for `key` unless a run is already in flight, in which case
    /// wait for that run's result instead.
    pub(crate) fn run<F>(&self, key: &K, work: F) -> Result<Document, SnapError>
    where
        F: FnOnce() -> Result<Document, SnapError>,
    {
        let (call, leader) = {
            let mut calls = self.calls.lock();
            match calls.get(key) {
                Some(call) => (Arc::clone(call), false),
                None => {
                    let call = Arc::new(Call::default());
                    calls.insert(key.clone(), Arc::clone(&call));
                    (call, true)
                }
            }
        };

        if !leader {
            log::debug!("Joining in-flight load for {:?}", key);
            #[cfg(test)]
            call.waiters.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            return match call.wait() {
                Outcome::Finished(result) => result,
                Outcome::Abandoned => Err(SnapError::cache_slot_empty(format!("{:?}", key))),
            };
        }

        let mut guard = LeaderGuard {
            flights: self,
            key,
            call: &call,
            finished: false,
        };
        let result = work();
        guard.finish(Outcome::Finished(result.clone()));
        result
    }

    #[cfg(test)]
    fn in_flight(&self) -> usize {
        self.calls.lock().len()
    }

    /// Callers blocked on the flight for `key`.
    #[cfg(test)]
    fn waiters(&self, key: &K) -> usize {
        self.calls
            .lock()
            .get(key)
            .map_or(0, |call| call.waiters.load(std::sync::atomic::Ordering::SeqCst))
    }
}

/// Publishes `Abandoned` if the leader's work unwinds.
struct LeaderGuard<'a, K: Eq + Hash + Clone + fmt::Debug> {
    flights: &'a SingleFlight<K>,
    key: &'a K,
    call: &'a Call,
    finished: bool,
}

impl<K: Eq + Hash + Clone + fmt::Debug> LeaderGuard<'_, K> {
    fn finish(&mut self, outcome: Outcome) {
        self.finished = true;
        self.complete(outcome);
    }

    fn complete(&self, outcome: Outcome) {
        // Remove first so that callers arriving after publication start a
        // fresh flight instead of reading this outcome.
        self.flights.calls.lock().remove(self.key);
        self.call.publish(outcome);
    }
}

impl<K: Eq + Hash + Clone + fmt::Debug> Drop for LeaderGuard<'_, K> {
    fn drop(&mut self) {
        if !self.finished {
            log::warn!("In-flight load for {:?} abandoned without a result", self.key);
            self.complete(Outcome::Abandoned);
        }
    }
}
