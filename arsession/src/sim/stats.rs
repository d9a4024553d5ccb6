//! Construction and disposal counters for simulated collaborators.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::scene::Dimensions;

/// Lock-free counters plus the sizes each collaborator was created with.
#[derive(Debug, Default)]
pub struct SimStats {
    sources_created: AtomicU64,
    sources_disposed: AtomicU64,
    contexts_created: AtomicU64,
    contexts_disposed: AtomicU64,
    trackers_created: AtomicU64,
    trackers_disposed: AtomicU64,
    context_updates: AtomicU64,
    source_requests: Mutex<Vec<Dimensions>>,
    context_canvases: Mutex<Vec<Dimensions>>,
}

/// Point-in-time copy of [`SimStats`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimStatsSnapshot {
    pub sources_created: u64,
    pub sources_disposed: u64,
    pub contexts_created: u64,
    pub contexts_disposed: u64,
    pub trackers_created: u64,
    pub trackers_disposed: u64,
    pub context_updates: u64,
    /// Requested dimensions, in creation order.
    pub source_requests: Vec<Dimensions>,
    /// Canvas dimensions, in creation order.
    pub context_canvases: Vec<Dimensions>,
}

impl SimStatsSnapshot {
    /// Collaborators created but not yet disposed.
    pub fn live(&self) -> (u64, u64, u64) {
        (
            self.sources_created - self.sources_disposed,
            self.contexts_created - self.contexts_disposed,
            self.trackers_created - self.trackers_disposed,
        )
    }
}

impl SimStats {
    /// Returns the 1-based ordinal of the new source.
    pub(crate) fn record_source(&self, requested: Dimensions) -> u64 {
        self.source_requests.lock().push(requested);
        self.sources_created.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub(crate) fn record_context(&self, canvas: Dimensions) {
        self.context_canvases.lock().push(canvas);
        self.contexts_created.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn record_tracker(&self) {
        self.trackers_created.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn source_disposed(&self) {
        self.sources_disposed.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn context_disposed(&self) {
        self.contexts_disposed.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn tracker_disposed(&self) {
        self.trackers_disposed.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn context_updated(&self) {
        self.context_updates.fetch_add(1, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> SimStatsSnapshot {
        SimStatsSnapshot {
            sources_created: self.sources_created.load(Ordering::SeqCst),
            sources_disposed: self.sources_disposed.load(Ordering::SeqCst),
            contexts_created: self.contexts_created.load(Ordering::SeqCst),
            contexts_disposed: self.contexts_disposed.load(Ordering::SeqCst),
            trackers_created: self.trackers_created.load(Ordering::SeqCst),
            trackers_disposed: self.trackers_disposed.load(Ordering::SeqCst),
            context_updates: self.context_updates.load(Ordering::SeqCst),
            source_requests: self.source_requests.lock().clone(),
            context_canvases: self.context_canvases.lock().clone(),
        }
    }
}
