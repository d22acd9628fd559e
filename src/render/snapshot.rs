//! Hand-off points between the analysis worker and the display

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::analysis::SpectrumSnapshot;

/// Latest-wins slot for the most recent spectrum.
///
/// The writer never waits for the reader; a snapshot that is replaced
/// before it was read is simply dropped.
#[derive(Debug, Default)]
pub struct SnapshotCell {
    slot: Mutex<Option<Arc<SpectrumSnapshot>>>,
}

impl SnapshotCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, snapshot: SpectrumSnapshot) {
        *self.slot.lock() = Some(Arc::new(snapshot));
    }

    pub fn latest(&self) -> Option<Arc<SpectrumSnapshot>> {
        self.slot.lock().clone()
    }

    pub fn clear(&self) {
        self.slot.lock().take();
    }
}

/// Single-pending-job render scheduler.
///
/// Any number of requests between two display ticks collapse into one
/// render, and at most one render runs at a time.
#[derive(Debug)]
pub struct RenderScheduler {
    pending: AtomicBool,
    running: AtomicBool,
    enabled: AtomicBool,
}

impl RenderScheduler {
    pub fn new() -> Self {
        Self {
            pending: AtomicBool::new(false),
            running: AtomicBool::new(false),
            enabled: AtomicBool::new(true),
        }
    }

    /// Ask for a render; returns false if one was already pending or rendering is stopped
    pub fn request(&self) -> bool {
        if !self.enabled.load(Ordering::Acquire) {
            return false;
        }
        !self.pending.swap(true, Ordering::AcqRel)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Drop any pending render without running it
    pub fn cancel(&self) {
        self.pending.store(false, Ordering::Release);
    }

    /// Stop accepting requests and cancel the pending one
    pub fn stop(&self) {
        self.enabled.store(false, Ordering::Release);
        self.cancel();
    }

    pub fn start(&self) {
        self.enabled.store(true, Ordering::Release);
    }

    /// Called on each display tick: runs `render` if a job is pending.
    ///
    /// Returns whether a render happened.
    pub fn run_pending<F: FnOnce()>(&self, render: F) -> bool {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        let ran = if self.pending.swap(false, Ordering::AcqRel) {
            render();
            true
        } else {
            false
        };

        self.running.store(false, Ordering::Release);
        ran
    }
}

impl Default for RenderScheduler {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared handles the worker publishes through
#[derive(Debug, Clone, Default)]
pub struct DisplayLink {
    pub cell: Arc<SnapshotCell>,
    pub scheduler: Arc<RenderScheduler>,
}

impl DisplayLink {
    pub fn new() -> Self {
        Self {
            cell: Arc::new(SnapshotCell::new()),
            scheduler: Arc::new(RenderScheduler::new()),
        }
    }

    /// Store a snapshot and ask for a render
    pub fn publish(&self, snapshot: SpectrumSnapshot) {
        self.cell.publish(snapshot);
        self.scheduler.request();
    }

    /// Forget the current spectrum and drop any pending render
    pub fn clear(&self) {
        self.cell.clear();
        self.scheduler.cancel();
    }
}
