//! Shared progress tracking for a running campaign

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Completed/total trial counters plus an abort flag, cheap to clone across
/// worker threads
#[derive(Debug, Clone)]
pub struct CampaignProgress {
    completed: Arc<AtomicUsize>,
    total: Arc<AtomicUsize>,
    aborted: Arc<AtomicBool>,
}

impl CampaignProgress {
    #[must_use]
    pub fn new(total: usize) -> Self {
        Self {
            completed: Arc::new(AtomicUsize::new(0)),
            total: Arc::new(AtomicUsize::new(total)),
            aborted: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Trials finished so far, baseline included
    #[must_use]
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.total.load(Ordering::Relaxed)
    }

    /// Record one finished trial and return the new count
    pub fn increment(&self) -> usize {
        self.completed.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Start over for a new campaign of `total` trials, clearing any abort
    pub fn reset(&self, total: usize) {
        self.completed.store(0, Ordering::Relaxed);
        self.total.store(total, Ordering::Relaxed);
        self.aborted.store(false, Ordering::Relaxed);
    }

    /// Stop scheduling new trials. Trials already running finish normally.
    pub fn abort(&self) {
        self.aborted.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::Relaxed)
    }
}

impl Default for CampaignProgress {
    fn default() -> Self {
        Self::new(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_counters() {
        let progress = CampaignProgress::new(3);
        let worker = progress.clone();
        assert_eq!(worker.increment(), 1);
        worker.abort();
        assert_eq!(progress.completed(), 1);
        assert_eq!(progress.total(), 3);
        assert!(progress.is_aborted());

        progress.reset(10);
        assert_eq!(worker.completed(), 0);
        assert_eq!(worker.total(), 10);
        assert!(!worker.is_aborted(), "reset clears an earlier abort");
    }
}
