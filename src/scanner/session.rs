use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::model::{FileEntry, ScanProgress};

const SCANNING_PERCENT_CAP: u64 = 99;

/// State shared by every worker of exactly one scan.
///
/// A new scan always builds a fresh session, so counters and the stop flag
/// never leak from one run into the next.
#[derive(Debug)]
pub struct ScanSession {
    stop: AtomicBool,
    min_size: u64,
    processed_bytes: AtomicU64,
    files_seen: AtomicU64,
    directories_done: AtomicU64,
    warnings: AtomicU64,
    /// Work items pushed but not yet fully enumerated. Incremented before an
    /// item becomes visible in any queue and decremented only after the
    /// claiming worker has pushed every child it discovered, so it reaches
    /// zero exactly when no item is queued or in flight.
    pending: AtomicUsize,
    results: Mutex<Vec<FileEntry>>,
    volume_bytes: Option<u64>,
    started: Instant,
}

impl ScanSession {
    pub fn new(min_size: u64, volume_bytes: Option<u64>) -> Self {
        Self {
            stop: AtomicBool::new(false),
            min_size,
            processed_bytes: AtomicU64::new(0),
            files_seen: AtomicU64::new(0),
            directories_done: AtomicU64::new(0),
            warnings: AtomicU64::new(0),
            pending: AtomicUsize::new(0),
            results: Mutex::new(Vec::new()),
            volume_bytes,
            started: Instant::now(),
        }
    }

    pub fn min_size(&self) -> u64 {
        self.min_size
    }

    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    pub fn should_stop(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }

    pub fn add_processed(&self, bytes: u64) {
        self.processed_bytes.fetch_add(bytes, Ordering::Relaxed);
        self.files_seen.fetch_add(1, Ordering::Relaxed);
    }

    pub fn processed_bytes(&self) -> u64 {
        self.processed_bytes.load(Ordering::Relaxed)
    }

    pub fn directory_done(&self) {
        self.directories_done.fetch_add(1, Ordering::Relaxed);
    }

    pub fn note_warning(&self) {
        self.warnings.fetch_add(1, Ordering::Relaxed);
    }

    pub fn warnings(&self) -> u64 {
        self.warnings.load(Ordering::Relaxed)
    }

    pub fn work_added(&self) {
        self.pending.fetch_add(1, Ordering::SeqCst);
    }

    pub fn work_finished(&self) {
        let previous = self.pending.fetch_sub(1, Ordering::SeqCst);
        debug_assert!(previous > 0, "work finished more often than added");
    }

    pub fn is_quiescent(&self) -> bool {
        self.pending.load(Ordering::SeqCst) == 0
    }

    /// Moves a worker's local results into the shared list.
    pub fn merge(&self, local: &mut Vec<FileEntry>) {
        if local.is_empty() {
            return;
        }
        self.results.lock().append(local);
    }

    pub fn take_results(&self) -> Vec<FileEntry> {
        std::mem::take(&mut *self.results.lock())
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn progress(&self) -> ScanProgress {
        let processed_bytes = self.processed_bytes();
        let percent = match self.volume_bytes {
            Some(total) if total > 0 => {
                let scaled = u128::from(processed_bytes) * 100 / u128::from(total);
                scaled.min(u128::from(SCANNING_PERCENT_CAP)) as u8
            }
            _ => 0,
        };
        ScanProgress {
            processed_bytes,
            files_seen: self.files_seen.load(Ordering::Relaxed),
            directories_done: self.directories_done.load(Ordering::Relaxed),
            percent,
        }
    }

    pub fn final_progress(&self) -> ScanProgress {
        ScanProgress {
            percent: 100,
            ..self.progress()
        }
    }
}
