use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, bounded, unbounded};
use tracing::{debug, info, warn};

use crate::classify::TypeClassifier;
use crate::errors::AppError;
use crate::model::{ScanEvent, ScanOptions, ScanSummary};
use crate::platform::{available_workers, used_bytes_estimate};
use crate::scanner::queue::WorkQueue;
use crate::scanner::session::ScanSession;
use crate::scanner::worker::Worker;

const EVENT_CHANNEL_CAPACITY: usize = 4096;

/// A running scan: its event stream, its session and the controlling thread.
pub struct ScanHandle {
    receiver: Receiver<ScanEvent>,
    session: Arc<ScanSession>,
    join: Option<JoinHandle<()>>,
}

impl ScanHandle {
    pub fn receiver(&self) -> &Receiver<ScanEvent> {
        &self.receiver
    }

    /// Requests cancellation and returns immediately.
    pub fn cancel(&self) {
        self.session.request_stop();
    }

    pub fn is_finished(&self) -> bool {
        self.join.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Cancels and waits for every worker to exit. Undelivered events are discarded
    /// so a full channel cannot hold the workers up.
    pub fn stop(&mut self) {
        self.cancel();
        if let Some(join) = self.join.take() {
            while !join.is_finished() {
                let _ = self.receiver.recv_timeout(std::time::Duration::from_millis(10));
            }
            if join.join().is_err() {
                warn!("scan thread panicked");
            }
        }
    }
}

impl Drop for ScanHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Starts a scan on a dedicated controlling thread.
pub fn start_scan(options: ScanOptions, classifier: Arc<TypeClassifier>) -> ScanHandle {
    // Bounded queue prevents unbounded RAM growth when the consumer falls behind.
    let (tx, rx) = bounded(EVENT_CHANNEL_CAPACITY);
    let session = Arc::new(ScanSession::new(
        options.min_size,
        used_bytes_estimate(&options.root),
    ));
    let session_for_thread = Arc::clone(&session);

    let join = thread::spawn(move || {
        run_scan(&options, &classifier, &session_for_thread, &tx);
    });

    ScanHandle {
        receiver: rx,
        session,
        join: Some(join),
    }
}

pub fn run_scan_blocking(options: ScanOptions, classifier: &TypeClassifier) -> Vec<ScanEvent> {
    let (tx, rx) = unbounded();
    let session = ScanSession::new(options.min_size, used_bytes_estimate(&options.root));
    run_scan(&options, classifier, &session, &tx);
    rx.try_iter().collect()
}

/// Resolves the root to an absolute path so every reported entry path is absolute.
fn check_root(options: &ScanOptions) -> Result<PathBuf, AppError> {
    let inaccessible = |reason: String| AppError::InaccessibleRoot {
        path: options.root.clone(),
        reason,
    };
    let root = fs::canonicalize(&options.root).map_err(|error| inaccessible(error.to_string()))?;
    let metadata = fs::metadata(&root).map_err(|error| inaccessible(error.to_string()))?;
    if !metadata.is_dir() {
        return Err(inaccessible("not a directory".to_string()));
    }
    fs::read_dir(&root).map_err(|error| inaccessible(error.to_string()))?;
    Ok(root)
}

/// Runs one scan to completion on the calling thread.
///
/// Emits `Started`, any number of `Progress`/`Warning`, then exactly one of
/// `Complete`, `Cancelled` or `Error`. An inaccessible root yields only `Error`.
/// A stop requested before the workers are joined wins, even if the
/// traversal had already finished: the result is `Cancelled`.
pub fn run_scan(
    options: &ScanOptions,
    classifier: &TypeClassifier,
    session: &ScanSession,
    tx: &Sender<ScanEvent>,
) {
    let root = match check_root(options) {
        Ok(root) => root,
        Err(error) => {
            warn!(%error, "scan aborted before start");
            let _ = tx.send(ScanEvent::Error(error.to_string()));
            return;
        }
    };

    let workers = options.workers.unwrap_or_else(available_workers).max(1);
    let queues: Vec<WorkQueue> = (0..workers).map(|_| WorkQueue::new()).collect();

    session.work_added();
    queues[0].push_own(root.clone());

    info!(
        root = %root.display(),
        workers,
        min_size = options.min_size,
        policy = %options.directory_policy,
        "scan started"
    );
    let _ = tx.send(ScanEvent::Started {
        root,
        workers,
    });

    thread::scope(|scope| {
        for id in 0..workers {
            let worker = Worker {
                id,
                queues: &queues,
                session,
                classifier,
                policy: options.directory_policy,
                tx,
            };
            scope.spawn(move || worker.run());
        }
    });

    if session.should_stop() {
        info!(elapsed = ?session.elapsed(), "scan cancelled");
        let _ = tx.send(ScanEvent::Cancelled);
        return;
    }

    let mut entries = session.take_results();
    entries.sort_by(|a, b| b.size.cmp(&a.size));

    let progress = session.final_progress();
    let summary = ScanSummary {
        entries,
        processed_bytes: progress.processed_bytes,
        files_seen: progress.files_seen,
        directories_done: progress.directories_done,
        warnings: session.warnings(),
        elapsed: session.elapsed(),
    };
    info!(
        matches = summary.entries.len(),
        files = summary.files_seen,
        bytes = summary.processed_bytes,
        warnings = summary.warnings,
        elapsed = ?summary.elapsed,
        "scan complete"
    );
    let _ = tx.send(ScanEvent::Progress(progress));
    let _ = tx.send(ScanEvent::Complete(summary));
}

/// Caller-facing controller: at most one scan in flight, classifier cache kept across scans.
pub struct Scanner {
    classifier: Arc<TypeClassifier>,
    current: Option<ScanHandle>,
}

impl Scanner {
    pub fn new(classifier: Arc<TypeClassifier>) -> Self {
        Self {
            classifier,
            current: None,
        }
    }

    /// Starts a new scan, tearing down any previous one first.
    pub fn start(&mut self, options: ScanOptions) -> &Receiver<ScanEvent> {
        if let Some(mut previous) = self.current.take() {
            debug!("stopping previous scan before starting a new one");
            previous.stop();
        }
        let handle = start_scan(options, Arc::clone(&self.classifier));
        self.current.insert(handle).receiver()
    }

    /// Starts a new scan only if nothing is running.
    pub fn try_start(&mut self, options: ScanOptions) -> Result<&Receiver<ScanEvent>, AppError> {
        if self.current.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return Err(AppError::ScanInProgress);
        }
        Ok(self.start(options))
    }

    /// Requests cancellation of the running scan without waiting for it.
    pub fn stop(&self) {
        if let Some(handle) = &self.current {
            handle.cancel();
        }
    }

    /// Blocks until the running scan has fully shut down.
    pub fn finish(&mut self) {
        if let Some(mut handle) = self.current.take() {
            handle.stop();
        }
    }

    pub fn receiver(&self) -> Option<&Receiver<ScanEvent>> {
        self.current.as_ref().map(ScanHandle::receiver)
    }

    pub fn classifier(&self) -> &Arc<TypeClassifier> {
        &self.classifier
    }
}

impl Default for Scanner {
    fn default() -> Self {
        Self::new(Arc::new(TypeClassifier::default()))
    }
}
