use std::fs::{self, Metadata};
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use crossbeam_channel::Sender;
use tracing::{debug, trace, warn};

use crate::classify::TypeClassifier;
use crate::model::{DirectoryPolicy, FileEntry, ScanEvent};
use crate::scanner::batch::{BATCH_CAPACITY, process_batch};
use crate::scanner::queue::WorkQueue;
use crate::scanner::session::ScanSession;

/// Local results above this size are handed to the shared list after a pass.
pub const MERGE_THRESHOLD: usize = 1000;
const SPIN_ROUNDS: u32 = 16;
const IDLE_SLEEP: Duration = Duration::from_micros(250);

/// Everything one worker thread needs; borrowed from the orchestrator's scope.
pub struct Worker<'a> {
    pub id: usize,
    pub queues: &'a [WorkQueue],
    pub session: &'a ScanSession,
    pub classifier: &'a TypeClassifier,
    pub policy: DirectoryPolicy,
    pub tx: &'a Sender<ScanEvent>,
}

enum PassControl {
    Finished,
    Cancelled,
}

impl Worker<'_> {
    pub fn run(&self) {
        let mut local: Vec<FileEntry> = Vec::with_capacity(MERGE_THRESHOLD);
        let mut batch: Vec<(PathBuf, Metadata)> = Vec::with_capacity(BATCH_CAPACITY);
        let mut idle_rounds = 0_u32;
        let mut passes = 0_u64;

        while !self.session.should_stop() {
            let Some(dir) = self.acquire() else {
                if self.session.is_quiescent() {
                    break;
                }
                idle_rounds = idle_rounds.saturating_add(1);
                if idle_rounds <= SPIN_ROUNDS {
                    thread::yield_now();
                } else {
                    thread::sleep(IDLE_SLEEP);
                }
                continue;
            };
            idle_rounds = 0;
            passes += 1;

            let control = self.enumerate(dir, &mut batch, &mut local);
            self.session.work_finished();

            if local.len() > MERGE_THRESHOLD {
                self.session.merge(&mut local);
            }
            if matches!(control, PassControl::Cancelled) {
                break;
            }

            // Progress is lossy: a full channel drops the update rather than stall the walk.
            let _ = self.tx.try_send(ScanEvent::Progress(self.session.progress()));
        }

        self.session.merge(&mut local);
        debug!(worker = self.id, passes, "worker finished");
    }

    /// Own queue first, then every other queue in round-robin order from our neighbour.
    fn acquire(&self) -> Option<PathBuf> {
        if let Some(dir) = self.queues[self.id].pop_own() {
            return Some(dir);
        }
        let count = self.queues.len();
        (1..count)
            .map(|offset| &self.queues[(self.id + offset) % count])
            .find_map(WorkQueue::steal)
    }

    fn push_work(&self, dir: PathBuf) {
        self.session.work_added();
        self.queues[self.id].push_own(dir);
    }

    fn enumerate(
        &self,
        claimed: PathBuf,
        batch: &mut Vec<(PathBuf, Metadata)>,
        local: &mut Vec<FileEntry>,
    ) -> PassControl {
        let mut inline = vec![claimed];
        let mut control = PassControl::Finished;

        'dirs: while let Some(dir) = inline.pop() {
            trace!(worker = self.id, dir = %dir.display(), "enumerating");
            let read_dir = match fs::read_dir(&dir) {
                Ok(read_dir) => read_dir,
                Err(error) => {
                    self.warn(&dir, "cannot read directory", &error);
                    continue;
                }
            };

            for entry_result in read_dir {
                if self.session.should_stop() {
                    control = PassControl::Cancelled;
                    break 'dirs;
                }

                let entry = match entry_result {
                    Ok(entry) => entry,
                    Err(error) => {
                        self.warn(&dir, "cannot read entry", &error);
                        continue;
                    }
                };
                let path = entry.path();
                let file_type = match entry.file_type() {
                    Ok(file_type) => file_type,
                    Err(error) => {
                        self.warn(&path, "cannot stat entry", &error);
                        continue;
                    }
                };

                if file_type.is_symlink() {
                    continue;
                }

                if file_type.is_dir() {
                    match self.policy {
                        DirectoryPolicy::Split => self.push_work(path),
                        DirectoryPolicy::OwnSize => match entry.metadata() {
                            Ok(meta) if meta.len() >= self.session.min_size() => {
                                self.push_work(path)
                            }
                            _ => inline.push(path),
                        },
                    }
                    continue;
                }

                if !file_type.is_file() {
                    continue;
                }

                match entry.metadata() {
                    Ok(metadata) => batch.push((path, metadata)),
                    Err(error) => {
                        self.warn(&path, "cannot stat file", &error);
                        continue;
                    }
                }

                if batch.len() >= BATCH_CAPACITY {
                    process_batch(batch, self.session, self.classifier, local);
                    batch.clear();
                }
            }

            self.session.directory_done();
        }

        if !batch.is_empty() {
            process_batch(batch, self.session, self.classifier, local);
            batch.clear();
        }

        control
    }

    fn warn(&self, path: &Path, context: &str, error: &io::Error) {
        warn!(worker = self.id, path = %path.display(), %error, "{context}");
        self.session.note_warning();
        // Counted in the session either way; a full channel must not hold up stop().
        let _ = self.tx.try_send(ScanEvent::Warning {
            path: path.to_path_buf(),
            message: format!("{context}: {error}"),
        });
    }
}
