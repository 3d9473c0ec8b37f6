use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// One regular file that passed the size filter.
#[derive(Debug, Clone)]
pub struct FileEntry {
    pub path: PathBuf,
    pub name: String,
    pub size: u64,
    pub last_modified: Option<SystemTime>,
    pub last_accessed: Option<SystemTime>,
    pub file_type: Arc<str>,
    /// Always false for entries produced by the scanner; directories are traversal work, not results.
    pub is_directory: bool,
}

impl FileEntry {
    /// Time since the file was last read, if the platform records access times.
    pub fn idle_for(&self, now: SystemTime) -> Option<Duration> {
        self.last_accessed
            .and_then(|accessed| now.duration_since(accessed).ok())
    }
}

/// Decides which discovered subdirectories become stealable work items.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub enum DirectoryPolicy {
    /// Every subdirectory is pushed onto the discovering worker's queue.
    #[default]
    Split,
    /// Only subdirectories whose own inode size reaches the minimum size are pushed;
    /// the rest are walked inline by the discovering worker. The inode size says
    /// nothing about the subtree below it, so this only shapes load balancing.
    OwnSize,
}

impl DirectoryPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Split => "split",
            Self::OwnSize => "own-size",
        }
    }
}

impl fmt::Display for DirectoryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub root: PathBuf,
    pub min_size: u64,
    /// Worker count override; `None` derives it from the available parallelism.
    pub workers: Option<usize>,
    pub directory_policy: DirectoryPolicy,
}

impl ScanOptions {
    pub fn new(root: impl Into<PathBuf>, min_size: u64) -> Self {
        Self {
            root: root.into(),
            min_size,
            workers: None,
            directory_policy: DirectoryPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct ScanProgress {
    pub processed_bytes: u64,
    pub files_seen: u64,
    pub directories_done: u64,
    /// 0..=100, derived from `processed_bytes`.
    pub percent: u8,
}

#[derive(Debug, Clone)]
pub struct ScanSummary {
    /// Sorted by size, largest first.
    pub entries: Vec<FileEntry>,
    pub processed_bytes: u64,
    pub files_seen: u64,
    pub directories_done: u64,
    pub warnings: u64,
    pub elapsed: Duration,
}

#[derive(Debug, Clone)]
pub enum ScanEvent {
    Started { root: PathBuf, workers: usize },
    Progress(ScanProgress),
    Warning { path: PathBuf, message: String },
    Complete(ScanSummary),
    Error(String),
    Cancelled,
}
