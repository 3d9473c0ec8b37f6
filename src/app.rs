use std::io::{self, Write};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use crossbeam_channel::RecvTimeoutError;
use tracing::{info, warn};

use crate::classify::TypeClassifier;
use crate::cli::Config;
use crate::errors::AppError;
use crate::model::{ScanEvent, ScanProgress, ScanSummary};
use crate::report::{filter_idle, format_bytes, write_table};
use crate::scanner::Scanner;

const POLL_INTERVAL: Duration = Duration::from_millis(100);
const PROGRESS_REFRESH: Duration = Duration::from_millis(250);

#[derive(Debug, Clone)]
enum ScanState {
    Idle,
    Scanning(ScanProgress),
    Complete(ScanSummary),
    Error(String),
    Cancelled,
}

impl ScanState {
    fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete(_) | Self::Error(_) | Self::Cancelled)
    }
}

pub struct App {
    config: Config,
    scanner: Scanner,
    scan_state: ScanState,
    warnings: u64,
    last_render: Option<Instant>,
}

impl App {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            scanner: Scanner::new(Arc::new(TypeClassifier::default())),
            scan_state: ScanState::Idle,
            warnings: 0,
            last_render: None,
        }
    }

    pub fn run(&mut self) -> Result<(), AppError> {
        let started = Instant::now();
        self.scanner.start(self.config.scan_options.clone());
        let mut stop_sent = false;

        while !self.scan_state.is_terminal() {
            if !stop_sent
                && self
                    .config
                    .max_duration
                    .is_some_and(|limit| started.elapsed() >= limit)
            {
                info!("time limit reached, stopping scan");
                self.scanner.stop();
                stop_sent = true;
            }
            self.drain_scan_events()?;
        }
        self.scanner.finish();
        clear_progress_line();

        match &self.scan_state {
            ScanState::Complete(summary) => self.print_report(summary),
            ScanState::Error(message) => Err(AppError::Scan(message.clone())),
            ScanState::Cancelled => {
                eprintln!("scan cancelled before completion; no results reported");
                Ok(())
            }
            ScanState::Idle | ScanState::Scanning(_) => Ok(()),
        }
    }

    fn drain_scan_events(&mut self) -> Result<(), AppError> {
        let Some(receiver) = self.scanner.receiver() else {
            return Err(AppError::Scan("scanner is not running".to_string()));
        };

        let event = match receiver.recv_timeout(POLL_INTERVAL) {
            Ok(event) => event,
            Err(RecvTimeoutError::Timeout) => return Ok(()),
            Err(RecvTimeoutError::Disconnected) => {
                return Err(AppError::Scan(
                    "scanner stopped without a result".to_string(),
                ));
            }
        };

        match event {
            ScanEvent::Started { root, workers } => {
                info!(root = %root.display(), workers, "scanning");
                self.scan_state = ScanState::Scanning(ScanProgress::default());
            }
            ScanEvent::Progress(progress) => {
                // Workers report concurrently; keep the furthest count seen.
                let ahead = match &self.scan_state {
                    ScanState::Scanning(current) => {
                        progress.processed_bytes >= current.processed_bytes
                    }
                    _ => true,
                };
                if ahead {
                    self.scan_state = ScanState::Scanning(progress);
                    self.render_progress(&progress);
                }
            }
            ScanEvent::Warning { path, message } => {
                self.warnings = self.warnings.saturating_add(1);
                warn!(path = %path.display(), "{message}");
            }
            ScanEvent::Complete(summary) => self.scan_state = ScanState::Complete(summary),
            ScanEvent::Error(message) => self.scan_state = ScanState::Error(message),
            ScanEvent::Cancelled => self.scan_state = ScanState::Cancelled,
        }
        Ok(())
    }

    fn render_progress(&mut self, progress: &ScanProgress) {
        if self
            .last_render
            .is_some_and(|last| last.elapsed() < PROGRESS_REFRESH)
        {
            return;
        }
        self.last_render = Some(Instant::now());
        let mut stderr = io::stderr().lock();
        let _ = write!(
            stderr,
            "\r{:>3}%  {} scanned in {} files",
            progress.percent,
            format_bytes(progress.processed_bytes),
            progress.files_seen
        );
        let _ = stderr.flush();
    }

    fn print_report(&self, summary: &ScanSummary) -> Result<(), AppError> {
        let now = SystemTime::now();
        let mut shown = filter_idle(&summary.entries, self.config.older_than_days, now);
        let matched = shown.len();
        shown.truncate(self.config.limit);

        let mut stdout = io::stdout().lock();
        write_table(&mut stdout, &shown, now)?;
        writeln!(
            stdout,
            "\n{} of {} matching files shown; {} in {} files scanned, {} directories, {} warnings, {:.2?}",
            shown.len(),
            matched,
            format_bytes(summary.processed_bytes),
            summary.files_seen,
            summary.directories_done,
            summary.warnings.max(self.warnings),
            summary.elapsed
        )?;
        Ok(())
    }
}

fn clear_progress_line() {
    let mut stderr = io::stderr().lock();
    let _ = write!(stderr, "\r\x1b[2K");
    let _ = stderr.flush();
}
