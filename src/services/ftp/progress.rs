use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::models::ScanState;

/// Thread-safe progress tracking for one FTP scan.
///
/// The blocking worker updates it while the async caller reads it.
#[derive(Debug, Clone)]
pub struct ScanProgress {
    inner: Arc<Mutex<ScanProgressInner>>,
}

#[derive(Debug)]
struct ScanProgressInner {
    start_time: Instant,
    last_report: Instant,
    state: ScanState,
    directories_listed: usize,
    files_found: usize,
    bytes_found: i64,
    current_directory: String,
    report_interval: Duration,
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanProgressSnapshot {
    pub state: ScanState,
    pub directories_listed: usize,
    pub files_found: usize,
    pub bytes_found: i64,
    pub current_directory: String,
    pub elapsed: Duration,
}

impl Default for ScanProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanProgress {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            inner: Arc::new(Mutex::new(ScanProgressInner {
                start_time: now,
                last_report: now,
                state: ScanState::Idle,
                directories_listed: 0,
                files_found: 0,
                bytes_found: 0,
                current_directory: String::new(),
                report_interval: Duration::from_secs(30),
            })),
        }
    }

    /// Moves the state machine forward. Terminal states are sticky.
    pub fn set_state(&self, state: ScanState) {
        if let Ok(mut inner) = self.inner.lock() {
            if inner.state.is_terminal() {
                warn!("Ignoring transition {} -> {} after scan finished", inner.state, state);
                return;
            }
            debug!("Scan state {} -> {}", inner.state, state);
            inner.state = state;

            if state.is_terminal() {
                info!(
                    "Scan {} after {:?}: {} directories listed, {} files ({} bytes)",
                    state,
                    inner.start_time.elapsed(),
                    inner.directories_listed,
                    inner.files_found,
                    inner.bytes_found
                );
            }
        }
    }

    pub fn state(&self) -> ScanState {
        self.inner
            .lock()
            .map(|inner| inner.state)
            .unwrap_or(ScanState::Failed)
    }

    pub fn set_current_directory(&self, directory: &str) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.current_directory = directory.to_string();
        }
    }

    pub fn add_directory_listed(&self) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.directories_listed += 1;
            Self::maybe_report(&mut inner);
        }
    }

    pub fn add_file_found(&self, size: i64) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.files_found += 1;
            inner.bytes_found = inner.bytes_found.saturating_add(size);
        }
    }

    pub fn snapshot(&self) -> Option<ScanProgressSnapshot> {
        self.inner.lock().ok().map(|inner| ScanProgressSnapshot {
            state: inner.state,
            directories_listed: inner.directories_listed,
            files_found: inner.files_found,
            bytes_found: inner.bytes_found,
            current_directory: inner.current_directory.clone(),
            elapsed: inner.start_time.elapsed(),
        })
    }

    fn maybe_report(inner: &mut ScanProgressInner) {
        let now = Instant::now();
        if now.duration_since(inner.last_report) >= inner.report_interval {
            inner.last_report = now;
            info!(
                "📁 Scan progress: {} directories listed, {} files found, currently in {}",
                inner.directories_listed, inner.files_found, inner.current_directory
            );
        }
    }
}
