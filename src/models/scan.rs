use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Lifecycle of one scan invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanState {
    Idle,
    Connecting,
    Authenticating,
    Walking,
    Completed,
    Aborted,
    Failed,
}

impl ScanState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ScanState::Completed | ScanState::Aborted | ScanState::Failed)
    }
}

impl fmt::Display for ScanState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ScanState::Idle => write!(f, "idle"),
            ScanState::Connecting => write!(f, "connecting"),
            ScanState::Authenticating => write!(f, "authenticating"),
            ScanState::Walking => write!(f, "walking"),
            ScanState::Completed => write!(f, "completed"),
            ScanState::Aborted => write!(f, "aborted"),
            ScanState::Failed => write!(f, "failed"),
        }
    }
}

/// Summary handed back to the orchestrator after a completed scan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    pub identifier: String,
    pub state: ScanState,
    pub files_delivered: usize,
    pub total_size_bytes: i64,
    pub directories_listed: usize,
    pub extended_listing: bool,
    pub elapsed: Duration,
}
