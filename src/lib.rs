pub mod config;
pub mod errors;
pub mod models;
pub mod services;
pub mod sink;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::ScanConfig;
pub use errors::{ScanError, TransportError};
pub use models::{DirectoryEntry, EntryKind, FileRecord, ScanReport, ScanState};
pub use services::ftp::{ScanProgress, ScanTarget};
pub use services::FtpScanService;
pub use sink::RecordSink;
