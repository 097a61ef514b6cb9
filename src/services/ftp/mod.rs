// FTP scanning modules organized by functionality

pub mod client;
pub mod progress;
pub mod session;
pub mod target;
pub mod walker;

// Re-export main types for convenience
pub use client::{FtpClient, FtpConnector, SuppaFtpClient, SuppaFtpConnector, MLST_FEATURE};
pub use progress::{ScanProgress, ScanProgressSnapshot};
pub use session::{establish, establish_with_progress, Session};
pub use target::{ScanTarget, DEFAULT_FTP_PORT};
pub use walker::{walk, InventoryWalker};
