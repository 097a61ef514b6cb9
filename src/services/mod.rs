pub mod ftp;
pub mod scan_service;

pub use scan_service::FtpScanService;
