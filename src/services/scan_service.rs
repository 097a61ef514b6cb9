use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, Instrument, Span};

use crate::config::ScanConfig;
use crate::errors::ScanError;
use crate::models::{Inventory, ScanReport, ScanState};
use crate::services::ftp::{
    establish_with_progress, FtpConnector, InventoryWalker, ScanProgress, SuppaFtpConnector,
};
use crate::sink::RecordSink;

/// Runs FTP inventory scans and hands the results to a sink.
///
/// The blocking protocol work happens on a `spawn_blocking` worker so the
/// async runtime keeps serving other tasks while a slow server is walked.
pub struct FtpScanService<K = SuppaFtpConnector> {
    connector: Arc<K>,
    config: ScanConfig,
}

impl<K> Clone for FtpScanService<K> {
    fn clone(&self) -> Self {
        Self {
            connector: self.connector.clone(),
            config: self.config.clone(),
        }
    }
}

impl FtpScanService<SuppaFtpConnector> {
    pub fn new(config: ScanConfig) -> Self {
        Self::with_connector(SuppaFtpConnector::new(), config)
    }
}

impl<K> FtpScanService<K>
where
    K: FtpConnector + Send + Sync + 'static,
    K::Client: Send,
{
    pub fn with_connector(connector: K, config: ScanConfig) -> Self {
        Self {
            connector: Arc::new(connector),
            config,
        }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Perform a scan with a fresh progress tracker
    pub async fn scan<S: RecordSink>(
        &self,
        scan_url: &str,
        identifier: &str,
        sink: &mut S,
        cancellation_token: CancellationToken,
    ) -> Result<ScanReport, ScanError> {
        self.scan_with_progress(scan_url, identifier, sink, cancellation_token, ScanProgress::new())
            .await
    }

    /// Scan `scan_url` and forward every file to `sink`.
    ///
    /// Records reach the sink only after the whole walk succeeded; a failed
    /// or cancelled scan delivers nothing. The scan counts as `Completed`
    /// once the sink has accepted every record and finished.
    pub async fn scan_with_progress<S: RecordSink>(
        &self,
        scan_url: &str,
        identifier: &str,
        sink: &mut S,
        cancellation_token: CancellationToken,
        progress: ScanProgress,
    ) -> Result<ScanReport, ScanError> {
        let span = info_span!("ftp_scan", identifier = %identifier);
        let started = Instant::now();

        let discovery = self
            .run_discovery(scan_url, cancellation_token, progress.clone())
            .instrument(span.clone())
            .await;

        let _entered = span.enter();
        let inventory = match discovery {
            Ok(inventory) => inventory,
            Err(e) => {
                if e.is_cancelled() {
                    info!("[{}] Scan was cancelled", identifier);
                } else {
                    error!("[{}] Scan failed: {}", identifier, e);
                }
                return Err(e);
            }
        };

        let total_size_bytes = inventory.total_size();
        let extended_listing = inventory.extended_listing;

        let files_delivered = match deliver(inventory, sink) {
            Ok(delivered) => delivered,
            Err(e) => {
                error!("[{}] Delivering records failed: {}", identifier, e);
                progress.set_state(ScanState::Failed);
                return Err(e);
            }
        };
        progress.set_state(ScanState::Completed);

        info!("[{}] Scan completed: {} files delivered", identifier, files_delivered);

        Ok(ScanReport {
            identifier: identifier.to_string(),
            state: ScanState::Completed,
            files_delivered,
            total_size_bytes,
            directories_listed: progress.snapshot().map(|s| s.directories_listed).unwrap_or(0),
            extended_listing,
            elapsed: started.elapsed(),
        })
    }

    /// Connect, authenticate and walk without touching any sink
    pub async fn discover(
        &self,
        scan_url: &str,
        cancellation_token: CancellationToken,
        progress: ScanProgress,
    ) -> Result<Inventory, ScanError> {
        let result = self.run_discovery(scan_url, cancellation_token, progress.clone()).await;
        if result.is_ok() {
            progress.set_state(ScanState::Completed);
        }
        result
    }

    /// Runs the blocking scan on a worker. Only failure states are recorded
    /// here; success is up to the caller.
    async fn run_discovery(
        &self,
        scan_url: &str,
        cancellation_token: CancellationToken,
        progress: ScanProgress,
    ) -> Result<Inventory, ScanError> {
        let connector = self.connector.clone();
        let config = self.config.clone();
        let scan_url = scan_url.to_string();
        let worker_progress = progress.clone();
        let span = Span::current();

        // Dropping this future before the worker returns cancels the walk.
        // The child token leaves the caller's token untouched.
        let worker_token = cancellation_token.child_token();
        let drop_guard = worker_token.clone().drop_guard();

        let result = tokio::task::spawn_blocking(move || {
            let _entered = span.enter();
            run_blocking_scan(&*connector, &scan_url, &worker_token, &config, &worker_progress)
        })
        .await
        .unwrap_or_else(|e| {
            Err(ScanError::Worker {
                message: e.to_string(),
            })
        });

        drop_guard.disarm();

        match &result {
            Err(e) if e.is_cancelled() => progress.set_state(ScanState::Aborted),
            Err(_) => progress.set_state(ScanState::Failed),
            Ok(_) => {}
        }

        result
    }
}

fn deliver<S: RecordSink>(inventory: Inventory, sink: &mut S) -> Result<usize, ScanError> {
    let mut delivered = 0;
    for record in inventory.records {
        sink.add_file(record).map_err(|e| ScanError::Sink { message: e.to_string() })?;
        delivered += 1;
    }
    sink.finish().map_err(|e| ScanError::Sink { message: e.to_string() })?;
    Ok(delivered)
}

/// Session establishment and walk, on the calling thread
pub fn run_blocking_scan<K: FtpConnector>(
    connector: &K,
    scan_url: &str,
    cancellation_token: &CancellationToken,
    config: &ScanConfig,
    progress: &ScanProgress,
) -> Result<Inventory, ScanError> {
    let mut session =
        establish_with_progress(scan_url, connector, cancellation_token, config, Some(progress))?;

    progress.set_state(ScanState::Walking);
    let start_path = session.target().path().to_string();
    let extended_listing = session.extended_listing();

    let walked = InventoryWalker::new(&mut session, cancellation_token, config)
        .with_progress(progress)
        .walk(&start_path);

    session.close();

    let records = walked?;
    debug!("Walk of {} returned {} records", start_path, records.len());

    Ok(Inventory {
        records,
        extended_listing,
    })
}
