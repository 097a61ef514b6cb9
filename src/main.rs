use anyhow::{anyhow, Result};
use clap::{value_parser, Arg, ArgAction, Command};
use std::io::{self, BufWriter};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ftpscan::{
    config::ScanConfig,
    errors::AppError,
    sink::{JsonLinesSink, PathListSink, RecordSink},
    FtpScanService, ScanError, ScanReport,
};

#[tokio::main]
async fn main() -> Result<()> {
    let matches = Command::new("ftpscan")
        .about("List every file below a directory on an FTP server")
        .arg(
            Arg::new("url")
                .help("Scan target, ftp://[user[:pass]@]host[:port]/path")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::new("identifier")
                .help("Name used to tag log lines for this scan")
                .long("identifier")
                .short('i')
                .value_name("NAME")
                .default_value("ftpscan"),
        )
        .arg(
            Arg::new("timeout")
                .help("Connect timeout in seconds (overrides FTP_CONNECT_TIMEOUT_SECONDS)")
                .long("timeout")
                .short('t')
                .value_name("SECS")
                .value_parser(value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new("format")
                .help("Output format")
                .long("format")
                .short('f')
                .value_parser(["json", "paths"])
                .default_value("json"),
        )
        .arg(
            Arg::new("debug")
                .help("Log every discovered path")
                .long("debug")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    let url = matches
        .get_one::<String>("url")
        .ok_or_else(|| anyhow!("missing scan URL"))?;
    let identifier = matches
        .get_one::<String>("identifier")
        .map(String::as_str)
        .unwrap_or("ftpscan");

    let mut config = ScanConfig::from_env()?;
    if let Some(seconds) = matches.get_one::<u64>("timeout") {
        config = config.with_connect_timeout(Duration::from_secs(*seconds));
    }
    if matches.get_flag("debug") {
        config = config.with_debug(true);
    }

    // Logs go to stderr so stdout carries only the inventory
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(std::env::var("RUST_LOG").ok().as_deref(), config.debug)?)
        .with_writer(io::stderr)
        .init();

    let cancellation_token = CancellationToken::new();
    let interrupt_token = cancellation_token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling scan");
            interrupt_token.cancel();
        }
    });

    let service = FtpScanService::new(config);
    let stdout = BufWriter::new(io::stdout().lock());

    let result = match matches.get_one::<String>("format").map(String::as_str) {
        Some("paths") => {
            let sink = PathListSink::new(stdout);
            run(&service, url, identifier, sink, cancellation_token).await
        }
        _ => {
            let sink = JsonLinesSink::new(stdout);
            run(&service, url, identifier, sink, cancellation_token).await
        }
    };

    match result {
        Ok(report) => {
            info!(
                "Scanned {} files ({} bytes) in {:?}",
                report.files_delivered, report.total_size_bytes, report.elapsed
            );
            Ok(())
        }
        Err(e) if e.is_cancelled() => {
            eprintln!("Scan cancelled");
            std::process::exit(130);
        }
        Err(e) => {
            eprintln!("Scan failed: {}", e);
            if let Some(action) = e.suggested_action() {
                eprintln!("Hint: {}", action);
            }
            std::process::exit(1);
        }
    }
}

async fn run<S: RecordSink>(
    service: &FtpScanService,
    url: &str,
    identifier: &str,
    mut sink: S,
    cancellation_token: CancellationToken,
) -> Result<ScanReport, ScanError> {
    service.scan(url, identifier, &mut sink, cancellation_token).await
}

/// `RUST_LOG` (or `info`), with this crate raised to `debug` when path echo is on
fn log_filter(rust_log: Option<&str>, debug: bool) -> Result<EnvFilter> {
    let mut filter = rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new("info"));
    if debug {
        filter = filter.add_directive("ftpscan=debug".parse()?);
    }
    Ok(filter)
}
