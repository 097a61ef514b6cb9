use chrono::{DateTime, Utc};
use std::borrow::Cow;
use std::net::{SocketAddr, ToSocketAddrs};
use std::str::FromStr;
use std::time::Duration;
use suppaftp::list::File;
use suppaftp::FtpStream;
use tracing::{debug, trace};

use crate::errors::TransportError;
use crate::models::{DirectoryEntry, EntryKind};

/// The feature name servers advertise for RFC 3659 machine listings
pub const MLST_FEATURE: &str = "MLST";

/// Blocking control connection to an FTP server.
///
/// Every method is one or more round trips on the wire. Paths given to
/// `list` are relative to the current working directory; the empty string
/// lists the working directory itself.
pub trait FtpClient {
    fn login(&mut self, username: &str, password: &str) -> Result<(), TransportError>;

    /// Whether FEAT advertises `feature` (case-insensitive)
    fn supports_feature(&mut self, feature: &str) -> Result<bool, TransportError>;

    fn change_dir(&mut self, path: &str) -> Result<(), TransportError>;

    fn current_dir(&mut self) -> Result<String, TransportError>;

    fn list(&mut self, path: &str) -> Result<Vec<DirectoryEntry>, TransportError>;

    fn quit(&mut self) -> Result<(), TransportError>;
}

/// Opens control connections
pub trait FtpConnector {
    type Client: FtpClient;

    fn connect(&self, address: &str, timeout: Duration) -> Result<Self::Client, TransportError>;
}

/// Production connector backed by `suppaftp`
#[derive(Debug, Clone, Default)]
pub struct SuppaFtpConnector;

impl SuppaFtpConnector {
    pub fn new() -> Self {
        Self
    }
}

impl FtpConnector for SuppaFtpConnector {
    type Client = SuppaFtpClient;

    fn connect(&self, address: &str, timeout: Duration) -> Result<Self::Client, TransportError> {
        let addrs: Vec<SocketAddr> = address.to_socket_addrs()?.collect();
        if addrs.is_empty() {
            return Err(TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} did not resolve to any address", address),
            )));
        }

        let mut last_error = None;
        for addr in addrs {
            debug!("Connecting to {} ({})", address, addr);
            match FtpStream::connect_timeout(addr, timeout) {
                Ok(stream) => return Ok(SuppaFtpClient::new(stream)),
                Err(e) => {
                    debug!("Connection attempt to {} failed: {}", addr, e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.map(TransportError::from).unwrap_or_else(|| {
            TransportError::Protocol(format!("no address to connect for {}", address))
        }))
    }
}

/// `FtpClient` over a plain `suppaftp::FtpStream`
pub struct SuppaFtpClient {
    stream: FtpStream,
    mlsd: Option<bool>,
}

impl SuppaFtpClient {
    pub fn new(stream: FtpStream) -> Self {
        Self { stream, mlsd: None }
    }

    fn use_mlsd(&mut self) -> bool {
        match self.mlsd {
            Some(mlsd) => mlsd,
            None => {
                let mlsd = self.supports_feature(MLST_FEATURE).unwrap_or(false);
                self.mlsd = Some(mlsd);
                mlsd
            }
        }
    }
}

impl FtpClient for SuppaFtpClient {
    fn login(&mut self, username: &str, password: &str) -> Result<(), TransportError> {
        self.stream.login(username, password)?;
        Ok(())
    }

    fn supports_feature(&mut self, feature: &str) -> Result<bool, TransportError> {
        let features = self.stream.feat()?;
        let supported = features.keys().any(|name| name.eq_ignore_ascii_case(feature));
        if feature.eq_ignore_ascii_case(MLST_FEATURE) {
            self.mlsd = Some(supported);
        }
        Ok(supported)
    }

    fn change_dir(&mut self, path: &str) -> Result<(), TransportError> {
        self.stream.cwd(path)?;
        Ok(())
    }

    fn current_dir(&mut self) -> Result<String, TransportError> {
        Ok(self.stream.pwd()?)
    }

    fn list(&mut self, path: &str) -> Result<Vec<DirectoryEntry>, TransportError> {
        let pathname = if path.is_empty() { None } else { Some(path) };

        if self.use_mlsd() {
            let lines = self.stream.mlsd(pathname)?;
            parse_mlsd_lines(&lines)
        } else {
            let lines = self.stream.list(pathname)?;
            parse_list_lines(&lines)
        }
    }

    fn quit(&mut self) -> Result<(), TransportError> {
        self.stream.quit()?;
        Ok(())
    }
}

/// Converts MLSD output.
///
/// `cdir`/`pdir` facts describe the listed directory and its parent and are
/// skipped explicitly. Fractional seconds in `modify=` are truncated. Any other
/// line that does not parse fails the whole listing.
pub fn parse_mlsd_lines(lines: &[String]) -> Result<Vec<DirectoryEntry>, TransportError> {
    let mut entries = Vec::with_capacity(lines.len());
    for line in lines.iter().filter(|line| !line.trim().is_empty()) {
        if is_pseudo_directory_fact(line) {
            continue;
        }
        let file = File::from_mlsx_line(&truncate_fractional_modify(line)).map_err(|e| {
            TransportError::Protocol(format!("unparseable MLSD line {:?}: {:?}", line, e))
        })?;
        let entry = entry_from_file(&file);
        if !entry.is_self_or_parent() {
            entries.push(entry);
        }
    }
    Ok(entries)
}

/// Converts LIST output (UNIX or DOS style). The `total N` header is
/// skipped; any other line that does not parse fails the whole listing.
pub fn parse_list_lines(lines: &[String]) -> Result<Vec<DirectoryEntry>, TransportError> {
    let mut entries = Vec::with_capacity(lines.len());
    for line in lines.iter().filter(|line| !line.trim().is_empty()) {
        if is_total_header(line) {
            trace!("Skipping LIST header {:?}", line);
            continue;
        }
        let file = File::from_str(line).map_err(|e| {
            TransportError::Protocol(format!("unparseable LIST line {:?}: {:?}", line, e))
        })?;
        let entry = entry_from_file(&file);
        if !entry.is_self_or_parent() {
            entries.push(entry);
        }
    }
    Ok(entries)
}

fn is_total_header(line: &str) -> bool {
    let mut words = line.split_whitespace();
    matches!(
        (words.next(), words.next(), words.next()),
        (Some(word), Some(count), None)
            if word.eq_ignore_ascii_case("total") && count.chars().all(|c| c.is_ascii_digit())
    )
}

fn is_pseudo_directory_fact(line: &str) -> bool {
    let facts = line.split(' ').next().unwrap_or("");
    facts.split(';').any(|fact| {
        let fact = fact.trim().to_ascii_lowercase();
        fact == "type=cdir" || fact == "type=pdir"
    })
}

/// `modify=YYYYMMDDHHMMSS.sss` becomes `modify=YYYYMMDDHHMMSS`
fn truncate_fractional_modify(line: &str) -> Cow<'_, str> {
    let Some((facts, name)) = line.split_once(' ') else {
        return Cow::Borrowed(line);
    };
    let is_fractional = |fact: &str| {
        fact.split_once('=')
            .map(|(key, value)| key.eq_ignore_ascii_case("modify") && value.contains('.'))
            .unwrap_or(false)
    };
    if !facts.split(';').any(is_fractional) {
        return Cow::Borrowed(line);
    }

    let facts: Vec<String> = facts
        .split(';')
        .map(|fact| match fact.split_once('=') {
            Some((key, value)) if is_fractional(fact) => {
                format!("{}={}", key, value.split('.').next().unwrap_or(value))
            }
            _ => fact.to_string(),
        })
        .collect();
    Cow::Owned(format!("{} {}", facts.join(";"), name))
}

fn entry_from_file(file: &File) -> DirectoryEntry {
    let kind = if file.is_symlink() {
        EntryKind::Other
    } else if file.is_directory() {
        EntryKind::Directory
    } else if file.is_file() {
        EntryKind::File
    } else {
        EntryKind::Other
    };

    DirectoryEntry {
        name: file.name().to_string(),
        kind,
        size: file.size() as u64,
        modified: DateTime::<Utc>::from(file.modified()),
    }
}
