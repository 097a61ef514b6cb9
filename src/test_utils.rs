//! Test utilities for simulating FTP servers
//!
//! `MockFtpServer` holds an in-memory directory tree and hands out
//! connectors whose clients behave like a real control connection: CWD
//! and relative listings, FEAT, login checks and injected failures. All
//! clients share the server state so tests can inspect what went over
//! the "wire" afterwards.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::errors::TransportError;
use crate::models::{DirectoryEntry, EntryKind};
use crate::services::ftp::{FtpClient, FtpConnector};

/// Deterministic timestamp for fixtures, `offset_hours` after 2024-01-01T00:00:00Z
pub fn fixture_time(offset_hours: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(1_704_067_200, 0).unwrap() + ChronoDuration::hours(offset_hours)
}

#[derive(Debug, Default)]
struct MockState {
    /// Absolute directory path -> entries in insertion order
    tree: BTreeMap<String, Vec<DirectoryEntry>>,
    features: Vec<String>,
    credentials: Option<(String, String)>,
    refuse_connections: bool,
    failing_listings: HashSet<String>,
    cancel_after: Option<(usize, CancellationToken)>,
    list_delay: Option<Duration>,

    connects: Vec<(String, Duration)>,
    logins: Vec<(String, String)>,
    listings: Vec<String>,
    quits: usize,
}

/// In-memory FTP server
#[derive(Debug, Clone)]
pub struct MockFtpServer {
    state: Arc<Mutex<MockState>>,
}

impl Default for MockFtpServer {
    fn default() -> Self {
        Self::new()
    }
}

impl MockFtpServer {
    /// Empty root directory, anonymous access allowed, MLST advertised
    pub fn new() -> Self {
        let mut state = MockState::default();
        state.tree.insert("/".to_string(), Vec::new());
        state.features = vec!["MLST".to_string(), "SIZE".to_string(), "MDTM".to_string()];
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn with_dir(self, path: &str) -> Self {
        self.ensure_dir(&normalize(path));
        self
    }

    pub fn with_file(self, path: &str, size: u64, modified: DateTime<Utc>) -> Self {
        let (parent, name) = split_parent(&normalize(path));
        self.ensure_dir(&parent);
        self.push_entry(&parent, DirectoryEntry::file(name, size, modified));
        self
    }

    pub fn with_symlink(self, path: &str) -> Self {
        let (parent, name) = split_parent(&normalize(path));
        self.ensure_dir(&parent);
        self.push_entry(&parent, DirectoryEntry::other(name, fixture_time(0)));
        self
    }

    pub fn without_mlst(self) -> Self {
        self.state.lock().unwrap().features.retain(|f| f != "MLST");
        self
    }

    /// Only this user/password pair may log in
    pub fn with_credentials(self, username: &str, password: &str) -> Self {
        self.state.lock().unwrap().credentials = Some((username.to_string(), password.to_string()));
        self
    }

    pub fn refuse_connections(self) -> Self {
        self.state.lock().unwrap().refuse_connections = true;
        self
    }

    /// Listing this absolute directory answers 550
    pub fn fail_listing(self, path: &str) -> Self {
        self.state.lock().unwrap().failing_listings.insert(normalize(path));
        self
    }

    /// Cancels `token` as soon as `count` listings have been served
    pub fn cancel_after_listings(self, count: usize, token: CancellationToken) -> Self {
        self.state.lock().unwrap().cancel_after = Some((count, token));
        self
    }

    /// Every LIST takes at least `delay` to answer
    pub fn with_list_delay(self, delay: Duration) -> Self {
        self.state.lock().unwrap().list_delay = Some(delay);
        self
    }

    pub fn connector(&self) -> MockConnector {
        MockConnector {
            state: self.state.clone(),
        }
    }

    pub fn connect_count(&self) -> usize {
        self.state.lock().unwrap().connects.len()
    }

    pub fn last_connect(&self) -> Option<(String, Duration)> {
        self.state.lock().unwrap().connects.last().cloned()
    }

    pub fn last_login(&self) -> Option<(String, String)> {
        self.state.lock().unwrap().logins.last().cloned()
    }

    pub fn list_count(&self) -> usize {
        self.state.lock().unwrap().listings.len()
    }

    /// Absolute directories listed so far, in order
    pub fn listed_paths(&self) -> Vec<String> {
        self.state.lock().unwrap().listings.clone()
    }

    pub fn quit_count(&self) -> usize {
        self.state.lock().unwrap().quits
    }

    fn ensure_dir(&self, path: &str) {
        if path == "/" {
            return;
        }
        let (parent, name) = split_parent(path);
        self.ensure_dir(&parent);

        let mut state = self.state.lock().unwrap();
        if state.tree.contains_key(path) {
            return;
        }
        state.tree.insert(path.to_string(), Vec::new());
        if let Some(entries) = state.tree.get_mut(&parent) {
            entries.push(DirectoryEntry::directory(name, fixture_time(0)));
        }
    }

    fn push_entry(&self, parent: &str, entry: DirectoryEntry) {
        let mut state = self.state.lock().unwrap();
        if let Some(entries) = state.tree.get_mut(parent) {
            entries.push(entry);
        }
    }
}

/// Connector handing out clients bound to a `MockFtpServer`
#[derive(Debug, Clone)]
pub struct MockConnector {
    state: Arc<Mutex<MockState>>,
}

impl FtpConnector for MockConnector {
    type Client = MockFtpClient;

    fn connect(&self, address: &str, timeout: Duration) -> Result<Self::Client, TransportError> {
        let mut state = self.state.lock().unwrap();
        state.connects.push((address.to_string(), timeout));
        if state.refuse_connections {
            return Err(TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "connection refused",
            )));
        }
        Ok(MockFtpClient {
            state: self.state.clone(),
            cwd: "/".to_string(),
            logged_in: false,
        })
    }
}

/// Client side of a simulated control connection
#[derive(Debug)]
pub struct MockFtpClient {
    state: Arc<Mutex<MockState>>,
    cwd: String,
    logged_in: bool,
}

impl MockFtpClient {
    fn resolve(&self, path: &str) -> String {
        if path.starts_with('/') {
            normalize(path)
        } else {
            normalize(&format!("{}/{}", self.cwd, path))
        }
    }

    fn require_login(&self) -> Result<(), TransportError> {
        if self.logged_in {
            Ok(())
        } else {
            Err(TransportError::Protocol("530 Please login with USER and PASS".to_string()))
        }
    }
}

impl FtpClient for MockFtpClient {
    fn login(&mut self, username: &str, password: &str) -> Result<(), TransportError> {
        let mut state = self.state.lock().unwrap();
        state.logins.push((username.to_string(), password.to_string()));
        if let Some((user, pass)) = &state.credentials {
            if user != username || pass != password {
                return Err(TransportError::Protocol("530 Login incorrect".to_string()));
            }
        }
        self.logged_in = true;
        Ok(())
    }

    fn supports_feature(&mut self, feature: &str) -> Result<bool, TransportError> {
        let state = self.state.lock().unwrap();
        Ok(state.features.iter().any(|f| f.eq_ignore_ascii_case(feature)))
    }

    fn change_dir(&mut self, path: &str) -> Result<(), TransportError> {
        self.require_login()?;
        let target = self.resolve(path);
        if self.state.lock().unwrap().tree.contains_key(&target) {
            self.cwd = target;
            Ok(())
        } else {
            Err(TransportError::Protocol(format!("550 {}: No such file or directory", path)))
        }
    }

    fn current_dir(&mut self) -> Result<String, TransportError> {
        self.require_login()?;
        Ok(self.cwd.clone())
    }

    fn list(&mut self, path: &str) -> Result<Vec<DirectoryEntry>, TransportError> {
        self.require_login()?;
        let target = if path.is_empty() { self.cwd.clone() } else { self.resolve(path) };

        let delay = self.state.lock().unwrap().list_delay;
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }

        let mut state = self.state.lock().unwrap();
        state.listings.push(target.clone());

        if let Some((count, token)) = &state.cancel_after {
            if state.listings.len() >= *count {
                token.cancel();
            }
        }

        if state.failing_listings.contains(&target) {
            return Err(TransportError::Protocol(format!("550 {}: Permission denied", target)));
        }

        state.tree.get(&target).cloned().ok_or_else(|| {
            TransportError::Protocol(format!("550 {}: No such file or directory", target))
        })
    }

    fn quit(&mut self) -> Result<(), TransportError> {
        self.state.lock().unwrap().quits += 1;
        Ok(())
    }
}

fn normalize(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty() && *s != ".").collect();
    format!("/{}", segments.join("/"))
}

fn split_parent(path: &str) -> (String, String) {
    match path.rfind('/') {
        Some(0) => ("/".to_string(), path[1..].to_string()),
        Some(idx) => (path[..idx].to_string(), path[idx + 1..].to_string()),
        None => ("/".to_string(), path.to_string()),
    }
}

/// Flattens the files of a simulated tree the way a scan should report them
pub fn expected_files(server: &MockFtpServer, root: &str) -> Vec<(String, u64, DateTime<Utc>)> {
    let root = normalize(root);
    let state = server.state.lock().unwrap();
    let mut files = Vec::new();
    for (dir, entries) in state.tree.iter() {
        let inside = dir == &root || root == "/" || dir.starts_with(&format!("{}/", root));
        if !inside {
            continue;
        }
        for entry in entries.iter().filter(|e| e.kind == EntryKind::File) {
            let path = if dir == "/" {
                format!("/{}", entry.name)
            } else {
                format!("{}/{}", dir, entry.name)
            };
            files.push((path, entry.size, entry.modified));
        }
    }
    files.sort();
    files
}
