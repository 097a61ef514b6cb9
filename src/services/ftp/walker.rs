use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::config::ScanConfig;
use crate::errors::ScanError;
use crate::models::{DirectoryEntry, EntryKind, FileRecord};
use super::client::FtpClient;
use super::progress::ScanProgress;
use super::session::Session;

/// Walks `start_path` depth-first and returns every regular file under it
pub fn walk<C: FtpClient>(
    session: &mut Session<C>,
    start_path: &str,
    cancel: &CancellationToken,
    config: &ScanConfig,
) -> Result<Vec<FileRecord>, ScanError> {
    InventoryWalker::new(session, cancel, config).walk(start_path)
}

/// Depth-first inventory of a remote tree over one session.
///
/// Directories are visited in listing order and each subdirectory is fully
/// walked before its next sibling, so records come out in the same order a
/// recursive walk would produce. Pending listings are kept on an explicit
/// stack instead of the call stack.
pub struct InventoryWalker<'a, C: FtpClient> {
    session: &'a mut Session<C>,
    cancel: &'a CancellationToken,
    config: &'a ScanConfig,
    progress: Option<&'a ScanProgress>,
    root: String,
}

struct PendingDirectory {
    relative_path: String,
    entries: std::vec::IntoIter<DirectoryEntry>,
}

impl<'a, C: FtpClient> InventoryWalker<'a, C> {
    pub fn new(
        session: &'a mut Session<C>,
        cancel: &'a CancellationToken,
        config: &'a ScanConfig,
    ) -> Self {
        Self {
            session,
            cancel,
            config,
            progress: None,
            root: String::new(),
        }
    }

    pub fn with_progress(mut self, progress: &'a ScanProgress) -> Self {
        self.progress = Some(progress);
        self
    }

    /// All-or-nothing walk: any error discards what was found
    pub fn walk(mut self, start_path: &str) -> Result<Vec<FileRecord>, ScanError> {
        let mut records = Vec::with_capacity(self.config.accumulator_capacity());
        self.walk_into(start_path, &mut records)?;
        Ok(records)
    }

    /// Appends discovered files to `records`.
    ///
    /// On `Aborted` everything this call appended is removed again. On a
    /// listing failure the records gathered so far stay in place for
    /// diagnostics; the walk still counts as failed.
    pub fn walk_into(
        &mut self,
        start_path: &str,
        records: &mut Vec<FileRecord>,
    ) -> Result<(), ScanError> {
        let initial_len = records.len();

        self.session
            .client_mut()
            .change_dir(start_path)
            .map_err(|e| ScanError::PathError {
                path: start_path.to_string(),
                message: e.to_string(),
            })?;

        match self.session.client_mut().current_dir() {
            Ok(prefix) => debug!("Current dir: {}", prefix),
            Err(e) => debug!("PWD failed after changing to {}: {}", start_path, e),
        }

        self.root = start_path.trim_end_matches('/').to_string();

        let result = self.walk_tree(records);
        match &result {
            Err(ScanError::Aborted) => {
                records.truncate(initial_len);
            }
            Err(e) => {
                let found = records.len() - initial_len;
                warn!("Walk of {} failed after {} files: {}", start_path, found, e);
            }
            Ok(()) => {
                debug!("Walk of {} found {} files", start_path, records.len() - initial_len);
            }
        }
        result
    }

    fn walk_tree(&mut self, records: &mut Vec<FileRecord>) -> Result<(), ScanError> {
        let mut stack = vec![PendingDirectory {
            relative_path: String::new(),
            entries: self.list_directory("")?.into_iter(),
        }];

        while let Some(current) = stack.last_mut() {
            let Some(entry) = current.entries.next() else {
                stack.pop();
                continue;
            };

            match entry.kind {
                EntryKind::File => {
                    let record = self.file_record(&current.relative_path, entry);
                    records.push(record);
                }
                EntryKind::Directory => {
                    let child = join_relative(&current.relative_path, &entry.name);
                    let entries = self.list_directory(&child)?;
                    stack.push(PendingDirectory {
                        relative_path: child,
                        entries: entries.into_iter(),
                    });
                }
                EntryKind::Other => {
                    trace!(
                        "Skipping {} in '{}': not a file or directory",
                        entry.name, current.relative_path
                    );
                }
            }
        }

        Ok(())
    }

    fn list_directory(&mut self, relative_path: &str) -> Result<Vec<DirectoryEntry>, ScanError> {
        // Nothing goes on the wire once cancellation is observed
        if self.cancel.is_cancelled() {
            debug!("Scan cancelled before listing '{}'", relative_path);
            return Err(ScanError::Aborted);
        }

        let display_path = self.remote_path(relative_path, "");
        if let Some(progress) = self.progress {
            progress.set_current_directory(&display_path);
        }

        let entries = self
            .session
            .client_mut()
            .list(relative_path)
            .map_err(|e| ScanError::ListError {
                path: display_path,
                message: e.to_string(),
            })?;

        if let Some(progress) = self.progress {
            progress.add_directory_listed();
        }

        Ok(entries)
    }

    fn file_record(&self, relative_path: &str, entry: DirectoryEntry) -> FileRecord {
        let record = FileRecord {
            path: self.remote_path(relative_path, &entry.name),
            size: i64::try_from(entry.size).unwrap_or(i64::MAX),
            modified: entry.modified,
        };

        if self.config.debug {
            debug!("{}", record.path);
        }
        if let Some(progress) = self.progress {
            progress.add_file_found(record.size);
        }

        record
    }

    /// Absolute path of `name` inside `relative_path` under the walk root
    fn remote_path(&self, relative_path: &str, name: &str) -> String {
        let segments: Vec<&str> = self
            .root
            .split('/')
            .chain(relative_path.split('/'))
            .chain(std::iter::once(name))
            .filter(|segment| !segment.is_empty())
            .collect();
        format!("/{}", segments.join("/"))
    }
}

fn join_relative(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", parent, name)
    }
}
