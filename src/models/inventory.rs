use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One file discovered on a remote server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Absolute, forward-slash separated path rooted at "/"
    pub path: String,
    pub size: i64,
    #[serde(rename = "mod_time")]
    pub modified: DateTime<Utc>,
}

/// Classification reported by the server for a listing item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    File,
    Directory,
    /// Symlinks, devices and anything else the scanner does not follow
    Other,
}

/// A single item from a remote directory listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub name: String,
    pub kind: EntryKind,
    pub size: u64,
    pub modified: DateTime<Utc>,
}

impl DirectoryEntry {
    pub fn file(name: impl Into<String>, size: u64, modified: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::File,
            size,
            modified,
        }
    }

    pub fn directory(name: impl Into<String>, modified: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Directory,
            size: 0,
            modified,
        }
    }

    pub fn other(name: impl Into<String>, modified: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Other,
            size: 0,
            modified,
        }
    }

    /// Servers may report the current and parent directory as entries
    pub fn is_self_or_parent(&self) -> bool {
        self.name == "." || self.name == ".."
    }
}

/// Records produced by one successful walk
#[derive(Debug, Clone)]
pub struct Inventory {
    pub records: Vec<FileRecord>,
    /// Whether the server advertised MLST
    pub extended_listing: bool,
}

impl Inventory {
    /// Sum of all record sizes, saturating at `i64::MAX`
    pub fn total_size(&self) -> i64 {
        self.records
            .iter()
            .fold(0i64, |total, record| total.saturating_add(record.size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_size_saturates() {
        let huge = FileRecord {
            path: "/pub/huge.bin".to_string(),
            size: i64::MAX,
            modified: DateTime::<Utc>::UNIX_EPOCH,
        };
        let inventory = Inventory {
            records: vec![huge.clone(), huge],
            extended_listing: true,
        };

        assert_eq!(inventory.total_size(), i64::MAX);
    }
}
