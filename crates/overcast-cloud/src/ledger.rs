//! Resource ledger
//!
//! Append-only record of every resource created during a run. The durable
//! form is a text log with one `"<kind>: <id>"` line per resource, in creation
//! order. Teardown reads it back and replays it bottom-to-top.

use crate::error::{CloudError, Result};
use crate::resource::ResourceKind;
use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;

/// One recorded resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub kind: ResourceKind,
    pub id: String,
}

impl LedgerEntry {
    pub fn new(kind: ResourceKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }
}

impl fmt::Display for LedgerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.id)
    }
}

/// Sink for created resources
///
/// `record` must not return before the entry is durable, so that a crash
/// after the call still leaves the resource discoverable by teardown.
#[async_trait]
pub trait ResourceLedger: Send + Sync {
    async fn record(&self, kind: ResourceKind, id: &str) -> Result<()>;
}

/// Ledger that forgets everything (cleanup tracking disabled)
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLedger;

#[async_trait]
impl ResourceLedger for NoopLedger {
    async fn record(&self, _kind: ResourceKind, _id: &str) -> Result<()> {
        Ok(())
    }
}

/// Ledger appended to a log file, flushed and synced per entry
pub struct FileLedger {
    path: PathBuf,
    file: tokio::sync::Mutex<File>,
}

impl FileLedger {
    /// Open (or create) a ledger file in append mode
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        tracing::debug!("Opened resource ledger: {}", path.display());
        Ok(Self {
            path,
            file: tokio::sync::Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ResourceLedger for FileLedger {
    async fn record(&self, kind: ResourceKind, id: &str) -> Result<()> {
        let line = format!("{}\n", LedgerEntry::new(kind, id));
        let mut file = self.file.lock().await;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        file.sync_data().await?;
        tracing::debug!(%kind, id, "Recorded resource");
        Ok(())
    }
}

/// In-process ledger
#[derive(Debug, Default)]
pub struct MemoryLedger {
    entries: Mutex<Vec<LedgerEntry>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the entries recorded so far, in creation order
    pub fn entries(&self) -> Vec<LedgerEntry> {
        match self.entries.lock() {
            Ok(entries) => entries.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl ResourceLedger for MemoryLedger {
    async fn record(&self, kind: ResourceKind, id: &str) -> Result<()> {
        let mut entries = match self.entries.lock() {
            Ok(entries) => entries,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries.push(LedgerEntry::new(kind, id));
        Ok(())
    }
}

/// Parse ledger text. Blank lines are skipped; anything else malformed is rejected.
pub fn parse_ledger(content: &str) -> Result<Vec<LedgerEntry>> {
    let mut entries = Vec::new();
    for (idx, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        let invalid = || CloudError::InvalidLedgerEntry {
            line: idx + 1,
            content: line.to_string(),
        };

        let (kind, id) = line.split_once(": ").ok_or_else(invalid)?;
        let kind = kind.parse::<ResourceKind>().map_err(|_| invalid())?;
        let id = id.trim();
        if id.is_empty() {
            return Err(invalid());
        }
        entries.push(LedgerEntry::new(kind, id));
    }
    Ok(entries)
}

/// Read a ledger file, returning entries in creation order
pub async fn read_ledger(path: impl AsRef<Path>) -> Result<Vec<LedgerEntry>> {
    let content = fs::read_to_string(path.as_ref()).await?;
    let entries = parse_ledger(&content)?;
    tracing::debug!(
        "Loaded {} ledger entries from {}",
        entries.len(),
        path.as_ref().display()
    );
    Ok(entries)
}
