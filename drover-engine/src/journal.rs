//! Durable per-campaign journals: the sent log and the thread index.
//!
//! Both live next to `state.json` in the campaign's logs directory and are
//! consumed downstream by bounce/reply/stat tooling, so their on-disk
//! formats are stable: `sent_log.csv` is one address per line, append-only;
//! `sent_threads.csv` is `email,threadId` and is rewritten in full per
//! success.

use std::path::{Path, PathBuf};

use ahash::AHashSet;
use serde::{Deserialize, Serialize};
use tokio::{fs, io::AsyncWriteExt};

use crate::error::EngineError;

/// Append-only log of successfully delivered addresses.
///
/// Doubles as a fast re-entry guard: addresses already present are never
/// sent again, independently of the state store.
#[derive(Debug)]
pub struct SentLog {
    seen: AHashSet<String>,
    file: fs::File,
}

impl SentLog {
    /// Open (or create) the log and preload the already-sent set.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened for appending.
    pub async fn open(path: &Path) -> Result<Self, EngineError> {
        let seen = match fs::read_to_string(path).await {
            Ok(existing) => existing
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(ToString::to_string)
                .collect(),
            Err(_) => AHashSet::default(),
        };

        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;

        Ok(Self { seen, file })
    }

    #[must_use]
    pub fn contains(&self, email: &str) -> bool {
        self.seen.contains(email)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// Append one address and flush immediately. The log is never
    /// rewritten.
    ///
    /// # Errors
    /// Returns an error if the write or flush fails.
    pub async fn append(&mut self, email: &str) -> Result<(), EngineError> {
        self.file.write_all(format!("{email}\n").as_bytes()).await?;
        self.file.flush().await?;
        self.seen.insert(email.to_string());
        Ok(())
    }
}

/// One row of the thread index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadEntry {
    pub email: String,
    #[serde(rename = "threadId")]
    pub thread_id: String,
}

/// Mapping recipient → remote thread id for sent messages.
///
/// Rewritten in full after every success; volume is small enough that the
/// whole-file rewrite buys the same crash safety as the state store.
#[derive(Debug)]
pub struct SentThreadIndex {
    path: PathBuf,
    entries: Vec<ThreadEntry>,
}

impl SentThreadIndex {
    /// Load the index, tolerating a missing file.
    pub async fn load(path: &Path) -> Self {
        let entries = match fs::read(path).await {
            Ok(raw) => {
                let mut reader = csv::Reader::from_reader(raw.as_slice());
                let mut entries = Vec::new();
                for row in reader.deserialize::<ThreadEntry>() {
                    match row {
                        Ok(entry) => entries.push(entry),
                        Err(e) => {
                            tracing::warn!(
                                path = %path.display(),
                                error = %e,
                                "Skipping malformed thread index row"
                            );
                        }
                    }
                }
                entries
            }
            Err(_) => Vec::new(),
        };

        Self {
            path: path.to_path_buf(),
            entries,
        }
    }

    #[must_use]
    pub fn entries(&self) -> &[ThreadEntry] {
        &self.entries
    }

    /// Record one delivery and rewrite the file.
    ///
    /// # Errors
    /// Returns an error if serialization or the filesystem steps fail.
    pub async fn record(&mut self, email: &str, thread_id: &str) -> Result<(), EngineError> {
        self.entries.push(ThreadEntry {
            email: email.to_string(),
            thread_id: thread_id.to_string(),
        });

        let mut writer = csv::Writer::from_writer(Vec::new());
        for entry in &self.entries {
            writer
                .serialize(entry)
                .map_err(|e| EngineError::Io(std::io::Error::other(e)))?;
        }
        let raw = writer
            .into_inner()
            .map_err(|e| EngineError::Io(std::io::Error::other(e)))?;

        let tmp = self.path.with_extension("csv.tmp");
        fs::write(&tmp, &raw).await?;
        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sent_log_appends_and_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sent_log.csv");

        let mut log = SentLog::open(&path).await.unwrap();
        assert!(log.is_empty());
        log.append("alice@example.com").await.unwrap();
        log.append("bob@example.com").await.unwrap();
        assert!(log.contains("alice@example.com"));
        drop(log);

        let log = SentLog::open(&path).await.unwrap();
        assert_eq!(log.len(), 2);
        assert!(log.contains("bob@example.com"));

        let on_disk = std::fs::read_to_string(&path).unwrap();
        assert_eq!(on_disk, "alice@example.com\nbob@example.com\n");
    }

    #[tokio::test]
    async fn thread_index_rewrites_in_full() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sent_threads.csv");

        let mut index = SentThreadIndex::load(&path).await;
        index.record("alice@example.com", "t1").await.unwrap();
        index.record("bob@example.com", "t2").await.unwrap();

        let on_disk = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            on_disk,
            "email,threadId\nalice@example.com,t1\nbob@example.com,t2\n"
        );

        let reloaded = SentThreadIndex::load(&path).await;
        assert_eq!(reloaded.entries().len(), 2);
        assert_eq!(reloaded.entries()[1].thread_id, "t2");
    }

    #[tokio::test]
    async fn thread_index_tolerates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let index = SentThreadIndex::load(&dir.path().join("sent_threads.csv")).await;
        assert!(index.entries().is_empty());
    }
}
