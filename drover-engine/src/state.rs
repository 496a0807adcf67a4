//! Persistent per-recipient send state.
//!
//! The full store is one JSON document, `state.json`, keyed by recipient
//! address. It is loaded once per run and rewritten atomically after every
//! status-changing event, so a killed process can never leave a partially
//! written document under the visible name: readers always see either the
//! prior complete document or the new one.
//!
//! # State machine
//!
//! `pending → sending → {sent | error}`; `error → sending` on a later run
//! unless the lifetime attempt ceiling was hit (terminal); `sent` is
//! terminal. An entry found in `sending` at load time belongs to a run that
//! crashed mid-send; its outcome is indeterminate, so startup
//! reconciliation resets it to `pending` and the recipient is re-attempted.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::{error::EngineError, transport::SendReceipt};

/// Delivery status of one recipient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecipientStatus {
    Pending,
    Sending,
    Sent,
    Error,
}

/// Per-recipient delivery record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipientState {
    pub status: RecipientStatus,

    /// Lifetime send attempts, incremented per attempt, never reset.
    #[serde(default)]
    pub attempts: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_attempt: Option<DateTime<Utc>>,

    /// Last failure text; serialized as `error` for compatibility with
    /// state files written by earlier versions of this tool.
    #[serde(default, rename = "error", skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error_ts: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_success_ts: Option<DateTime<Utc>>,
}

impl Default for RecipientState {
    fn default() -> Self {
        Self {
            status: RecipientStatus::Pending,
            attempts: 0,
            last_attempt: None,
            last_error: None,
            last_error_ts: None,
            message_id: None,
            thread_id: None,
            last_success_ts: None,
        }
    }
}

/// The full recipient→state mapping with its backing file.
#[derive(Debug)]
pub struct SendStateStore {
    path: PathBuf,
    entries: BTreeMap<String, RecipientState>,
}

impl SendStateStore {
    /// Load the store from disk.
    ///
    /// Never fails: a missing file yields an empty store, and a corrupt
    /// document is treated as empty (with a warning) rather than aborting
    /// the run.
    pub async fn load(path: &Path) -> Self {
        let entries = match fs::read(path).await {
            Ok(raw) => match serde_json::from_slice(&raw) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Corrupt send state, starting from an empty store"
                    );
                    BTreeMap::new()
                }
            },
            Err(_) => BTreeMap::new(),
        };

        Self {
            path: path.to_path_buf(),
            entries,
        }
    }

    /// Atomically persist the full document.
    ///
    /// Writes the serialized store to `<path>.tmp`, then renames over the
    /// target, so a crash mid-write cannot corrupt the visible file.
    ///
    /// # Errors
    /// Returns an error if serialization or either filesystem step fails.
    pub async fn save(&self) -> Result<(), EngineError> {
        let raw = serde_json::to_vec_pretty(&self.entries)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, &raw).await?;
        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    /// Reset every `sending` entry to `pending`.
    ///
    /// Called once at run start; returns how many entries were reconciled.
    pub fn reconcile_interrupted(&mut self) -> usize {
        let mut reset = 0;
        for state in self.entries.values_mut() {
            if state.status == RecipientStatus::Sending {
                state.status = RecipientStatus::Pending;
                reset += 1;
            }
        }
        reset
    }

    #[must_use]
    pub fn get(&self, email: &str) -> Option<&RecipientState> {
        self.entries.get(email)
    }

    #[must_use]
    pub fn status(&self, email: &str) -> Option<RecipientStatus> {
        self.entries.get(email).map(|state| state.status)
    }

    #[must_use]
    pub fn attempts(&self, email: &str) -> u32 {
        self.entries.get(email).map_or(0, |state| state.attempts)
    }

    /// Whether this recipient has permanently failed: status `error` with
    /// the lifetime attempt ceiling reached. Terminal across runs.
    #[must_use]
    pub fn is_exhausted(&self, email: &str, max_attempts_per_contact: u32) -> bool {
        self.entries.get(email).is_some_and(|state| {
            state.status == RecipientStatus::Error && state.attempts >= max_attempts_per_contact
        })
    }

    /// Transition to `sending`: stamp the attempt, increment the lifetime
    /// counter, clear the previous error text. Returns the new attempt
    /// count.
    pub fn begin_attempt(&mut self, email: &str, now: DateTime<Utc>) -> u32 {
        let state = self.entries.entry(email.to_string()).or_default();
        state.status = RecipientStatus::Sending;
        state.last_attempt = Some(now);
        state.attempts += 1;
        state.last_error = None;
        state.attempts
    }

    /// Transition to `error` with the failure text and timestamp.
    pub fn record_failure(&mut self, email: &str, error: &str, now: DateTime<Utc>) {
        let state = self.entries.entry(email.to_string()).or_default();
        state.status = RecipientStatus::Error;
        state.last_error = Some(error.to_string());
        state.last_error_ts = Some(now);
    }

    /// Transition to `sent` with the remote identifiers. Terminal.
    pub fn record_success(&mut self, email: &str, receipt: &SendReceipt, now: DateTime<Utc>) {
        let state = self.entries.entry(email.to_string()).or_default();
        state.status = RecipientStatus::Sent;
        state.message_id = Some(receipt.message_id.clone());
        state.thread_id = Some(receipt.thread_id.clone());
        state.last_success_ts = Some(now);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &RecipientState)> {
        self.entries.iter()
    }
}
