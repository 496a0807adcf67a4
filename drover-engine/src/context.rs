//! Run context: the immutable root paths every component works from.
//!
//! Constructed once at process start and passed down explicitly; nothing in
//! the engine reads path configuration from the environment after this
//! point.

use std::path::{Path, PathBuf};

/// Immutable per-process context deriving all campaign paths.
///
/// Layout under the data root:
///
/// ```text
/// <data_root>/campaigns/<campaign>/campaign.toml
/// <data_root>/campaigns/<campaign>/recipients.csv
/// <data_root>/campaigns/<campaign>/template.html
/// <data_root>/logs/<campaign>/sent_log.csv
/// <data_root>/logs/<campaign>/sent_threads.csv
/// <data_root>/logs/<campaign>/state.json
/// ```
#[derive(Debug, Clone)]
pub struct RunContext {
    data_root: PathBuf,
    creds_root: PathBuf,
}

impl RunContext {
    #[must_use]
    pub fn new(data_root: PathBuf, creds_root: PathBuf) -> Self {
        Self {
            data_root,
            creds_root,
        }
    }

    /// Build a context from `DATA_ROOT` / `CREDS_ROOT`, falling back to the
    /// container defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let data_root = std::env::var_os("DATA_ROOT")
            .map_or_else(|| PathBuf::from("/data"), PathBuf::from);
        let creds_root = std::env::var_os("CREDS_ROOT")
            .map_or_else(|| PathBuf::from("/creds"), PathBuf::from);
        Self::new(data_root, creds_root)
    }

    #[must_use]
    pub fn data_root(&self) -> &Path {
        &self.data_root
    }

    #[must_use]
    pub fn campaigns_dir(&self) -> PathBuf {
        self.data_root.join("campaigns")
    }

    #[must_use]
    pub fn campaign_dir(&self, campaign: &str) -> PathBuf {
        self.campaigns_dir().join(campaign)
    }

    #[must_use]
    pub fn config_path(&self, campaign: &str) -> PathBuf {
        self.campaign_dir(campaign).join("campaign.toml")
    }

    #[must_use]
    pub fn recipients_path(&self, campaign: &str) -> PathBuf {
        self.campaign_dir(campaign).join("recipients.csv")
    }

    #[must_use]
    pub fn template_path(&self, campaign: &str) -> PathBuf {
        self.campaign_dir(campaign).join("template.html")
    }

    #[must_use]
    pub fn logs_dir(&self, campaign: &str) -> PathBuf {
        self.data_root.join("logs").join(campaign)
    }

    #[must_use]
    pub fn state_path(&self, campaign: &str) -> PathBuf {
        self.logs_dir(campaign).join("state.json")
    }

    #[must_use]
    pub fn sent_log_path(&self, campaign: &str) -> PathBuf {
        self.logs_dir(campaign).join("sent_log.csv")
    }

    #[must_use]
    pub fn sent_threads_path(&self, campaign: &str) -> PathBuf {
        self.logs_dir(campaign).join("sent_threads.csv")
    }

    #[must_use]
    pub fn stats_path(&self, campaign: &str) -> PathBuf {
        self.logs_dir(campaign).join("stats.csv")
    }

    /// Credential directory for an account identity.
    #[must_use]
    pub fn creds_dir(&self, account: &str) -> PathBuf {
        self.creds_root.join(account)
    }

    /// Resolve an attachment path: absolute paths pass through, relative
    /// ones are joined onto the data root.
    #[must_use]
    pub fn resolve_attachment(&self, path: &str) -> PathBuf {
        let candidate = Path::new(path);
        if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.data_root.join(candidate)
        }
    }
}
