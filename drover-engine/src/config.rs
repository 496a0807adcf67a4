//! Campaign configuration
//!
//! One `CampaignConfig` is loaded per run from `campaign.toml` in the
//! campaign directory and stays immutable for the run's duration. Every
//! field has a serde default so a minimal config only needs the sender
//! identity and the API endpoint.

use std::path::Path;

use serde::Deserialize;

use crate::error::EngineError;

/// Immutable configuration for one campaign.
#[derive(Debug, Clone, Deserialize)]
pub struct CampaignConfig {
    /// Account identity, selects the credential directory under the creds
    /// root.
    #[serde(default = "default_account_name")]
    pub account_name: String,

    /// Sender address.
    pub from_email: String,

    /// Optional send-as override; takes precedence over `from_email` when
    /// set.
    #[serde(default)]
    pub send_as_email: Option<String>,

    /// Subject template, rendered against each recipient row.
    #[serde(default = "default_subject")]
    pub subject: String,

    /// Label applied to sent messages. Defaults to `campaign/<name>`.
    #[serde(default)]
    pub label_for_sent: Option<String>,

    /// Embed a tracking pixel in the rendered body.
    #[serde(default)]
    pub track_opens: bool,

    /// Base URL for the tracking pixel endpoint.
    #[serde(default)]
    pub tracking_base_url: Option<String>,

    /// Render an unsubscribe link into the body.
    #[serde(default)]
    pub unsubscribe_enabled: bool,

    /// Base URL for the unsubscribe endpoint.
    #[serde(default)]
    pub unsubscribe_base_url: Option<String>,

    /// Attachment used when a recipient row has no `attachment_path`,
    /// resolved against the data root when relative.
    #[serde(default)]
    pub default_attachment_path: Option<String>,

    /// Maximum successful sends per run.
    #[serde(default = "default_daily_send_limit")]
    pub daily_send_limit: u32,

    /// Sleep after every successful send (seconds).
    #[serde(default = "default_delay_between_emails")]
    pub delay_between_emails_seconds: u64,

    /// Successes per batch before the inter-batch pause. Defaults to the
    /// daily limit (one batch per run); read through [`Self::batch_size`].
    #[serde(default)]
    batch_size: Option<u32>,

    /// Sleep between batches (seconds). `0` disables the pause.
    #[serde(default)]
    pub pause_between_batches_seconds: u64,

    /// Total attempts the backoff retrier makes per send.
    #[serde(default = "default_max_retry_attempts")]
    pub max_retry_attempts: u32,

    /// Initial backoff delay (seconds), floored at 1.0.
    #[serde(default = "default_retry_backoff_initial")]
    pub retry_backoff_initial_seconds: f64,

    /// Backoff multiplier, floored at 1.0.
    #[serde(default = "default_retry_backoff_multiplier")]
    pub retry_backoff_multiplier: f64,

    /// Backoff delay cap (seconds).
    #[serde(default = "default_retry_backoff_max")]
    pub retry_backoff_max_seconds: f64,

    /// Lifetime attempt ceiling per recipient, across runs.
    #[serde(default = "default_max_attempts_per_contact")]
    pub max_attempts_per_contact: u32,

    /// Consecutive failures that trigger a global cooldown. `0` disables
    /// the cooldown entirely.
    #[serde(default = "default_global_error_threshold")]
    pub global_error_threshold_for_cooldown: u32,

    /// Cooldown sleep (seconds) once the threshold fires.
    #[serde(default = "default_global_error_cooldown")]
    pub global_error_cooldown_seconds: u64,

    /// Remote mail API endpoint settings.
    pub api: ApiConfig,
}

/// Remote mail API endpoint configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the mail-sending API, e.g.
    /// `https://gmail.googleapis.com/gmail/v1`.
    pub base_url: String,
}

const fn default_daily_send_limit() -> u32 {
    100
}

const fn default_delay_between_emails() -> u64 {
    10
}

const fn default_max_retry_attempts() -> u32 {
    3
}

const fn default_retry_backoff_initial() -> f64 {
    5.0
}

const fn default_retry_backoff_multiplier() -> f64 {
    2.0
}

const fn default_retry_backoff_max() -> f64 {
    60.0
}

const fn default_max_attempts_per_contact() -> u32 {
    5
}

const fn default_global_error_threshold() -> u32 {
    5
}

const fn default_global_error_cooldown() -> u64 {
    120
}

fn default_account_name() -> String {
    "default".to_string()
}

fn default_subject() -> String {
    "Campaign".to_string()
}

impl CampaignConfig {
    /// Load a campaign configuration from a TOML file.
    ///
    /// # Errors
    /// Returns [`EngineError::Config`] if the file is missing or malformed.
    /// Either is fatal at startup, before any send is attempted.
    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("{}: {e}", path.display())))?;
        toml::from_str(&raw).map_err(|e| EngineError::Config(format!("{}: {e}", path.display())))
    }

    /// Effective sender address (`send_as_email` override, else
    /// `from_email`).
    #[must_use]
    pub fn sender(&self) -> &str {
        self.send_as_email.as_deref().unwrap_or(&self.from_email)
    }

    /// Effective batch size; defaults to the daily limit.
    #[must_use]
    pub fn batch_size(&self) -> u32 {
        self.batch_size.unwrap_or(self.daily_send_limit)
    }

    /// Label applied to sent messages for this campaign.
    #[must_use]
    pub fn sent_label(&self, campaign: &str) -> String {
        self.label_for_sent
            .clone()
            .unwrap_or_else(|| format!("campaign/{campaign}"))
    }
}
