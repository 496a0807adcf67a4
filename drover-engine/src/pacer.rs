//! Run pacing: inter-send delay, batch pauses, the daily cap, and the
//! global error cooldown.
//!
//! Throughput is intentionally bounded to respect the remote API's limits;
//! the pacer's sleeps (together with the retrier's backoff) are the only
//! suspension points in a run.

use std::time::Duration;

use drover_common::events;
use tokio::time::sleep;

use crate::config::CampaignConfig;

/// Pacing limits, fixed for the duration of one run.
#[derive(Debug, Clone, Copy)]
pub struct PacingPolicy {
    pub daily_limit: u32,
    pub delay_between_emails_seconds: u64,
    pub batch_size: u32,
    pub pause_between_batches_seconds: u64,
    /// Consecutive failures that trigger a cooldown; `0` disables it.
    pub error_threshold: u32,
    pub error_cooldown_seconds: u64,
}

impl PacingPolicy {
    #[must_use]
    pub fn from_config(config: &CampaignConfig) -> Self {
        Self {
            daily_limit: config.daily_send_limit,
            delay_between_emails_seconds: config.delay_between_emails_seconds,
            batch_size: config.batch_size(),
            pause_between_batches_seconds: config.pause_between_batches_seconds,
            error_threshold: config.global_error_threshold_for_cooldown,
            error_cooldown_seconds: config.global_error_cooldown_seconds,
        }
    }
}

/// Outcome of the post-success pacing step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Continue,
    /// The daily cap is hit: a normal completion boundary, not an error.
    DailyLimitReached,
}

/// Pacing state carried across a whole run.
#[derive(Debug)]
pub struct Pacer {
    policy: PacingPolicy,
    campaign: String,
    sent_today: u32,
    batch_counter: u32,
    consecutive_errors: u32,
}

impl Pacer {
    #[must_use]
    pub fn new(policy: PacingPolicy, campaign: &str) -> Self {
        Self {
            policy,
            campaign: campaign.to_string(),
            sent_today: 0,
            batch_counter: 0,
            consecutive_errors: 0,
        }
    }

    /// Bookkeeping and pacing after a successful send: resets the error
    /// streak, counts the send, then either stops at the daily cap or
    /// sleeps the inter-email delay (plus the batch pause when a batch
    /// completes).
    pub async fn after_success(&mut self) -> Verdict {
        self.consecutive_errors = 0;
        self.sent_today += 1;
        self.batch_counter += 1;

        if self.sent_today >= self.policy.daily_limit {
            events::daily_limit_reached(&self.campaign, self.policy.daily_limit);
            return Verdict::DailyLimitReached;
        }

        sleep(Duration::from_secs(self.policy.delay_between_emails_seconds)).await;

        if self.batch_counter >= self.policy.batch_size {
            self.batch_counter = 0;
            if self.policy.pause_between_batches_seconds > 0 {
                events::batch_pause(&self.campaign, self.policy.pause_between_batches_seconds);
                sleep(Duration::from_secs(self.policy.pause_between_batches_seconds)).await;
            }
        }

        Verdict::Continue
    }

    /// Bookkeeping after a send that failed past the retrier. Once the
    /// consecutive-error threshold fires, the run cools down and the streak
    /// resets — even when the configured cooldown is zero.
    pub async fn after_failure(&mut self) {
        self.consecutive_errors += 1;

        if self.policy.error_threshold > 0 && self.consecutive_errors >= self.policy.error_threshold
        {
            if self.policy.error_cooldown_seconds > 0 {
                events::global_cooldown(
                    self.consecutive_errors,
                    self.policy.error_cooldown_seconds,
                );
            }
            sleep(Duration::from_secs(self.policy.error_cooldown_seconds)).await;
            self.consecutive_errors = 0;
        }
    }

    #[must_use]
    pub const fn sent_today(&self) -> u32 {
        self.sent_today
    }

    #[must_use]
    pub const fn consecutive_errors(&self) -> u32 {
        self.consecutive_errors
    }
}
