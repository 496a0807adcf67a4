//! Structured audit events for the campaign lifecycle
//!
//! Every operation of the send engine is surfaced as exactly one structured
//! event record: timestamp, severity, event name, and a free-form field bag.
//! These records are the sole externally observable audit trail, and the
//! event names are a contract with downstream bounce/reply/stat tooling —
//! do not rename them.
//!
//! ## Events
//!
//! - `campaign_send_start` / `campaign_send_complete`: run boundaries
//! - `send_attempt` / `send_success` / `send_failed`: per-recipient outcome
//! - `send_retry_scheduled`: emitted before every backoff sleep
//! - `max_attempts_reached`: recipient skipped as exhausted
//! - `daily_limit_reached` / `batch_pause` / `global_cooldown`: pacing
//! - `attachment_missing` / `label_apply_failed`: non-fatal degradations
//! - `preflight_summary`: result of a local preflight check

/// Log the start of a campaign run.
///
/// # Fields
/// - `campaign`: campaign name
/// - `total_recipients`: rows loaded from the recipient file
/// - `daily_limit`, `delay_seconds`, `batch_size`: effective pacing settings
pub fn campaign_send_start(
    campaign: &str,
    total_recipients: usize,
    daily_limit: u32,
    delay_seconds: u64,
    batch_size: u32,
) {
    tracing::event!(
        tracing::Level::INFO,
        event = "campaign_send_start",
        campaign = %campaign,
        total_recipients = total_recipients,
        daily_limit = daily_limit,
        delay_seconds = delay_seconds,
        batch_size = batch_size,
        "Campaign send starting"
    );
}

/// Log the end of a campaign run with its outcome counters.
pub fn campaign_send_complete(campaign: &str, sent: u32, errors: u32, skipped: u32) {
    tracing::event!(
        tracing::Level::INFO,
        event = "campaign_send_complete",
        campaign = %campaign,
        sent = sent,
        errors = errors,
        skipped = skipped,
        "Campaign send complete"
    );
}

/// Log a send attempt, after state has been persisted as `sending`.
///
/// `attempt` is the recipient's lifetime attempt count, including this one.
pub fn send_attempt(email: &str, campaign: &str, attempt: u32) {
    tracing::event!(
        tracing::Level::INFO,
        event = "send_attempt",
        email = %email,
        campaign = %campaign,
        attempt = attempt,
        "Sending message"
    );
}

/// Log a successful delivery.
pub fn send_success(email: &str, campaign: &str, message_id: &str, thread_id: &str, attempt: u32) {
    tracing::event!(
        tracing::Level::INFO,
        event = "send_success",
        email = %email,
        campaign = %campaign,
        message_id = %message_id,
        thread_id = %thread_id,
        attempt = attempt,
        "Message sent"
    );
}

/// Log a delivery that failed after the retrier gave up.
pub fn send_failed(email: &str, campaign: &str, error: &str, attempts: u32) {
    tracing::event!(
        tracing::Level::ERROR,
        event = "send_failed",
        email = %email,
        campaign = %campaign,
        error = %error,
        attempts = attempts,
        "Message failed"
    );
}

/// Log a scheduled retry, emitted before the backoff sleep.
///
/// # Fields
/// - `attempt`: the attempt that just failed (1-based)
/// - `max_attempts`: total attempts allowed
/// - `sleep_seconds`: pre-jitter sleep duration, rounded to centiseconds
pub fn send_retry_scheduled(attempt: u32, max_attempts: u32, error: &str, sleep_seconds: f64) {
    tracing::event!(
        tracing::Level::WARN,
        event = "send_retry_scheduled",
        attempt = attempt,
        max_attempts = max_attempts,
        error = %error,
        sleep_seconds = sleep_seconds,
        "Retrying after backoff"
    );
}

/// Log a recipient skipped because the per-contact attempt ceiling was hit.
pub fn max_attempts_reached(email: &str, attempts: u32, max_attempts: u32) {
    tracing::event!(
        tracing::Level::WARN,
        event = "max_attempts_reached",
        email = %email,
        attempts = attempts,
        max_attempts = max_attempts,
        "Skipping exhausted recipient"
    );
}

/// Log that the daily send limit stopped the run. A normal completion
/// boundary, not an error.
pub fn daily_limit_reached(campaign: &str, daily_limit: u32) {
    tracing::event!(
        tracing::Level::INFO,
        event = "daily_limit_reached",
        campaign = %campaign,
        daily_limit = daily_limit,
        "Daily send limit reached"
    );
}

/// Log a pause between batches.
pub fn batch_pause(campaign: &str, pause_seconds: u64) {
    tracing::event!(
        tracing::Level::INFO,
        event = "batch_pause",
        campaign = %campaign,
        pause_seconds = pause_seconds,
        "Pausing between batches"
    );
}

/// Log a global cooldown triggered by consecutive failures.
pub fn global_cooldown(consecutive_errors: u32, cooldown_seconds: u64) {
    tracing::event!(
        tracing::Level::WARN,
        event = "global_cooldown",
        consecutive_errors = consecutive_errors,
        cooldown_seconds = cooldown_seconds,
        "Cooling down after consecutive errors"
    );
}

/// Log a configured attachment that does not exist on disk. The send
/// proceeds without it.
pub fn attachment_missing(attachment_path: &str) {
    tracing::event!(
        tracing::Level::WARN,
        event = "attachment_missing",
        attachment_path = %attachment_path,
        "Attachment not found, sending without it"
    );
}

/// Log a label application failure. Never fails the send that already
/// succeeded.
pub fn label_apply_failed(email: &str, label: &str, error: &str) {
    tracing::event!(
        tracing::Level::WARN,
        event = "label_apply_failed",
        email = %email,
        label = %label,
        error = %error,
        "Could not label sent message"
    );
}

/// Log the outcome of a local preflight check.
pub fn preflight_summary(
    campaign: &str,
    total_recipients: usize,
    attachment_ok: usize,
    attachment_missing: usize,
    default_attachment_present: bool,
    template_exists: bool,
) {
    tracing::event!(
        tracing::Level::INFO,
        event = "preflight_summary",
        campaign = %campaign,
        total_recipients = total_recipients,
        attachment_ok = attachment_ok,
        attachment_missing = attachment_missing,
        default_attachment_present = default_attachment_present,
        template_exists = template_exists,
        "Preflight check complete"
    );
}
