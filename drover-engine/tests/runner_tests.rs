//! Integration tests for the campaign runner

#![allow(clippy::unwrap_used)]

use std::{path::Path, sync::Arc};

use drover_engine::{
    CampaignConfig, CampaignRunner, RecipientStatus, RunContext, RunSummary, SendStateStore,
    SentThreadIndex,
    transport::{MockLabelService, MockTransport, TransportError},
};
use tempfile::TempDir;

const RECIPIENTS: &str = "email,name\nalice@example.com,Alice\nbob@example.com,Bob\n";

/// Lay out a campaign directory tree under a fresh temp root.
fn setup(recipients: &str, config_extra: &str) -> (TempDir, RunContext, CampaignConfig) {
    let dir = TempDir::new().unwrap();
    let campaign_dir = dir.path().join("campaigns/example");
    std::fs::create_dir_all(&campaign_dir).unwrap();
    std::fs::write(campaign_dir.join("recipients.csv"), recipients).unwrap();
    std::fs::write(
        campaign_dir.join("template.html"),
        "<p>Hi {{ name }}</p>",
    )
    .unwrap();

    let config: CampaignConfig = toml::from_str(&format!(
        r#"
        from_email = "sender@example.com"
        subject = "Hello {{{{ name }}}}"
        delay_between_emails_seconds = 0
        {config_extra}

        [api]
        base_url = "https://mail.invalid/v1"
    "#
    ))
    .unwrap();

    let ctx = RunContext::new(dir.path().to_path_buf(), dir.path().join("creds"));
    (dir, ctx, config)
}

fn runner(ctx: &RunContext, config: &CampaignConfig, transport: &MockTransport) -> CampaignRunner {
    CampaignRunner::new(
        ctx.clone(),
        "example",
        config.clone(),
        Arc::new(transport.clone()),
        None,
    )
}

fn write_state(ctx: &RunContext, json: &str) {
    std::fs::create_dir_all(ctx.logs_dir("example")).unwrap();
    std::fs::write(ctx.state_path("example"), json).unwrap();
}

fn sent_log_lines(ctx: &RunContext) -> Vec<String> {
    std::fs::read_to_string(ctx.sent_log_path("example"))
        .unwrap_or_default()
        .lines()
        .map(ToString::to_string)
        .collect()
}

async fn status_of(ctx: &RunContext, email: &str) -> Option<RecipientStatus> {
    SendStateStore::load(&ctx.state_path("example"))
        .await
        .status(email)
}

#[tokio::test]
async fn fresh_run_sends_every_recipient() {
    let (_dir, ctx, config) = setup(RECIPIENTS, "");
    let transport = MockTransport::new();

    let summary = runner(&ctx, &config, &transport).run().await.unwrap();
    assert_eq!(
        summary,
        RunSummary {
            sent: 2,
            errors: 0,
            skipped: 0
        }
    );

    assert_eq!(transport.sent().len(), 2);
    assert_eq!(transport.sent()[0].to, "alice@example.com");
    assert_eq!(
        sent_log_lines(&ctx),
        vec!["alice@example.com", "bob@example.com"]
    );

    let state = SendStateStore::load(&ctx.state_path("example")).await;
    assert_eq!(state.len(), 2);
    assert_eq!(
        state.status("alice@example.com"),
        Some(RecipientStatus::Sent)
    );
    assert_eq!(state.status("bob@example.com"), Some(RecipientStatus::Sent));
    assert!(state.get("alice@example.com").unwrap().message_id.is_some());

    let threads = SentThreadIndex::load(&ctx.sent_threads_path("example")).await;
    assert_eq!(threads.entries().len(), 2);
}

#[tokio::test]
async fn completed_campaign_is_idempotent() {
    let (_dir, ctx, config) = setup(RECIPIENTS, "");
    let transport = MockTransport::new();

    runner(&ctx, &config, &transport).run().await.unwrap();
    assert_eq!(transport.call_count(), 2);

    let summary = runner(&ctx, &config, &transport).run().await.unwrap();
    assert_eq!(summary, RunSummary::default());
    assert_eq!(transport.call_count(), 2);
    assert_eq!(sent_log_lines(&ctx).len(), 2);
}

#[tokio::test]
async fn resumes_from_prior_state() {
    let (_dir, ctx, config) = setup(RECIPIENTS, "");
    write_state(
        &ctx,
        r#"{
            "alice@example.com": {"status": "sent", "attempts": 1},
            "bob@example.com": {"status": "pending", "attempts": 0}
        }"#,
    );
    std::fs::write(ctx.sent_log_path("example"), "alice@example.com\n").unwrap();

    let transport = MockTransport::new();
    let summary = runner(&ctx, &config, &transport).run().await.unwrap();

    assert_eq!(summary.sent, 1);
    assert_eq!(transport.sent().len(), 1);
    assert_eq!(transport.sent()[0].to, "bob@example.com");
    assert_eq!(status_of(&ctx, "bob@example.com").await, Some(RecipientStatus::Sent));
}

#[tokio::test]
async fn interrupted_send_is_reset_and_retried() {
    let (_dir, ctx, config) = setup(RECIPIENTS, "");
    // A previous run died mid-send for alice
    write_state(
        &ctx,
        r#"{
            "alice@example.com": {"status": "sending", "attempts": 1},
            "bob@example.com": {"status": "sent", "attempts": 1}
        }"#,
    );
    std::fs::write(ctx.sent_log_path("example"), "bob@example.com\n").unwrap();

    let transport = MockTransport::new();
    let summary = runner(&ctx, &config, &transport).run().await.unwrap();

    assert_eq!(summary.sent, 1);
    assert_eq!(transport.sent()[0].to, "alice@example.com");

    let state = SendStateStore::load(&ctx.state_path("example")).await;
    assert_eq!(
        state.status("alice@example.com"),
        Some(RecipientStatus::Sent)
    );
    // The interrupted attempt still counts toward the lifetime total
    assert_eq!(state.attempts("alice@example.com"), 2);
}

#[tokio::test(start_paused = true)]
async fn retryable_failure_is_retried_within_one_attempt() {
    let (_dir, ctx, config) = setup(RECIPIENTS, "max_retry_attempts = 3");
    let transport = MockTransport::new();
    transport.push_failure(TransportError::RateLimited("HTTP 429".to_string()));

    let summary = runner(&ctx, &config, &transport).run().await.unwrap();

    assert_eq!(summary.sent, 2);
    assert_eq!(summary.errors, 0);
    // alice: one failed call plus one retry; bob: one call
    assert_eq!(transport.call_count(), 3);

    let state = SendStateStore::load(&ctx.state_path("example")).await;
    // One logical attempt, however many internal retries it contained
    assert_eq!(state.attempts("alice@example.com"), 1);
    assert_eq!(
        state.status("alice@example.com"),
        Some(RecipientStatus::Sent)
    );
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_mark_the_recipient_errored() {
    let (_dir, ctx, config) = setup(
        RECIPIENTS,
        "max_retry_attempts = 2\nglobal_error_cooldown_seconds = 0",
    );
    let transport = MockTransport::new();
    transport.push_failure(TransportError::Server("HTTP 503".to_string()));
    transport.push_failure(TransportError::Server("HTTP 503".to_string()));

    let summary = runner(&ctx, &config, &transport).run().await.unwrap();

    assert_eq!(summary.sent, 1);
    assert_eq!(summary.errors, 1);

    let state = SendStateStore::load(&ctx.state_path("example")).await;
    let alice = state.get("alice@example.com").unwrap();
    assert_eq!(alice.status, RecipientStatus::Error);
    assert_eq!(alice.attempts, 1);
    assert!(alice.last_error.as_deref().unwrap().contains("HTTP 503"));
    assert!(alice.last_error_ts.is_some());

    // The failed address never reaches the sent log
    assert_eq!(sent_log_lines(&ctx), vec!["bob@example.com"]);
}

#[tokio::test]
async fn fatal_error_is_not_retried() {
    let (_dir, ctx, config) = setup(
        RECIPIENTS,
        "max_retry_attempts = 3\nglobal_error_cooldown_seconds = 0",
    );
    let transport = MockTransport::new();
    transport.push_failure(TransportError::Rejected("HTTP 400".to_string()));

    let summary = runner(&ctx, &config, &transport).run().await.unwrap();

    assert_eq!(summary.errors, 1);
    assert_eq!(summary.sent, 1);
    // No internal retries for a fatal error: one call each
    assert_eq!(transport.call_count(), 2);
    assert_eq!(
        status_of(&ctx, "alice@example.com").await,
        Some(RecipientStatus::Error)
    );
}

#[tokio::test]
async fn exhausted_recipient_is_skipped_without_sending() {
    let (_dir, ctx, config) = setup(RECIPIENTS, "max_attempts_per_contact = 1");
    write_state(
        &ctx,
        r#"{"alice@example.com": {"status": "error", "attempts": 1, "error": "boom"}}"#,
    );

    let transport = MockTransport::new();
    let summary = runner(&ctx, &config, &transport).run().await.unwrap();

    assert_eq!(
        summary,
        RunSummary {
            sent: 1,
            errors: 0,
            skipped: 1
        }
    );
    assert_eq!(sent_log_lines(&ctx), vec!["bob@example.com"]);
    // Still terminal on the next run
    let summary = runner(&ctx, &config, &transport).run().await.unwrap();
    assert_eq!(summary.skipped, 1);
    assert_eq!(transport.call_count(), 1);
}

#[tokio::test]
async fn daily_limit_stops_the_run_cleanly() {
    let (_dir, ctx, config) = setup(RECIPIENTS, "daily_send_limit = 1");
    let transport = MockTransport::new();

    let summary = runner(&ctx, &config, &transport).run().await.unwrap();
    assert_eq!(
        summary,
        RunSummary {
            sent: 1,
            errors: 0,
            skipped: 0
        }
    );
    assert_eq!(transport.call_count(), 1);

    // The next run picks up where the cap stopped this one
    let summary = runner(&ctx, &config, &transport).run().await.unwrap();
    assert_eq!(summary.sent, 1);
    assert_eq!(sent_log_lines(&ctx).len(), 2);
}

#[tokio::test]
async fn label_failures_never_fail_the_send() {
    let (_dir, ctx, config) = setup(RECIPIENTS, "");
    let transport = MockTransport::new();
    let labels = MockLabelService::new().failing_apply();

    let runner = CampaignRunner::new(
        ctx.clone(),
        "example",
        config,
        Arc::new(transport.clone()),
        Some(Arc::new(labels)),
    );
    let summary = runner.run().await.unwrap();

    assert_eq!(summary.sent, 2);
    assert_eq!(summary.errors, 0);
    assert_eq!(
        status_of(&ctx, "alice@example.com").await,
        Some(RecipientStatus::Sent)
    );
}

#[tokio::test]
async fn labels_are_applied_to_sent_messages() {
    let (_dir, ctx, config) = setup(RECIPIENTS, r#"label_for_sent = "newsletter/sent""#);
    let transport = MockTransport::new();
    let labels = MockLabelService::new();

    let runner = CampaignRunner::new(
        ctx.clone(),
        "example",
        config,
        Arc::new(transport.clone()),
        Some(Arc::new(labels.clone())),
    );
    runner.run().await.unwrap();

    let applied = labels.applied();
    assert_eq!(applied.len(), 2);
    assert_eq!(applied[0].1, vec!["label-newsletter/sent".to_string()]);
}

#[tokio::test]
async fn missing_recipient_file_aborts_before_any_send() {
    let (dir, ctx, config) = setup(RECIPIENTS, "");
    std::fs::remove_file(ctx.recipients_path("example")).unwrap();

    let transport = MockTransport::new();
    let error = runner(&ctx, &config, &transport).run().await.unwrap_err();
    assert!(error.is_startup());
    assert_eq!(transport.call_count(), 0);
    assert!(!dir.path().join("logs/example/sent_log.csv").exists());
}

#[tokio::test]
async fn missing_template_aborts_before_any_send() {
    let (_dir, ctx, config) = setup(RECIPIENTS, "");
    std::fs::remove_file(ctx.template_path("example")).unwrap();

    let transport = MockTransport::new();
    let error = runner(&ctx, &config, &transport).run().await.unwrap_err();
    assert!(error.is_startup());
    assert_eq!(transport.call_count(), 0);
}

#[tokio::test]
async fn state_file_is_valid_json_after_every_run() {
    let (_dir, ctx, config) = setup(RECIPIENTS, "");
    let transport = MockTransport::new();
    transport.push_failure(TransportError::Rejected("HTTP 400".to_string()));

    runner(&ctx, &config, &transport).run().await.unwrap();

    // Whatever the outcomes, the visible document parses completely and no
    // temp file is left behind
    let raw = std::fs::read_to_string(ctx.state_path("example")).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(parsed.as_object().unwrap().len(), 2);
    assert!(!Path::new(&format!("{}.tmp", ctx.state_path("example").display())).exists());
}
