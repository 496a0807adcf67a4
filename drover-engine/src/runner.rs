//! Campaign runner: the send engine's orchestration loop.
//!
//! One run processes the recipient sequence strictly in order, one
//! recipient at a time: consult the persistent state, build the message,
//! persist `sending` *before* the network call (the crash-recovery
//! contract), send through the backoff retrier, persist the outcome, and
//! let the pacer govern the gap to the next recipient.

use std::sync::Arc;

use chrono::Utc;
use drover_common::events;
use tokio::fs;

use crate::{
    config::CampaignConfig,
    context::RunContext,
    error::EngineError,
    journal::{SentLog, SentThreadIndex},
    message::MessageBuilder,
    pacer::{Pacer, PacingPolicy, Verdict},
    recipients,
    retry::{self, BackoffPolicy},
    state::{RecipientStatus, SendStateStore},
    transport::{LabelService, Transport},
};

/// Outcome counters for one campaign run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Successful sends this run.
    pub sent: u32,
    /// Recipients whose send failed past the retrier.
    pub errors: u32,
    /// Recipients skipped as exhausted (`max_attempts_per_contact`).
    pub skipped: u32,
}

/// Drives one campaign over its recipient list.
pub struct CampaignRunner {
    ctx: RunContext,
    campaign: String,
    config: CampaignConfig,
    transport: Arc<dyn Transport>,
    labels: Option<Arc<dyn LabelService>>,
}

impl CampaignRunner {
    #[must_use]
    pub fn new(
        ctx: RunContext,
        campaign: impl Into<String>,
        config: CampaignConfig,
        transport: Arc<dyn Transport>,
        labels: Option<Arc<dyn LabelService>>,
    ) -> Self {
        Self {
            ctx,
            campaign: campaign.into(),
            config,
            transport,
            labels,
        }
    }

    /// Run the campaign to its terminal condition: recipient sequence
    /// exhausted or daily limit reached.
    ///
    /// # Errors
    /// Returns an error for startup problems (missing recipients or
    /// template) and for state/journal persistence failures. Transport
    /// failures are per-recipient and never abort the run.
    #[allow(clippy::too_many_lines, reason = "The sequential send loop reads best in one piece")]
    pub async fn run(&self) -> Result<RunSummary, EngineError> {
        let campaign = self.campaign.as_str();

        let rows = recipients::load_recipients(&self.ctx.recipients_path(campaign))?;
        let body_template = self.load_template()?;

        fs::create_dir_all(self.ctx.logs_dir(campaign)).await?;

        let label = self.ensure_label().await;

        let mut state = SendStateStore::load(&self.ctx.state_path(campaign)).await;
        let reconciled = state.reconcile_interrupted();
        if reconciled > 0 {
            tracing::info!(reconciled, "Reset interrupted sends to pending");
            state.save().await?;
        }

        let mut sent_log = SentLog::open(&self.ctx.sent_log_path(campaign)).await?;
        let mut threads = SentThreadIndex::load(&self.ctx.sent_threads_path(campaign)).await;

        events::campaign_send_start(
            campaign,
            rows.len(),
            self.config.daily_send_limit,
            self.config.delay_between_emails_seconds,
            self.config.batch_size(),
        );

        let builder = MessageBuilder::new(&self.ctx, campaign, &self.config, body_template);
        let backoff = BackoffPolicy::from_config(&self.config);
        let mut pacer = Pacer::new(PacingPolicy::from_config(&self.config), campaign);
        let mut summary = RunSummary::default();

        for row in &rows {
            let email = row.email.as_str();

            // Idempotent re-entry: already delivered in this or any prior run
            if state.status(email) == Some(RecipientStatus::Sent) || sent_log.contains(email) {
                continue;
            }

            if state.is_exhausted(email, self.config.max_attempts_per_contact) {
                events::max_attempts_reached(
                    email,
                    state.attempts(email),
                    self.config.max_attempts_per_contact,
                );
                summary.skipped += 1;
                continue;
            }

            let message = builder.build(row);

            // Persist `sending` before the network call so a crash leaves a
            // reconcilable record instead of a silent gap
            let attempt = state.begin_attempt(email, Utc::now());
            state.save().await?;
            events::send_attempt(email, campaign, attempt);

            match retry::send_with_retry(&backoff, || self.transport.send(&message)).await {
                Err(error) => {
                    let text = error.to_string();
                    state.record_failure(email, &text, Utc::now());
                    state.save().await?;
                    events::send_failed(email, campaign, &text, state.attempts(email));
                    summary.errors += 1;
                    pacer.after_failure().await;
                }
                Ok(receipt) => {
                    summary.sent += 1;

                    if let (Some(service), Some((name, id))) = (&self.labels, &label)
                        && let Err(e) = service
                            .apply_labels(&receipt.message_id, std::slice::from_ref(id))
                            .await
                    {
                        events::label_apply_failed(email, name, &e.to_string());
                    }

                    sent_log.append(email).await?;
                    threads.record(email, &receipt.thread_id).await?;

                    state.record_success(email, &receipt, Utc::now());
                    state.save().await?;
                    events::send_success(
                        email,
                        campaign,
                        &receipt.message_id,
                        &receipt.thread_id,
                        attempt,
                    );

                    if pacer.after_success().await == Verdict::DailyLimitReached {
                        break;
                    }
                }
            }
        }

        events::campaign_send_complete(campaign, summary.sent, summary.errors, summary.skipped);
        Ok(summary)
    }

    /// Read the body template once; a missing template aborts the run
    /// before any send.
    fn load_template(&self) -> Result<String, EngineError> {
        let path = self.ctx.template_path(&self.campaign);
        std::fs::read_to_string(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                EngineError::TemplateNotFound(path)
            } else {
                EngineError::Io(e)
            }
        })
    }

    /// Resolve the sent-label id at startup. Label failures never abort a
    /// run; a failed ensure just disables labelling.
    async fn ensure_label(&self) -> Option<(String, String)> {
        let service = self.labels.as_ref()?;
        let name = self.config.sent_label(&self.campaign);
        match service.ensure_label(&name).await {
            Ok(id) => Some((name, id)),
            Err(e) => {
                tracing::warn!(
                    label = %name,
                    error = %e,
                    "Could not ensure sent label, continuing without labelling"
                );
                None
            }
        }
    }
}
