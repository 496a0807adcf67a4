//! Local preflight checks for a campaign.
//!
//! Validates everything a run needs from disk — recipients, template,
//! attachments — without touching the remote API, so operators can catch
//! input problems before the first send.

use drover_common::events;

use crate::{config::CampaignConfig, context::RunContext, error::EngineError, recipients};

/// Result of a preflight check, also emitted as a `preflight_summary`
/// event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreflightReport {
    pub total_recipients: usize,
    /// Rows whose effective attachment (row override or campaign default)
    /// exists on disk.
    pub attachment_ok: usize,
    /// Rows whose effective attachment is configured but missing.
    pub attachment_missing: usize,
    /// A default attachment is configured and present on disk.
    pub default_attachment_present: bool,
    pub template_exists: bool,
}

/// Run the preflight checks for one campaign.
///
/// # Errors
/// Returns an error when the recipient file itself is missing or
/// malformed — the same condition that would abort a real run at startup.
pub fn preflight(
    ctx: &RunContext,
    campaign: &str,
    config: &CampaignConfig,
) -> Result<PreflightReport, EngineError> {
    let rows = recipients::load_recipients(&ctx.recipients_path(campaign))?;
    let template_exists = ctx.template_path(campaign).is_file();

    let default_attachment_present = config
        .default_attachment_path
        .as_deref()
        .is_some_and(|path| ctx.resolve_attachment(path).is_file());

    let mut attachment_ok = 0;
    let mut attachment_missing = 0;
    for row in &rows {
        let Some(configured) = row
            .attachment_path()
            .or(config.default_attachment_path.as_deref())
        else {
            continue;
        };
        if ctx.resolve_attachment(configured).is_file() {
            attachment_ok += 1;
        } else {
            attachment_missing += 1;
        }
    }

    let report = PreflightReport {
        total_recipients: rows.len(),
        attachment_ok,
        attachment_missing,
        default_attachment_present,
        template_exists,
    };

    events::preflight_summary(
        campaign,
        report.total_recipients,
        report.attachment_ok,
        report.attachment_missing,
        report.default_attachment_present,
        report.template_exists,
    );

    Ok(report)
}
