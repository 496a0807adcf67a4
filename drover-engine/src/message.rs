//! Outgoing message assembly.
//!
//! Renders the subject and HTML body for one recipient, resolves the
//! optional attachment, and packs everything into the transport payload: a
//! URL-safe base64 encoding of the raw MIME document, which is what the
//! remote API's send endpoint consumes.

use base64::{Engine as _, engine::general_purpose::URL_SAFE};
use ulid::Ulid;

use crate::{
    config::CampaignConfig, context::RunContext, recipients::RecipientRow, template,
};

/// A transport-ready message.
#[derive(Debug, Clone)]
pub struct OutgoingMessage {
    pub to: String,
    pub subject: String,
    /// URL-safe base64 of the raw MIME document.
    pub raw: String,
}

/// Builds [`OutgoingMessage`]s for one campaign run.
///
/// The body template is read once at startup; per-recipient work is pure
/// rendering plus an optional attachment read.
pub struct MessageBuilder<'run> {
    ctx: &'run RunContext,
    campaign: &'run str,
    config: &'run CampaignConfig,
    body_template: String,
}

impl<'run> MessageBuilder<'run> {
    #[must_use]
    pub fn new(
        ctx: &'run RunContext,
        campaign: &'run str,
        config: &'run CampaignConfig,
        body_template: String,
    ) -> Self {
        Self {
            ctx,
            campaign,
            config,
            body_template,
        }
    }

    /// Build the outgoing message for one recipient row.
    ///
    /// A configured attachment that is missing on disk emits an
    /// `attachment_missing` event and the message goes out without it; a
    /// missing file never fails the send.
    #[must_use]
    pub fn build(&self, row: &RecipientRow) -> OutgoingMessage {
        let email = row.email.as_str();

        let tracking_pixel_url = if self.config.track_opens {
            self.config
                .tracking_base_url
                .as_deref()
                .map(|base| base.trim_end_matches('/'))
                .filter(|base| !base.is_empty())
                .map(|base| {
                    // Fresh per-recipient token for downstream open dedup
                    let token = Ulid::new();
                    format!("{base}&cid={}&to={email}&tid={token}", self.campaign)
                })
                .unwrap_or_default()
        } else {
            String::new()
        };

        let unsubscribe_url = if self.config.unsubscribe_enabled {
            self.config
                .unsubscribe_base_url
                .as_deref()
                .map(|base| base.trim_end_matches('/'))
                .filter(|base| !base.is_empty())
                .map(|base| format!("{base}&email={email}"))
                .unwrap_or_default()
        } else {
            String::new()
        };

        let mut fields = row.fields.clone();
        fields.insert("email".to_string(), email.to_string());
        fields.insert("tracking_pixel_url".to_string(), tracking_pixel_url);
        fields.insert("unsubscribe_url".to_string(), unsubscribe_url);

        let subject = template::render(&self.config.subject, &fields);
        let html_body = template::render(&self.body_template, &fields);

        let attachment = self.load_attachment(row);

        let mime = build_mime(
            self.config.sender(),
            email,
            &subject,
            &html_body,
            attachment.as_ref().map(|(name, data)| (name.as_str(), data.as_slice())),
        );

        OutgoingMessage {
            to: email.to_string(),
            subject,
            raw: URL_SAFE.encode(mime),
        }
    }

    /// Resolve the row's attachment (row field first, campaign default
    /// second) and read it, warning instead of failing when absent.
    fn load_attachment(&self, row: &RecipientRow) -> Option<(String, Vec<u8>)> {
        let configured = row
            .attachment_path()
            .or(self.config.default_attachment_path.as_deref())?;

        let path = self.ctx.resolve_attachment(configured);
        match std::fs::read(&path) {
            Ok(data) => {
                let filename = path
                    .file_name()
                    .map_or_else(|| configured.to_string(), |n| n.to_string_lossy().into_owned());
                Some((filename, data))
            }
            Err(_) => {
                drover_common::events::attachment_missing(&path.display().to_string());
                None
            }
        }
    }
}

/// Assemble a multipart/mixed MIME document with a base64 HTML part and an
/// optional base64 attachment part.
fn build_mime(
    sender: &str,
    to: &str,
    subject: &str,
    html_body: &str,
    attachment: Option<(&str, &[u8])>,
) -> Vec<u8> {
    use base64::engine::general_purpose::STANDARD;

    let boundary = format!("=_drover_{}", Ulid::new());
    let mut out = String::new();

    out.push_str(&format!("From: {sender}\r\n"));
    out.push_str(&format!("To: {to}\r\n"));
    out.push_str(&format!("Subject: {subject}\r\n"));
    out.push_str("MIME-Version: 1.0\r\n");
    out.push_str(&format!(
        "Content-Type: multipart/mixed; boundary=\"{boundary}\"\r\n\r\n"
    ));

    out.push_str(&format!("--{boundary}\r\n"));
    out.push_str("Content-Type: text/html; charset=\"utf-8\"\r\n");
    out.push_str("Content-Transfer-Encoding: base64\r\n\r\n");
    out.push_str(&wrap_base64(&STANDARD.encode(html_body)));
    out.push_str("\r\n");

    if let Some((filename, data)) = attachment {
        out.push_str(&format!("--{boundary}\r\n"));
        out.push_str("Content-Type: application/octet-stream\r\n");
        out.push_str(&format!(
            "Content-Disposition: attachment; filename=\"{filename}\"\r\n"
        ));
        out.push_str("Content-Transfer-Encoding: base64\r\n\r\n");
        out.push_str(&wrap_base64(&STANDARD.encode(data)));
        out.push_str("\r\n");
    }

    out.push_str(&format!("--{boundary}--\r\n"));
    out.into_bytes()
}

/// Wrap a base64 string at the 76-column MIME limit.
fn wrap_base64(encoded: &str) -> String {
    encoded
        .as_bytes()
        .chunks(76)
        .map(|chunk| std::str::from_utf8(chunk).unwrap_or_default())
        .collect::<Vec<_>>()
        .join("\r\n")
}
