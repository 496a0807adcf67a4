//! HTTP adapter for a Gmail-shaped mail API.
//!
//! Endpoints:
//! - `POST {base}/users/me/messages/send` with `{"raw": <base64url>}`
//! - `GET  {base}/users/me/labels`
//! - `POST {base}/users/me/labels` with `{"name": ...}`
//! - `POST {base}/users/me/messages/{id}/modify` with `{"addLabelIds": [...]}`
//!
//! Credential acquisition is out of scope; the caller supplies a bearer
//! token. No request timeout is configured: the engine deliberately lets a
//! hung remote call block the run rather than impose a second timeout layer
//! on top of the retrier's bounds.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::{LabelService, SendReceipt, Transport, TransportError};
use crate::message::OutgoingMessage;

/// Reqwest-based [`Transport`] and [`LabelService`] implementation.
#[derive(Debug, Clone)]
pub struct HttpApiTransport {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    id: String,
    #[serde(rename = "threadId")]
    thread_id: String,
}

#[derive(Debug, Deserialize)]
struct Label {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct LabelList {
    #[serde(default)]
    labels: Vec<Label>,
}

impl HttpApiTransport {
    #[must_use]
    pub fn new(base_url: &str, token: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    /// Map a response to a classified error unless it succeeded.
    async fn check(response: reqwest::Response) -> Result<reqwest::Response, TransportError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(classify_status(status, &body))
    }

    async fn post_json(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<reqwest::Response, TransportError> {
        let response = self
            .client
            .post(self.url(path))
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await
            .map_err(classify_reqwest)?;
        Self::check(response).await
    }
}

/// Classify an HTTP status into the retrier's error taxonomy.
fn classify_status(status: reqwest::StatusCode, body: &str) -> TransportError {
    let detail = format!("{status}: {}", body.chars().take(200).collect::<String>());
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        TransportError::RateLimited(detail)
    } else if status.is_server_error() {
        TransportError::Server(detail)
    } else if status == reqwest::StatusCode::UNAUTHORIZED
        || status == reqwest::StatusCode::FORBIDDEN
    {
        TransportError::Denied(detail)
    } else {
        TransportError::Rejected(detail)
    }
}

/// Classify a request-level failure (never reached the remote, or died in
/// flight). All of these are transient from the engine's point of view.
fn classify_reqwest(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout(error.to_string())
    } else {
        TransportError::Connection(error.to_string())
    }
}

#[async_trait]
impl Transport for HttpApiTransport {
    async fn send(&self, message: &OutgoingMessage) -> Result<SendReceipt, TransportError> {
        let response = self
            .post_json("users/me/messages/send", &json!({ "raw": message.raw }))
            .await?;

        let sent: SendResponse = response
            .json()
            .await
            .map_err(|e| TransportError::Rejected(format!("malformed send response: {e}")))?;

        Ok(SendReceipt {
            message_id: sent.id,
            thread_id: sent.thread_id,
        })
    }
}

#[async_trait]
impl LabelService for HttpApiTransport {
    async fn ensure_label(&self, name: &str) -> Result<String, TransportError> {
        let response = self
            .client
            .get(self.url("users/me/labels"))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(classify_reqwest)?;
        let listing: LabelList = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| TransportError::Rejected(format!("malformed label list: {e}")))?;

        if let Some(label) = listing.labels.into_iter().find(|label| label.name == name) {
            return Ok(label.id);
        }

        let created: Label = self
            .post_json("users/me/labels", &json!({ "name": name }))
            .await?
            .json()
            .await
            .map_err(|e| TransportError::Rejected(format!("malformed label response: {e}")))?;
        Ok(created.id)
    }

    async fn apply_labels(
        &self,
        message_id: &str,
        label_ids: &[String],
    ) -> Result<(), TransportError> {
        self.post_json(
            &format!("users/me/messages/{message_id}/modify"),
            &json!({ "addLabelIds": label_ids }),
        )
        .await?;
        Ok(())
    }
}
