//! Mail transport seam.
//!
//! The engine drives a remote mail-sending API through the [`Transport`]
//! trait and applies mailbox labels through [`LabelService`]. Failures carry
//! an explicit [`RetryClass`] so the retrier never has to inspect error
//! internals: the transport adapter classifies once, at the edge.

pub mod http;
pub mod mock;

use async_trait::async_trait;
use thiserror::Error;

pub use http::HttpApiTransport;
pub use mock::{MockLabelService, MockTransport};

use crate::message::OutgoingMessage;

/// Identifiers returned by the remote API for a delivered message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendReceipt {
    pub message_id: String,
    pub thread_id: String,
}

/// Whether a failed operation is worth retrying with backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryClass {
    /// Transient: rate limiting, server-side failure, connectivity.
    Retryable,
    /// Permanent: the same request will keep failing.
    Fatal,
}

/// A classified transport failure.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Remote rate limit (HTTP 429 equivalent).
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Remote server-side failure (5xx equivalent).
    #[error("server error: {0}")]
    Server(String),

    /// Connection could not be established or was dropped.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The request timed out in flight.
    #[error("timed out: {0}")]
    Timeout(String),

    /// The remote rejected the request (malformed message, bad address).
    #[error("request rejected: {0}")]
    Rejected(String),

    /// Authentication or authorization failure.
    #[error("permission denied: {0}")]
    Denied(String),
}

impl TransportError {
    /// Classify this error for the retrier.
    #[must_use]
    pub const fn retry_class(&self) -> RetryClass {
        match self {
            Self::RateLimited(_) | Self::Server(_) | Self::Connection(_) | Self::Timeout(_) => {
                RetryClass::Retryable
            }
            Self::Rejected(_) | Self::Denied(_) => RetryClass::Fatal,
        }
    }

    /// Returns `true` if the retrier may attempt this send again.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self.retry_class(), RetryClass::Retryable)
    }
}

/// Remote mail-sending API.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one message, returning the remote identifiers on success.
    ///
    /// # Errors
    /// Returns a classified [`TransportError`] on any remote failure.
    async fn send(&self, message: &OutgoingMessage) -> Result<SendReceipt, TransportError>;
}

/// Mailbox label management. Failures here are never fatal to a send that
/// already succeeded.
#[async_trait]
pub trait LabelService: Send + Sync {
    /// Resolve a label name to its identifier, creating it if needed.
    ///
    /// # Errors
    /// Returns a classified [`TransportError`] on any remote failure.
    async fn ensure_label(&self, name: &str) -> Result<String, TransportError>;

    /// Apply labels to a delivered message.
    ///
    /// # Errors
    /// Returns a classified [`TransportError`] on any remote failure.
    async fn apply_labels(
        &self,
        message_id: &str,
        label_ids: &[String],
    ) -> Result<(), TransportError>;
}
