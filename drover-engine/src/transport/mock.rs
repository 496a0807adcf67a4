//! Mock transport implementations for testing.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;

use super::{LabelService, SendReceipt, Transport, TransportError};
use crate::message::OutgoingMessage;

/// Scriptable [`Transport`] that records every message it is asked to send.
///
/// Outcomes are consumed front-to-back; once the script runs out, every
/// further send succeeds with a generated receipt.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    script: Arc<Mutex<VecDeque<Result<SendReceipt, TransportError>>>>,
    sent: Arc<Mutex<Vec<OutgoingMessage>>>,
    calls: Arc<Mutex<u32>>,
}

impl MockTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an outcome for a future send call.
    ///
    /// # Panics
    /// Panics if the script mutex is poisoned.
    pub fn push_outcome(&self, outcome: Result<SendReceipt, TransportError>) {
        self.script
            .lock()
            .expect("MockTransport script mutex poisoned")
            .push_back(outcome);
    }

    /// Queue a failure for a future send call.
    pub fn push_failure(&self, error: TransportError) {
        self.push_outcome(Err(error));
    }

    /// Messages accepted by the transport, in send order.
    ///
    /// # Panics
    /// Panics if the sent mutex is poisoned.
    #[must_use]
    pub fn sent(&self) -> Vec<OutgoingMessage> {
        self.sent
            .lock()
            .expect("MockTransport sent mutex poisoned")
            .clone()
    }

    /// Total send calls, including failed ones.
    ///
    /// # Panics
    /// Panics if the call-counter mutex is poisoned.
    #[must_use]
    pub fn call_count(&self) -> u32 {
        *self
            .calls
            .lock()
            .expect("MockTransport calls mutex poisoned")
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, message: &OutgoingMessage) -> Result<SendReceipt, TransportError> {
        let call = {
            let mut calls = self
                .calls
                .lock()
                .expect("MockTransport calls mutex poisoned");
            *calls += 1;
            *calls
        };

        let scripted = self
            .script
            .lock()
            .expect("MockTransport script mutex poisoned")
            .pop_front();

        match scripted {
            Some(Err(e)) => Err(e),
            Some(Ok(receipt)) => {
                self.sent
                    .lock()
                    .expect("MockTransport sent mutex poisoned")
                    .push(message.clone());
                Ok(receipt)
            }
            None => {
                self.sent
                    .lock()
                    .expect("MockTransport sent mutex poisoned")
                    .push(message.clone());
                Ok(SendReceipt {
                    message_id: format!("msg-{call}"),
                    thread_id: format!("thread-{call}"),
                })
            }
        }
    }
}

/// [`LabelService`] that records applications and optionally fails them.
#[derive(Debug, Clone, Default)]
pub struct MockLabelService {
    fail_apply: bool,
    applied: Arc<Mutex<Vec<(String, Vec<String>)>>>,
}

impl MockLabelService {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `apply_labels` call fail (non-fatally, from the runner's
    /// point of view).
    #[must_use]
    pub const fn failing_apply(mut self) -> Self {
        self.fail_apply = true;
        self
    }

    /// Recorded `(message_id, label_ids)` applications.
    ///
    /// # Panics
    /// Panics if the mutex is poisoned.
    #[must_use]
    pub fn applied(&self) -> Vec<(String, Vec<String>)> {
        self.applied
            .lock()
            .expect("MockLabelService mutex poisoned")
            .clone()
    }
}

#[async_trait]
impl LabelService for MockLabelService {
    async fn ensure_label(&self, name: &str) -> Result<String, TransportError> {
        Ok(format!("label-{name}"))
    }

    async fn apply_labels(
        &self,
        message_id: &str,
        label_ids: &[String],
    ) -> Result<(), TransportError> {
        if self.fail_apply {
            return Err(TransportError::Server("label backend down".to_string()));
        }
        self.applied
            .lock()
            .expect("MockLabelService mutex poisoned")
            .push((message_id.to_string(), label_ids.to_vec()));
        Ok(())
    }
}
