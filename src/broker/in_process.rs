// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! In-process [`BrokerLink`] for tests and demos.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::broker::BrokerLink;
use crate::errors::BrokerError;

/// In-memory wire side of a connection.
///
/// Records every publish and ack it receives and can be told to reject
/// either operation, which is how tests simulate a broken replica.
#[derive(Default)]
pub struct InProcessLink {
    published: Mutex<Vec<(String, Vec<u8>)>>,
    acked: Mutex<Vec<(String, u64)>>,
    publish_attempts: AtomicUsize,
    publish_failure: Mutex<Option<String>>,
    ack_failure: Mutex<Option<String>>,
}

impl InProcessLink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Reject every publish with `reason` until healed.
    pub fn fail_publishes(&self, reason: impl Into<String>) {
        *self.publish_failure.lock().unwrap() = Some(reason.into());
    }

    /// Accept publishes again.
    pub fn heal_publishes(&self) {
        *self.publish_failure.lock().unwrap() = None;
    }

    /// Reject every ack with `reason` until healed.
    pub fn fail_acks(&self, reason: impl Into<String>) {
        *self.ack_failure.lock().unwrap() = Some(reason.into());
    }

    /// Accept acks again.
    pub fn heal_acks(&self) {
        *self.ack_failure.lock().unwrap() = None;
    }

    /// Every `(subject, body)` publish accepted so far.
    pub fn published(&self) -> Vec<(String, Vec<u8>)> {
        self.published.lock().unwrap().clone()
    }

    /// Every `(subject, sequence)` ack accepted so far.
    pub fn acked(&self) -> Vec<(String, u64)> {
        self.acked.lock().unwrap().clone()
    }

    /// Number of publish attempts, accepted or rejected.
    pub fn publish_attempts(&self) -> usize {
        self.publish_attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BrokerLink for InProcessLink {
    async fn publish(&self, subject: &str, body: &[u8]) -> Result<(), BrokerError> {
        self.publish_attempts.fetch_add(1, Ordering::SeqCst);
        if let Some(reason) = self.publish_failure.lock().unwrap().clone() {
            return Err(BrokerError::PublishRejected {
                subject: subject.to_string(),
                reason,
            });
        }
        self.published
            .lock()
            .unwrap()
            .push((subject.to_string(), body.to_vec()));
        Ok(())
    }

    async fn ack(&self, subject: &str, sequence: u64) -> Result<(), BrokerError> {
        if let Some(reason) = self.ack_failure.lock().unwrap().clone() {
            return Err(BrokerError::AckRejected {
                subject: subject.to_string(),
                sequence,
                reason,
            });
        }
        self.acked
            .lock()
            .unwrap()
            .push((subject.to_string(), sequence));
        Ok(())
    }
}
