// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;

use crate::errors::BrokerError;

/// Wire side of a broker connection.
///
/// A [`Connection`](crate::broker::Connection) keeps the buffered
/// subscription state locally and goes to the wire for exactly two things:
/// publishing a message and acknowledging a delivered one. Implementations
/// carry the actual transport; [`InProcessLink`](crate::broker::InProcessLink)
/// backs tests and demos.
#[async_trait]
pub trait BrokerLink: Send + Sync {
    /// Publish one message body to a subject.
    async fn publish(&self, subject: &str, body: &[u8]) -> Result<(), BrokerError>;

    /// Acknowledge one delivered message by its per-subject sequence.
    async fn ack(&self, subject: &str, sequence: u64) -> Result<(), BrokerError>;
}
