// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for broker connection and failover events.
//!
//! This module contains message types for logging events related to:
//! * Connection lifecycle (open, close, degraded subscriptions)
//! * Clustered fetch and acknowledgement partial failures
//! * Publish failover between redundant connections

use std::fmt::{Display, Formatter};

use tracing::Span;

use crate::observability::messages::StructuredLog;

/// Connection opened and reading from its declared subjects.
///
/// # Log Level
/// `info!` - Important operational event
pub struct ConnectionOpened<'a> {
    pub url: &'a str,
    pub subject_count: usize,
}

impl Display for ConnectionOpened<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Connection {} opened, reading {} subjects",
            self.url, self.subject_count
        )
    }
}

impl StructuredLog for ConnectionOpened<'_> {
    fn log(&self) {
        tracing::info!(url = self.url, subject_count = self.subject_count, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "connection",
            span_name = name,
            url = self.url,
            subject_count = self.subject_count,
        )
    }
}

/// A durable subscription could not be established on one subject.
///
/// The connection keeps serving its other subjects; fetches against the
/// rejected subject surface the stored failure.
///
/// # Log Level
/// `error!` - Degraded but non-fatal condition
pub struct SubscriptionRejected<'a> {
    pub subject: &'a str,
    pub url: &'a str,
    pub reason: &'a str,
}

impl Display for SubscriptionRejected<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Subscribe error {} on {}: {}",
            self.subject, self.url, self.reason
        )
    }
}

impl StructuredLog for SubscriptionRejected<'_> {
    fn log(&self) {
        tracing::error!(
            subject = self.subject,
            url = self.url,
            reason = self.reason,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::span!(
            tracing::Level::ERROR,
            "subscription",
            span_name = name,
            subject = self.subject,
            url = self.url,
        )
    }
}

/// A clustered read against one connection failed.
///
/// Partial data from the remaining connections is still returned;
/// availability is preferred over completeness.
///
/// # Log Level
/// `error!` - Partial failure, best-effort continues
pub struct ConnectionReadFailed<'a> {
    pub url: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for ConnectionReadFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Reading from {}: {}", self.url, self.error)
    }
}

impl StructuredLog for ConnectionReadFailed<'_> {
    fn log(&self) {
        tracing::error!(url = self.url, error = %self.error, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::span!(
            tracing::Level::ERROR,
            "clustered_read",
            span_name = name,
            url = self.url,
        )
    }
}

/// A publish failed on one connection; the consumer advances to the next.
///
/// # Log Level
/// `error!` - Failover in progress
pub struct PublishFailover<'a> {
    pub url: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for PublishFailover<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Err while publish to {}: {}", self.url, self.error)
    }
}

impl StructuredLog for PublishFailover<'_> {
    fn log(&self) {
        tracing::error!(url = self.url, error = %self.error, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::span!(
            tracing::Level::ERROR,
            "publish_failover",
            span_name = name,
            url = self.url,
        )
    }
}

/// Every connection in the set rejected the publish; the failure was
/// absorbed into the batch's per-message outcomes.
///
/// # Log Level
/// `error!` - Whole-cluster publish outage
pub struct PublishAbsorbed<'a> {
    pub stream: &'a str,
    pub connection_count: usize,
}

impl Display for PublishAbsorbed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Publish for '{}' failed on all {} connections, failure recorded per message",
            self.stream, self.connection_count
        )
    }
}

impl StructuredLog for PublishAbsorbed<'_> {
    fn log(&self) {
        tracing::error!(
            stream = self.stream,
            connection_count = self.connection_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::span!(
            tracing::Level::ERROR,
            "publish_absorbed",
            span_name = name,
            stream = self.stream,
        )
    }
}

/// An acknowledged sequence number could not be resolved to a buffered
/// message handle and was skipped.
///
/// # Log Level
/// `error!` - Skipped identifier, acknowledgement continues
pub struct UnresolvableSequence {
    pub connection: usize,
    pub sequence: u64,
}

impl Display for UnresolvableSequence {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Not found msg with id {} in connection {}",
            self.sequence, self.connection
        )
    }
}

/// A batch identifier without composite parts reached a clustered
/// acknowledgement and was skipped.
///
/// # Log Level
/// `error!` - Skipped identifier, acknowledgement continues
pub struct UnparsableIdentifier<'a> {
    pub id: &'a str,
}

impl Display for UnparsableIdentifier<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Unable to parse msg {}", self.id)
    }
}
