// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Error types for broker connection operations.
//!
//! Covers the buffered-subscription surface of a single broker replica:
//! fetching buffered messages, acknowledging them, and publishing. All
//! variants implement `std::error::Error` via the `thiserror` crate.

use thiserror::Error;

use crate::broker::ConnectionState;

/// Errors surfaced by a single broker connection.
#[derive(Error, Debug)]
pub enum BrokerError {
    /// The subject was never declared on this connection.
    #[error("subject '{subject}' is not declared on connection {url}")]
    UnknownSubject { subject: String, url: String },

    /// The durable subscription for this subject could not be established.
    #[error("subscription for '{subject}' on {url} failed: {reason}")]
    SubscriptionFailed {
        subject: String,
        url: String,
        reason: String,
    },

    /// The connection is in a state that does not permit the operation.
    #[error("connection {url} cannot {operation} in state {state:?}")]
    BadState {
        url: String,
        state: ConnectionState,
        operation: &'static str,
    },

    /// The broker rejected a publish.
    #[error("publish to '{subject}' rejected: {reason}")]
    PublishRejected { subject: String, reason: String },

    /// The broker rejected an acknowledgement.
    #[error("ack of sequence {sequence} on '{subject}' rejected: {reason}")]
    AckRejected {
        subject: String,
        sequence: u64,
        reason: String,
    },
}
