// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Error types for one event-processing pass.
//!
//! A pass moves through fetch, adapt, consume and acknowledge stages; each
//! stage surfaces its failures through this enum. Per-message failures are
//! *not* represented here; those are recorded inside the task batch as
//! [`DeliveryFailure`](crate::batch::DeliveryFailure) values and never abort
//! the pass on their own.

use thiserror::Error;

use crate::errors::BrokerError;

/// Errors that can abort an event-processing pass.
#[derive(Error, Debug)]
pub enum ProcessingError {
    /// No wire subject is configured for this event stream.
    #[error("no queue configured for event stream '{stream}' in {scope}")]
    UnknownQueue { stream: String, scope: String },

    /// The processor was built without an adapter.
    #[error("no adapter provided for event stream '{stream}'")]
    NoAdapter { stream: String },

    /// The adapter rejected the batch.
    #[error("adapter failed: {reason}")]
    Adapter { reason: String },

    /// A batch payload could not be serialized for publishing.
    #[error("unable to serialize batch for '{stream}': {source}")]
    BadMessage {
        stream: String,
        #[source]
        source: serde_json::Error,
    },

    /// A broker read failed while fetching new messages.
    #[error("reading from {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: BrokerError,
    },

    /// A broker publish failed.
    #[error("publish failed: {0}")]
    Publish(#[source] BrokerError),

    /// A broker acknowledgement failed.
    #[error("acknowledging on {url}: {source}")]
    Ack {
        url: String,
        #[source]
        source: BrokerError,
    },

    /// The pass body panicked; the panic was caught at the pass boundary.
    #[error("panic while executing '{stream}': {detail}")]
    PassPanicked { stream: String, detail: String },
}
