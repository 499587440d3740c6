// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

/// Durable-subscription settings for one subject.
///
/// Subjects must be declared with these settings before a connection opens;
/// the engine's fetch/acknowledge cycle relies on a durable cursor and
/// manual acknowledgement mode.
#[derive(Debug, Clone)]
pub struct SubjectSettings {
    /// Durable name identifying the broker-side cursor that survives
    /// reconnects.
    pub durable_name: String,
    /// Maximum number of unacknowledged messages the broker keeps in
    /// flight for this subject.
    pub max_in_flight: Option<u16>,
    /// Where the cursor starts when no durable state exists yet.
    pub start: StartPosition,
    /// Seconds the broker waits for an ack before redelivering.
    pub ack_wait_seconds: Option<u32>,
    /// Manual acknowledgement mode. Required: the engine acknowledges
    /// messages itself after delivery is confirmed.
    pub manual_ack: bool,
}

impl SubjectSettings {
    /// Settings with a durable name, manual-ack mode, and broker defaults
    /// for everything else.
    pub fn durable(durable_name: impl Into<String>) -> Self {
        Self {
            durable_name: durable_name.into(),
            max_in_flight: None,
            start: StartPosition::NewOnly,
            ack_wait_seconds: None,
            manual_ack: true,
        }
    }
}

/// Start position of a durable cursor with no prior state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StartPosition {
    /// Deliver only messages published after the subscription starts.
    #[default]
    NewOnly,
    /// Start at a fixed sequence number.
    Sequence(u64),
    /// Start at a point in time, `YYYY-MM-DDTHH:MM:SS`.
    Time(String),
}
