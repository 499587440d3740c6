// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The unit of work passed through one event-processing pass.

use std::collections::HashMap;

use thiserror::Error;

use crate::batch::MessageId;

/// Message identifier -> raw payload bytes. Payloads are opaque at this
/// layer; only the adapter stage decodes them.
pub type Events = HashMap<MessageId, Vec<u8>>;

/// Message identifier -> acknowledgement outcome. `None` means the message
/// has not failed; `Some` records the terminal failure reason for that
/// specific message.
pub type AckResult = HashMap<MessageId, Option<DeliveryFailure>>;

/// Terminal failure reason recorded against a single message.
///
/// Cheap to clone because one failure (a rejected whole-batch publish, for
/// example) is recorded against every message in the batch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct DeliveryFailure(String);

impl DeliveryFailure {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }

    /// The failure text, used for grouping diagnostics.
    pub fn reason(&self) -> &str {
        &self.0
    }
}

/// One pass's collection of fetched messages plus their per-message
/// outcomes and a scratch context map.
///
/// A batch is created fresh for every pipeline pass, populated by the
/// repository during fetch, mutated by the adapter and consumer, drained by
/// the repository during acknowledgement, and discarded at the end of the
/// pass. It is never shared across concurrent tasks within one pass.
///
/// # Invariant
///
/// Every key present in `events` has a corresponding entry in the ack
/// result (initialized to success) from the moment the message is
/// registered. The two key sets stay equal for the life of the batch; ack
/// outcomes may be overwritten but never removed.
#[derive(Debug, Clone, Default)]
pub struct TaskBatch {
    name: String,
    context: HashMap<String, serde_json::Value>,
    events: Events,
    ack_result: AckResult,
}

impl TaskBatch {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            context: HashMap::new(),
            events: Events::new(),
            ack_result: AckResult::new(),
        }
    }

    /// Logical event-stream identifier this batch belongs to.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Pre-size both maps for `capacity` messages.
    pub fn allocate(&mut self, capacity: usize) {
        self.events = Events::with_capacity(capacity);
        self.ack_result = AckResult::with_capacity(capacity);
    }

    /// Register one fetched message. The ack outcome starts as success.
    pub fn write_event(&mut self, id: MessageId, payload: Vec<u8>) {
        self.events.insert(id, payload);
        self.ack_result.insert(id, None);
    }

    /// Register a whole set of fetched messages at once.
    pub fn write_events_from_iter<I>(&mut self, events: I)
    where
        I: IntoIterator<Item = (MessageId, Vec<u8>)>,
    {
        for (id, payload) in events {
            self.write_event(id, payload);
        }
    }

    /// Record a terminal failure for one message.
    pub fn set_failure(&mut self, id: MessageId, failure: DeliveryFailure) {
        self.ack_result.insert(id, Some(failure));
    }

    /// Record a terminal failure only if the message is registered.
    /// Returns `false` (and records nothing) for unknown identifiers.
    pub fn set_failure_checked(&mut self, id: MessageId, failure: DeliveryFailure) -> bool {
        if !self.ack_result.contains_key(&id) {
            return false;
        }
        self.set_failure(id, failure);
        true
    }

    /// Record a conversion failure for one message.
    pub fn bad_input(&mut self, id: MessageId, target_type: &str) {
        self.set_failure(
            id,
            DeliveryFailure::new(format!(
                "error while trying to convert source msg to {}",
                target_type
            )),
        );
    }

    /// Record the same failure against every registered message.
    pub fn fail_all(&mut self, failure: DeliveryFailure) {
        for outcome in self.ack_result.values_mut() {
            *outcome = Some(failure.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &Events {
        &self.events
    }

    /// Mutable access for the adapter stage, which may rewrite payloads in
    /// place.
    pub fn events_mut(&mut self) -> &mut Events {
        &mut self.events
    }

    pub fn ack_result(&self) -> &AckResult {
        &self.ack_result
    }

    /// Write a value into the pass's scratch context.
    pub fn set_context(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.context.insert(key.into(), value);
    }

    /// Read a value from the pass's scratch context.
    pub fn context(&self, key: &str) -> Option<&serde_json::Value> {
        self.context.get(key)
    }
}
