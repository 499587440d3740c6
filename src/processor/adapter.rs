// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::Arc;

use crate::batch::{Events, MessageId};
use crate::errors::ProcessingError;

/// Transformation applied to a batch's raw payloads before delivery.
///
/// The adapter is the only stage that decodes payload bytes. It receives
/// the full event map and may rewrite any value in place; an error aborts
/// the entire batch. There is no per-message partial adaptation unless the
/// adapter itself records individual failures in the batch and still
/// returns `Ok`.
#[derive(Clone)]
pub struct EventAdapter {
    f: Arc<dyn Fn(&mut Events) -> Result<(), ProcessingError> + Send + Sync>,
}

impl EventAdapter {
    /// Adapter from an arbitrary whole-batch transform.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&mut Events) -> Result<(), ProcessingError> + Send + Sync + 'static,
    {
        Self { f: Arc::new(f) }
    }

    /// Adapter that passes every payload through untouched.
    pub fn identity() -> Self {
        Self::new(|_| Ok(()))
    }

    /// Adapter that applies a per-message transform.
    ///
    /// `f` returns the transformed payload, or `Ok(None)` when the message
    /// does not fit the transform. A message that does not fit, or any
    /// transform error, aborts the whole batch.
    pub fn per_message<F>(f: F) -> Self
    where
        F: Fn(MessageId, &[u8]) -> Result<Option<Vec<u8>>, ProcessingError>
            + Send
            + Sync
            + 'static,
    {
        Self::new(move |events| {
            for (id, payload) in events.iter_mut() {
                match f(*id, payload)? {
                    Some(adapted) => *payload = adapted,
                    None => {
                        return Err(ProcessingError::Adapter {
                            reason: format!("message {} does not fit the adapter", id),
                        })
                    }
                }
            }
            Ok(())
        })
    }

    pub(crate) fn apply(&self, events: &mut Events) -> Result<(), ProcessingError> {
        (self.f)(events)
    }
}

impl std::fmt::Debug for EventAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventAdapter").finish_non_exhaustive()
    }
}
