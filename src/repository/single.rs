// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::batch::{MessageId, TaskBatch};
use crate::broker::{Connection, MessageHandle};
use crate::errors::ProcessingError;
use crate::traits::EventRepository;

/// Repository over one broker connection.
///
/// Message identifiers are the broker's native per-subject sequence
/// numbers.
pub struct SingleRepository {
    connection: Arc<Connection>,
    /// Event stream name -> wire subject.
    streams: HashMap<String, String>,
}

impl SingleRepository {
    pub fn new(connection: Arc<Connection>, streams: HashMap<String, String>) -> Self {
        Self {
            connection,
            streams,
        }
    }

    fn subject_for(&self, batch: &TaskBatch) -> Result<&str, ProcessingError> {
        self.streams
            .get(batch.name())
            .map(String::as_str)
            .ok_or_else(|| ProcessingError::UnknownQueue {
                stream: batch.name().to_string(),
                scope: "repository".to_string(),
            })
    }
}

#[async_trait]
impl EventRepository for SingleRepository {
    async fn fetch_new(
        &self,
        batch: &mut TaskBatch,
        _consumer_name: &str,
    ) -> Result<(), ProcessingError> {
        let subject = self.subject_for(batch)?;

        let messages = self
            .connection
            .fetch_buffered(subject)
            .await
            .map_err(|source| ProcessingError::Fetch {
                url: self.connection.url().to_string(),
                source,
            })?;

        batch.allocate(messages.len());
        for (sequence, handle) in messages {
            batch.write_event(MessageId::Sequence(sequence), handle.payload);
        }

        Ok(())
    }

    async fn confirm_ack(
        &self,
        batch: &TaskBatch,
        _consumer_name: &str,
    ) -> Result<(), ProcessingError> {
        let subject = self.subject_for(batch)?;

        let messages = self
            .connection
            .fetch_buffered(subject)
            .await
            .map_err(|source| ProcessingError::Fetch {
                url: self.connection.url().to_string(),
                source,
            })?;

        // Only identifiers that never failed are acknowledged; the rest
        // stay redeliverable.
        let mut acknowledged: HashMap<u64, MessageHandle> = HashMap::with_capacity(batch.len());
        for (id, outcome) in batch.ack_result() {
            if outcome.is_some() {
                continue;
            }
            let sequence = id.sequence();
            if let Some(handle) = messages.get(&sequence) {
                acknowledged.insert(sequence, handle.clone());
            }
        }

        self.connection
            .acknowledge(subject, &acknowledged)
            .await
            .map_err(|source| ProcessingError::Ack {
                url: self.connection.url().to_string(),
                source,
            })
    }
}
