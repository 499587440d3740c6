// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::batch::{DeliveryFailure, TaskBatch};
use crate::broker::Connection;
use crate::consumer::{publish_batch, ConsumeFault};
use crate::errors::ProcessingError;
use crate::traits::EventConsumer;

/// Consumer over one broker connection.
///
/// A rejected publish aborts the pass: the error is returned *and* every
/// message in the batch has the failure recorded, so nothing from this
/// batch gets acknowledged.
pub struct SingleConsumer {
    connection: Arc<Connection>,
    /// Event stream name -> downstream wire subject.
    streams: HashMap<String, String>,
    name: String,
}

impl SingleConsumer {
    pub fn new(
        connection: Arc<Connection>,
        streams: HashMap<String, String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            connection,
            streams,
            name: name.into(),
        }
    }
}

#[async_trait]
impl EventConsumer for SingleConsumer {
    async fn consume(&self, batch: &mut TaskBatch) -> Result<(), ProcessingError> {
        match publish_batch(&self.connection, &self.streams, batch).await {
            Ok(()) => Ok(()),
            Err(ConsumeFault::UnknownQueue) => Err(ProcessingError::UnknownQueue {
                stream: batch.name().to_string(),
                scope: self.name.clone(),
            }),
            Err(ConsumeFault::BadMessage(source)) => Err(ProcessingError::BadMessage {
                stream: batch.name().to_string(),
                source,
            }),
            Err(ConsumeFault::Publish(source)) => {
                batch.fail_all(DeliveryFailure::new(source.to_string()));
                Err(ProcessingError::Publish(source))
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}
