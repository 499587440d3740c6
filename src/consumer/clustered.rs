// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Sticky-failover consumer over a set of downstream connections.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::batch::{DeliveryFailure, TaskBatch};
use crate::broker::Connection;
use crate::consumer::{publish_batch, ConsumeFault};
use crate::errors::ProcessingError;
use crate::observability::messages::broker::{PublishAbsorbed, PublishFailover};
use crate::observability::messages::StructuredLog;
use crate::traits::EventConsumer;

/// Consumer with sticky failover across an ordered connection set.
///
/// Publishes go to the currently preferred connection; a publish failure
/// advances the preference to the next connection (wrapping) and retries
/// until one succeeds or every connection has been tried exactly once. A
/// successful connection stays preferred for subsequent calls instead of
/// round-robining.
///
/// When every connection fails, the failure is recorded on every message in
/// the batch and the call reports success: the failure has been fully
/// absorbed into per-message results and the pass continues to its
/// acknowledgement phase. Downstream acknowledgement bookkeeping depends on
/// this; it is not an error-propagation bug.
pub struct ClusteredConsumer {
    connections: Vec<Arc<Connection>>,
    /// Event stream name -> downstream wire subject.
    streams: HashMap<String, String>,
    name: String,
    /// Currently preferred connection index; shared across concurrent
    /// calls.
    preferred: Mutex<usize>,
}

impl ClusteredConsumer {
    pub fn new(
        connections: Vec<Arc<Connection>>,
        streams: HashMap<String, String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            connections,
            streams,
            name: name.into(),
            preferred: Mutex::new(0),
        }
    }
}

#[async_trait]
impl EventConsumer for ClusteredConsumer {
    async fn consume(&self, batch: &mut TaskBatch) -> Result<(), ProcessingError> {
        // Held for the whole attempt sequence: the preferred index is the
        // cluster's only cross-call shared state.
        let mut preferred = self.preferred.lock().await;
        let mut active = *preferred;
        let mut last_failure = None;

        for _ in 0..self.connections.len() {
            let connection = &self.connections[active];
            match publish_batch(connection, &self.streams, batch).await {
                Ok(()) => {
                    *preferred = active;
                    return Ok(());
                }
                Err(ConsumeFault::UnknownQueue) => {
                    // Misconfiguration, identical on every connection
                    return Err(ProcessingError::UnknownQueue {
                        stream: batch.name().to_string(),
                        scope: format!("cluster {}", self.name),
                    });
                }
                Err(ConsumeFault::BadMessage(source)) => {
                    // The input cannot serialize any better elsewhere
                    return Err(ProcessingError::BadMessage {
                        stream: batch.name().to_string(),
                        source,
                    });
                }
                Err(ConsumeFault::Publish(source)) => {
                    PublishFailover {
                        url: connection.url(),
                        error: &source,
                    }
                    .log();
                    last_failure = Some(source);
                    active = (active + 1) % self.connections.len();
                }
            }
        }

        // Every connection rejected the publish: absorb the failure into
        // the per-message outcomes and report success.
        if let Some(failure) = last_failure {
            PublishAbsorbed {
                stream: batch.name(),
                connection_count: self.connections.len(),
            }
            .log();
            batch.fail_all(DeliveryFailure::new(failure.to_string()));
        }

        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
