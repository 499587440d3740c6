// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::Arc;

use async_trait::async_trait;

use crate::batch::TaskBatch;
use crate::errors::ProcessingError;
use crate::traits::EventConsumer;

/// One member of a [`ConsumerSet`].
pub struct ConsumerSetMember {
    pub consumer: Arc<dyn EventConsumer>,
    /// Whether this member's mutations and errors count. A member whose
    /// result does not matter consumes a clone of the batch and its errors
    /// are only logged.
    pub result_matters: bool,
}

impl ConsumerSetMember {
    pub fn primary(consumer: Arc<dyn EventConsumer>) -> Self {
        Self {
            consumer,
            result_matters: true,
        }
    }

    pub fn side(consumer: Arc<dyn EventConsumer>) -> Self {
        Self {
            consumer,
            result_matters: false,
        }
    }
}

/// An ordered set of consumers run one after another for the same batch.
///
/// Members flagged `result_matters` operate on the real batch and abort the
/// set on error; the others get a clone, so neither their per-message
/// outcomes nor their failures can leak into acknowledgement bookkeeping.
pub struct ConsumerSet {
    members: Vec<ConsumerSetMember>,
    name: String,
}

impl ConsumerSet {
    pub fn new(members: Vec<ConsumerSetMember>) -> Self {
        let name = members
            .iter()
            .map(|member| member.consumer.name())
            .collect::<Vec<_>>()
            .join("+");
        Self { members, name }
    }
}

#[async_trait]
impl EventConsumer for ConsumerSet {
    async fn consume(&self, batch: &mut TaskBatch) -> Result<(), ProcessingError> {
        for member in &self.members {
            if member.result_matters {
                member.consumer.consume(batch).await?;
            } else {
                let mut side_copy = batch.clone();
                if let Err(err) = member.consumer.consume(&mut side_copy).await {
                    tracing::error!(
                        consumer = member.consumer.name(),
                        error = %err,
                        "side consumer failed"
                    );
                }
            }
        }

        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
