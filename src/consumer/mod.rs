// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Downstream delivery of processed batches.
//!
//! A consumer republishes the whole batch as one broker message, a JSON
//! array of the adapted payloads. Delivery is atomic at this layer: the
//! publish succeeds for the whole batch or fails for the whole batch, and a
//! failure is recorded against every message in the batch.

mod clustered;
mod set;
mod single;

use std::collections::HashMap;

use crate::batch::TaskBatch;
use crate::broker::Connection;
use crate::errors::BrokerError;

pub use clustered::ClusteredConsumer;
pub use set::{ConsumerSet, ConsumerSetMember};
pub use single::SingleConsumer;

/// Internal outcome of one publish attempt, distinguishing the failures
/// that are eligible for failover from the ones that are immediately fatal.
enum ConsumeFault {
    /// No wire subject configured for the batch's stream. Fatal.
    UnknownQueue,
    /// The batch could not be serialized. Fatal: retrying against another
    /// connection cannot change the input.
    BadMessage(serde_json::Error),
    /// The broker rejected the publish. Eligible for failover.
    Publish(BrokerError),
}

/// Serialize the batch's payloads as one JSON array and publish it to the
/// stream's subject on `connection`.
///
/// The array takes the iteration order of the batch's internal map, which
/// is not stable; callers must not depend on element order.
async fn publish_batch(
    connection: &Connection,
    streams: &HashMap<String, String>,
    batch: &TaskBatch,
) -> Result<(), ConsumeFault> {
    let subject = streams
        .get(batch.name())
        .ok_or(ConsumeFault::UnknownQueue)?;

    let mut values = Vec::with_capacity(batch.len());
    for payload in batch.events().values() {
        let value: serde_json::Value =
            serde_json::from_slice(payload).map_err(ConsumeFault::BadMessage)?;
        values.push(value);
    }

    let body = serde_json::to_vec(&values).map_err(ConsumeFault::BadMessage)?;

    connection
        .publish(subject, &body)
        .await
        .map_err(ConsumeFault::Publish)
}
