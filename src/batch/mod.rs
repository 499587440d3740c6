// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod message_id;
mod task_batch;

pub use message_id::MessageId;
pub use task_batch::{AckResult, DeliveryFailure, Events, TaskBatch};
