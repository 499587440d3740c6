use async_trait::async_trait;

use crate::batch::TaskBatch;
use crate::errors::ProcessingError;

/// Downstream delivery for a processed batch.
///
/// Implementations may absorb delivery failures into the batch's
/// per-message outcomes instead of returning an error; the clustered
/// consumer does exactly that after exhausting every connection.
#[async_trait]
pub trait EventConsumer: Send + Sync {
    /// Deliver the batch onward. May record per-message failures in the
    /// batch's ack result.
    async fn consume(&self, batch: &mut TaskBatch) -> Result<(), ProcessingError>;

    /// Display name of this consumer, used as the durable consumer name on
    /// fetches and in diagnostics.
    fn name(&self) -> &str;
}
