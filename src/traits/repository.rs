use async_trait::async_trait;

use crate::batch::TaskBatch;
use crate::errors::ProcessingError;

/// Source of new messages for an event stream, and the commit point for
/// their acknowledgements.
///
/// A repository fetches every currently buffered, not-yet-acknowledged
/// message for a batch's stream into the batch, and later acknowledges
/// exactly the subset of messages whose recorded outcome is still success.
/// Single-connection and clustered implementations exist; construction
/// chooses the variant once, statically.
#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Fetch all buffered messages for `batch.name()` into the batch.
    ///
    /// A stream with no configured wire subject fails with
    /// [`ProcessingError::UnknownQueue`]. Zero buffered messages is a
    /// success with no side effect on the batch.
    async fn fetch_new(&self, batch: &mut TaskBatch, consumer_name: &str)
        -> Result<(), ProcessingError>;

    /// Acknowledge every message in the batch whose ack outcome is still
    /// success. Messages with a recorded failure are left unacknowledged
    /// and stay redeliverable.
    async fn confirm_ack(&self, batch: &TaskBatch, consumer_name: &str)
        -> Result<(), ProcessingError>;
}
