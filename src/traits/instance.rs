use async_trait::async_trait;

/// One named unit of work in an aggregator graph.
///
/// An instance runs only after every instance named in `depends_on` has
/// completed successfully; a failure anywhere upstream poisons it without
/// invoking [`process`](Instance::process). An event-processor pass is one
/// typical instance, but any work fits.
#[async_trait]
pub trait Instance: Send + Sync {
    /// Run this instance's work on the pass's input data.
    async fn process(&self, data: &serde_json::Value) -> anyhow::Result<()>;

    /// Unique name of this instance within its graph.
    fn name(&self) -> &str;

    /// Names of the instances that must complete before this one runs.
    fn depends_on(&self) -> &[String];
}
