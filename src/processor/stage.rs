// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;

use crate::processor::EventProcessor;
use crate::traits::Instance;

/// An event-processor pass packaged as one aggregator instance.
///
/// The typical graph node: the stage ignores the pass's input data and runs
/// one full fetch -> adapt -> consume -> acknowledge pass when every upstream
/// stage has completed.
pub struct StageInstance {
    name: String,
    depends_on: Vec<String>,
    processor: EventProcessor,
    log_unprocessed: bool,
}

impl StageInstance {
    pub fn new(
        name: impl Into<String>,
        processor: EventProcessor,
        depends_on: Vec<String>,
        log_unprocessed: bool,
    ) -> Self {
        Self {
            name: name.into(),
            depends_on,
            processor,
            log_unprocessed,
        }
    }
}

#[async_trait]
impl Instance for StageInstance {
    async fn process(&self, _data: &serde_json::Value) -> anyhow::Result<()> {
        self.processor.process(self.log_unprocessed).await?;
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn depends_on(&self) -> &[String] {
        &self.depends_on
    }
}
