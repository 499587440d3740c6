// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Stub instance implementations for testing and placeholder purposes.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::traits::Instance;

/// An instance that records how often it ran and always succeeds.
pub struct StubInstance {
    name: String,
    depends_on: Vec<String>,
    invocations: AtomicUsize,
}

impl StubInstance {
    pub fn new(name: impl Into<String>, depends_on: &[&str]) -> Self {
        Self {
            name: name.into(),
            depends_on: depends_on.iter().map(|s| s.to_string()).collect(),
            invocations: AtomicUsize::new(0),
        }
    }

    /// Number of times `process` was invoked.
    pub fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Instance for StubInstance {
    async fn process(&self, _data: &serde_json::Value) -> anyhow::Result<()> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn depends_on(&self) -> &[String] {
        &self.depends_on
    }
}

/// An instance that always fails, for poisoning scenarios.
pub struct FailingInstance {
    name: String,
    depends_on: Vec<String>,
    reason: String,
    invocations: AtomicUsize,
}

impl FailingInstance {
    pub fn new(name: impl Into<String>, depends_on: &[&str], reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            depends_on: depends_on.iter().map(|s| s.to_string()).collect(),
            reason: reason.into(),
            invocations: AtomicUsize::new(0),
        }
    }

    pub fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Instance for FailingInstance {
    async fn process(&self, _data: &serde_json::Value) -> anyhow::Result<()> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        anyhow::bail!("{}", self.reason)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn depends_on(&self) -> &[String] {
        &self.depends_on
    }
}

/// An instance that panics instead of returning, for worker-loss scenarios.
pub struct PanickingInstance {
    name: String,
    depends_on: Vec<String>,
}

impl PanickingInstance {
    pub fn new(name: impl Into<String>, depends_on: &[&str]) -> Self {
        Self {
            name: name.into(),
            depends_on: depends_on.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[async_trait]
impl Instance for PanickingInstance {
    async fn process(&self, _data: &serde_json::Value) -> anyhow::Result<()> {
        panic!("instance '{}' exploded", self.name)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn depends_on(&self) -> &[String] {
        &self.depends_on
    }
}
