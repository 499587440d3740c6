// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for aggregator graph build and execution events.

use std::fmt::{Display, Formatter};

use tracing::Span;

use crate::observability::messages::StructuredLog;

/// Graph built successfully.
///
/// # Log Level
/// `info!` - Important operational event
pub struct GraphBuilt {
    pub instance_count: usize,
    pub edge_count: usize,
}

impl Display for GraphBuilt {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Aggregator graph built: {} instances, {} dependency edges",
            self.instance_count, self.edge_count
        )
    }
}

impl StructuredLog for GraphBuilt {
    fn log(&self) {
        tracing::info!(
            instance_count = self.instance_count,
            edge_count = self.edge_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "aggregator",
            span_name = name,
            instance_count = self.instance_count,
            edge_count = self.edge_count,
        )
    }
}

/// An instance's work function returned an error.
///
/// The failure is recorded as the instance's outcome and propagated to its
/// dependents as a poison signal; it is never returned to the caller of
/// the graph pass.
///
/// # Log Level
/// `error!`
pub struct InstanceFailed<'a> {
    pub instance: &'a str,
    pub error: &'a dyn Display,
}

impl Display for InstanceFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Instance '{}' failed: {}", self.instance, self.error)
    }
}

impl StructuredLog for InstanceFailed<'_> {
    fn log(&self) {
        tracing::error!(instance = self.instance, error = %self.error, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::span!(
            tracing::Level::ERROR,
            "instance",
            span_name = name,
            instance = self.instance,
        )
    }
}

/// An instance worker disappeared without delivering its outcome
/// (panicked or was aborted); dependents poison themselves instead of
/// hanging.
///
/// # Log Level
/// `error!`
pub struct WorkerLost<'a> {
    pub instance: &'a str,
    pub detail: &'a str,
}

impl Display for WorkerLost<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Worker for '{}' lost: {}", self.instance, self.detail)
    }
}
