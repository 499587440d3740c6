// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Centralized message types for structured logging.
//!
//! Each message is a plain struct carrying the fields of one loggable
//! event, with a `Display` implementation for human-readable output.
//! Messages that benefit from structured fields additionally implement
//! [`StructuredLog`], which emits the event through `tracing` with the
//! fields attached.

use tracing::Span;

pub mod aggregator;
pub mod broker;
pub mod processor;

/// Structured emission of a log message through `tracing`.
///
/// `log` emits the event at the message's natural level with its fields
/// recorded as structured attributes; `span` opens a span carrying the
/// same fields for work performed under the event.
pub trait StructuredLog {
    fn log(&self);

    fn span(&self, name: &str) -> Span;
}
