// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for event-processing pass lifecycle events.

use std::fmt::{Display, Formatter};

/// A pass stage failed and the pass is aborting.
///
/// # Log Level
/// `error!`
pub struct PassFailed<'a> {
    pub stream: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for PassFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Pass for '{}' failed: {}", self.stream, self.error)
    }
}

/// The pass body panicked; the panic was caught at the pass boundary and
/// converted into a normal error.
///
/// # Log Level
/// `error!`
pub struct PassPanicked<'a> {
    pub stream: &'a str,
    pub detail: &'a str,
}

impl Display for PassPanicked<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Panic while executing {}: {}", self.stream, self.detail)
    }
}

/// Summary of the messages that failed consumption, grouped by failure
/// reason: one line per distinct reason, not one per message.
///
/// # Log Level
/// `info!` - Purely observational, never affects control flow
pub struct UnprocessedEvents<'a> {
    pub stream: &'a str,
    pub failure: &'a str,
    pub ids: &'a str,
    pub count: usize,
}

impl Display for UnprocessedEvents<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "{} unprocessed events for '{}'. {}: {}",
            self.count, self.stream, self.failure, self.ids
        )
    }
}
