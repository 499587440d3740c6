// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Observability module for structured logging and tracing.
//!
//! This module provides centralized message types for all diagnostic and
//! operational logging in the engine. Message types follow a struct-based
//! pattern with `Display` trait implementation to:
//!
//! * Eliminate magic strings scattered throughout the codebase
//! * Enable future internationalization without code changes
//! * Provide consistent, structured logging output
//!
//! # Architecture
//!
//! Messages are organized by subsystem:
//! * `messages::broker` - connection, fetch and publish failover events
//! * `messages::processor` - event-processing pass lifecycle events
//! * `messages::aggregator` - graph build and instance execution events
//!
//! Logging is diagnostics only: no message emitted here ever affects
//! control flow.

pub mod messages;
