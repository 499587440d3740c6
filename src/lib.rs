// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod aggregator;    // dependency-ordered execution
pub mod batch;         // task batch model
pub mod broker;        // broker connection primitive
pub mod config;        // config + runtime builder
pub mod consumer;      // downstream delivery
pub mod errors;        // error handling
pub mod observability; // structured log messages
pub mod processor;     // event-processing pass
pub mod repository;    // message fetch + acknowledgement
pub mod stubs;         // stub instances
pub mod traits;        // unified abstractions
