// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod aggregator;
mod broker;
mod config;
mod processing;

pub use aggregator::{BuildError, InstanceFailure};
pub use broker::BrokerError;
pub use config::{ConfigError, ValidationError};
pub use processing::ProcessingError;
