// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::broker::{StartPosition, SubjectSettings};
use crate::errors::ConfigError;

/// Main configuration structure for the engine.
///
/// Describes the broker replica set, the durable subject declarations, the
/// event streams, and the stage graph that one pass executes. Typically
/// loaded from a YAML configuration file.
///
/// # Example
/// ```yaml
/// broker:
///   client: delivery-report
///   cluster: events-cluster
///   clusters:
///     - url: nats://replica-0:4222
///     - url: nats://replica-1:4222
///   subjects:
///     orders.new:
///       durable_name: orders-cursor
///       max_in_flight: 512
///       manual_ack: true
/// streams:
///   orders:
///     subject: orders.new
///     publish_to: orders.adapted
/// stages:
///   - id: orders
///     stream: orders
///     consumer: report-builder
///   - id: summary
///     stream: orders
///     consumer: summary-builder
///     depends_on: [orders]
/// ```
#[derive(Debug, Deserialize)]
pub struct Config {
    pub broker: BrokerConfig,
    pub streams: HashMap<String, StreamConfig>,
    #[serde(default)]
    pub stages: Vec<StageConfig>,
}

/// Broker replica set plus durable subject declarations.
///
/// One connection is built per cluster entry; a single entry selects the
/// single-connection repository and consumer variants, more than one
/// selects the clustered variants. The choice is made once, at
/// construction.
#[derive(Debug, Deserialize)]
pub struct BrokerConfig {
    /// Client identity presented to every replica.
    pub client: String,
    /// Broker cluster name.
    pub cluster: String,
    /// Replica endpoints, in failover order.
    pub clusters: Vec<ClusterConfig>,
    /// Durable-subscription settings per wire subject.
    pub subjects: HashMap<String, SubjectConfig>,
}

impl BrokerConfig {
    /// Comma-joined replica URLs, for diagnostics.
    pub fn url(&self) -> String {
        self.clusters
            .iter()
            .map(|cluster| cluster.url.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }

    /// The declared subjects as connection-level settings.
    pub fn subject_settings(&self) -> HashMap<String, SubjectSettings> {
        self.subjects
            .iter()
            .map(|(subject, config)| (subject.clone(), config.to_settings()))
            .collect()
    }
}

/// One broker replica endpoint.
#[derive(Debug, Deserialize)]
pub struct ClusterConfig {
    pub url: String,
}

/// Durable-subscription settings for one subject, as configured.
#[derive(Debug, Deserialize)]
pub struct SubjectConfig {
    pub durable_name: String,
    pub max_in_flight: Option<u16>,
    pub start_at_sequence: Option<u64>,
    /// `YYYY-MM-DDTHH:MM:SS`; ignored when `start_at_sequence` is set.
    pub start_at_time: Option<String>,
    pub ack_wait_seconds: Option<u32>,
    #[serde(default)]
    pub manual_ack: bool,
}

impl SubjectConfig {
    pub fn to_settings(&self) -> SubjectSettings {
        let start = if let Some(sequence) = self.start_at_sequence {
            StartPosition::Sequence(sequence)
        } else if let Some(time) = &self.start_at_time {
            StartPosition::Time(time.clone())
        } else {
            StartPosition::NewOnly
        };

        SubjectSettings {
            durable_name: self.durable_name.clone(),
            max_in_flight: self.max_in_flight,
            start,
            ack_wait_seconds: self.ack_wait_seconds,
            manual_ack: self.manual_ack,
        }
    }
}

/// One event stream: where it is read from and where the adapted batch is
/// republished.
#[derive(Debug, Deserialize)]
pub struct StreamConfig {
    /// Wire subject the repository fetches from.
    pub subject: String,
    /// Wire subject the consumer publishes the adapted batch to.
    pub publish_to: String,
}

/// One stage of the aggregator graph.
#[derive(Debug, Deserialize)]
pub struct StageConfig {
    /// Unique stage id within the graph.
    pub id: String,
    /// Event stream this stage processes.
    pub stream: String,
    /// Durable consumer name for this stage's fetches and publishes.
    pub consumer: String,
    #[serde(default)]
    pub depends_on: Vec<String>,
    /// Log a per-reason summary of messages that failed consumption.
    #[serde(default)]
    pub log_unprocessed: bool,
}

/// Load a config from a YAML file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let content = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
        path: path.as_ref().to_path_buf(),
        source,
    })?;
    let cfg: Config = serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.as_ref().to_path_buf(),
        source,
    })?;
    Ok(cfg)
}

/// Load and validate a config from a YAML file.
///
/// Validation covers the stage list's structural integrity: duplicate
/// ids, unresolved dependencies, unknown streams, undeclared subjects.
/// Cycle detection happens later, when the aggregator graph is built.
pub fn load_and_validate_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let cfg = load_config(path)?;

    if let Err(validation_errors) = crate::config::validate_stages(&cfg) {
        return Err(ConfigError::Validation(validation_errors));
    }

    Ok(cfg)
}
