// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::HashMap;
use std::sync::Arc;

use crate::aggregator::Aggregator;
use crate::broker::{BrokerLink, Connection};
use crate::config::Config;
use crate::consumer::{ClusteredConsumer, SingleConsumer};
use crate::errors::ConfigError;
use crate::processor::{EventAdapter, EventProcessor, StageInstance};
use crate::repository::{ClusteredRepository, SingleRepository};
use crate::traits::{EventConsumer, EventRepository, Instance};

/// A fully assembled engine: the broker connections and the stage graph.
///
/// The runtime exposes exactly one operational entry point,
/// [`run_pass`](Runtime::run_pass). Whatever schedules passes (a calendar
/// worker, a cron loop, a test) lives outside the engine and only needs
/// something callable.
pub struct Runtime {
    connections: Vec<Arc<Connection>>,
    aggregator: Aggregator,
}

impl Runtime {
    pub fn connections(&self) -> &[Arc<Connection>] {
        &self.connections
    }

    /// Open every connection in the set.
    pub async fn open(&self) {
        for connection in &self.connections {
            connection.open().await;
        }
    }

    /// Close every connection in the set.
    pub async fn close(&self) {
        for connection in &self.connections {
            connection.close().await;
        }
    }

    /// Run one pass of the whole stage graph.
    pub async fn run_pass(&self, data: serde_json::Value) {
        self.aggregator.process(data).await;
    }
}

/// Runtime builder: assembles connections, repository/consumer variants
/// and the stage graph from a validated configuration.
///
/// The repository and consumer variants are chosen here, once, by the size
/// of the replica set: one cluster entry selects the single-connection
/// implementations, anything more selects the clustered ones. No runtime
/// type inspection happens after construction.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use conveyor::broker::{BrokerLink, InProcessLink};
/// use conveyor::config::{load_and_validate_config, RuntimeBuilder};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let cfg = load_and_validate_config("conveyor.yaml")?;
/// let runtime = RuntimeBuilder::new()
///     .build(&cfg, |_url| InProcessLink::shared() as Arc<dyn BrokerLink>)?;
/// runtime.open().await;
/// runtime.run_pass(serde_json::Value::Null).await;
/// # Ok(())
/// # }
/// ```
pub struct RuntimeBuilder {
    adapters: HashMap<String, EventAdapter>,
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self {
            adapters: HashMap::new(),
        }
    }

    /// Register the adapter for one stream. Streams without a registered
    /// adapter pass payloads through untouched.
    pub fn adapter(mut self, stream: impl Into<String>, adapter: EventAdapter) -> Self {
        self.adapters.insert(stream.into(), adapter);
        self
    }

    /// Build the runtime. `link_factory` produces the wire side for each
    /// replica endpoint, keyed by its URL.
    pub fn build<F>(self, cfg: &Config, mut link_factory: F) -> Result<Runtime, ConfigError>
    where
        F: FnMut(&str) -> Arc<dyn BrokerLink>,
    {
        if let Err(validation_errors) = crate::config::validate_stages(cfg) {
            return Err(ConfigError::Validation(validation_errors));
        }

        let subjects = cfg.broker.subject_settings();
        let connections: Vec<Arc<Connection>> = cfg
            .broker
            .clusters
            .iter()
            .map(|cluster| {
                Arc::new(Connection::new(
                    cluster.url.clone(),
                    cfg.broker.client.clone(),
                    cfg.broker.cluster.clone(),
                    subjects.clone(),
                    link_factory(&cluster.url),
                ))
            })
            .collect();

        let read_streams: HashMap<String, String> = cfg
            .streams
            .iter()
            .map(|(stream, stream_config)| (stream.clone(), stream_config.subject.clone()))
            .collect();
        let publish_streams: HashMap<String, String> = cfg
            .streams
            .iter()
            .map(|(stream, stream_config)| (stream.clone(), stream_config.publish_to.clone()))
            .collect();

        let repository: Arc<dyn EventRepository> = if connections.len() == 1 {
            Arc::new(SingleRepository::new(
                Arc::clone(&connections[0]),
                read_streams,
            ))
        } else {
            Arc::new(ClusteredRepository::new(connections.clone(), read_streams))
        };

        let mut instances: Vec<Arc<dyn Instance>> = Vec::with_capacity(cfg.stages.len());
        for stage in &cfg.stages {
            let consumer: Arc<dyn EventConsumer> = if connections.len() == 1 {
                Arc::new(SingleConsumer::new(
                    Arc::clone(&connections[0]),
                    publish_streams.clone(),
                    stage.consumer.clone(),
                ))
            } else {
                Arc::new(ClusteredConsumer::new(
                    connections.clone(),
                    publish_streams.clone(),
                    stage.consumer.clone(),
                ))
            };

            let adapter = self
                .adapters
                .get(&stage.stream)
                .cloned()
                .unwrap_or_else(EventAdapter::identity);
            let processor = EventProcessor::new(
                Arc::clone(&repository),
                consumer,
                stage.stream.clone(),
                Some(adapter),
            );

            instances.push(Arc::new(StageInstance::new(
                stage.id.clone(),
                processor,
                stage.depends_on.clone(),
                stage.log_unprocessed,
            )));
        }

        let aggregator = Aggregator::new(instances)?;

        Ok(Runtime {
            connections,
            aggregator,
        })
    }
}
