// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Concurrent dependency-ordered execution of named instances.
//!
//! An [`Aggregator`] holds a fixed set of [`Instance`]s and the dependency
//! edges derived from their declared dependency lists. Building the graph
//! validates it: unknown dependency names, duplicate instance names, and
//! graphs that can never become ready (cycles included) are all
//! construction-time errors, and a graph that fails to build never runs.
//!
//! Execution spawns one worker per instance. Each dependency edge carries
//! exactly one completion outcome through a single-use oneshot channel: an
//! instance waits for all of its inbound edges, runs its work only if no
//! upstream outcome was a failure, and sends its own outcome (success, or
//! the failure it inherited or produced) down every outbound edge. A
//! failure therefore poisons everything downstream of it without executing
//! any of it.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::oneshot;

use crate::errors::{BuildError, InstanceFailure};
use crate::observability::messages::aggregator::{GraphBuilt, InstanceFailed, WorkerLost};
use crate::observability::messages::StructuredLog;
use crate::traits::Instance;

#[cfg(test)]
mod integration_tests;

/// One parent -> child dependency edge, derived at build time.
#[derive(Debug, Clone, PartialEq, Eq)]
struct DependencyEdge {
    parent: String,
    child: String,
}

/// A fixed set of named instances plus their dependency edges.
pub struct Aggregator {
    instances: Vec<Arc<dyn Instance>>,
    edges: Vec<DependencyEdge>,
}

impl Aggregator {
    /// Build and validate the dependency graph.
    ///
    /// Readiness is computed by repeated passes: an instance becomes
    /// processed once every name in its dependency list is itself
    /// processed, and each of its parent -> child pairs is recorded as an
    /// edge at that moment. A pass that makes no progress while
    /// unprocessed instances remain means the graph can never run.
    pub fn new(instances: Vec<Arc<dyn Instance>>) -> Result<Self, BuildError> {
        let mut processed: HashMap<String, bool> = HashMap::with_capacity(instances.len());
        for instance in &instances {
            if processed.insert(instance.name().to_string(), false).is_some() {
                return Err(BuildError::DuplicateInstance {
                    instance: instance.name().to_string(),
                });
            }
        }

        let mut edges = Vec::new();
        let mut processed_count = 0;

        while processed_count < instances.len() {
            let mut newly_processed = 0;

            for instance in &instances {
                if processed[instance.name()] {
                    continue;
                }

                let mut blocked = false;
                for dependency in instance.depends_on() {
                    match processed.get(dependency.as_str()) {
                        None => {
                            return Err(BuildError::UnknownDependency {
                                instance: instance.name().to_string(),
                                dependency: dependency.clone(),
                            })
                        }
                        Some(false) => blocked = true,
                        Some(true) => {}
                    }
                }
                if blocked {
                    continue;
                }

                for dependency in instance.depends_on() {
                    edges.push(DependencyEdge {
                        parent: dependency.clone(),
                        child: instance.name().to_string(),
                    });
                }
                *processed.get_mut(instance.name()).unwrap() = true;
                newly_processed += 1;
            }

            if newly_processed == 0 {
                let mut unprocessed: Vec<String> = processed
                    .iter()
                    .filter(|(_, done)| !**done)
                    .map(|(name, _)| name.clone())
                    .collect();
                unprocessed.sort();
                return Err(BuildError::UnsatisfiableGraph { unprocessed });
            }
            processed_count += newly_processed;
        }

        GraphBuilt {
            instance_count: instances.len(),
            edge_count: edges.len(),
        }
        .log();

        Ok(Self { instances, edges })
    }

    /// Run one pass of the whole graph on `data`.
    ///
    /// Blocks until every instance worker has completed. Per-instance
    /// failures are logged and propagated to dependents as poison, never
    /// aggregated into a return value: returning signals "the pass has
    /// finished", not "the pass succeeded".
    pub async fn process(&self, data: serde_json::Value) {
        self.execute(data).await;
    }

    /// Execution core, returning each instance's recorded outcome.
    async fn execute(&self, data: serde_json::Value) -> HashMap<String, Option<InstanceFailure>> {
        let data = Arc::new(data);

        // One single-use channel per edge: inbound edges are an instance's
        // listeners, outbound edges its notifiers.
        let mut listeners: HashMap<String, Vec<oneshot::Receiver<Option<InstanceFailure>>>> =
            HashMap::with_capacity(self.edges.len());
        let mut notifiers: HashMap<String, Vec<oneshot::Sender<Option<InstanceFailure>>>> =
            HashMap::with_capacity(self.edges.len());
        for edge in &self.edges {
            let (sender, receiver) = oneshot::channel();
            listeners.entry(edge.child.clone()).or_default().push(receiver);
            notifiers.entry(edge.parent.clone()).or_default().push(sender);
        }

        let mut workers = Vec::with_capacity(self.instances.len());
        for instance in &self.instances {
            let instance = Arc::clone(instance);
            let inbound = listeners.remove(instance.name()).unwrap_or_default();
            let outbound = notifiers.remove(instance.name()).unwrap_or_default();
            let data = Arc::clone(&data);
            let worker_name = instance.name().to_string();

            let handle = tokio::spawn(async move {
                let mut outcome: Option<InstanceFailure> = None;

                // Fan-in barrier: every inbound edge delivers exactly one
                // outcome before any work is considered.
                for edge in inbound {
                    match edge.await {
                        Ok(Some(failure)) => outcome = Some(failure),
                        Ok(None) => {}
                        Err(_) => {
                            outcome = Some(InstanceFailure::new(
                                instance.name(),
                                "upstream worker dropped its completion signal",
                            ));
                        }
                    }
                }

                if outcome.is_none() {
                    if let Err(err) = instance.process(&data).await {
                        InstanceFailed {
                            instance: instance.name(),
                            error: &err,
                        }
                        .log();
                        outcome = Some(InstanceFailure::new(instance.name(), err.to_string()));
                    }
                }

                for notifier in outbound {
                    let _ = notifier.send(outcome.clone());
                }

                outcome
            });
            workers.push((worker_name, handle));
        }

        let mut outcomes = HashMap::with_capacity(workers.len());
        for (name, handle) in workers {
            match handle.await {
                Ok(outcome) => {
                    outcomes.insert(name, outcome);
                }
                Err(join_error) => {
                    let detail = join_error.to_string();
                    tracing::error!(
                        "{}",
                        WorkerLost {
                            instance: &name,
                            detail: &detail,
                        }
                    );
                    outcomes.insert(
                        name.clone(),
                        Some(InstanceFailure::new(name, detail)),
                    );
                }
            }
        }
        outcomes
    }
}
