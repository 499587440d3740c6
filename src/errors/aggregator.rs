// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt;

use thiserror::Error;

/// Errors that can occur while building an aggregator graph.
///
/// All of these are construction-time failures: a graph that fails to build
/// never runs.
#[derive(Debug, Clone, PartialEq)]
pub enum BuildError {
    /// An instance declares a dependency on a name that is not part of the
    /// graph.
    UnknownDependency {
        /// The instance with the unresolved dependency
        instance: String,
        /// The dependency name that couldn't be resolved
        dependency: String,
    },
    /// A readiness pass made no progress while unprocessed instances remain.
    /// Covers cycles and subgraphs that can never become ready.
    UnsatisfiableGraph {
        /// The instances that never became ready
        unprocessed: Vec<String>,
    },
    /// Two instances share the same name.
    DuplicateInstance {
        /// The duplicate instance name
        instance: String,
    },
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildError::UnknownDependency {
                instance,
                dependency,
            } => {
                write!(
                    f,
                    "instance '{}' depends on '{}' which does not exist",
                    instance, dependency
                )
            }
            BuildError::UnsatisfiableGraph { unprocessed } => {
                write!(
                    f,
                    "unable to build aggregator, check for cycles or unreachable dependencies: {}",
                    unprocessed.join(", ")
                )
            }
            BuildError::DuplicateInstance { instance } => {
                write!(f, "duplicate instance name: '{}'", instance)
            }
        }
    }
}

impl std::error::Error for BuildError {}

/// Poison value propagated along dependency edges when an upstream instance
/// fails.
///
/// Carries the name of the instance whose work actually failed, so a node
/// several edges downstream still sees the original source of the poison.
/// Clonable and comparable because one failure fans out to every notifier
/// edge unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("instance '{instance}' failed: {reason}")]
pub struct InstanceFailure {
    pub instance: String,
    pub reason: String,
}

impl InstanceFailure {
    pub fn new(instance: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
            reason: reason.into(),
        }
    }
}
