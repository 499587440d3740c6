// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::errors::BuildError;

/// Errors that can occur while loading runtime configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("unable to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid YAML for the expected schema.
    #[error("unable to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The configuration parsed but failed structural validation.
    #[error("invalid configuration: {}", format_validation_errors(.0))]
    Validation(Vec<ValidationError>),

    /// The stage graph described by the configuration cannot be built.
    #[error("unable to build stage graph: {0}")]
    Graph(#[from] BuildError),
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors that can occur during stage configuration validation
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// A stage has a duplicate id
    DuplicateStageId {
        /// The duplicate stage id
        stage_id: String,
    },
    /// A stage references a dependency that doesn't exist
    UnresolvedDependency {
        /// The stage that has the unresolved dependency
        stage_id: String,
        /// The dependency that couldn't be resolved
        missing_dependency: String,
    },
    /// A stage references an event stream with no configured subject
    UnknownStream {
        /// The stage referencing the stream
        stage_id: String,
        /// The stream name with no subject mapping
        stream: String,
    },
    /// A stream reads from a subject that no broker connection declares
    UndeclaredSubject {
        /// The stream reading the subject
        stream: String,
        /// The subject missing from the broker's subject settings
        subject: String,
    },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::DuplicateStageId { stage_id } => {
                write!(f, "Duplicate stage id: '{}'", stage_id)
            }
            ValidationError::UnresolvedDependency {
                stage_id,
                missing_dependency,
            } => {
                write!(
                    f,
                    "Stage '{}' depends on '{}' which does not exist",
                    stage_id, missing_dependency
                )
            }
            ValidationError::UnknownStream { stage_id, stream } => {
                write!(
                    f,
                    "Stage '{}' reads stream '{}' which has no configured subject",
                    stage_id, stream
                )
            }
            ValidationError::UndeclaredSubject { stream, subject } => {
                write!(
                    f,
                    "Stream '{}' reads subject '{}' which is not declared in the broker settings",
                    stream, subject
                )
            }
        }
    }
}

impl std::error::Error for ValidationError {}
