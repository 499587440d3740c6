//! Structural validation of the configured stage list.
//!
//! Three checks run in order, accumulating everything they find so a bad
//! config surfaces all of its problems at once:
//!
//! 1. **Uniqueness**: stage ids must be unique
//! 2. **References**: every `depends_on` entry names an existing stage
//! 3. **Streams**: every stage's stream exists and reads a declared subject
//!
//! Cycle detection is deliberately *not* done here: the aggregator build
//! detects unsatisfiable graphs itself, and a graph that fails to build
//! never runs.

use std::collections::HashSet;

use crate::config::Config;
use crate::errors::ValidationError;

/// Validate the stage list's structural integrity.
///
/// Returns every validation error found, or `Ok(())` when the stage list
/// is ready to be built into a graph.
pub fn validate_stages(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Err(duplicate_errors) = validate_unique_stage_ids(config) {
        errors.extend(duplicate_errors);
    }

    if let Err(unresolved_errors) = validate_dependency_references(config) {
        errors.extend(unresolved_errors);
    }

    if let Err(stream_errors) = validate_stream_references(config) {
        errors.extend(stream_errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_unique_stage_ids(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut seen_ids = HashSet::new();
    let mut errors = Vec::new();

    for stage in &config.stages {
        if !seen_ids.insert(&stage.id) {
            errors.push(ValidationError::DuplicateStageId {
                stage_id: stage.id.clone(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_dependency_references(config: &Config) -> Result<(), Vec<ValidationError>> {
    let stage_ids: HashSet<&String> = config.stages.iter().map(|stage| &stage.id).collect();
    let mut errors = Vec::new();

    for stage in &config.stages {
        for dependency in &stage.depends_on {
            if !stage_ids.contains(dependency) {
                errors.push(ValidationError::UnresolvedDependency {
                    stage_id: stage.id.clone(),
                    missing_dependency: dependency.clone(),
                });
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_stream_references(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    for stage in &config.stages {
        if !config.streams.contains_key(&stage.stream) {
            errors.push(ValidationError::UnknownStream {
                stage_id: stage.id.clone(),
                stream: stage.stream.clone(),
            });
        }
    }

    // A stream whose read subject was never declared can never fetch
    for (stream, stream_config) in &config.streams {
        if !config.broker.subjects.contains_key(&stream_config.subject) {
            errors.push(ValidationError::UndeclaredSubject {
                stream: stream.clone(),
                subject: stream_config.subject.clone(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
