use std::io;
use thiserror::Error;

use crate::validation::DescriptorViolation;

/// Errors that can occur while producing or reading a descriptor
#[derive(Error, Debug)]
pub enum DescriptorError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to serialize descriptor: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Invalid descriptor for plugin '{id}': {}", join_violations(.violations))]
    Invalid {
        id: String,
        violations: Vec<DescriptorViolation>,
    },
}

fn join_violations(violations: &[DescriptorViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
