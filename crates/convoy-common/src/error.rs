//! Unified error types for the Convoy workspace.
//!
//! Structural errors (substitution, duplicate labels, unresolved links,
//! cycles) abort loading and linking entirely; runtime operation failures
//! are collected per container by the orchestrator instead of aborting a
//! whole batch.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::Operation;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum ConvoyError {
    /// The compose configuration path does not exist.
    #[error("compose file not found: {path}")]
    ConfigNotFound {
        /// Path that was looked up.
        path: PathBuf,
    },

    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The compose document could not be parsed.
    #[error("failed to parse compose document: {source}")]
    Parse {
        /// Underlying parser error.
        #[from]
        source: serde_yaml::Error,
    },

    /// The compose document has an unusable structure.
    #[error("invalid compose document: {message}")]
    Document {
        /// Description of the structural problem.
        message: String,
    },

    /// A placeholder variable is unset and has no default.
    #[error("bad substitution at {location}: ${{{variable}}} is unset and has no default")]
    BadSubstitution {
        /// Name of the unset variable.
        variable: String,
        /// Dotted path to the value holding the placeholder.
        location: String,
    },

    /// Two services share the same label.
    #[error("duplicate container label: {label}")]
    DuplicateLabel {
        /// The colliding label.
        label: String,
    },

    /// A declared link references a label that is not in the graph.
    #[error("container {container} links to unknown container {target}")]
    UnresolvedLink {
        /// Label of the container declaring the link.
        container: String,
        /// The missing link target.
        target: String,
    },

    /// The link graph contains a cycle.
    #[error("cyclic link chain: {}", .members.join(" -> "))]
    CyclicLink {
        /// Labels participating in the cycle, in declaration order.
        members: Vec<String>,
    },

    /// A runtime client call failed.
    #[error("{operation} failed for container {container}: {message}")]
    Runtime {
        /// Label of the container the operation targeted.
        container: String,
        /// The attempted operation.
        operation: Operation,
        /// Description of the failure.
        message: String,
    },
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, ConvoyError>;
