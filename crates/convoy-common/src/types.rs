//! Domain primitive types used across the Convoy workspace.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identifier issued by the runtime host for a materialized container.
///
/// A descriptor without a handle has not been created on the host yet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContainerHandle(String);

impl ContainerHandle {
    /// Creates a handle from a host-issued identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a container within a compose graph.
///
/// Transitions happen only through orchestrator operations:
/// `Declared → Created → Running ⇄ Stopped`, and any state may reach
/// `Removed`, which is terminal: a removed label leaves the graph and can
/// no longer be targeted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContainerState {
    /// Loaded from configuration, not yet materialized on the host.
    Declared,
    /// Created on the host but not yet started.
    Created,
    /// Actively running on the host.
    Running,
    /// Stopped on the host.
    Stopped,
    /// Removed from the host and the graph.
    Removed,
}

impl ContainerState {
    /// Returns whether the container is materialized on the host.
    #[must_use]
    pub const fn is_materialized(self) -> bool {
        matches!(self, Self::Created | Self::Running | Self::Stopped)
    }
}

impl fmt::Display for ContainerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Declared => write!(f, "declared"),
            Self::Created => write!(f, "created"),
            Self::Running => write!(f, "running"),
            Self::Stopped => write!(f, "stopped"),
            Self::Removed => write!(f, "removed"),
        }
    }
}

/// A lifecycle operation issued against the runtime host.
///
/// Used for failure attribution in errors and batch reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    /// Create a container from its descriptor.
    Create,
    /// Start a created container.
    Start,
    /// Gracefully stop a running container.
    Stop,
    /// Forcibly stop a running container.
    Kill,
    /// Remove a container from the host.
    Remove,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Start => write!(f, "start"),
            Self::Stop => write!(f, "stop"),
            Self::Kill => write!(f, "kill"),
            Self::Remove => write!(f, "remove"),
        }
    }
}
