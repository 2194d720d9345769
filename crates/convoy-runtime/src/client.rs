//! Abstract client for the container host.
//!
//! The orchestration core owns no wire protocol; every host operation goes
//! through this trait so a test double (or any concrete transport) can be
//! injected as an explicit capability.

use std::collections::BTreeMap;

use convoy_common::error::Result;
use convoy_common::types::ContainerHandle;
use convoy_compose::descriptor::ContainerDescriptor;
use serde::{Deserialize, Serialize};

/// Filter for enumerating containers on the host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListFilter {
    /// Only names starting with this prefix (leading slashes ignored).
    pub name_prefix: Option<String>,
    /// Include containers that are not currently running.
    pub include_stopped: bool,
}

/// One live port mapping as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortBinding {
    /// Container-side port, possibly with a protocol suffix stripped.
    pub container_port: String,
    /// Host-side port, when published.
    pub host_port: Option<String>,
}

impl PortBinding {
    /// Renders the binding in canonical `host:container` form; an
    /// unpublished port renders as the container port alone.
    #[must_use]
    pub fn canonical(&self) -> String {
        self.host_port.as_ref().map_or_else(
            || self.container_port.clone(),
            |host| format!("{host}:{}", self.container_port),
        )
    }
}

/// Live inspection record for one container on the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerRecord {
    /// Host-issued identifier.
    pub id: ContainerHandle,
    /// Container name, possibly with a leading slash.
    pub name: String,
    /// Image reference the container was created from.
    pub image: String,
    /// Whether the container is currently running.
    pub running: bool,
    /// Argument vector of the container's command.
    pub command: Vec<String>,
    /// Environment entries in `KEY=VALUE` form.
    pub environment: Vec<String>,
    /// Labels attached to the container.
    pub labels: BTreeMap<String, String>,
    /// Volume mount specifications.
    pub volumes: Vec<String>,
    /// Raw link entries from the host configuration.
    pub links: Vec<String>,
    /// Live port mappings.
    pub ports: Vec<PortBinding>,
    /// ISO-8601 creation timestamp as reported by the host.
    pub created_at: String,
}

/// Operations the orchestration core needs from a container host.
///
/// Implementors handle the transport-specific details; the core calls these
/// in link order and never reaches the host any other way.
pub trait RuntimeClient: Send + Sync {
    /// Enumerates containers matching the filter.
    ///
    /// # Errors
    ///
    /// Returns an error if the host cannot be queried.
    fn list(&self, filter: &ListFilter) -> Result<Vec<ContainerRecord>>;

    /// Returns the full inspection record for one container.
    ///
    /// # Errors
    ///
    /// Returns an error if the container is unknown to the host.
    fn inspect(&self, handle: &ContainerHandle) -> Result<ContainerRecord>;

    /// Creates a container from its descriptor, returning the host handle.
    ///
    /// Whether `build` or `image` is used to materialize the container is
    /// decided here, not by the caller.
    ///
    /// # Errors
    ///
    /// Returns an error if the container cannot be created.
    fn create(&self, descriptor: &ContainerDescriptor) -> Result<ContainerHandle>;

    /// Starts a created container.
    ///
    /// # Errors
    ///
    /// Returns an error if the container cannot be started.
    fn start(&self, handle: &ContainerHandle) -> Result<()>;

    /// Gracefully stops a running container.
    ///
    /// # Errors
    ///
    /// Returns an error if the container cannot be stopped.
    fn stop(&self, handle: &ContainerHandle) -> Result<()>;

    /// Forcibly stops a running container, bypassing any grace period.
    ///
    /// # Errors
    ///
    /// Returns an error if the container cannot be killed.
    fn kill(&self, handle: &ContainerHandle) -> Result<()>;

    /// Removes a stopped container from the host.
    ///
    /// # Errors
    ///
    /// Returns an error if the container cannot be removed.
    fn remove(&self, handle: &ContainerHandle) -> Result<()>;

    /// Returns whether the container is currently running.
    ///
    /// # Errors
    ///
    /// Returns an error if the container is unknown to the host.
    fn is_running(&self, handle: &ContainerHandle) -> Result<bool>;
}
