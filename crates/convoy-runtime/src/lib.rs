//! # convoy-runtime
//!
//! Lifecycle orchestration for compose projects over an abstract runtime
//! client.
//!
//! Provides three main entry points:
//! - [`load`]: loads a compose document into a ready-to-orchestrate
//!   [`Project`](orchestrator::Project).
//! - [`RuntimeClient`](client::RuntimeClient): the host capability the
//!   orchestrator depends on; inject any transport or a test double.
//! - [`reconcile`](reconcile::reconcile): folds already-running host
//!   containers into a graph.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::path::Path;
//!
//! use convoy_runtime::LoadOptions;
//!
//! # fn client() -> Box<dyn convoy_runtime::client::RuntimeClient> { unimplemented!() }
//! # fn main() -> convoy_common::error::Result<()> {
//! let mut project = convoy_runtime::load(
//!     Path::new("docker-compose.yml"),
//!     &LoadOptions { project_name: Some("myproj".into()), attach_running: true },
//!     client(),
//! )?;
//! let report = project.start()?;
//! assert!(report.is_complete());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod orchestrator;
pub mod reconcile;
pub mod report;

use std::path::Path;

use convoy_common::error::Result;
use convoy_common::naming;
use convoy_compose::config::ComposeConfig;
use convoy_compose::descriptor::ContainerDescriptor;
use convoy_compose::graph::ComposeGraph;

use crate::client::RuntimeClient;
use crate::orchestrator::Project;

/// Options controlling how a compose project is loaded.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Project name; derived from the working directory when absent.
    pub project_name: Option<String>,
    /// Also fold already-running containers matching the project's naming
    /// prefix into the graph.
    pub attach_running: bool,
}

/// Loads a compose document into a fully linked [`Project`].
///
/// Adds one descriptor per declared service, optionally reconciles running
/// host containers, then resolves the link graph. Structural errors abort
/// the load entirely; no partially linked graph ever escapes.
///
/// # Errors
///
/// Returns config, substitution, duplicate-label, unresolved-link, or
/// cyclic-link errors, plus client errors when `attach_running` is set.
pub fn load(path: &Path, options: &LoadOptions, client: Box<dyn RuntimeClient>) -> Result<Project> {
    let project = options
        .project_name
        .clone()
        .unwrap_or_else(naming::current_project_name);
    tracing::info!(path = %path.display(), project = %project, "loading compose project");

    let config = ComposeConfig::load(path)?;
    let mut graph = ComposeGraph::new();
    for (label, attributes) in config.service_entries() {
        graph.add_container(ContainerDescriptor::from_service(&project, &label, &attributes))?;
    }
    if options.attach_running {
        let _ = reconcile::reconcile(&mut graph, client.as_ref(), &project)?;
    }
    graph.link_containers()?;

    Ok(Project::new(project, graph, client))
}
