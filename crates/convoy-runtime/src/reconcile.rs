//! Folding already-running host containers into a compose graph.
//!
//! Containers named under the active project's prefix are inspected and
//! converted back into materialized descriptors, so a project loaded twice
//! (or started by an out-of-band process) manages one set of containers
//! instead of colliding with itself.

use convoy_common::error::Result;
use convoy_common::naming;
use convoy_common::types::ContainerState;
use convoy_compose::descriptor::ContainerDescriptor;
use convoy_compose::graph::ComposeGraph;

use crate::client::{ContainerRecord, ListFilter, PortBinding, RuntimeClient};

/// Enumerates host containers matching the project's naming prefix and
/// folds each into the graph.
///
/// A record whose derived label matches an already-declared service adopts
/// it: the declared descriptor gains the live handle and state. Records
/// without a declared counterpart join the graph as reconciled entries,
/// which are exempt from link validation. Returns how many new entries were
/// added.
///
/// # Errors
///
/// Returns an error if the host cannot be enumerated or inspected, or if
/// two live containers resolve to the same undeclared label.
pub fn reconcile(
    graph: &mut ComposeGraph,
    client: &dyn RuntimeClient,
    project: &str,
) -> Result<usize> {
    let filter = ListFilter {
        name_prefix: Some(naming::project_prefix(project)),
        include_stopped: true,
    };
    let records = client.list(&filter)?;
    tracing::debug!(project, matches = records.len(), "enumerated live containers");

    let mut folded = 0;
    for record in records {
        let detail = client.inspect(&record.id)?;
        let Some(label) = naming::service_label(&detail.name) else {
            tracing::warn!(name = %detail.name, "skipping container outside the naming convention");
            continue;
        };
        let state = if detail.running {
            ContainerState::Running
        } else {
            ContainerState::Stopped
        };

        if let Some(declared) = graph.get_mut(&label) {
            declared.handle = Some(detail.id.clone());
            declared.state = state;
            tracing::info!(label = %label, id = %detail.id, "adopted live container for declared service");
        } else {
            tracing::info!(label = %label, id = %detail.id, %state, "folded live container into graph");
            graph.add_container(materialized(&label, state, &detail))?;
            folded += 1;
        }
    }
    Ok(folded)
}

/// Rebuilds a descriptor from live inspection data.
fn materialized(label: &str, state: ContainerState, record: &ContainerRecord) -> ContainerDescriptor {
    let mut descriptor =
        ContainerDescriptor::new(label, record.name.trim_start_matches('/').to_string());
    descriptor.image = Some(record.image.clone()).filter(|image| !image.is_empty());
    descriptor.ports = record.ports.iter().map(PortBinding::canonical).collect();
    descriptor.volumes = record.volumes.clone();
    descriptor.command = if record.command.is_empty() {
        None
    } else {
        Some(record.command.join(" "))
    };
    descriptor.environment = record.environment.clone();
    descriptor.labels = record.labels.clone();
    descriptor.links = record.links.iter().map(|raw| link_label(raw)).collect();
    descriptor.state = state;
    descriptor.handle = Some(record.id.clone());
    descriptor.reconciled = true;
    descriptor
}

/// Maps a live host link entry (`/myproj_db_1:/myproj_web_1/db`) back to a
/// service label where the naming convention allows it; unconventional
/// entries stay as their raw source name.
fn link_label(raw: &str) -> String {
    let source = raw.split(':').next().unwrap_or(raw);
    naming::service_label(source)
        .unwrap_or_else(|| source.trim_start_matches('/').to_string())
}
