//! Lifecycle orchestration across a compose graph.
//!
//! A [`Project`] owns its graph and its runtime client, so one orchestration
//! invocation is the single writer of the graph: every lifecycle operation
//! takes `&mut self` and no other handle to the graph exists.

use std::collections::BTreeSet;

use convoy_common::error::{ConvoyError, Result};
use convoy_common::types::{ContainerState, Operation};
use convoy_compose::graph::ComposeGraph;

use crate::client::RuntimeClient;
use crate::report::BatchReport;

/// A loaded compose project: the graph plus the client that materializes it.
pub struct Project {
    name: String,
    graph: ComposeGraph,
    client: Box<dyn RuntimeClient>,
}

impl Project {
    /// Wraps a linked graph and a runtime client as one project.
    #[must_use]
    pub fn new(name: impl Into<String>, graph: ComposeGraph, client: Box<dyn RuntimeClient>) -> Self {
        Self {
            name: name.into(),
            graph,
            client,
        }
    }

    /// The active project name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Read access to the compose graph.
    #[must_use]
    pub fn graph(&self) -> &ComposeGraph {
        &self.graph
    }

    /// Creates and starts every container, providers before consumers.
    ///
    /// Containers already running are no-ops. A container whose provider
    /// (directly or transitively) failed is skipped and reported as blocked,
    /// never attempted; failures elsewhere in the graph do not stop the
    /// batch.
    ///
    /// # Errors
    ///
    /// Returns an error only for a structural problem in the graph; client
    /// failures are collected in the report.
    pub fn start(&mut self) -> Result<BatchReport> {
        let order = self.graph.start_order()?;
        tracing::info!(project = %self.name, ?order, "starting project");
        let mut report = BatchReport::new(Operation::Start);
        let mut unavailable: BTreeSet<String> = BTreeSet::new();

        for label in order {
            let blocking_provider = self
                .graph
                .providers_of(&label)
                .into_iter()
                .find(|provider| unavailable.contains(*provider))
                .map(str::to_string);
            if let Some(provider) = blocking_provider {
                tracing::warn!(label = %label, provider = %provider, "skipping container behind failed provider");
                let _ = unavailable.insert(label.clone());
                report.record_blocked(label, provider);
                continue;
            }

            match self.start_one(&label) {
                Ok(()) => report.record_completed(label),
                Err(error) => {
                    tracing::error!(label = %label, %error, "start failed");
                    let _ = unavailable.insert(label.clone());
                    report.record_failed(label, error);
                }
            }
        }
        Ok(report)
    }

    /// Gracefully stops every running container, consumers before providers.
    ///
    /// # Errors
    ///
    /// Returns an error only for a structural problem in the graph.
    pub fn stop(&mut self) -> Result<BatchReport> {
        self.halt(Operation::Stop)
    }

    /// Forcibly stops every running container, consumers before providers,
    /// bypassing any graceful-shutdown grace period.
    ///
    /// # Errors
    ///
    /// Returns an error only for a structural problem in the graph.
    pub fn kill(&mut self) -> Result<BatchReport> {
        self.halt(Operation::Kill)
    }

    /// Force-stops and removes every container, consumers before providers,
    /// dropping each from the graph as it goes; a fully successful batch
    /// leaves the graph empty.
    ///
    /// Descriptors that were never materialized are simply dropped.
    ///
    /// # Errors
    ///
    /// Returns an error only for a structural problem in the graph.
    pub fn delete(&mut self) -> Result<BatchReport> {
        let order = self.graph.stop_order()?;
        tracing::info!(project = %self.name, ?order, "deleting project");
        let mut report = BatchReport::new(Operation::Remove);
        for label in order {
            match self.delete_one(&label) {
                Ok(()) => {
                    let _ = self.graph.remove(&label);
                    report.record_completed(label);
                }
                Err(error) => {
                    tracing::error!(label = %label, %error, "delete failed");
                    report.record_failed(label, error);
                }
            }
        }
        Ok(report)
    }

    fn start_one(&mut self, label: &str) -> Result<()> {
        let client = self.client.as_ref();
        let Some(descriptor) = self.graph.get_mut(label) else {
            return Ok(());
        };
        if descriptor.state == ContainerState::Running {
            return Ok(());
        }

        if descriptor.handle.is_none() {
            let handle = client
                .create(descriptor)
                .map_err(|error| attribute(label, Operation::Create, &error))?;
            tracing::info!(label, id = %handle, "container created");
            descriptor.handle = Some(handle);
            descriptor.state = ContainerState::Created;
        }

        if let Some(handle) = descriptor.handle.clone() {
            client
                .start(&handle)
                .map_err(|error| attribute(label, Operation::Start, &error))?;
            descriptor.state = ContainerState::Running;
            tracing::info!(label, id = %handle, "container started");
        }
        Ok(())
    }

    fn halt(&mut self, operation: Operation) -> Result<BatchReport> {
        let order = self.graph.stop_order()?;
        tracing::info!(project = %self.name, %operation, ?order, "halting project");
        let mut report = BatchReport::new(operation);
        for label in order {
            match self.halt_one(&label, operation) {
                Ok(()) => report.record_completed(label),
                Err(error) => {
                    tracing::error!(label = %label, %error, "halt failed");
                    report.record_failed(label, error);
                }
            }
        }
        Ok(report)
    }

    fn halt_one(&mut self, label: &str, operation: Operation) -> Result<()> {
        let client = self.client.as_ref();
        let Some(descriptor) = self.graph.get_mut(label) else {
            return Ok(());
        };
        if descriptor.state != ContainerState::Running {
            return Ok(());
        }
        let Some(handle) = descriptor.handle.clone() else {
            return Ok(());
        };

        let outcome = if operation == Operation::Kill {
            client.kill(&handle)
        } else {
            client.stop(&handle)
        };
        outcome.map_err(|error| attribute(label, operation, &error))?;
        descriptor.state = ContainerState::Stopped;
        tracing::info!(label, id = %handle, %operation, "container halted");
        Ok(())
    }

    fn delete_one(&mut self, label: &str) -> Result<()> {
        let client = self.client.as_ref();
        let Some(descriptor) = self.graph.get_mut(label) else {
            return Ok(());
        };
        let Some(handle) = descriptor.handle.clone() else {
            return Ok(());
        };

        if descriptor.state == ContainerState::Running {
            client
                .kill(&handle)
                .map_err(|error| attribute(label, Operation::Kill, &error))?;
            descriptor.state = ContainerState::Stopped;
        }
        client
            .remove(&handle)
            .map_err(|error| attribute(label, Operation::Remove, &error))?;
        descriptor.state = ContainerState::Removed;
        descriptor.handle = None;
        tracing::info!(label, id = %handle, "container removed");
        Ok(())
    }
}

impl std::fmt::Debug for Project {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Project")
            .field("name", &self.name)
            .field("containers", &self.graph.labels())
            .finish_non_exhaustive()
    }
}

/// Attributes a client failure to the container and operation it hit.
fn attribute(label: &str, operation: Operation, error: &ConvoyError) -> ConvoyError {
    ConvoyError::Runtime {
        container: label.to_string(),
        operation,
        message: error.to_string(),
    }
}
