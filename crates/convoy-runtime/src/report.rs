//! Aggregate results of one lifecycle batch.
//!
//! A lifecycle operation walks every container in link order and collects a
//! per-container outcome instead of aborting on the first failure.

use std::fmt;

use convoy_common::error::ConvoyError;
use convoy_common::types::Operation;

/// What happened to one container during a batch.
#[derive(Debug)]
pub enum OutcomeStatus {
    /// The operation completed (including no-op completions).
    Completed,
    /// The runtime client reported a failure.
    Failed {
        /// The failure, attributed to this container.
        error: ConvoyError,
    },
    /// Never attempted: a provider this container depends on failed first.
    Blocked {
        /// Label of the failed provider.
        provider: String,
    },
}

/// Outcome for one container, in issue order.
#[derive(Debug)]
pub struct ContainerOutcome {
    /// Container label.
    pub label: String,
    /// What happened.
    pub status: OutcomeStatus,
}

/// Per-container outcomes of one lifecycle operation over a graph.
#[derive(Debug)]
pub struct BatchReport {
    operation: Operation,
    outcomes: Vec<ContainerOutcome>,
}

impl BatchReport {
    pub(crate) fn new(operation: Operation) -> Self {
        Self {
            operation,
            outcomes: Vec::new(),
        }
    }

    pub(crate) fn record_completed(&mut self, label: String) {
        self.outcomes.push(ContainerOutcome {
            label,
            status: OutcomeStatus::Completed,
        });
    }

    pub(crate) fn record_failed(&mut self, label: String, error: ConvoyError) {
        self.outcomes.push(ContainerOutcome {
            label,
            status: OutcomeStatus::Failed { error },
        });
    }

    pub(crate) fn record_blocked(&mut self, label: String, provider: String) {
        self.outcomes.push(ContainerOutcome {
            label,
            status: OutcomeStatus::Blocked { provider },
        });
    }

    /// The operation this batch performed.
    #[must_use]
    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// Outcomes in the order operations were issued.
    #[must_use]
    pub fn outcomes(&self) -> &[ContainerOutcome] {
        &self.outcomes
    }

    /// Returns whether every container completed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.outcomes
            .iter()
            .all(|outcome| matches!(outcome.status, OutcomeStatus::Completed))
    }

    /// Labels of containers whose operation failed.
    #[must_use]
    pub fn failed(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|outcome| matches!(outcome.status, OutcomeStatus::Failed { .. }))
            .map(|outcome| outcome.label.as_str())
            .collect()
    }

    /// `(label, provider)` pairs for containers skipped behind a failure.
    #[must_use]
    pub fn blocked(&self) -> Vec<(&str, &str)> {
        self.outcomes
            .iter()
            .filter_map(|outcome| match &outcome.status {
                OutcomeStatus::Blocked { provider } => {
                    Some((outcome.label.as_str(), provider.as_str()))
                }
                _ => None,
            })
            .collect()
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let completed = self
            .outcomes
            .iter()
            .filter(|o| matches!(o.status, OutcomeStatus::Completed))
            .count();
        write!(
            f,
            "{}: {completed} completed, {} failed, {} blocked",
            self.operation,
            self.failed().len(),
            self.blocked().len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_batch_is_complete() {
        let report = BatchReport::new(Operation::Start);
        assert!(report.is_complete());
        assert!(report.failed().is_empty());
    }

    #[test]
    fn failure_and_block_are_tallied() {
        let mut report = BatchReport::new(Operation::Start);
        report.record_completed("db".into());
        report.record_failed(
            "cache".into(),
            ConvoyError::Runtime {
                container: "cache".into(),
                operation: Operation::Create,
                message: "no such image".into(),
            },
        );
        report.record_blocked("web".into(), "cache".into());

        assert!(!report.is_complete());
        assert_eq!(report.failed(), vec!["cache"]);
        assert_eq!(report.blocked(), vec![("web", "cache")]);
        assert_eq!(report.to_string(), "start: 1 completed, 1 failed, 1 blocked");
    }

    #[test]
    fn outcomes_keep_issue_order() {
        let mut report = BatchReport::new(Operation::Stop);
        report.record_completed("web".into());
        report.record_completed("db".into());
        let labels: Vec<&str> = report.outcomes().iter().map(|o| o.label.as_str()).collect();
        assert_eq!(labels, vec!["web", "db"]);
    }
}
