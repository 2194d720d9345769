//! Compose configuration loading.
//!
//! Reads a compose document from disk, applies placeholder substitution to
//! the entire document, and exposes the per-service raw attribute maps.
//! No semantic validation of field values happens here; that is the
//! descriptor's job.

use std::path::Path;

use convoy_common::error::{ConvoyError, Result};
use serde_yaml::{Mapping, Value};

use crate::substitution::{self, Environment};

/// A compose document after placeholder substitution.
///
/// Service entries keep their declaration order; downstream ordering
/// guarantees depend on it.
#[derive(Debug, Clone)]
pub struct ComposeConfig {
    services: Mapping,
}

impl ComposeConfig {
    /// Loads a compose document, substituting against the process
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConvoyError::ConfigNotFound`] if the path does not exist,
    /// [`ConvoyError::Io`] / [`ConvoyError::Parse`] for unreadable or
    /// malformed documents, and any substitution failure.
    pub fn load(path: &Path) -> Result<Self> {
        Self::load_with_env(path, &substitution::process_environment())
    }

    /// Loads a compose document against an explicit environment map.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`ComposeConfig::load`].
    pub fn load_with_env(path: &Path, env: &Environment) -> Result<Self> {
        if !path.exists() {
            return Err(ConvoyError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }
        let text = std::fs::read_to_string(path).map_err(|source| ConvoyError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "parsing compose document");
        Self::from_document(&text, env)
    }

    /// Parses a compose document from its source text.
    ///
    /// Substitution runs over the whole document before the service section
    /// is extracted, so placeholders anywhere in the tree are resolved.
    ///
    /// # Errors
    ///
    /// Returns a parse, document-shape, or substitution error.
    pub fn from_document(document: &str, env: &Environment) -> Result<Self> {
        let raw: Value = serde_yaml::from_str(document)?;
        let substituted = substitution::substitute_tree(&raw, env)?;
        let services = extract_services(&substituted)?;
        tracing::info!(services = services.len(), "compose document loaded");
        Ok(Self { services })
    }

    /// Returns the raw service mapping in declaration order.
    #[must_use]
    pub fn services(&self) -> &Mapping {
        &self.services
    }

    /// Returns `(label, attributes)` per service in declaration order.
    ///
    /// A service entry whose value is not a mapping surfaces with an empty
    /// attribute map; the descriptor layer decides what that means.
    #[must_use]
    pub fn service_entries(&self) -> Vec<(String, Mapping)> {
        self.services
            .iter()
            .filter_map(|(key, value)| {
                let label = key.as_str()?.to_string();
                let attributes = value.as_mapping().cloned().unwrap_or_default();
                Some((label, attributes))
            })
            .collect()
    }
}

/// Pulls the service mapping out of either document shape: a `services:`
/// section, or a bare top-level mapping of services with an optional
/// `version` key.
fn extract_services(document: &Value) -> Result<Mapping> {
    let Value::Mapping(top) = document else {
        return Err(ConvoyError::Document {
            message: "compose document root must be a mapping".into(),
        });
    };

    if let Some((_, section)) = top.iter().find(|(key, _)| key.as_str() == Some("services")) {
        return match section {
            Value::Mapping(services) => Ok(services.clone()),
            _ => Err(ConvoyError::Document {
                message: "services section must be a mapping".into(),
            }),
        };
    }

    Ok(top
        .iter()
        .filter(|(key, _)| key.as_str() != Some("version"))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect())
}
