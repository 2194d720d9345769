//! The normalized container descriptor built from one service entry.

use std::collections::BTreeMap;

use convoy_common::naming;
use convoy_common::types::{ContainerHandle, ContainerState};
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

/// Build instructions for a service built from source rather than an image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildSpec {
    /// Build context directory.
    pub context: String,
    /// Dockerfile path, when not the context default.
    pub dockerfile: Option<String>,
}

/// Normalized attribute bag for one service of a compose project.
///
/// Field values are extracted leniently: the configuration format is
/// loosely typed, so wrong-shaped optional attributes are skipped rather
/// than rejected here. `image` and `build` may both be present; which one
/// wins at materialization time is the runtime client's decision, and the
/// absence of both surfaces as a create failure, not a load failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerDescriptor {
    /// Unique key within the graph, derived from the service name.
    pub label: String,
    /// Resolved host-side container name.
    pub name: String,
    /// Image reference, when declared.
    pub image: Option<String>,
    /// Build instructions, when declared. Takes precedence over `image`.
    pub build: Option<BuildSpec>,
    /// Port publications in canonical `host:container` form.
    pub ports: Vec<String>,
    /// Volume mount specifications.
    pub volumes: Vec<String>,
    /// Command override as a single joined string.
    pub command: Option<String>,
    /// Environment entries in `KEY=VALUE` form.
    pub environment: Vec<String>,
    /// Labels attached to the container.
    pub labels: BTreeMap<String, String>,
    /// Raw link declarations (`target` or `target:alias`).
    pub links: Vec<String>,
    /// Lifecycle state within the graph.
    pub state: ContainerState,
    /// Host handle, present only once materialized.
    pub handle: Option<ContainerHandle>,
    /// Whether this entry was recovered from live host state rather than
    /// configuration. Reconciled entries are exempt from link validation
    /// and contribute no link edges.
    pub reconciled: bool,
}

impl ContainerDescriptor {
    /// Creates an empty declared descriptor with a resolved name.
    #[must_use]
    pub fn new(label: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            name: name.into(),
            image: None,
            build: None,
            ports: Vec::new(),
            volumes: Vec::new(),
            command: None,
            environment: Vec::new(),
            labels: BTreeMap::new(),
            links: Vec::new(),
            state: ContainerState::Declared,
            handle: None,
            reconciled: false,
        }
    }

    /// Builds a descriptor from one service's raw attribute map.
    ///
    /// The container name is the declared `container_name` or, absent that,
    /// the `{project}_{label}_1` convention.
    #[must_use]
    pub fn from_service(project: &str, label: &str, attributes: &Mapping) -> Self {
        let name = attr(attributes, "container_name")
            .and_then(scalar_text)
            .unwrap_or_else(|| naming::container_name(project, label));

        let mut descriptor = Self::new(label, name);
        descriptor.image = attr(attributes, "image").and_then(scalar_text);
        descriptor.build = build_spec(attributes);
        descriptor.ports = attr(attributes, "ports").map(string_items).unwrap_or_default();
        descriptor.volumes = attr(attributes, "volumes").map(string_items).unwrap_or_default();
        descriptor.command = attr(attributes, "command").and_then(joined_command);
        descriptor.environment = attr(attributes, "environment")
            .map(environment_entries)
            .unwrap_or_default();
        descriptor.labels = attr(attributes, "labels").map(label_entries).unwrap_or_default();
        descriptor.links = attr(attributes, "links").map(string_items).unwrap_or_default();
        descriptor
    }

    /// Iterates the labels this container links to, aliases stripped.
    pub fn link_targets(&self) -> impl Iterator<Item = &str> {
        self.links
            .iter()
            .map(|raw| raw.split(':').next().unwrap_or(raw.as_str()))
    }
}

fn attr<'a>(attributes: &'a Mapping, key: &str) -> Option<&'a Value> {
    attributes
        .iter()
        .find(|(k, _)| k.as_str() == Some(key))
        .map(|(_, value)| value)
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

/// A sequence of scalars, or a lone scalar treated as a one-element list.
fn string_items(value: &Value) -> Vec<String> {
    match value {
        Value::Sequence(items) => items.iter().filter_map(scalar_text).collect(),
        other => scalar_text(other).into_iter().collect(),
    }
}

/// Command as a single string; array form is joined with spaces.
fn joined_command(value: &Value) -> Option<String> {
    match value {
        Value::Sequence(parts) => {
            let words: Vec<String> = parts.iter().filter_map(scalar_text).collect();
            if words.is_empty() {
                None
            } else {
                Some(words.join(" "))
            }
        }
        other => scalar_text(other),
    }
}

/// Environment in either mapping (`KEY: value`) or sequence (`KEY=VALUE`)
/// form, normalized to `KEY=VALUE` strings in document order.
fn environment_entries(value: &Value) -> Vec<String> {
    match value {
        Value::Mapping(entries) => entries
            .iter()
            .filter_map(|(key, item)| {
                let key = key.as_str()?;
                Some(format!("{key}={}", scalar_text(item).unwrap_or_default()))
            })
            .collect(),
        other => string_items(other),
    }
}

/// Labels in either mapping or `key=value` sequence form.
fn label_entries(value: &Value) -> BTreeMap<String, String> {
    match value {
        Value::Mapping(entries) => entries
            .iter()
            .filter_map(|(key, item)| {
                Some((key.as_str()?.to_string(), scalar_text(item).unwrap_or_default()))
            })
            .collect(),
        Value::Sequence(items) => items
            .iter()
            .filter_map(scalar_text)
            .filter_map(|entry| {
                entry
                    .split_once('=')
                    .map(|(key, val)| (key.to_string(), val.to_string()))
            })
            .collect(),
        _ => BTreeMap::new(),
    }
}

/// Build as a context string or a `{context, dockerfile}` mapping; a
/// v1-style top-level `dockerfile` key folds into the spec.
fn build_spec(attributes: &Mapping) -> Option<BuildSpec> {
    let top_level_dockerfile = attr(attributes, "dockerfile").and_then(scalar_text);
    match attr(attributes, "build")? {
        Value::String(context) => Some(BuildSpec {
            context: context.clone(),
            dockerfile: top_level_dockerfile,
        }),
        Value::Mapping(entries) => Some(BuildSpec {
            context: attr(entries, "context")
                .and_then(scalar_text)
                .unwrap_or_else(|| ".".to_string()),
            dockerfile: attr(entries, "dockerfile")
                .and_then(scalar_text)
                .or(top_level_dockerfile),
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(text: &str) -> Mapping {
        serde_yaml::from_str(text).expect("fixture should parse")
    }

    #[test]
    fn default_name_follows_project_convention() {
        let descriptor = ContainerDescriptor::from_service("myproj", "web", &attrs("image: nginx"));
        assert_eq!(descriptor.name, "myproj_web_1");
        assert_eq!(descriptor.label, "web");
        assert_eq!(descriptor.state, ContainerState::Declared);
        assert!(descriptor.handle.is_none());
    }

    #[test]
    fn container_name_overrides_convention() {
        let descriptor = ContainerDescriptor::from_service(
            "myproj",
            "web",
            &attrs("image: nginx\ncontainer_name: edge"),
        );
        assert_eq!(descriptor.name, "edge");
    }

    #[test]
    fn command_array_joins_to_single_string() {
        let as_array = ContainerDescriptor::from_service(
            "p",
            "app",
            &attrs("command: [bundle, exec, rails, s]"),
        );
        let as_string =
            ContainerDescriptor::from_service("p", "app", &attrs("command: bundle exec rails s"));
        assert_eq!(as_array.command.as_deref(), Some("bundle exec rails s"));
        assert_eq!(as_array.command, as_string.command);
    }

    #[test]
    fn environment_mapping_normalizes_to_key_value() {
        let from_map = ContainerDescriptor::from_service(
            "p",
            "db",
            &attrs("environment:\n  POSTGRES_USER: admin\n  POSTGRES_DB: app"),
        );
        let from_list = ContainerDescriptor::from_service(
            "p",
            "db",
            &attrs("environment:\n  - POSTGRES_USER=admin\n  - POSTGRES_DB=app"),
        );
        assert_eq!(from_map.environment, vec!["POSTGRES_USER=admin", "POSTGRES_DB=app"]);
        assert_eq!(from_map.environment, from_list.environment);
    }

    #[test]
    fn labels_accept_both_forms() {
        let from_map = ContainerDescriptor::from_service(
            "p",
            "web",
            &attrs("labels:\n  tier: frontend"),
        );
        let from_list = ContainerDescriptor::from_service(
            "p",
            "web",
            &attrs("labels:\n  - tier=frontend"),
        );
        assert_eq!(from_map.labels, from_list.labels);
        assert_eq!(from_map.labels.get("tier").map(String::as_str), Some("frontend"));
    }

    #[test]
    fn numeric_ports_coerce_to_strings() {
        let descriptor = ContainerDescriptor::from_service(
            "p",
            "web",
            &attrs("ports:\n  - 8080\n  - \"443:443\""),
        );
        assert_eq!(descriptor.ports, vec!["8080", "443:443"]);
    }

    #[test]
    fn link_targets_strip_aliases() {
        let descriptor = ContainerDescriptor::from_service(
            "p",
            "web",
            &attrs("links:\n  - db:database\n  - cache"),
        );
        let targets: Vec<&str> = descriptor.link_targets().collect();
        assert_eq!(targets, vec!["db", "cache"]);
    }

    #[test]
    fn build_string_takes_top_level_dockerfile() {
        let descriptor = ContainerDescriptor::from_service(
            "p",
            "app",
            &attrs("build: ./app\ndockerfile: Dockerfile.dev"),
        );
        let build = descriptor.build.expect("build should exist");
        assert_eq!(build.context, "./app");
        assert_eq!(build.dockerfile.as_deref(), Some("Dockerfile.dev"));
    }

    #[test]
    fn build_mapping_carries_its_own_dockerfile() {
        let descriptor = ContainerDescriptor::from_service(
            "p",
            "app",
            &attrs("build:\n  context: ./app\n  dockerfile: Dockerfile.ci"),
        );
        let build = descriptor.build.expect("build should exist");
        assert_eq!(build.context, "./app");
        assert_eq!(build.dockerfile.as_deref(), Some("Dockerfile.ci"));
    }

    #[test]
    fn image_and_build_may_coexist() {
        let descriptor = ContainerDescriptor::from_service(
            "p",
            "app",
            &attrs("image: registry/app\nbuild: ."),
        );
        assert!(descriptor.image.is_some());
        assert!(descriptor.build.is_some());
    }

    #[test]
    fn wrong_shaped_optional_fields_are_skipped() {
        let descriptor = ContainerDescriptor::from_service(
            "p",
            "odd",
            &attrs("image: [not, a, scalar]\nports: {}\nlinks: solo"),
        );
        assert!(descriptor.image.is_none());
        assert!(descriptor.ports.is_empty());
        assert_eq!(descriptor.links, vec!["solo"]);
    }
}
