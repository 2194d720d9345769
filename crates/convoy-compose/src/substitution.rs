//! Environment placeholder substitution over parsed configuration trees.
//!
//! Rewrites every scalar string containing `${VAR}` or `${VAR:-default}`
//! against an explicit environment map. The walk visits mappings and
//! sequences top-to-bottom, left-to-right in document order, so the first
//! failing placeholder is reproducible for identical inputs.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use convoy_common::error::{ConvoyError, Result};
use serde_yaml::{Mapping, Value};

/// Environment consulted during substitution.
pub type Environment = BTreeMap<String, String>;

/// Captures the current process environment.
#[must_use]
pub fn process_environment() -> Environment {
    std::env::vars().collect()
}

/// Rewrites placeholders in an entire configuration tree.
///
/// The input is never mutated; identical tree and environment always yield
/// an identical output tree or the identical first error. Substitution is
/// idempotent on its own output.
///
/// # Errors
///
/// Returns [`ConvoyError::BadSubstitution`] for the first placeholder whose
/// variable is unset and has no default clause, naming the variable and its
/// location in the tree.
pub fn substitute_tree(value: &Value, env: &Environment) -> Result<Value> {
    let mut path = Vec::new();
    walk(value, env, &mut path)
}

enum Segment {
    Key(String),
    Index(usize),
}

fn walk(value: &Value, env: &Environment, path: &mut Vec<Segment>) -> Result<Value> {
    match value {
        Value::String(text) => Ok(Value::String(expand(text, env, path)?)),
        Value::Sequence(items) => {
            let mut out = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                path.push(Segment::Index(index));
                let rewritten = walk(item, env, path);
                let _ = path.pop();
                out.push(rewritten?);
            }
            Ok(Value::Sequence(out))
        }
        Value::Mapping(entries) => {
            let mut out = Mapping::new();
            for (key, item) in entries {
                path.push(Segment::Key(key_text(key)));
                let rewritten = walk(item, env, path);
                let _ = path.pop();
                let _ = out.insert(key.clone(), rewritten?);
            }
            Ok(Value::Mapping(out))
        }
        other => Ok(other.clone()),
    }
}

/// Expands every placeholder in one scalar string.
///
/// An opening `${` without a closing `}` is not a placeholder and stays
/// verbatim.
fn expand(text: &str, env: &Environment, path: &[Segment]) -> Result<String> {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let tail = &rest[start + 2..];
        let Some(end) = tail.find('}') else {
            out.push_str(&rest[start..]);
            return Ok(out);
        };
        out.push_str(&resolve(&tail[..end], env, path)?);
        rest = &tail[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

fn resolve(token: &str, env: &Environment, path: &[Segment]) -> Result<String> {
    let (variable, default) = token
        .split_once(":-")
        .map_or((token, None), |(name, default)| (name, Some(default)));

    if let Some(value) = env.get(variable) {
        return Ok(value.clone());
    }
    default
        .map(str::to_string)
        .ok_or_else(|| ConvoyError::BadSubstitution {
            variable: variable.to_string(),
            location: location(path),
        })
}

fn key_text(key: &Value) -> String {
    match key {
        Value::String(text) => text.clone(),
        other => serde_yaml::to_string(other)
            .map_or_else(|_| "?".to_string(), |text| text.trim_end().to_string()),
    }
}

fn location(path: &[Segment]) -> String {
    if path.is_empty() {
        return "(document root)".to_string();
    }
    let mut out = String::new();
    for segment in path {
        match segment {
            Segment::Key(key) => {
                if !out.is_empty() {
                    out.push('.');
                }
                out.push_str(key);
            }
            Segment::Index(index) => {
                let _ = write!(out, "[{index}]");
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> Environment {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    fn yaml(text: &str) -> Value {
        serde_yaml::from_str(text).expect("fixture should parse")
    }

    #[test]
    fn set_variable_is_substituted() {
        let tree = yaml("image: ${IMAGE}");
        let out = substitute_tree(&tree, &env(&[("IMAGE", "alpine")])).expect("should substitute");
        assert_eq!(out, yaml("image: alpine"));
    }

    #[test]
    fn default_applies_when_unset() {
        let tree = yaml("image: ${IMAGE:-nginx}");
        let out = substitute_tree(&tree, &env(&[])).expect("should substitute");
        assert_eq!(out, yaml("image: nginx"));
    }

    #[test]
    fn environment_wins_over_default() {
        let tree = yaml("image: ${IMAGE:-nginx}");
        let out = substitute_tree(&tree, &env(&[("IMAGE", "redis")])).expect("should substitute");
        assert_eq!(out, yaml("image: redis"));
    }

    #[test]
    fn unset_without_default_fails_naming_variable() {
        let tree = yaml("web:\n  ports:\n    - ${DOCKER_PORT_1}:80");
        let err = substitute_tree(&tree, &env(&[])).unwrap_err();
        match err {
            ConvoyError::BadSubstitution { variable, location } => {
                assert_eq!(variable, "DOCKER_PORT_1");
                assert_eq!(location, "web.ports[0]");
            }
            other => panic!("expected BadSubstitution, got {other}"),
        }
    }

    #[test]
    fn first_error_follows_document_order() {
        let tree = yaml("a: ${FIRST}\nb: ${SECOND}");
        let err = substitute_tree(&tree, &env(&[])).unwrap_err();
        match err {
            ConvoyError::BadSubstitution { variable, .. } => assert_eq!(variable, "FIRST"),
            other => panic!("expected BadSubstitution, got {other}"),
        }
    }

    #[test]
    fn multiple_placeholders_in_one_scalar() {
        let tree = yaml("url: ${HOST}:${PORT:-5432}/app");
        let out = substitute_tree(&tree, &env(&[("HOST", "db")])).expect("should substitute");
        assert_eq!(out, yaml("url: db:5432/app"));
    }

    #[test]
    fn substitution_is_idempotent() {
        let tree = yaml("cmd: ping ${TARGET:-localhost}");
        let environment = env(&[("TARGET", "gateway")]);
        let once = substitute_tree(&tree, &environment).expect("first pass");
        let twice = substitute_tree(&once, &environment).expect("second pass");
        assert_eq!(once, twice);
    }

    #[test]
    fn non_string_scalars_pass_through() {
        let tree = yaml("replicas: 3\nenabled: true\nnothing: null");
        let out = substitute_tree(&tree, &env(&[])).expect("should substitute");
        assert_eq!(out, tree);
    }

    #[test]
    fn unterminated_placeholder_stays_verbatim() {
        let tree = yaml("cmd: 'echo ${OOPS'");
        let out = substitute_tree(&tree, &env(&[])).expect("should substitute");
        assert_eq!(out, yaml("cmd: 'echo ${OOPS'"));
    }

    #[test]
    fn empty_default_is_allowed() {
        let tree = yaml("suffix: a${GONE:-}b");
        let out = substitute_tree(&tree, &env(&[])).expect("should substitute");
        assert_eq!(out, yaml("suffix: ab"));
    }
}
