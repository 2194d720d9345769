//! Project naming convention for containers managed by Convoy.
//!
//! Containers belonging to a project are named `{project}_{label}_{n}`.
//! The project name defaults to the current working directory's name,
//! reduced to lowercase alphanumerics.

/// Separator between the project, label, and instance segments of a name.
pub const NAME_SEPARATOR: char = '_';

/// Instance number assigned to the single container of a service.
pub const DEFAULT_INSTANCE: u32 = 1;

/// Fallback project name when the working directory yields nothing usable.
pub const DEFAULT_PROJECT: &str = "default";

/// Composes the host-side container name for a service of a project.
#[must_use]
pub fn container_name(project: &str, label: &str) -> String {
    format!("{project}{NAME_SEPARATOR}{label}{NAME_SEPARATOR}{DEFAULT_INSTANCE}")
}

/// Returns the name prefix matching every container of a project.
#[must_use]
pub fn project_prefix(project: &str) -> String {
    format!("{project}{NAME_SEPARATOR}")
}

/// Recovers the service label from a host-side container name.
///
/// The host may report names with a leading slash (`/myproj_web_1`); the
/// label is the second `_`-separated segment. Returns `None` when the name
/// does not follow the project naming convention.
#[must_use]
pub fn service_label(container_name: &str) -> Option<String> {
    let trimmed = container_name.trim_start_matches('/');
    let label = trimmed.split(NAME_SEPARATOR).nth(1)?;
    if label.is_empty() {
        return None;
    }
    Some(label.to_string())
}

/// Derives the active project name from the current working directory.
///
/// Falls back to [`DEFAULT_PROJECT`] when the directory name is unavailable
/// or sanitizes to an empty string.
#[must_use]
pub fn current_project_name() -> String {
    std::env::current_dir()
        .ok()
        .and_then(|dir| dir.file_name().map(|n| n.to_string_lossy().into_owned()))
        .map(|name| sanitize(&name))
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| DEFAULT_PROJECT.to_string())
}

/// Reduces a raw directory name to the character set used in container names.
#[must_use]
pub fn sanitize(name: &str) -> String {
    name.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn container_name_follows_convention() {
        assert_eq!(container_name("myproj", "web"), "myproj_web_1");
    }

    #[test]
    fn project_prefix_ends_with_separator() {
        assert_eq!(project_prefix("myproj"), "myproj_");
    }

    #[test]
    fn service_label_parses_plain_name() {
        assert_eq!(service_label("myproj_web_1").as_deref(), Some("web"));
    }

    #[test]
    fn service_label_strips_leading_slash() {
        assert_eq!(service_label("/myproj_db_1").as_deref(), Some("db"));
    }

    #[test]
    fn service_label_rejects_unconventional_names() {
        assert_eq!(service_label("standalone"), None);
        assert_eq!(service_label("trailing_"), None);
    }

    #[test]
    fn sanitize_lowercases_and_drops_symbols() {
        assert_eq!(sanitize("My-Project.2"), "myproject2");
        assert_eq!(sanitize("---"), "");
    }
}
