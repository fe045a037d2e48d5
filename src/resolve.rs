//! Path resolution and normalization
//!
//! Turns raw path strings from tool inputs into canonical absolute paths:
//! relative paths are joined against the invocation's working directory,
//! symlinks are resolved when the filesystem cooperates, and everything is
//! normalized to forward slashes. Also detects the nearest enclosing
//! project root.

use std::path::{Component, Path, PathBuf};

/// Markers that identify a project root directory.
///
/// The nearest ancestor containing any of these wins.
pub const PROJECT_MARKERS: &[&str] = &[
    ".git",
    "package.json",
    "pyproject.toml",
    "Cargo.toml",
    "go.mod",
    "CLAUDE.md",
];

/// A resolved and normalized file path.
///
/// The empty value (all fields empty/None) is the result for empty input
/// and is not an error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedPath {
    /// Absolute path in platform-native form
    pub absolute_path: String,
    /// Absolute path with forward slashes, case preserved
    pub normalized_path: String,
    /// Nearest enclosing project root, normalized, if one was found
    pub project_root: Option<String>,
    /// Path relative to the project root, normalized, if inside it
    pub relative_to_project: Option<String>,
    /// Whether the path exists; None when the check itself failed
    pub exists: Option<bool>,
}

/// Convert a path string to Unix-style forward slashes.
///
/// UNC prefixes survive as `//server/share`. Case is preserved.
pub fn normalize_path(path: &str) -> String {
    path.replace('\\', "/")
}

/// Resolve and normalize a file path against an optional working directory.
///
/// Prefers the symlink-resolved canonical form; when canonicalization fails
/// (missing file, permission, broken symlink) it degrades to a purely
/// lexical cleanup of `.` and `..` components. Never returns an error.
pub fn resolve_path(path: &str, cwd: Option<&str>) -> ResolvedPath {
    if path.is_empty() {
        return ResolvedPath::default();
    }

    let mut joined = PathBuf::from(path);
    if joined.is_relative() {
        if let Some(cwd) = cwd {
            if !cwd.is_empty() {
                joined = Path::new(cwd).join(joined);
            }
        }
    }

    let exists = match joined.try_exists() {
        Ok(found) => Some(found),
        Err(_) => None,
    };

    let absolute = match dunce::canonicalize(&joined) {
        Ok(canonical) => canonical,
        Err(_) => {
            let cleaned = lexical_clean(&joined);
            if cleaned.is_relative() {
                match std::env::current_dir() {
                    Ok(current) => lexical_clean(&current.join(cleaned)),
                    Err(_) => cleaned,
                }
            } else {
                cleaned
            }
        }
    };

    let absolute_path = absolute.to_string_lossy().to_string();
    let normalized_path = normalize_path(&absolute_path);

    let project_root = detect_project_root(&absolute);
    let relative_to_project = project_root.as_ref().and_then(|root| {
        absolute
            .strip_prefix(root)
            .ok()
            .map(|rel| normalize_path(&rel.to_string_lossy()))
    });

    ResolvedPath {
        absolute_path,
        normalized_path,
        project_root: project_root.map(|root| normalize_path(&root.to_string_lossy())),
        relative_to_project,
        exists,
    }
}

/// Detect the nearest project root enclosing `path`.
///
/// Walks upward from the path's containing directory through parents,
/// stopping at the first ancestor holding any of [`PROJECT_MARKERS`].
pub fn detect_project_root(path: &Path) -> Option<PathBuf> {
    let start = if path.is_file() { path.parent()? } else { path };

    for ancestor in start.ancestors() {
        for marker in PROJECT_MARKERS {
            if ancestor.join(marker).exists() {
                return Some(ancestor.to_path_buf());
            }
        }
    }
    None
}

/// Resolve `.` and `..` components without touching the filesystem.
fn lexical_clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    let mut depth = 0usize;

    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                if depth > 0 {
                    out.pop();
                    depth -= 1;
                } else if !path.has_root() {
                    // Relative paths keep leading `..`; absolute ones drop it
                    out.push("..");
                }
            }
            Component::Normal(name) => {
                out.push(name);
                depth += 1;
            }
        }
    }
    out
}
