//! Access vocabulary - how a tool touched a file
//!
//! Every file access reduces to five modes:
//! - `Read`: content was read (Read tool, cat, cp source)
//! - `Write`: content was created or destroyed (Write tool, touch, rm)
//! - `Modify`: content or metadata changed in place (Edit tools, mv, chmod)
//! - `Search`: the file surfaced through a listing or pattern match
//! - `Execute`: the file ran as a program or script

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Classification of how a tool touched a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessMode {
    /// File content was read
    Read,
    /// File was created, overwritten, or deleted
    Write,
    /// File content or metadata changed in place
    Modify,
    /// File surfaced through a listing or pattern match
    Search,
    /// File was executed
    Execute,
}

impl AccessMode {
    /// Get the string representation of the access mode
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessMode::Read => "read",
            AccessMode::Write => "write",
            AccessMode::Modify => "modify",
            AccessMode::Search => "search",
            AccessMode::Execute => "execute",
        }
    }

    /// Get all access modes
    pub fn all() -> &'static [AccessMode] {
        &[
            AccessMode::Read,
            AccessMode::Write,
            AccessMode::Modify,
            AccessMode::Search,
            AccessMode::Execute,
        ]
    }

    /// Name of the per-mode counter column on a file node
    pub fn counter_column(&self) -> &'static str {
        match self {
            AccessMode::Read => "read_count",
            AccessMode::Write => "write_count",
            AccessMode::Modify => "modify_count",
            AccessMode::Search => "search_count",
            AccessMode::Execute => "execute_count",
        }
    }
}

impl Default for AccessMode {
    fn default() -> Self {
        AccessMode::Read
    }
}

impl FromStr for AccessMode {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "read" => Ok(AccessMode::Read),
            "write" => Ok(AccessMode::Write),
            "modify" => Ok(AccessMode::Modify),
            "search" => Ok(AccessMode::Search),
            "execute" => Ok(AccessMode::Execute),
            _ => Err(crate::Error::InvalidAccessMode(s.to_string())),
        }
    }
}

impl std::fmt::Display for AccessMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Tool identity as far as file extraction is concerned.
///
/// Tools outside this set never contribute file accesses; their events are
/// still logged, just with no access rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    Read,
    Write,
    Edit,
    MultiEdit,
    NotebookEdit,
    Glob,
    Grep,
    Bash,
    BashOutput,
    Other,
}

impl ToolKind {
    /// Map a tool name to its kind; unrecognized names become `Other`
    pub fn from_name(name: &str) -> ToolKind {
        match name {
            "Read" => ToolKind::Read,
            "Write" => ToolKind::Write,
            "Edit" => ToolKind::Edit,
            "MultiEdit" => ToolKind::MultiEdit,
            "NotebookEdit" => ToolKind::NotebookEdit,
            "Glob" => ToolKind::Glob,
            "Grep" => ToolKind::Grep,
            "Bash" => ToolKind::Bash,
            "BashOutput" => ToolKind::BashOutput,
            _ => ToolKind::Other,
        }
    }

    /// Tools whose input names a single target file
    pub fn is_direct(&self) -> bool {
        matches!(
            self,
            ToolKind::Read
                | ToolKind::Write
                | ToolKind::Edit
                | ToolKind::MultiEdit
                | ToolKind::NotebookEdit
        )
    }

    /// Pattern-matching tools whose output reveals additional files
    pub fn is_search(&self) -> bool {
        matches!(self, ToolKind::Glob | ToolKind::Grep)
    }

    /// Shell-execution tools whose command text must be parsed
    pub fn is_shell(&self) -> bool {
        matches!(self, ToolKind::Bash | ToolKind::BashOutput)
    }

    /// The fixed access mode this tool implies, if it has one
    pub fn fixed_access_mode(&self) -> Option<AccessMode> {
        match self {
            ToolKind::Read => Some(AccessMode::Read),
            ToolKind::Write => Some(AccessMode::Write),
            ToolKind::Edit | ToolKind::MultiEdit | ToolKind::NotebookEdit => {
                Some(AccessMode::Modify)
            }
            ToolKind::Glob | ToolKind::Grep => Some(AccessMode::Search),
            ToolKind::Bash | ToolKind::BashOutput => Some(AccessMode::Execute),
            ToolKind::Other => None,
        }
    }
}

/// Canonical file-access extraction result for one tool invocation.
///
/// All paths have passed through the resolver: normalized, forward-slash,
/// absolute where resolution was possible. An empty result (no primary, no
/// related paths) is the normal outcome for tools that touch no files.
#[derive(Debug, Clone, Default)]
pub struct FileAccessResult {
    /// The main target of the tool call
    pub primary_path: Option<String>,
    /// Additional files discovered indirectly (pattern expansion, extra
    /// command arguments)
    pub related_paths: Vec<String>,
    /// How the primary target was touched
    pub access_mode: AccessMode,
    /// Project root enclosing the primary path, if one was found
    pub project_root: Option<String>,
    /// True when the related paths came from glob-style output expansion
    pub is_glob_expansion: bool,
    /// Line numbers per path, for match-style output that carries them
    pub line_numbers: BTreeMap<String, Vec<u32>>,
}

impl FileAccessResult {
    /// True when no file was touched at all
    pub fn is_empty(&self) -> bool {
        self.primary_path.is_none() && self.related_paths.is_empty()
    }

    /// All accessed paths, primary first
    pub fn all_paths(&self) -> Vec<&str> {
        let mut paths = Vec::with_capacity(1 + self.related_paths.len());
        if let Some(p) = &self.primary_path {
            paths.push(p.as_str());
        }
        paths.extend(self.related_paths.iter().map(|p| p.as_str()));
        paths
    }
}
