//! File-access extraction - one canonical result per tool invocation
//!
//! Dispatches on tool identity:
//! - direct-path tools name their target in the input
//! - search tools reveal extra files through their output
//! - shell tools need their command text parsed
//!
//! Every path in a result has passed through the resolver. Unknown tools
//! and malformed inputs produce an empty result, never an error.

use serde_json::{Map, Value};

use crate::access::{AccessMode, FileAccessResult, ToolKind};
use crate::command::CommandPathParser;
use crate::event::ToolOutput;
use crate::output::{parse_list_output, parse_match_output};
use crate::resolve::resolve_path;

/// Extracts file accesses from tool invocations.
pub struct Extractor {
    commands: CommandPathParser,
}

impl Extractor {
    /// Create an extractor with the built-in command table
    pub fn new() -> Self {
        Self {
            commands: CommandPathParser::new(),
        }
    }

    /// Extract all file paths touched by one tool invocation.
    pub fn extract(
        &self,
        tool_name: &str,
        tool_input: &Map<String, Value>,
        tool_output: Option<&ToolOutput>,
        cwd: Option<&str>,
    ) -> FileAccessResult {
        let kind = ToolKind::from_name(tool_name);

        if kind.is_direct() {
            self.extract_direct(kind, tool_input, cwd)
        } else if kind.is_search() {
            self.extract_search(kind, tool_input, tool_output, cwd)
        } else if kind.is_shell() {
            self.extract_shell(tool_input, cwd)
        } else {
            FileAccessResult::default()
        }
    }

    fn extract_direct(
        &self,
        kind: ToolKind,
        tool_input: &Map<String, Value>,
        cwd: Option<&str>,
    ) -> FileAccessResult {
        let mut result = FileAccessResult {
            access_mode: kind.fixed_access_mode().unwrap_or_default(),
            ..Default::default()
        };

        let target = string_field(tool_input, "file_path")
            .or_else(|| string_field(tool_input, "filePath"));
        if let Some(target) = target {
            let resolved = resolve_path(target, cwd);
            if !resolved.normalized_path.is_empty() {
                result.primary_path = Some(resolved.normalized_path);
                result.project_root = resolved.project_root;
            }
        }
        result
    }

    fn extract_search(
        &self,
        kind: ToolKind,
        tool_input: &Map<String, Value>,
        tool_output: Option<&ToolOutput>,
        cwd: Option<&str>,
    ) -> FileAccessResult {
        let mut result = FileAccessResult {
            access_mode: AccessMode::Search,
            ..Default::default()
        };

        // Primary is the search base: the path input, or the cwd
        let base = string_field(tool_input, "path").or(cwd);
        if let Some(base) = base {
            let resolved = resolve_path(base, cwd);
            if !resolved.normalized_path.is_empty() {
                result.primary_path = Some(resolved.normalized_path);
                result.project_root = resolved.project_root;
            }
        }

        let Some(text) = tool_output.map(ToolOutput::primary_text) else {
            return result;
        };
        if text.is_empty() {
            return result;
        }

        // Relative paths in search output are relative to the search base
        let base = result.primary_path.clone();
        let base = base.as_deref().or(cwd);

        match kind {
            ToolKind::Glob => {
                for line in parse_list_output(text) {
                    let resolved = resolve_path(&line, base);
                    if !resolved.normalized_path.is_empty() {
                        result.related_paths.push(resolved.normalized_path);
                    }
                }
                result.is_glob_expansion = !result.related_paths.is_empty();
            }
            ToolKind::Grep => {
                for found in parse_match_output(text) {
                    let resolved = resolve_path(&found.file_path, base);
                    if resolved.normalized_path.is_empty() {
                        continue;
                    }
                    if let Some(line) = found.line_number {
                        result
                            .line_numbers
                            .entry(resolved.normalized_path.clone())
                            .or_default()
                            .push(line);
                    }
                    result.related_paths.push(resolved.normalized_path);
                }
            }
            _ => {}
        }

        result
    }

    fn extract_shell(
        &self,
        tool_input: &Map<String, Value>,
        cwd: Option<&str>,
    ) -> FileAccessResult {
        let mut result = FileAccessResult {
            access_mode: AccessMode::Execute,
            ..Default::default()
        };

        let Some(command) = string_field(tool_input, "command") else {
            return result;
        };
        let entries = self.commands.parse(command);
        if entries.is_empty() {
            return result;
        }

        // First source entry becomes the primary target
        for entry in &entries {
            if !entry.is_source {
                continue;
            }
            let resolved = resolve_path(&entry.path, cwd);
            if resolved.normalized_path.is_empty() {
                continue;
            }
            result.primary_path = Some(resolved.normalized_path);
            result.project_root = resolved.project_root;
            result.access_mode = entry.op.access_mode();
            break;
        }

        // Every other distinct resolved path is related
        for entry in &entries {
            let resolved = resolve_path(&entry.path, cwd);
            let normalized = resolved.normalized_path;
            if normalized.is_empty()
                || result.primary_path.as_deref() == Some(&normalized)
                || result.related_paths.iter().any(|p| p == &normalized)
            {
                continue;
            }
            result.related_paths.push(normalized);
        }

        result
    }
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new()
    }
}

fn string_field<'a>(input: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    input.get(key).and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn input(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn test_direct_tools_have_fixed_modes() {
        let extractor = Extractor::new();
        let cases = [
            ("Read", AccessMode::Read),
            ("Write", AccessMode::Write),
            ("Edit", AccessMode::Modify),
            ("MultiEdit", AccessMode::Modify),
            ("NotebookEdit", AccessMode::Modify),
        ];

        for (tool, mode) in cases {
            let result = extractor.extract(
                tool,
                &input(json!({"file_path": "/work/app/main.py"})),
                None,
                None,
            );
            assert_eq!(result.access_mode, mode, "tool {tool}");
            assert_eq!(result.primary_path.as_deref(), Some("/work/app/main.py"));
            assert!(result.related_paths.is_empty());
        }
    }

    #[test]
    fn test_direct_tool_camel_case_input() {
        let extractor = Extractor::new();
        let result = extractor.extract("Write", &input(json!({"filePath": "/w/x.rs"})), None, None);
        assert_eq!(result.primary_path.as_deref(), Some("/w/x.rs"));
    }

    #[test]
    fn test_glob_expansion_scenario() {
        let extractor = Extractor::new();
        let output = ToolOutput::Text("a.py\nb.py\nc.py".to_string());
        let result = extractor.extract(
            "Glob",
            &input(json!({"path": "/p", "pattern": "*.py"})),
            Some(&output),
            None,
        );

        assert_eq!(result.primary_path.as_deref(), Some("/p"));
        assert_eq!(result.access_mode, AccessMode::Search);
        assert!(result.is_glob_expansion);
        assert_eq!(
            result.related_paths,
            vec!["/p/a.py", "/p/b.py", "/p/c.py"]
        );
    }

    #[test]
    fn test_glob_without_output_is_not_expansion() {
        let extractor = Extractor::new();
        let result = extractor.extract("Glob", &input(json!({"path": "/p"})), None, None);
        assert_eq!(result.primary_path.as_deref(), Some("/p"));
        assert!(!result.is_glob_expansion);
        assert!(result.related_paths.is_empty());
    }

    #[test]
    fn test_search_base_falls_back_to_cwd() {
        let extractor = Extractor::new();
        let result = extractor.extract(
            "Grep",
            &input(json!({"pattern": "fn main"})),
            None,
            Some("/repo"),
        );
        assert_eq!(result.primary_path.as_deref(), Some("/repo"));
        assert_eq!(result.access_mode, AccessMode::Search);
    }

    #[test]
    fn test_grep_records_line_numbers() {
        let extractor = Extractor::new();
        let output = ToolOutput::Text("main.py:10:def main():\nutil.py\n".to_string());
        let result = extractor.extract(
            "Grep",
            &input(json!({"path": "/src", "pattern": "def"})),
            Some(&output),
            None,
        );

        assert_eq!(result.related_paths, vec!["/src/main.py", "/src/util.py"]);
        assert!(!result.is_glob_expansion);
        assert_eq!(result.line_numbers["/src/main.py"], vec![10]);
        assert!(!result.line_numbers.contains_key("/src/util.py"));
    }

    #[test]
    fn test_shell_move_scenario() {
        let extractor = Extractor::new();
        let result = extractor.extract(
            "Bash",
            &input(json!({"command": "mv old.py new.py"})),
            None,
            Some("/repo"),
        );

        assert_eq!(result.primary_path.as_deref(), Some("/repo/old.py"));
        assert_eq!(result.access_mode, AccessMode::Modify);
        assert_eq!(result.related_paths, vec!["/repo/new.py"]);
    }

    #[test]
    fn test_shell_delete_maps_to_write() {
        let extractor = Extractor::new();
        let result = extractor.extract(
            "Bash",
            &input(json!({"command": "rm -f /tmp/scratch.txt"})),
            None,
            None,
        );
        assert_eq!(result.primary_path.as_deref(), Some("/tmp/scratch.txt"));
        assert_eq!(result.access_mode, AccessMode::Write);
    }

    #[test]
    fn test_shell_unmatched_command_is_empty() {
        let extractor = Extractor::new();
        let result = extractor.extract(
            "Bash",
            &input(json!({"command": "cargo build --release"})),
            None,
            None,
        );
        assert!(result.is_empty());
        assert_eq!(result.access_mode, AccessMode::Execute);
    }

    #[test]
    fn test_unknown_tool_is_empty() {
        let extractor = Extractor::new();
        let result = extractor.extract(
            "WebFetch",
            &input(json!({"url": "https://example.com"})),
            None,
            None,
        );
        assert!(result.is_empty());
    }

    #[test]
    fn test_missing_input_fields_are_empty() {
        let extractor = Extractor::new();
        assert!(extractor
            .extract("Read", &Map::new(), None, None)
            .is_empty());
        assert!(extractor
            .extract("Bash", &Map::new(), None, None)
            .is_empty());
    }
}
