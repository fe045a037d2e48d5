//! Hook event input boundary
//!
//! One JSON object arrives per tool invocation. The duck-typed pieces of
//! that payload (tool output as string-or-map, camelCase/snake_case field
//! aliases) are normalized here, before any extraction logic runs.

use chrono::Utc;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::access::ToolKind;

/// Keys whose values are masked before an event is persisted.
const SENSITIVE_KEYS: &[&str] = &[
    "password",
    "api_key",
    "token",
    "secret",
    "auth",
    "credential",
    "key",
];

/// Keywords that mark a tool output as failed.
const ERROR_KEYWORDS: &[&str] = &["error", "failed", "exception", "traceback", "fatal", "denied"];

/// Tool output, normalized into an explicit sum type.
///
/// Downstream code never sees the raw duck-typed shape.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ToolOutput {
    /// Plain text output
    Text(String),
    /// Structured output from shell-like tools
    Structured {
        #[serde(default)]
        stdout: Option<String>,
        #[serde(default)]
        stderr: Option<String>,
        #[serde(default)]
        interrupted: bool,
    },
    /// Any other JSON shape; carried for the raw log, contributes no paths
    Other(Value),
}

impl ToolOutput {
    /// The text that carries file paths: the plain text itself, or stdout
    pub fn primary_text(&self) -> &str {
        match self {
            ToolOutput::Text(text) => text,
            ToolOutput::Structured { stdout, .. } => stdout.as_deref().unwrap_or(""),
            ToolOutput::Other(_) => "",
        }
    }

    /// Approximate output size in bytes
    pub fn size_bytes(&self) -> usize {
        match self {
            ToolOutput::Text(text) => text.len(),
            ToolOutput::Structured { stdout, stderr, .. } => {
                stdout.as_deref().map_or(0, str::len) + stderr.as_deref().map_or(0, str::len)
            }
            ToolOutput::Other(value) => value.to_string().len(),
        }
    }
}

/// One tool-use event from the assistant CLI.
///
/// Unknown fields are tolerated; missing fields degrade to defaults rather
/// than failing deserialization.
#[derive(Debug, Clone, Deserialize)]
pub struct HookEvent {
    #[serde(default = "default_session_id", alias = "sessionId")]
    pub session_id: String,
    #[serde(default, alias = "toolName")]
    pub tool_name: String,
    #[serde(default, alias = "toolInput")]
    pub tool_input: Map<String, Value>,
    #[serde(default, alias = "toolOutput", alias = "tool_response")]
    pub tool_output: Option<ToolOutput>,
    #[serde(default)]
    pub cwd: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

fn default_session_id() -> String {
    "unknown".to_string()
}

impl HookEvent {
    /// Parse one event from its JSON text
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// The event's timestamp in RFC 3339 form.
    ///
    /// Uses the caller-supplied timestamp when it parses; falls back to now.
    pub fn effective_timestamp(&self) -> String {
        if let Some(raw) = &self.timestamp {
            if let Ok(parsed) = chrono::DateTime::parse_from_rfc3339(raw) {
                return parsed.to_rfc3339();
            }
        }
        Utc::now().to_rfc3339()
    }

    /// First line of a shell command, truncated for the event row
    pub fn command_summary(&self) -> Option<String> {
        if !ToolKind::from_name(&self.tool_name).is_shell() {
            return None;
        }
        let command = self.tool_input.get("command")?.as_str()?;
        let first = command.lines().next()?.trim();
        if first.is_empty() {
            return None;
        }
        Some(first.chars().take(200).collect())
    }

    /// Search pattern for pattern-matching tools
    pub fn search_pattern(&self) -> Option<String> {
        if !ToolKind::from_name(&self.tool_name).is_search() {
            return None;
        }
        Some(self.tool_input.get("pattern")?.as_str()?.to_string())
    }

    /// The raw event payload with sensitive input values masked,
    /// serialized for the append-only log
    pub fn sanitized_json(&self) -> crate::Result<String> {
        let mut payload = Map::new();
        payload.insert("session_id".into(), Value::String(self.session_id.clone()));
        payload.insert("tool_name".into(), Value::String(self.tool_name.clone()));
        payload.insert(
            "tool_input".into(),
            Value::Object(sanitize_tool_input(&self.tool_input)),
        );
        if let Some(cwd) = &self.cwd {
            payload.insert("cwd".into(), Value::String(cwd.clone()));
        }
        if let Some(output) = &self.tool_output {
            let value = match output {
                ToolOutput::Text(text) => Value::String(text.clone()),
                ToolOutput::Structured {
                    stdout,
                    stderr,
                    interrupted,
                } => {
                    let mut map = Map::new();
                    if let Some(stdout) = stdout {
                        map.insert("stdout".into(), Value::String(stdout.clone()));
                    }
                    if let Some(stderr) = stderr {
                        map.insert("stderr".into(), Value::String(stderr.clone()));
                    }
                    map.insert("interrupted".into(), Value::Bool(*interrupted));
                    Value::Object(map)
                }
                ToolOutput::Other(value) => value.clone(),
            };
            payload.insert("tool_output".into(), value);
        }
        Ok(serde_json::to_string(&Value::Object(payload))?)
    }
}

/// Outcome analysis of a tool invocation's output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputAnalysis {
    pub success: bool,
    pub error_message: Option<String>,
    pub has_stderr: bool,
    pub was_interrupted: bool,
}

/// Analyze a tool output for success/failure.
///
/// Absent output counts as success; keyword matches in the combined output
/// flip it to failure, preferring stderr for the error message.
pub fn analyze_output(output: Option<&ToolOutput>) -> OutputAnalysis {
    let Some(output) = output else {
        return OutputAnalysis {
            success: true,
            ..Default::default()
        };
    };

    match output {
        ToolOutput::Text(text) => {
            let has_error = contains_error_keyword(text);
            OutputAnalysis {
                success: !has_error,
                error_message: has_error.then(|| truncate(text, 500)),
                has_stderr: false,
                was_interrupted: false,
            }
        }
        ToolOutput::Structured {
            stdout,
            stderr,
            interrupted,
        } => {
            let stdout = stdout.as_deref().unwrap_or("");
            let stderr = stderr.as_deref().unwrap_or("");
            let has_stderr = !stderr.trim().is_empty();
            let combined = format!("{stdout} {stderr}");
            let has_error = contains_error_keyword(&combined);

            let error_message = if has_error {
                if has_stderr {
                    Some(truncate(stderr.trim(), 500))
                } else {
                    // Pull the offending lines out of stdout
                    let lines: Vec<&str> = stdout
                        .lines()
                        .filter(|line| contains_error_keyword(line))
                        .take(5)
                        .collect();
                    if lines.is_empty() {
                        None
                    } else {
                        Some(truncate(&lines.join("\n"), 500))
                    }
                }
            } else {
                None
            };

            OutputAnalysis {
                success: !has_error && !*interrupted,
                error_message,
                has_stderr,
                was_interrupted: *interrupted,
            }
        }
        ToolOutput::Other(value) => {
            let text = value.to_string();
            let has_error = contains_error_keyword(&text);
            OutputAnalysis {
                success: !has_error,
                error_message: has_error.then(|| truncate(&text, 500)),
                has_stderr: false,
                was_interrupted: false,
            }
        }
    }
}

fn contains_error_keyword(text: &str) -> bool {
    let lower = text.to_lowercase();
    ERROR_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Mask sensitive values in a tool-input map, recursively.
pub fn sanitize_tool_input(input: &Map<String, Value>) -> Map<String, Value> {
    let mut sanitized = Map::new();
    for (key, value) in input {
        let lower = key.to_lowercase();
        if SENSITIVE_KEYS.iter().any(|s| lower.contains(s)) {
            sanitized.insert(key.clone(), Value::String("[REDACTED]".to_string()));
        } else if let Value::Object(nested) = value {
            sanitized.insert(key.clone(), Value::Object(sanitize_tool_input(nested)));
        } else {
            sanitized.insert(key.clone(), value.clone());
        }
    }
    sanitized
}

/// Classify a tool into a coarse category for the event log.
pub fn tool_category(tool_name: &str) -> &'static str {
    if tool_name.is_empty() {
        return "other";
    }
    if tool_name.starts_with("mcp__") {
        return "mcp";
    }
    match tool_name {
        "Read" | "Write" | "Edit" | "MultiEdit" | "NotebookEdit" => "file_ops",
        "Grep" | "Glob" => "search",
        "Bash" | "BashOutput" | "KillShell" => "bash",
        "WebFetch" | "WebSearch" => "web",
        "Task" | "TodoWrite" | "TodoRead" | "Agent" | "Subagent" => "task",
        "AskUserQuestion" => "question",
        "EnterPlanMode" | "ExitPlanMode" => "plan",
        _ => "other",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_output_sum_type_from_string() {
        let event = HookEvent::from_json(
            r#"{"session_id":"s1","tool_name":"Glob","tool_output":"a.py\nb.py"}"#,
        )
        .unwrap();
        match event.tool_output.unwrap() {
            ToolOutput::Text(text) => assert_eq!(text, "a.py\nb.py"),
            other => panic!("expected text output, got {other:?}"),
        }
    }

    #[test]
    fn test_output_sum_type_from_map() {
        let event = HookEvent::from_json(
            r#"{"session_id":"s1","tool_name":"Bash",
                "tool_output":{"stdout":"ok","stderr":"","interrupted":false}}"#,
        )
        .unwrap();
        let output = event.tool_output.unwrap();
        assert_eq!(output.primary_text(), "ok");
    }

    #[test]
    fn test_unexpected_output_shape_still_parses() {
        let event =
            HookEvent::from_json(r#"{"tool_name":"Task","tool_output":[1,2,3]}"#).unwrap();
        let output = event.tool_output.unwrap();
        assert_eq!(output.primary_text(), "");
        assert!(output.size_bytes() > 0);
    }

    #[test]
    fn test_field_aliases_and_defaults() {
        let event = HookEvent::from_json(
            r#"{"sessionId":"abc","toolName":"Read","toolInput":{"file_path":"/x"}}"#,
        )
        .unwrap();
        assert_eq!(event.session_id, "abc");
        assert_eq!(event.tool_name, "Read");
        assert_eq!(event.tool_input["file_path"], json!("/x"));

        let bare = HookEvent::from_json("{}").unwrap();
        assert_eq!(bare.session_id, "unknown");
        assert!(bare.tool_name.is_empty());
        assert!(bare.tool_output.is_none());
    }

    #[test]
    fn test_analysis_prefers_stderr() {
        let output = ToolOutput::Structured {
            stdout: Some("partial".to_string()),
            stderr: Some("error: no such file".to_string()),
            interrupted: false,
        };
        let analysis = analyze_output(Some(&output));
        assert!(!analysis.success);
        assert!(analysis.has_stderr);
        assert_eq!(analysis.error_message.as_deref(), Some("error: no such file"));
    }

    #[test]
    fn test_analysis_interrupted_is_failure() {
        let output = ToolOutput::Structured {
            stdout: Some("fine so far".to_string()),
            stderr: None,
            interrupted: true,
        };
        let analysis = analyze_output(Some(&output));
        assert!(!analysis.success);
        assert!(analysis.was_interrupted);
        assert!(analysis.error_message.is_none());
    }

    #[test]
    fn test_analysis_absent_output_is_success() {
        let analysis = analyze_output(None);
        assert!(analysis.success);
        assert!(!analysis.has_stderr);
    }

    #[test]
    fn test_sanitize_masks_nested_keys() {
        let input = json!({
            "url": "https://example.com",
            "api_key": "sk-12345",
            "options": {"auth_token": "abc", "depth": 2}
        });
        let Value::Object(map) = input else { unreachable!() };
        let sanitized = sanitize_tool_input(&map);

        assert_eq!(sanitized["url"], json!("https://example.com"));
        assert_eq!(sanitized["api_key"], json!("[REDACTED]"));
        assert_eq!(sanitized["options"]["auth_token"], json!("[REDACTED]"));
        assert_eq!(sanitized["options"]["depth"], json!(2));
    }

    #[test]
    fn test_tool_categories() {
        assert_eq!(tool_category("Edit"), "file_ops");
        assert_eq!(tool_category("Glob"), "search");
        assert_eq!(tool_category("mcp__graph__query"), "mcp");
        assert_eq!(tool_category("SomethingNew"), "other");
        assert_eq!(tool_category(""), "other");
    }

    #[test]
    fn test_effective_timestamp_falls_back() {
        let mut event = HookEvent::from_json("{}").unwrap();
        event.timestamp = Some("not-a-timestamp".to_string());
        // Falls back to a real timestamp rather than failing
        assert!(event.effective_timestamp().contains('T'));

        event.timestamp = Some("2026-08-06T10:00:00+00:00".to_string());
        assert_eq!(event.effective_timestamp(), "2026-08-06T10:00:00+00:00");
    }
}
