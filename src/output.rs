//! Search-tool output parsing
//!
//! Two output shapes reveal additional file paths:
//! - glob-style listings: one candidate path per line
//! - grep-style matches: `file:line:content` lines, with bare-path lines
//!   in files-with-matches mode
//!
//! Both parsers are permissive: they filter obvious non-paths and degrade
//! to empty results, never to errors.

/// Maximum stored length of a match line's content.
const MATCH_CONTENT_MAX: usize = 200;

/// Parse glob-style output into candidate file paths.
///
/// Lines are trimmed; blank lines and lines opening a JSON structure
/// (`[` / `{`) are dropped. No strict path-syntax validation is applied.
pub fn parse_list_output(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('[') && !line.starts_with('{'))
        .map(str::to_string)
        .collect()
}

/// One file match from grep-style output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchLine {
    pub file_path: String,
    pub line_number: Option<u32>,
    pub match_content: Option<String>,
}

/// Parse grep-style output into per-file matches.
///
/// Handles `file:line:content`, `file:content`, and bare `file` lines.
/// A leading single-letter alphabetic token before `:` is a Windows drive
/// prefix and is folded back into the path. Files are deduplicated within
/// one call; the first occurrence's metadata wins.
pub fn parse_match_output(output: &str) -> Vec<MatchLine> {
    let mut matches = Vec::new();
    let mut seen = std::collections::HashSet::new();

    for line in output.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let (file_path, remaining) = split_match_line(line);
        if file_path.is_empty() || !seen.insert(file_path.to_string()) {
            continue;
        }

        let (line_number, match_content) = match remaining.split_first() {
            None => (None, None),
            Some((first, rest)) => match first.parse::<u32>() {
                Ok(number) => (Some(number), join_content(rest)),
                Err(_) => (None, join_content(&remaining)),
            },
        };

        matches.push(MatchLine {
            file_path,
            line_number,
            match_content,
        });
    }

    matches
}

/// Split a match line into its file path and the remaining `:` fields,
/// reconstructing a Windows drive prefix when present.
fn split_match_line(line: &str) -> (String, Vec<&str>) {
    if !line.contains(':') {
        return (line.to_string(), Vec::new());
    }

    let parts: Vec<&str> = line.split(':').collect();
    let drive_prefix = parts.len() >= 2
        && parts[0].len() == 1
        && parts[0].chars().all(|c| c.is_ascii_alphabetic());

    if drive_prefix {
        let file_path = format!("{}:{}", parts[0], parts[1]);
        (file_path, parts[2..].to_vec())
    } else {
        (parts[0].to_string(), parts[1..].to_vec())
    }
}

fn join_content(fields: &[&str]) -> Option<String> {
    if fields.is_empty() {
        return None;
    }
    let content = fields.join(":");
    if content.is_empty() {
        return None;
    }
    Some(content.chars().take(MATCH_CONTENT_MAX).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_output_filters_structure_lines() {
        let output = "src/a.py\n\n  src/b.py  \n[truncated]\n{\"note\":1}\nsrc/c.py";
        assert_eq!(
            parse_list_output(output),
            vec!["src/a.py", "src/b.py", "src/c.py"]
        );
    }

    #[test]
    fn test_list_output_is_permissive() {
        // No path-syntax validation: odd-looking lines survive
        assert_eq!(parse_list_output("README\nMakefile"), vec!["README", "Makefile"]);
        assert!(parse_list_output("").is_empty());
    }

    #[test]
    fn test_match_line_with_line_number() {
        let matches = parse_match_output("main.py:10:def main():");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].file_path, "main.py");
        assert_eq!(matches[0].line_number, Some(10));
        assert_eq!(matches[0].match_content.as_deref(), Some("def main():"));
    }

    #[test]
    fn test_match_line_without_line_number() {
        let matches = parse_match_output("config.toml:name = \"demo\"");
        assert_eq!(matches[0].file_path, "config.toml");
        assert_eq!(matches[0].line_number, None);
        assert_eq!(
            matches[0].match_content.as_deref(),
            Some("name = \"demo\"")
        );
    }

    #[test]
    fn test_bare_path_mode() {
        let matches = parse_match_output("src/a.rs\nsrc/b.rs\n");
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].file_path, "src/a.rs");
        assert!(matches[0].line_number.is_none());
        assert!(matches[0].match_content.is_none());
    }

    #[test]
    fn test_windows_drive_prefix_reconstructed() {
        let matches = parse_match_output("C:\\proj\\main.py:7:import os");
        assert_eq!(matches[0].file_path, "C:\\proj\\main.py");
        assert_eq!(matches[0].line_number, Some(7));
        assert_eq!(matches[0].match_content.as_deref(), Some("import os"));
    }

    #[test]
    fn test_dedup_keeps_first_occurrence() {
        let output = "lib.rs:3:mod a;\nlib.rs:9:mod b;\nmain.rs:1:fn main() {}";
        let matches = parse_match_output(output);
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].file_path, "lib.rs");
        assert_eq!(matches[0].line_number, Some(3));
    }

    #[test]
    fn test_content_with_embedded_colons() {
        let matches = parse_match_output("a.py:5:x = {1: 2, 3: 4}");
        assert_eq!(matches[0].match_content.as_deref(), Some("x = {1: 2, 3: 4}"));
    }

    #[test]
    fn test_content_truncated() {
        let long = "y".repeat(500);
        let matches = parse_match_output(&format!("a.py:5:{long}"));
        assert_eq!(matches[0].match_content.as_ref().unwrap().len(), 200);
    }
}
