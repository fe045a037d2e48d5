//! Shell command parsing - file paths out of free-form command text
//!
//! An ordered table of command shapes is evaluated with first-match
//! short-circuit: a command is interpreted against exactly one pattern or
//! none at all, never decomposed against several unrelated ones. This keeps
//! pipes and redirects from producing false positives.

use regex::Regex;

use crate::access::AccessMode;

/// Operation a shell command performs on a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandOp {
    /// cat / head / tail
    Read,
    /// ls / find / cd
    List,
    /// cp
    Copy,
    /// mv
    Move,
    /// rm
    Delete,
    /// mkdir / touch
    Create,
    /// interpreter + script
    Execute,
    /// git add
    Stage,
    /// chmod / chown
    Modify,
}

impl CommandOp {
    /// Get the string representation of the operation
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandOp::Read => "read",
            CommandOp::List => "list",
            CommandOp::Copy => "copy",
            CommandOp::Move => "move",
            CommandOp::Delete => "delete",
            CommandOp::Create => "create",
            CommandOp::Execute => "execute",
            CommandOp::Stage => "stage",
            CommandOp::Modify => "modify",
        }
    }

    /// Access mode implied when a path with this operation is the primary
    /// target of a shell invocation
    pub fn access_mode(&self) -> AccessMode {
        match self {
            CommandOp::Read => AccessMode::Read,
            CommandOp::List => AccessMode::Search,
            CommandOp::Copy => AccessMode::Read,
            CommandOp::Move => AccessMode::Modify,
            CommandOp::Delete => AccessMode::Write,
            CommandOp::Create => AccessMode::Write,
            CommandOp::Execute => AccessMode::Execute,
            CommandOp::Stage => AccessMode::Read,
            CommandOp::Modify => AccessMode::Modify,
        }
    }
}

impl std::fmt::Display for CommandOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A file path extracted from a shell command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandPath {
    pub path: String,
    pub op: CommandOp,
    pub is_source: bool,
    pub is_destination: bool,
}

/// How a matched pattern's captures map to path entries.
#[derive(Debug, Clone, Copy)]
enum Shape {
    /// One capture, acting as the operation's source
    Source(CommandOp),
    /// One capture, acting as the operation's destination
    Destination(CommandOp),
    /// Two captures: source then destination
    Pair(CommandOp),
}

/// The ordered command-shape table. First match wins.
const PATTERNS: &[(&str, Shape)] = &[
    // find <path> ...
    (r"(?i)^find\s+(\S+)", Shape::Source(CommandOp::List)),
    // ls [-flags] <path>
    (
        r"(?i)^ls\s+(?:-[a-zA-Z]+\s+)*([^\s|>]+)",
        Shape::Source(CommandOp::List),
    ),
    // cat/head/tail [-flags] <path>
    (
        r"(?i)^(?:cat|head|tail)\s+(?:-[a-zA-Z0-9]+\s+)*([^\s|>]+)",
        Shape::Source(CommandOp::Read),
    ),
    // cp [-flags] <src> <dst>
    (
        r"(?i)^cp\s+(?:-[a-zA-Z]+\s+)*(\S+)\s+(\S+)",
        Shape::Pair(CommandOp::Copy),
    ),
    // mv [-flags] <src> <dst>
    (
        r"(?i)^mv\s+(?:-[a-zA-Z]+\s+)*(\S+)\s+(\S+)",
        Shape::Pair(CommandOp::Move),
    ),
    // rm [-flags] <path>
    (
        r"(?i)^rm\s+(?:-[a-zA-Z]+\s+)*(\S+)",
        Shape::Source(CommandOp::Delete),
    ),
    // mkdir [-flags] <path>
    (
        r"(?i)^mkdir\s+(?:-[a-zA-Z]+\s+)*(\S+)",
        Shape::Destination(CommandOp::Create),
    ),
    // touch <path>
    (r"(?i)^touch\s+(\S+)", Shape::Destination(CommandOp::Create)),
    // python/python3 [-flags] <script.py>
    (
        r"(?i)^python3?\s+(?:-[a-zA-Z]+\s+)*(\S+\.py)",
        Shape::Source(CommandOp::Execute),
    ),
    // git add <path>
    (r"(?i)^git\s+add\s+(\S+)", Shape::Source(CommandOp::Stage)),
    // chmod/chown <mode|owner> <path>
    (
        r"(?i)^(?:chmod|chown)\s+\S+\s+(\S+)",
        Shape::Source(CommandOp::Modify),
    ),
    // cd <path>
    (r"(?i)^cd\s+([^\s;&|]+)", Shape::Source(CommandOp::List)),
];

/// Extracts (path, operation, role) tuples from raw shell command text.
pub struct CommandPathParser {
    table: Vec<(Regex, Shape)>,
}

impl CommandPathParser {
    /// Build the parser, compiling the pattern table once
    pub fn new() -> Self {
        let table = PATTERNS
            .iter()
            .map(|(pattern, shape)| {
                (
                    Regex::new(pattern).expect("command table pattern is valid"),
                    *shape,
                )
            })
            .collect();
        Self { table }
    }

    /// Parse file paths out of a shell command.
    ///
    /// Empty input or an unrecognized command yields an empty list, never
    /// an error. For copy/move the source always precedes the destination.
    pub fn parse(&self, command: &str) -> Vec<CommandPath> {
        let cmd = command.trim();
        if cmd.is_empty() {
            return Vec::new();
        }

        for (pattern, shape) in &self.table {
            let Some(caps) = pattern.captures(cmd) else {
                continue;
            };
            return match shape {
                Shape::Source(op) => vec![CommandPath {
                    path: caps[1].to_string(),
                    op: *op,
                    is_source: true,
                    is_destination: false,
                }],
                Shape::Destination(op) => vec![CommandPath {
                    path: caps[1].to_string(),
                    op: *op,
                    is_source: false,
                    is_destination: true,
                }],
                Shape::Pair(op) => vec![
                    CommandPath {
                        path: caps[1].to_string(),
                        op: *op,
                        is_source: true,
                        is_destination: false,
                    },
                    CommandPath {
                        path: caps[2].to_string(),
                        op: *op,
                        is_source: false,
                        is_destination: true,
                    },
                ],
            };
        }

        Vec::new()
    }
}

impl Default for CommandPathParser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(cmd: &str) -> Vec<CommandPath> {
        CommandPathParser::new().parse(cmd)
    }

    #[test]
    fn test_copy_yields_source_then_destination() {
        let paths = parse("cp a b");
        assert_eq!(paths.len(), 2);
        assert_eq!(paths[0].path, "a");
        assert_eq!(paths[0].op, CommandOp::Copy);
        assert!(paths[0].is_source && !paths[0].is_destination);
        assert_eq!(paths[1].path, "b");
        assert!(!paths[1].is_source && paths[1].is_destination);
    }

    #[test]
    fn test_move_scenario() {
        let paths = parse("mv old.py new.py");
        assert_eq!(paths.len(), 2);
        assert_eq!(paths[0], CommandPath {
            path: "old.py".to_string(),
            op: CommandOp::Move,
            is_source: true,
            is_destination: false,
        });
        assert_eq!(paths[1].path, "new.py");
        assert_eq!(paths[0].op.access_mode(), AccessMode::Modify);
    }

    #[test]
    fn test_leading_flags_are_skipped() {
        let paths = parse("ls -la /tmp/project");
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].path, "/tmp/project");
        assert_eq!(paths[0].op, CommandOp::List);

        let paths = parse("rm -rf build/");
        assert_eq!(paths[0].path, "build/");
        assert_eq!(paths[0].op, CommandOp::Delete);

        let paths = parse("head -n20 notes.txt");
        assert_eq!(paths[0].path, "notes.txt");
        assert_eq!(paths[0].op, CommandOp::Read);
    }

    #[test]
    fn test_first_match_short_circuits() {
        // The pipe target must not produce a second entry
        let paths = parse("cat src/main.rs | grep TODO");
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].path, "src/main.rs");
    }

    #[test]
    fn test_create_paths_are_destinations() {
        let mkdir = parse("mkdir -p out/dist");
        assert_eq!(mkdir[0].path, "out/dist");
        assert!(mkdir[0].is_destination);

        let touch = parse("touch .keep");
        assert_eq!(touch[0].op, CommandOp::Create);
        assert!(touch[0].is_destination);
    }

    #[test]
    fn test_script_execution() {
        let paths = parse("python3 scripts/migrate.py --dry-run");
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].path, "scripts/migrate.py");
        assert_eq!(paths[0].op, CommandOp::Execute);
    }

    #[test]
    fn test_stage_and_permissions() {
        assert_eq!(parse("git add src/lib.rs")[0].op, CommandOp::Stage);
        let chmod = parse("chmod 755 run.sh");
        assert_eq!(chmod[0].path, "run.sh");
        assert_eq!(chmod[0].op, CommandOp::Modify);
    }

    #[test]
    fn test_cd_stops_at_separators() {
        let paths = parse("cd /work/repo && cargo test");
        assert_eq!(paths[0].path, "/work/repo");
        assert_eq!(paths[0].op, CommandOp::List);
    }

    #[test]
    fn test_unmatched_and_empty_commands() {
        assert!(parse("").is_empty());
        assert!(parse("   ").is_empty());
        assert!(parse("echo hello").is_empty());
        assert!(parse("cargo build --release").is_empty());
    }
}
