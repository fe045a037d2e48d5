//! Toolscope CLI - hook entrypoint and graph sync commands

use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::{Path, PathBuf};
use toolscope::config;
use toolscope::graph::GraphStore;
use toolscope::{EventStore, Extractor, GraphSync, HookEvent, SqliteGraphStore};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "toolscope")]
#[command(version = "0.1.0")]
#[command(about = "File-access tracking for assistant tool events")]
#[command(long_about = r#"
Toolscope records which files an AI coding assistant's tool calls touch,
and folds finished sessions into a co-access graph.

Example usage:
  echo '{"session_id":"s1","tool_name":"Read","tool_input":{"file_path":"a.py"}}' | toolscope hook
  toolscope sync --all
  toolscope co-accessed --path /work/app/main.py
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record one tool-use event from standard input
    ///
    /// Reads a single JSON object and appends it to the event log. Never
    /// fails the surrounding tool call: problems are logged to stderr and
    /// the exit code stays 0.
    Hook {
        /// Path to the config file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Fold recorded sessions into the co-access graph
    Sync {
        /// Sync a single session
        #[arg(short, long)]
        session: Option<String>,

        /// Sync every session with pending access rows
        #[arg(short, long)]
        all: bool,

        /// Path to the config file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Show statistics about the event store and the graph
    Stats {
        /// Path to the config file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// List files co-accessed with a path
    CoAccessed {
        /// Normalized file path to query
        #[arg(short, long)]
        path: String,

        /// Maximum number of results
        #[arg(short, long, default_value = "10")]
        limit: usize,

        /// Path to the config file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging; diagnostics go to stderr so stdout stays clean
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match cli.command {
        Commands::Hook { config } => {
            if let Err(err) = run_hook(config.as_deref()) {
                tracing::error!("Hook processing failed: {err:#}");
            }
            // The surrounding tool call must never be interrupted
            Ok(())
        }

        Commands::Sync {
            session,
            all,
            config,
        } => {
            let (events, graph) = open_stores(config.as_deref())?;
            let sync = GraphSync::new(&events, &graph);

            if let Some(session_id) = session {
                let synced = sync.sync_session(&session_id)?;
                if synced {
                    println!("Session {session_id}: synced");
                } else {
                    println!("Session {session_id}: graph unavailable, will retry");
                }
            } else if all {
                let count = sync.sync_all()?;
                println!("Synced {count} sessions");
            } else {
                anyhow::bail!("specify --session <ID> or --all");
            }
            Ok(())
        }

        Commands::Stats { config } => {
            let (events, graph) = open_stores(config.as_deref())?;
            println!("{}", events.stats()?);
            println!("Graph Statistics:");
            println!("  Files: {}", graph.count_files()?);
            println!("  Co-access edges: {}", graph.count_edges()?);
            Ok(())
        }

        Commands::CoAccessed {
            path,
            limit,
            config,
        } => {
            let (_, graph) = open_stores(config.as_deref())?;
            let peers = graph.co_accessed_with(&path)?;

            if peers.is_empty() {
                println!("No co-accessed files recorded for {path}");
            } else {
                for peer in peers.iter().take(limit) {
                    println!("{:>6}  {}", peer.co_access_count, peer.path);
                }
            }
            Ok(())
        }
    }
}

/// Record one event from stdin into the event log.
fn run_hook(config_path: Option<&Path>) -> anyhow::Result<()> {
    let mut input = String::new();
    std::io::stdin().read_to_string(&mut input)?;
    let event = HookEvent::from_json(&input)?;

    let config = config::load_config(config_path)?;
    let db_path = config::event_db_path(config.as_ref());
    config::ensure_db_dir(&db_path)?;
    let store = EventStore::open(&db_path)?;

    let extractor = Extractor::new();
    let access = extractor.extract(
        &event.tool_name,
        &event.tool_input,
        event.tool_output.as_ref(),
        event.cwd.as_deref(),
    );
    let recorded = store.record_tool_event(&event, &access)?;

    tracing::debug!(
        "Recorded event {} for session {} ({} access rows)",
        recorded.event_id,
        event.session_id,
        recorded.access_rows
    );
    Ok(())
}

fn open_stores(config_path: Option<&Path>) -> anyhow::Result<(EventStore, SqliteGraphStore)> {
    let config = config::load_config(config_path)?;

    let event_db = config::event_db_path(config.as_ref());
    config::ensure_db_dir(&event_db)?;
    let events = EventStore::open(&event_db)?;

    let graph_db = config::graph_db_path(config.as_ref());
    config::ensure_db_dir(&graph_db)?;
    let graph = SqliteGraphStore::open(&graph_db)?;

    Ok((events, graph))
}
