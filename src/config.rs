use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Store locations. Environment variables win over the config file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ToolscopeConfig {
    pub event_db: Option<String>,
    pub graph_db: Option<String>,
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("toolscope.toml")
}

pub fn default_data_dir() -> PathBuf {
    match std::env::var("TOOLSCOPE_DATA_DIR") {
        Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => PathBuf::from(".toolscope"),
    }
}

pub fn event_db_path(config: Option<&ToolscopeConfig>) -> PathBuf {
    if let Ok(path) = std::env::var("TOOLSCOPE_EVENT_DB") {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }
    if let Some(path) = config.and_then(|c| c.event_db.as_ref()) {
        return PathBuf::from(path);
    }
    default_data_dir().join("events.db")
}

pub fn graph_db_path(config: Option<&ToolscopeConfig>) -> PathBuf {
    if let Ok(path) = std::env::var("TOOLSCOPE_GRAPH_DB") {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }
    if let Some(path) = config.and_then(|c| c.graph_db.as_ref()) {
        return PathBuf::from(path);
    }
    default_data_dir().join("graph.db")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<ToolscopeConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: ToolscopeConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

pub fn ensure_db_dir(db_path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
