use std::path::PathBuf;

use thiserror::Error;

use crate::plugin::TaskState;

/// Fallos del reconciliador de workers huérfanos.
#[derive(Error, Debug)]
pub enum ReconciliationError {
    #[error("failed to list containers")]
    List(#[source] anyhow::Error),

    #[error("failed to remove container: {name}")]
    Remove {
        name: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Transición de estado ilegal en un `PluginTask`.
#[derive(Error, Debug, PartialEq, Eq)]
#[error("plugin task `{plugin}` cannot move from {from:?} to {to:?}")]
pub struct TaskStateError {
    pub plugin: String,
    pub from: TaskState,
    pub to: TaskState,
}

/// Errores de la orquestación de un escaneo. Todos ocurren antes del
/// despacho de workers; después del despacho nada se propaga.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("{}: no such file or directory", .0.display())]
    Preflight(PathBuf),

    #[error("stale state reconciliation failed")]
    Reconciliation(#[from] ReconciliationError),

    #[error("storage backend is not available")]
    Backend(#[source] anyhow::Error),

    #[error("failed to stage sample {}", .path.display())]
    Staging {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("scan cmd failed to store file info")]
    Persistence(#[source] anyhow::Error),

    #[error("failed to get file's mime type")]
    MimeResolution(#[source] anyhow::Error),
}

impl ScanError {
    /// Fase del escaneo en la que se produjo el error.
    pub fn phase(&self) -> &'static str {
        match self {
            ScanError::Preflight(_) => "preflight",
            ScanError::Reconciliation(_) => "reconciliation",
            ScanError::Backend(_) => "backend",
            ScanError::Staging { .. } => "staging",
            ScanError::Persistence(_) => "persistence",
            ScanError::MimeResolution(_) => "mime-resolution",
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration parse error: {0}")]
    Parse(#[from] config::ConfigError),

    #[error("Plugin manifest parse error: {0}")]
    Manifest(#[from] toml::de::Error),

    #[error("Duplicate plugin `{0}` in manifest")]
    DuplicatePlugin(String),

    #[error("Invalid mime matcher `{pattern}`: {source}")]
    Matcher {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}
