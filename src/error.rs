use std::path::PathBuf;
use thiserror::Error;

/// Failure of a raw OS read. Providers never propagate this; they log it and
/// fall back to their zero tuple.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed {what}: {detail}")]
    Parse { what: &'static str, detail: String },

    #[error("{0} unavailable")]
    Unavailable(&'static str),

    #[error("battery error: {0}")]
    Battery(#[from] battery::Error),
}

impl SourceError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn parse(what: &'static str, detail: impl Into<String>) -> Self {
        Self::Parse {
            what,
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("settings file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("scheduler is already running")]
    AlreadyRunning,

    #[error("scheduler is not running")]
    NotRunning,

    #[error("scheduler task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("sampler was lost when the scheduler task failed; build a new monitor")]
    SamplerLost,
}
