use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Startup failures. These are the only errors that stop the tool.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No watch directory given (pass one on the command line or set watch_dir)")]
    MissingWatchDir,

    #[error("Watch directory does not exist: {0}")]
    WatchDirNotFound(PathBuf),

    #[error("Watch path is not a directory: {0}")]
    WatchDirNotADirectory(PathBuf),

    #[error("Invalid file pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("OPENAI_API_KEY not set")]
    MissingApiKey,

    #[error("At least one category must be configured")]
    NoCategories,

    #[error("Request timeout must be greater than zero")]
    ZeroTimeout,

    #[error("Could not determine home directory")]
    NoHomeDir,

    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
}

/// Transport failures. They never leave `RenameProvider::classify`.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{provider} API error {status}: {body}")]
    Status {
        provider: &'static str,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Response contained no choices")]
    EmptyResponse,

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
}

#[derive(Debug, Error)]
pub enum FileOpError {
    #[error("Failed to back up {source_path} to {backup_path}: {source}")]
    Backup {
        source_path: PathBuf,
        backup_path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to move {from} to {to}: {source}")]
    Move {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Per-item failures, contained by the processing queue.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    FileOp(#[from] FileOpError),
}
