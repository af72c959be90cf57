use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to access config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Bundled default config is invalid: {0}")]
    InvalidDefault(#[source] serde_json::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("Config file ({}) includes invalid JSON: {source}", path.display())]
    InvalidUserConfig {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

#[derive(Debug, Error)]
pub enum InstallError {
    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Editable install of {} failed: {status}", dir.display())]
    Failed { dir: PathBuf, status: ExitStatus },
}

/// Errors that abort a whole batch
#[derive(Debug, Error)]
pub enum PisError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Couldn't get {url}: unexpected status {status}")]
    UnexpectedStatus { url: String, status: u16 },

    #[error("Invalid configuration received from {url}: {source}")]
    InvalidRemoteConfig {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Install(#[from] InstallError),
}
