//! Custom error types for meshctl

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for meshctl operations
#[derive(Error, Debug)]
pub enum MeshError {
    #[error("{0}")]
    Config(String),

    #[error("provisioning failed: {0}")]
    Provisioning(String),

    #[error("request to the control plane failed: {0}\n\n  Is the control plane running? Check the server address:\n    meshctl config <provider> --server http://localhost:9081")]
    Network(String),

    #[error("cannot attach credentials from {}: {reason}\n\n  Log in again to refresh the token, or point at another file:\n    meshctl config <provider> --token /path/to/auth.json", path.display())]
    Auth { path: PathBuf, reason: String },

    #[error("cannot read {}: {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unexpected response from the control plane: {0}")]
    Parse(String),

    #[error("no contexts found in the generated kubeconfig\n\n  Check the cluster is reachable:\n    kubectl config get-contexts")]
    NoContexts,

    #[error("invalid selection: {0}")]
    Selection(String),

    #[error("selection cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}\n\n  Check ~/.meshctl/config.yaml")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl MeshError {
    /// Wrap an IO failure on a specific file
    pub fn file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        MeshError::File {
            path: path.into(),
            source,
        }
    }

    pub fn auth(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        MeshError::Auth {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<reqwest::Error> for MeshError {
    fn from(e: reqwest::Error) -> Self {
        MeshError::Network(e.to_string())
    }
}

/// Result type alias for meshctl operations
pub type Result<T> = std::result::Result<T, MeshError>;
