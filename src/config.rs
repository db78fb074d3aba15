//! meshctl settings: optional YAML file, environment and flag overrides

use crate::error::{MeshError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Control plane address used when nothing else is configured
pub const DEFAULT_SERVER: &str = "http://localhost:9081";

pub const ENV_SERVER: &str = "MESHCTL_SERVER";
pub const ENV_TOKEN: &str = "MESHCTL_TOKEN";

/// On-disk configuration (`~/.meshctl/config.yaml`)
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct MeshConfig {
    /// Base URL of the control plane API
    #[serde(default)]
    pub server: Option<String>,
    /// Path to the auth file holding the session token
    #[serde(default)]
    pub token: Option<String>,
    /// Where provisioning scripts write the kubeconfig
    #[serde(default)]
    pub kubeconfig_out: Option<String>,
}

/// Values given on the command line; they win over everything else
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub server: Option<String>,
    pub token: Option<PathBuf>,
    pub kubeconfig_out: Option<PathBuf>,
}

/// Fully resolved settings threaded through a single command run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server: String,
    pub token: PathBuf,
    pub kubeconfig_out: PathBuf,
}

impl Settings {
    /// Resolve settings using the process environment
    pub fn resolve(file: &MeshConfig, overrides: &Overrides) -> Result<Self> {
        Self::resolve_with(file, overrides, |key| env::var(key).ok())
    }

    /// Resolve with precedence flag > environment > file > default
    pub fn resolve_with<F>(file: &MeshConfig, overrides: &Overrides, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let server = overrides
            .server
            .clone()
            .or_else(|| lookup(ENV_SERVER))
            .or_else(|| file.server.clone())
            .unwrap_or_else(|| DEFAULT_SERVER.to_string());
        let url = reqwest::Url::parse(&server)
            .map_err(|e| MeshError::Config(format!("invalid server address '{}': {}", server, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(MeshError::Config(format!(
                "invalid server address '{}': expected an http:// or https:// URL",
                server
            )));
        }
        let server = server.trim_end_matches('/').to_string();

        let token = match overrides.token.clone() {
            Some(path) => path,
            None => lookup(ENV_TOKEN)
                .or_else(|| file.token.clone())
                .map(|t| expand_home(&t))
                .or_else(default_token_path)
                .unwrap_or_default(),
        };
        if token.as_os_str().is_empty() {
            return Err(MeshError::Config(
                "token path invalid\n\n  Pass the auth file explicitly:\n    meshctl config <provider> --token ~/.meshctl/auth.json"
                    .into(),
            ));
        }

        let kubeconfig_out = overrides
            .kubeconfig_out
            .clone()
            .or_else(|| file.kubeconfig_out.as_deref().map(expand_home))
            .unwrap_or_else(default_kubeconfig_out);

        Ok(Self {
            server,
            token,
            kubeconfig_out,
        })
    }
}

/// Directory holding meshctl's own files
pub fn meshctl_dir() -> Option<PathBuf> {
    dirs_next::home_dir().map(|home| home.join(".meshctl"))
}

/// Get the config file path
pub fn config_path() -> Option<PathBuf> {
    meshctl_dir().map(|dir| dir.join("config.yaml"))
}

fn default_token_path() -> Option<PathBuf> {
    meshctl_dir().map(|dir| dir.join("auth.json"))
}

fn default_kubeconfig_out() -> PathBuf {
    env::temp_dir().join("meshctl").join("kubeconfig.yaml")
}

/// Load the config file; a missing file yields defaults
pub fn load() -> Result<MeshConfig> {
    match config_path() {
        Some(path) => load_from(&path),
        None => Ok(MeshConfig::default()),
    }
}

pub fn load_from(path: &Path) -> Result<MeshConfig> {
    if !path.exists() {
        return Ok(MeshConfig::default());
    }

    let content = fs::read_to_string(path).map_err(|e| MeshError::file(path, e))?;
    let config: MeshConfig = serde_yaml_ng::from_str(&content)?;
    Ok(config)
}

/// Expand ~ to home directory in path strings
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs_next::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}
