//! meshctl - point a local control plane at a Kubernetes cluster
//!
//! Provisions a kubeconfig for minikube or GKE, uploads it to the control plane and
//! activates one of its contexts.

mod api;
mod auth;
mod cli;
mod commands;
mod config;
mod error;
mod provision;
mod upload;

use crate::cli::{Cli, Command};
use crate::config::{Overrides, Settings};
use crate::error::{MeshError, Result};

use clap::Parser;
use clap_complete::{generate, shells};
use std::io;
use tracing::debug;

/// Initialize tracing subscriber based on verbosity level
fn init_tracing(verbosity: u8) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = match verbosity {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Config {
            provider,
            token,
            server,
            kubeconfig_out,
        } => {
            let file_config = config::load()?;
            let settings = Settings::resolve(
                &file_config,
                &Overrides {
                    server,
                    token,
                    kubeconfig_out,
                },
            )?;
            debug!(?settings, "resolved settings");
            commands::run(&provider, &settings)?;
        }

        Command::Completions { shell } => {
            generate_completions(&shell)?;
        }
    }

    Ok(())
}

fn generate_completions(shell: &str) -> Result<()> {
    let mut cmd = Cli::command();
    let mut stdout = io::stdout();

    match shell {
        "bash" => generate(shells::Bash, &mut cmd, "meshctl", &mut stdout),
        "zsh" => generate(shells::Zsh, &mut cmd, "meshctl", &mut stdout),
        "fish" => generate(shells::Fish, &mut cmd, "meshctl", &mut stdout),
        "powershell" => generate(shells::PowerShell, &mut cmd, "meshctl", &mut stdout),
        "elvish" => generate(shells::Elvish, &mut cmd, "meshctl", &mut stdout),
        _ => {
            return Err(MeshError::Config(format!(
                "unsupported shell '{}'\n\n  Supported: bash, zsh, fish, powershell, elvish",
                shell
            )))
        }
    }

    Ok(())
}

// Re-export Cli for completions
impl Cli {
    pub fn command() -> clap::Command {
        <Self as clap::CommandFactory>::command()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_config_parse() {
        let cli = Cli::parse_from(["meshctl", "config", "minikube"]);
        match cli.command {
            Command::Config {
                provider,
                token,
                server,
                kubeconfig_out,
            } => {
                assert_eq!(provider, "minikube");
                assert!(token.is_none());
                assert!(server.is_none());
                assert!(kubeconfig_out.is_none());
            }
            _ => panic!("expected Config command"),
        }
    }

    #[test]
    fn test_cli_config_with_flags() {
        let cli = Cli::parse_from([
            "meshctl",
            "-vv",
            "config",
            "gke",
            "--token",
            "/tmp/auth.json",
            "--server",
            "http://127.0.0.1:9081",
        ]);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Config {
                provider,
                token,
                server,
                ..
            } => {
                assert_eq!(provider, "gke");
                assert_eq!(token, Some(std::path::PathBuf::from("/tmp/auth.json")));
                assert_eq!(server.as_deref(), Some("http://127.0.0.1:9081"));
            }
            _ => panic!("expected Config command"),
        }
    }

    #[test]
    fn test_cli_config_requires_exactly_one_provider() {
        assert!(Cli::try_parse_from(["meshctl", "config"]).is_err());
        assert!(Cli::try_parse_from(["meshctl", "config", "gke", "minikube"]).is_err());
    }

    #[test]
    fn test_cli_completions() {
        let cli = Cli::parse_from(["meshctl", "completions", "zsh"]);
        match cli.command {
            Command::Completions { shell } => assert_eq!(shell, "zsh"),
            _ => panic!("expected Completions command"),
        }
        assert!(matches!(
            generate_completions("tcsh"),
            Err(MeshError::Config(_))
        ));
    }

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }
}
