//! Command line interface definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "meshctl",
    version,
    about = "Configure the Kubernetes cluster used by the local control plane",
    long_about = "meshctl provisions access to a Kubernetes cluster and tells the locally running \
                  control plane which context to use.\n\n\
                  Examples:\n  \
                  meshctl config minikube                  # Use the local minikube cluster\n  \
                  meshctl config gke                       # Create a service account on the current GKE cluster\n  \
                  meshctl config gke --token ./auth.json   # Use another auth file"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Command {
    /// Configure the Kubernetes cluster used by the control plane
    #[command(after_help = "Providers:\n  \
        minikube   export the 'minikube' context from your kubeconfig\n  \
        gke        create a cluster-admin service account in the current GKE context\n\n\
        The auth file defaults to ~/.meshctl/auth.json and can also be set with MESHCTL_TOKEN.")]
    Config {
        /// Cluster provider: minikube | gke
        #[arg(value_name = "PROVIDER")]
        provider: String,
        /// Path to the control plane auth file
        #[arg(long, value_name = "PATH")]
        token: Option<PathBuf>,
        /// Control plane base URL (default: http://localhost:9081)
        #[arg(long, value_name = "URL")]
        server: Option<String>,
        /// Where the provisioning script writes the kubeconfig
        #[arg(long, value_name = "PATH")]
        kubeconfig_out: Option<PathBuf>,
    },

    /// Generate shell completions
    #[command(after_help = "Examples:\n  \
        meshctl completions bash > ~/.bash_completion.d/meshctl\n  \
        meshctl completions zsh > ~/.zfunc/_meshctl\n  \
        meshctl completions fish > ~/.config/fish/completions/meshctl.fish")]
    Completions {
        /// Shell: bash, zsh, fish, powershell, elvish
        #[arg(value_name = "SHELL")]
        shell: String,
    },
}
