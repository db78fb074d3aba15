//! Cluster provisioning: generate and run the script that writes a kubeconfig

use crate::error::{MeshError, Result};
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

/// Namespace the GKE service account is created in
pub const GKE_NAMESPACE: &str = "default";

const SERVICE_ACCOUNT_PREFIX: &str = "sa-meshctl-";
const SERVICE_ACCOUNT_SUFFIX_LEN: usize = 8;

/// Cluster backend whose setup script should run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Minikube,
    Gke,
}

impl std::str::FromStr for Provider {
    type Err = MeshError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "minikube" => Ok(Provider::Minikube),
            "gke" => Ok(Provider::Gke),
            _ => Err(MeshError::Config(format!(
                "unknown provider '{}'\n\n  The argument has to be one of: minikube | gke",
                s
            ))),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Minikube => write!(f, "minikube"),
            Provider::Gke => write!(f, "gke"),
        }
    }
}

impl Provider {
    /// Executables the generated script calls
    pub fn required_tools(&self) -> &'static [&'static str] {
        match self {
            Provider::Minikube => &["sh", "kubectl"],
            Provider::Gke => &["sh", "kubectl", "base64"],
        }
    }

    /// Generate this provider's script writing a kubeconfig to `out`
    pub fn script(&self, out: &Path) -> String {
        match self {
            Provider::Minikube => minikube_script(out),
            Provider::Gke => gke_script(&service_account_name(), GKE_NAMESPACE, out),
        }
    }
}

/// Produces a kubeconfig for a provider and says where it is
pub trait Provisioner {
    fn provision(&self, provider: Provider) -> Result<PathBuf>;
}

/// Runs the provider scripts through `sh -c` with output streamed to the terminal
pub struct ScriptProvisioner {
    output: PathBuf,
}

impl ScriptProvisioner {
    pub fn new(output: impl Into<PathBuf>) -> Self {
        Self {
            output: output.into(),
        }
    }
}

impl Provisioner for ScriptProvisioner {
    fn provision(&self, provider: Provider) -> Result<PathBuf> {
        for tool in provider.required_tools() {
            if which::which(tool).is_err() {
                return Err(MeshError::Provisioning(format!(
                    "'{}' not found on PATH\n\n  Install kubectl:\n    https://kubernetes.io/docs/tasks/tools/",
                    tool
                )));
            }
        }

        info!(%provider, out = %self.output.display(), "generating kubeconfig");
        run_and_verify(&provider.script(&self.output), &self.output)
    }
}

/// Run a script and check it left a kubeconfig at `out`
pub fn run_and_verify(script: &str, out: &Path) -> Result<PathBuf> {
    run_script(script)?;
    if !out.is_file() {
        return Err(MeshError::Provisioning(format!(
            "script finished but no kubeconfig was written to {}",
            out.display()
        )));
    }
    Ok(out.to_path_buf())
}

/// Run a script with `sh -c`, inheriting stdout and stderr
pub fn run_script(script: &str) -> Result<()> {
    debug!(script, "running provisioning script");
    let status = Command::new("sh")
        .arg("-c")
        .arg(script)
        .status()
        .map_err(|e| MeshError::Provisioning(format!("failed to launch sh: {}", e)))?;

    if !status.success() {
        return Err(MeshError::Provisioning(format!(
            "error generating config: script exited with {}",
            status
        )));
    }
    Ok(())
}

/// `len` random characters from [a-z0-9], safe inside Kubernetes object names
pub fn random_suffix(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect()
}

pub fn service_account_name() -> String {
    format!(
        "{}{}",
        SERVICE_ACCOUNT_PREFIX,
        random_suffix(SERVICE_ACCOUNT_SUFFIX_LEN)
    )
}

fn quote_path(path: &Path) -> String {
    shell_words::quote(&path.to_string_lossy()).into_owned()
}

pub fn minikube_script(out: &Path) -> String {
    format!(
        "set -e\nKUBECFG_FILE={}\n{}",
        quote_path(out),
        MINIKUBE_SCRIPT_BODY
    )
}

pub fn gke_script(service_account: &str, namespace: &str, out: &Path) -> String {
    format!(
        "set -e\nKUBECFG_FILE={}\nSERVICE_ACCOUNT={}\nNAMESPACE={}\n{}",
        quote_path(out),
        shell_words::quote(service_account),
        shell_words::quote(namespace),
        GKE_SCRIPT_BODY
    )
}

const MINIKUBE_SCRIPT_BODY: &str = r#"mkdir -p "$(dirname "$KUBECFG_FILE")"
echo "Exporting the minikube context to $KUBECFG_FILE"
kubectl config view --minify --flatten --context=minikube > "$KUBECFG_FILE"
"#;

const GKE_SCRIPT_BODY: &str = r#"mkdir -p "$(dirname "$KUBECFG_FILE")"
rm -f "$KUBECFG_FILE"
TMP_DIR=$(mktemp -d)
trap 'rm -rf "$TMP_DIR"' EXIT

echo "Creating service account $SERVICE_ACCOUNT in namespace $NAMESPACE"
kubectl create serviceaccount "$SERVICE_ACCOUNT" --namespace "$NAMESPACE"
kubectl create clusterrolebinding "$SERVICE_ACCOUNT-binding" \
    --clusterrole=cluster-admin \
    --serviceaccount="$NAMESPACE:$SERVICE_ACCOUNT"

# Token secrets are not created automatically since Kubernetes 1.24
kubectl apply --namespace "$NAMESPACE" -f - <<EOF
apiVersion: v1
kind: Secret
metadata:
  name: $SERVICE_ACCOUNT-token
  annotations:
    kubernetes.io/service-account.name: $SERVICE_ACCOUNT
type: kubernetes.io/service-account-token
EOF

TOKEN=""
for _ in 1 2 3 4 5 6 7 8 9 10; do
    TOKEN=$(kubectl get secret "$SERVICE_ACCOUNT-token" --namespace "$NAMESPACE" -o jsonpath='{.data.token}')
    [ -n "$TOKEN" ] && break
    sleep 1
done
if [ -z "$TOKEN" ]; then
    echo "token for $SERVICE_ACCOUNT was never issued" >&2
    exit 1
fi
TOKEN=$(echo "$TOKEN" | base64 --decode)
kubectl get secret "$SERVICE_ACCOUNT-token" --namespace "$NAMESPACE" \
    -o jsonpath='{.data.ca\.crt}' | base64 --decode > "$TMP_DIR/ca.crt"

CONTEXT=$(kubectl config current-context)
CLUSTER=$(kubectl config view -o jsonpath="{.contexts[?(@.name == \"$CONTEXT\")].context.cluster}")
SERVER=$(kubectl config view -o jsonpath="{.clusters[?(@.name == \"$CLUSTER\")].cluster.server}")

echo "Writing kubeconfig for $CLUSTER to $KUBECFG_FILE"
kubectl config set-cluster "$CLUSTER" --kubeconfig="$KUBECFG_FILE" \
    --server="$SERVER" --certificate-authority="$TMP_DIR/ca.crt" --embed-certs=true
kubectl config set-credentials "$SERVICE_ACCOUNT" --kubeconfig="$KUBECFG_FILE" --token="$TOKEN"
kubectl config set-context "$SERVICE_ACCOUNT@$CLUSTER" --kubeconfig="$KUBECFG_FILE" \
    --cluster="$CLUSTER" --user="$SERVICE_ACCOUNT" --namespace="$NAMESPACE"
kubectl config use-context "$SERVICE_ACCOUNT@$CLUSTER" --kubeconfig="$KUBECFG_FILE"
"#;
