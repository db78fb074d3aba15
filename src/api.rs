//! Client for the control plane's kubeconfig endpoints

use crate::auth;
use crate::config::Settings;
use crate::error::{MeshError, Result};
use crate::upload;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::blocking::{Client, RequestBuilder};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

const CONTEXTS_PATH: &str = "/api/k8sconfig/contexts";
const SET_CONTEXT_PATH: &str = "/api/k8sconfig";

/// Multipart field carrying the kubeconfig file
pub const FILE_FIELD: &str = "k8sfile";
/// Multipart field (and JSON key) carrying a context name
pub const CONTEXT_FIELD: &str = "contextName";

/// Operations the `config` command needs from the control plane
pub trait ContextApi {
    /// Upload a kubeconfig and return the context names it contains, in server order
    fn list_contexts(&self, kubeconfig: &Path) -> Result<Vec<String>>;

    /// Upload a kubeconfig and make `context` the active one; returns the raw response
    fn set_default_context(&self, kubeconfig: &Path, context: &str) -> Result<String>;
}

#[derive(Deserialize, Debug)]
struct ContextEntry {
    #[serde(rename = "contextName", default)]
    context_name: Option<serde_json::Value>,
}

/// Parse the discovery response into context names.
///
/// Entries without a non-empty string `contextName` are skipped.
pub fn parse_contexts(body: &[u8]) -> Result<Vec<String>> {
    let entries: Vec<ContextEntry> = serde_json::from_slice(body).map_err(|e| {
        MeshError::Parse(format!(
            "expected a JSON array of contexts ({}): {}",
            e,
            String::from_utf8_lossy(body).trim()
        ))
    })?;

    let mut contexts = Vec::with_capacity(entries.len());
    for (idx, entry) in entries.into_iter().enumerate() {
        match entry.context_name {
            Some(serde_json::Value::String(name)) if !name.is_empty() => contexts.push(name),
            other => warn!(index = idx, value = ?other, "skipping entry without a context name"),
        }
    }
    Ok(contexts)
}

/// Blocking HTTP client bound to one control plane and one auth file
pub struct ApiClient {
    client: Client,
    server: String,
    token: PathBuf,
}

impl ApiClient {
    pub fn new(settings: &Settings) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("meshctl/", env!("CARGO_PKG_VERSION")))
            // The control plane runs on this machine; never route through a proxy
            .no_proxy()
            .build()
            .map_err(|e| MeshError::Network(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            server: settings.server.clone(),
            token: settings.token.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.server, path)
    }

    /// Build the upload, attach credentials, send it and return the body of a 2xx reply
    fn upload(
        &self,
        path: &str,
        kubeconfig: &Path,
        fields: &BTreeMap<&str, &str>,
    ) -> Result<String> {
        let url = self.url(path);
        let request = upload::build_upload_request(&self.client, &url, fields, FILE_FIELD, kubeconfig)?;
        let request = auth::attach(request, &self.token)?;
        send(request, &url)
    }
}

fn send(request: RequestBuilder, url: &str) -> Result<String> {
    let spinner = if std::io::stderr().is_terminal() {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(format!("Uploading kubeconfig to {}...", url));
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    } else {
        None
    };

    let response = request.send();

    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    let response = response.map_err(|e| MeshError::Network(format!("POST {}: {}", url, e)))?;
    let status = response.status();
    let body = response
        .text()
        .map_err(|e| MeshError::Io(std::io::Error::other(e)))?;
    debug!(url, %status, bytes = body.len(), "control plane replied");

    if !status.is_success() {
        return Err(MeshError::Network(format!(
            "POST {}: HTTP {}: {}",
            url,
            status,
            body.trim()
        )));
    }
    Ok(body)
}

impl ContextApi for ApiClient {
    fn list_contexts(&self, kubeconfig: &Path) -> Result<Vec<String>> {
        let body = self.upload(CONTEXTS_PATH, kubeconfig, &BTreeMap::new())?;
        parse_contexts(body.as_bytes())
    }

    fn set_default_context(&self, kubeconfig: &Path, context: &str) -> Result<String> {
        let mut fields = BTreeMap::new();
        fields.insert(CONTEXT_FIELD, context);
        self.upload(SET_CONTEXT_PATH, kubeconfig, &fields)
    }
}
