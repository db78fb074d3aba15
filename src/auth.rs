//! Session credentials attached to control plane requests

use crate::error::{MeshError, Result};
use reqwest::blocking::RequestBuilder;
use reqwest::header::{HeaderValue, COOKIE};
use serde::Deserialize;
use std::fs;
use std::path::Path;

const TOKEN_COOKIE: &str = "token";
const PROVIDER_COOKIE: &str = "meshery-provider";

/// Contents of the auth file saved after logging in to the control plane
#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthFile {
    #[serde(default)]
    pub token: String,
    #[serde(rename = "meshery-provider", default)]
    pub provider: String,
}

impl AuthFile {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read(path).map_err(|e| MeshError::auth(path, e))?;
        serde_json::from_slice(&content).map_err(|e| MeshError::auth(path, e))
    }

    fn cookie_header(&self) -> String {
        format!(
            "{}={}; {}={}",
            TOKEN_COOKIE, self.token, PROVIDER_COOKIE, self.provider
        )
    }
}

/// Fail early when the auth file is not there at all
pub fn ensure_present(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(MeshError::auth(path, "file not found"))
    }
}

/// Read the auth file and attach its session cookies to the request
pub fn attach(request: RequestBuilder, token_path: &Path) -> Result<RequestBuilder> {
    let auth = AuthFile::load(token_path)?;
    if auth.token.is_empty() {
        tracing::warn!(path = %token_path.display(), "auth file has an empty token");
    }
    let cookie =
        HeaderValue::from_str(&auth.cookie_header()).map_err(|e| MeshError::auth(token_path, e))?;
    Ok(request.header(COOKIE, cookie))
}
