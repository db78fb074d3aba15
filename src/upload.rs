//! multipart/form-data uploads of local files

use crate::error::{MeshError, Result};
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::{Client, RequestBuilder};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Build a POST carrying `path` as a file part plus one text part per extra field.
///
/// The file is read fully before the request is returned, so the handle is closed on
/// every exit path. The `Content-Type` header (with its boundary) is set by reqwest
/// when the form is attached.
pub fn build_upload_request(
    client: &Client,
    url: &str,
    extra_fields: &BTreeMap<&str, &str>,
    file_field: &str,
    path: &Path,
) -> Result<RequestBuilder> {
    let (file_name, contents) = read_file(path)?;
    tracing::debug!(
        url,
        file = %path.display(),
        bytes = contents.len(),
        fields = extra_fields.len(),
        "building upload request"
    );

    let part = Part::bytes(contents)
        .file_name(file_name)
        .mime_str("application/octet-stream")?;
    let form = extra_fields
        .iter()
        .fold(Form::new().part(file_field.to_string(), part), |form, (k, v)| {
            form.text(k.to_string(), v.to_string())
        });

    Ok(client.post(url).multipart(form))
}

fn read_file(path: &Path) -> Result<(String, Vec<u8>)> {
    let mut file = File::open(path).map_err(|e| MeshError::file(path, e))?;
    let meta = file.metadata().map_err(|e| MeshError::file(path, e))?;
    if !meta.is_file() {
        return Err(MeshError::file(
            path,
            io::Error::new(io::ErrorKind::InvalidInput, "not a regular file"),
        ));
    }

    let mut contents = Vec::with_capacity(meta.len() as usize);
    file.read_to_end(&mut contents)
        .map_err(|e| MeshError::file(path, e))?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok((file_name, contents))
}
