//! Client for the remote, Hugging-Face-style model registry. Enumerates the
//! files in a repository revision and streams individual file bodies.
//!
//! Mirrors the teacher's `external::s3::get_client` pattern: a single
//! `reqwest::Client` built once and shared behind an `Arc`.

use std::sync::Arc;

use bytes::Bytes;
use futures::Stream;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct TreeEntry {
    pub path: String,
    #[serde(rename = "type")]
    pub entry_type: String,
    #[allow(dead_code)]
    pub size: Option<u64>,
}

#[derive(Debug)]
pub enum RegistryError {
    /// Tree endpoint returned a non-success status, or its body did not
    /// parse as the expected JSON array.
    ListFailed { repo: String, rev: String, message: String },
    /// Blob endpoint returned a non-success status or had no body. Callers
    /// treat this as a per-file, non-fatal condition.
    FetchFailed { repo: String, rev: String, path: String, message: String },
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryError::ListFailed { repo, rev, message } => {
                write!(f, "failed to list {repo}@{rev}: {message}")
            }
            RegistryError::FetchFailed { repo, rev, path, message } => {
                write!(f, "failed to fetch {repo}@{rev}/{path}: {message}")
            }
        }
    }
}

impl std::error::Error for RegistryError {}

pub struct RegistryClient {
    http: Arc<reqwest::Client>,
    host: String,
}

impl RegistryClient {
    pub fn new(http: Arc<reqwest::Client>, host: String) -> Self {
        Self { http, host }
    }

    /// Lists the file paths in `repo` at `rev`, in the order the registry
    /// returns them, filtered to entries whose type is `"file"`.
    pub async fn list(&self, repo: &str, rev: &str) -> Result<Vec<String>, RegistryError> {
        let url = format!("{}/api/models/{repo}/tree/{rev}", self.host);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|err| RegistryError::ListFailed {
                repo: repo.to_string(),
                rev: rev.to_string(),
                message: err.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(RegistryError::ListFailed {
                repo: repo.to_string(),
                rev: rev.to_string(),
                message: format!("tree endpoint returned {}", response.status()),
            });
        }

        let entries: Vec<TreeEntry> =
            response
                .json()
                .await
                .map_err(|err| RegistryError::ListFailed {
                    repo: repo.to_string(),
                    rev: rev.to_string(),
                    message: format!("unparseable tree response: {err}"),
                })?;

        Ok(entries
            .into_iter()
            .filter(|entry| entry.entry_type == "file")
            .map(|entry| entry.path)
            .collect())
    }

    /// Opens `path` within `repo`@`rev` as a byte-chunk stream. A non-success
    /// status is surfaced as `RegistryError::FetchFailed`; callers skip the
    /// file rather than treating this as fatal.
    pub async fn open(
        &self,
        repo: &str,
        rev: &str,
        path: &str,
    ) -> Result<impl Stream<Item = reqwest::Result<Bytes>>, RegistryError> {
        let url = format!("{}/{repo}/resolve/{rev}/{path}", self.host);
        let response = self.http.get(&url).send().await.map_err(|err| {
            RegistryError::FetchFailed {
                repo: repo.to_string(),
                rev: rev.to_string(),
                path: path.to_string(),
                message: err.to_string(),
            }
        })?;

        if !response.status().is_success() {
            return Err(RegistryError::FetchFailed {
                repo: repo.to_string(),
                rev: rev.to_string(),
                path: path.to_string(),
                message: format!("blob endpoint returned {}", response.status()),
            });
        }

        Ok(response.bytes_stream())
    }
}
