//! # GitHub contents API as a [`ContentStore`]
//!
//! Documents are files on one branch of one repository. A file's version token
//! is the blob `sha` GitHub reports for it, and GitHub itself enforces the
//! conditional write: a `PUT` carrying a stale `sha` is answered `409`.
//!
//! | Operation | Request |
//! |-----------|---------|
//! | `fetch` | `GET /repos/{owner}/{repo}/contents/{path}?ref={branch}`; files the endpoint does not inline (over 1 MB) are read from `GET /repos/{owner}/{repo}/git/blobs/{sha}`. |
//! | `commit` | `PUT /repos/{owner}/{repo}/contents/{path}` with `sha` set to the expected token. |
//! | `create` | The same `PUT` without `sha`. |
//!
//! | Status | Maps to |
//! |--------|---------|
//! | `404` | [`StoreError::NotFound`] |
//! | `409` | [`StoreError::Conflict`] |
//! | `422` on create | [`StoreError::AlreadyExists`] |
//! | anything else unsuccessful | [`StoreError::Backend`] |

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::{Method, RequestBuilder, StatusCode, Url};
use serde::{Deserialize, Serialize};
use store::{ContentStore, StoreError, VersionToken, VersionedDocument};

use crate::settings::StoreSettings;

const USER_AGENT: &str = concat!("secretaria/", env!("CARGO_PKG_VERSION"));
const API_VERSION: &str = "2022-11-28";

#[derive(Clone)]
pub struct GitHubStore {
    client: reqwest::Client,
    api_url: Url,
    owner: String,
    repository: String,
    branch: String,
    token: String,
}

impl std::fmt::Debug for GitHubStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubStore")
            .field("api_url", &self.api_url.as_str())
            .field("owner", &self.owner)
            .field("repository", &self.repository)
            .field("branch", &self.branch)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct ContentsResponse {
    sha: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    encoding: String,
}

#[derive(Deserialize)]
struct BlobResponse {
    content: String,
    encoding: String,
}

#[derive(Serialize)]
struct PutRequest<'a> {
    message: &'a str,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
    branch: &'a str,
}

#[derive(Deserialize)]
struct PutResponse {
    content: PutContent,
}

#[derive(Deserialize)]
struct PutContent {
    sha: String,
}

impl GitHubStore {
    pub fn new(settings: &StoreSettings) -> Result<Self, StoreError> {
        let api_url = Url::parse(settings.api_url.trim_end_matches('/'))
            .map_err(|e| StoreError::Backend(format!("invalid api_url: {e}")))?;
        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = settings.timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(Self {
            client,
            api_url,
            owner: settings.owner.clone(),
            repository: settings.repository.clone(),
            branch: settings.branch.clone(),
            token: settings.token.clone(),
        })
    }

    /// `{api}/repos/{owner}/{repo}/{tail...}`, each segment percent-encoded.
    fn repo_url<'a>(&self, tail: impl IntoIterator<Item = &'a str>) -> Result<Url, StoreError> {
        let mut url = self.api_url.clone();
        url.path_segments_mut()
            .map_err(|_| StoreError::Backend(format!("api_url cannot be a base: {}", self.api_url)))?
            .pop_if_empty()
            .extend(["repos", self.owner.as_str(), self.repository.as_str()])
            .extend(tail);
        Ok(url)
    }

    fn contents_url(&self, path: &str) -> Result<Url, StoreError> {
        self.repo_url(
            std::iter::once("contents").chain(path.split('/').filter(|s| !s.is_empty())),
        )
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client
            .request(method, url)
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
    }

    async fn read_blob(&self, path: &str, sha: &str) -> Result<Vec<u8>, StoreError> {
        let url = self.repo_url(["git", "blobs", sha])?;
        let response = self
            .request(Method::GET, url)
            .send()
            .await
            .map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(status_error(status, path, false, &text));
        }
        let blob: BlobResponse = response.json().await.map_err(transport)?;
        decode_content(&blob.content, &blob.encoding)
    }

    async fn put(
        &self,
        path: &str,
        content: Vec<u8>,
        expected: Option<&VersionToken>,
        message: &str,
    ) -> Result<VersionToken, StoreError> {
        let url = self.contents_url(path)?;
        let body = PutRequest {
            message,
            content: STANDARD.encode(content),
            sha: expected.map(VersionToken::as_str),
            branch: &self.branch,
        };
        let response = self
            .request(Method::PUT, url)
            .json(&body)
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let err = status_error(status, path, expected.is_none(), &text);
            tracing::warn!("GitHub PUT {} answered {}: {}", path, status, err);
            return Err(err);
        }
        let put: PutResponse = response.json().await.map_err(transport)?;
        tracing::info!(
            "Committed {} to {}/{}@{}: {}",
            path,
            self.owner,
            self.repository,
            self.branch,
            message
        );
        Ok(VersionToken::new(put.content.sha))
    }
}

impl ContentStore for GitHubStore {
    async fn fetch(&self, path: &str) -> Result<VersionedDocument, StoreError> {
        let mut url = self.contents_url(path)?;
        url.query_pairs_mut().append_pair("ref", &self.branch);
        tracing::debug!("GitHub GET {}", url);

        let response = self
            .request(Method::GET, url)
            .send()
            .await
            .map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(status_error(status, path, false, &text));
        }

        let file: ContentsResponse = response
            .json()
            .await
            .map_err(|e| StoreError::Backend(format!("{path} is not a file: {e}")))?;
        let content = if file.encoding == "base64" && !file.content.is_empty() {
            decode_content(&file.content, &file.encoding)?
        } else {
            self.read_blob(path, &file.sha).await?
        };

        Ok(VersionedDocument {
            content,
            version: VersionToken::new(file.sha),
        })
    }

    async fn commit(
        &self,
        path: &str,
        content: Vec<u8>,
        expected: &VersionToken,
        message: &str,
    ) -> Result<VersionToken, StoreError> {
        self.put(path, content, Some(expected), message).await
    }

    async fn create(
        &self,
        path: &str,
        content: Vec<u8>,
        message: &str,
    ) -> Result<VersionToken, StoreError> {
        self.put(path, content, None, message).await
    }
}

fn transport(e: reqwest::Error) -> StoreError {
    tracing::error!("GitHub request failed: {}", e);
    StoreError::Backend(e.to_string())
}

/// GitHub wraps base64 payloads at 60 columns.
fn decode_content(content: &str, encoding: &str) -> Result<Vec<u8>, StoreError> {
    if encoding != "base64" {
        return Err(StoreError::Backend(format!(
            "unsupported content encoding {encoding:?}"
        )));
    }
    let compact: String = content.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    STANDARD
        .decode(compact)
        .map_err(|e| StoreError::Backend(format!("invalid base64 content: {e}")))
}

fn status_error(status: StatusCode, path: &str, creating: bool, body: &str) -> StoreError {
    let path = path.to_string();
    match status {
        StatusCode::NOT_FOUND => StoreError::NotFound { path },
        StatusCode::CONFLICT => StoreError::Conflict { path },
        StatusCode::UNPROCESSABLE_ENTITY if creating => StoreError::AlreadyExists { path },
        _ => StoreError::Backend(format!("GitHub answered {status} for {path}: {body}")),
    }
}
