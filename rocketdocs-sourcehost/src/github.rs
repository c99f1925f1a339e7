//! A real [`SourceHost`] backed by the public GitHub "contents" REST API.

use async_trait::async_trait;
use base64::Engine;
use rocketdocs_core::error::CoreError;
use rocketdocs_core::sourcehost::{EntryKind, RepoHandle, SourceEntry, SourceHost};
use serde::Deserialize;
use tracing::instrument;

const API_BASE: &str = "https://api.github.com";

pub struct GitHubSourceHost {
    http: reqwest::Client,
    token: Option<String>,
}

impl GitHubSourceHost {
    pub fn new(token: Option<String>) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("rocketdocs")
            .build()
            .expect("reqwest client configuration is always valid here");
        Self { http, token }
    }

    fn request(&self, url: &str) -> reqwest::RequestBuilder {
        let builder = self.http.get(url).header("Accept", "application/vnd.github+json");
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Parse `owner/repo` out of a GitHub URL, tolerating `.git` suffixes
    /// and trailing slashes.
    fn parse_owner_repo(url: &str) -> Result<(String, String), CoreError> {
        let trimmed = url.trim().trim_end_matches('/').trim_end_matches(".git");
        let after_host = trimmed
            .rsplit_once("github.com")
            .map(|(_, rest)| rest.trim_start_matches('/'))
            .ok_or_else(|| CoreError::InvalidUrl(url.to_string()))?;
        let mut parts = after_host.splitn(2, '/');
        let owner = parts.next().filter(|s| !s.is_empty());
        let repo = parts.next().filter(|s| !s.is_empty());
        match (owner, repo) {
            (Some(owner), Some(repo)) => Ok((owner.to_string(), repo.to_string())),
            _ => Err(CoreError::InvalidUrl(url.to_string())),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RepoMeta {
    full_name: String,
    html_url: String,
    default_branch: String,
}

#[derive(Debug, Deserialize)]
struct ContentEntry {
    name: String,
    path: String,
    html_url: String,
    #[serde(rename = "type")]
    kind: String,
    size: Option<u64>,
    content: Option<String>,
    encoding: Option<String>,
}

fn to_upstream(message: impl Into<String>) -> CoreError {
    CoreError::UpstreamIo { source: "github".to_string(), message: message.into() }
}

#[async_trait]
impl SourceHost for GitHubSourceHost {
    #[instrument(skip(self))]
    async fn resolve(&self, url: &str) -> Result<RepoHandle, CoreError> {
        let (owner, repo) = Self::parse_owner_repo(url)?;
        let meta_url = format!("{API_BASE}/repos/{owner}/{repo}");
        let response = self.request(&meta_url).send().await.map_err(|e| to_upstream(e.to_string()))?;
        if !response.status().is_success() {
            return Err(CoreError::InvalidUrl(url.to_string()));
        }
        let meta: RepoMeta = response.json().await.map_err(|e| to_upstream(e.to_string()))?;
        Ok(RepoHandle { full_name: meta.full_name, html_url: meta.html_url, version: Some(meta.default_branch) })
    }

    #[instrument(skip(self))]
    async fn list_children(
        &self,
        repo: &RepoHandle,
        relative_path: &str,
    ) -> Result<Vec<SourceEntry>, CoreError> {
        let contents_url = format!(
            "{API_BASE}/repos/{}/contents/{}{}",
            repo.full_name,
            relative_path,
            repo.version.as_deref().map(|v| format!("?ref={v}")).unwrap_or_default()
        );
        let response =
            self.request(&contents_url).send().await.map_err(|e| to_upstream(e.to_string()))?;
        if !response.status().is_success() {
            let status = response.status();
            return Err(to_upstream(format!("listing {relative_path} failed with status {status}")));
        }
        let entries: Vec<ContentEntry> =
            response.json().await.map_err(|e| to_upstream(e.to_string()))?;

        Ok(entries
            .into_iter()
            .map(|entry| {
                let content = match (entry.content, entry.encoding.as_deref()) {
                    (Some(encoded), Some("base64")) => base64::engine::general_purpose::STANDARD
                        .decode(encoded.replace('\n', ""))
                        .ok(),
                    _ => None,
                };
                SourceEntry {
                    name: entry.name,
                    path: entry.path,
                    html_url: entry.html_url,
                    kind: if entry.kind == "dir" { EntryKind::Dir } else { EntryKind::File },
                    size: entry.size,
                    content,
                }
            })
            .collect())
    }

    #[instrument(skip(self, entry))]
    async fn fetch_content(
        &self,
        repo: &RepoHandle,
        entry: &SourceEntry,
    ) -> Result<Vec<u8>, CoreError> {
        if let Some(content) = &entry.content {
            return Ok(content.clone());
        }
        let contents_url = format!(
            "{API_BASE}/repos/{}/contents/{}{}",
            repo.full_name,
            entry.path,
            repo.version.as_deref().map(|v| format!("?ref={v}")).unwrap_or_default()
        );
        let response =
            self.request(&contents_url).send().await.map_err(|e| to_upstream(e.to_string()))?;
        if !response.status().is_success() {
            return Err(to_upstream(format!("fetching {} failed", entry.path)));
        }
        let parsed: ContentEntry = response.json().await.map_err(|e| to_upstream(e.to_string()))?;
        let encoded = parsed.content.ok_or_else(|| to_upstream("file content missing in response"))?;
        base64::engine::general_purpose::STANDARD
            .decode(encoded.replace('\n', ""))
            .map_err(|e| to_upstream(e.to_string()))
    }
}
