//! GitHub REST API client: implements `HostingClient` and `OAuthProvider` over reqwest.
//!
//! # GitHub integration
//!
//! [`GitHubClient`] wires the [`HostingClient`] trait to the public GitHub REST API
//! (repositories, git data, contents, pulls) and the [`OAuthProvider`] trait to the
//! OAuth web flow of a GitHub OAuth app.
//!
//! - The bearer credential is supplied per call; the client itself holds only the
//!   app settings from [`GitHubConfig`].
//! - Non-2xx responses become [`HostingError::Status`] with the response body kept
//!   for the operator log.
//! - Base URLs are configurable so the client can be pointed at GitHub Enterprise or
//!   a local stand-in.
//! - Owner, repository, branch and file path components are appended as URL path
//!   segments, so `#`, `?` and `%` in a name are percent-encoded instead of ending
//!   the path early. A `/` inside a branch or file path still separates segments.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use crate::config::GitHubConfig;
use crate::contract::{
    Blob, Credential, FileEntry, HostingClient, NewFileCommit, NewPullRequest, OAuthProvider,
    PullRequest, RepositoryCoordinate, RepositoryDescriptor, Tree,
};
use crate::error::HostingError;

const API_VERSION: &str = "2022-11-28";

pub struct GitHubClient {
    http: Client,
    config: GitHubConfig,
    api_base: Url,
}

#[derive(Deserialize)]
struct RepoInfo {
    #[serde(default)]
    default_branch: Option<String>,
}

#[derive(Deserialize)]
struct RefInfo {
    object: RefObject,
}

#[derive(Deserialize)]
struct RefObject {
    sha: String,
}

#[derive(Deserialize)]
struct TreeResponse {
    #[serde(default)]
    tree: Vec<FileEntry>,
    #[serde(default)]
    truncated: bool,
}

#[derive(Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

impl GitHubClient {
    pub fn new(config: GitHubConfig) -> Result<Self, HostingError> {
        let api_base = Url::parse(&config.api_base)
            .map_err(|e| HostingError::InvalidBaseUrl(format!("{}: {e}", config.api_base)))?;
        if api_base.cannot_be_a_base() {
            return Err(HostingError::InvalidBaseUrl(config.api_base.clone()));
        }
        let http = Client::builder().user_agent(config.user_agent.clone()).build()?;
        config.trace_loaded();
        Ok(Self {
            http,
            config,
            api_base,
        })
    }

    /// Appends each segment to the API base, percent-encoding as needed.
    fn api_url<I>(&self, segments: I) -> Url
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut url = self.api_base.clone();
        // always Ok: `new` rejects cannot-be-a-base URLs
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn repo_url(&self, repo: &RepositoryCoordinate, rest: &[&str]) -> Url {
        let head = ["repos", repo.owner(), repo.name()];
        self.api_url(head.iter().chain(rest).copied())
    }

    /// `/repos/{owner}/{repo}/{prefix..}/{name split on '/'}`
    fn repo_path_url(&self, repo: &RepositoryCoordinate, prefix: &[&str], name: &str) -> Url {
        let mut rest = prefix.to_vec();
        rest.extend(name.split('/').filter(|s| !s.is_empty()));
        self.repo_url(repo, &rest)
    }

    fn authed(&self, req: RequestBuilder, credential: &Credential) -> RequestBuilder {
        req.bearer_auth(credential.expose())
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
    }

    async fn send(&self, req: RequestBuilder) -> Result<Response, HostingError> {
        let resp = req.send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp
            .text()
            .await
            .unwrap_or_else(|_| String::from("<failed to read response body>"));
        tracing::debug!(status = %status, body = %body, "GitHub API returned error status");
        Err(HostingError::Status {
            status: status.as_u16(),
            body,
        })
    }

    async fn send_json<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, HostingError> {
        let resp = self.send(req).await?;
        resp.json::<T>()
            .await
            .map_err(|e| HostingError::Decode(e.to_string()))
    }
}

#[async_trait]
impl HostingClient for GitHubClient {
    async fn list_repositories(
        &self,
        credential: &Credential,
    ) -> Result<Vec<RepositoryDescriptor>, HostingError> {
        tracing::info!("Listing repositories for authenticated user");
        let req = self.http.get(self.api_url(["user", "repos"]));
        let repos: Vec<RepositoryDescriptor> = self.send_json(self.authed(req, credential)).await?;
        tracing::info!(count = repos.len(), "Fetched repositories");
        Ok(repos)
    }

    async fn default_branch(
        &self,
        credential: &Credential,
        repo: &RepositoryCoordinate,
    ) -> Result<Option<String>, HostingError> {
        let req = self.http.get(self.repo_url(repo, &[]));
        let info: RepoInfo = self.send_json(self.authed(req, credential)).await?;
        Ok(info.default_branch)
    }

    async fn branch_head(
        &self,
        credential: &Credential,
        repo: &RepositoryCoordinate,
        branch: &str,
    ) -> Result<String, HostingError> {
        let req = self
            .http
            .get(self.repo_path_url(repo, &["git", "ref", "heads"], branch));
        let r: RefInfo = self.send_json(self.authed(req, credential)).await?;
        Ok(r.object.sha)
    }

    async fn get_tree(
        &self,
        credential: &Credential,
        repo: &RepositoryCoordinate,
        tree_ish: &str,
    ) -> Result<Tree, HostingError> {
        let req = self
            .http
            .get(self.repo_path_url(repo, &["git", "trees"], tree_ish))
            .query(&[("recursive", "1")]);
        let t: TreeResponse = self.send_json(self.authed(req, credential)).await?;
        Ok(Tree {
            entries: t.tree,
            truncated: t.truncated,
        })
    }

    async fn get_blob(
        &self,
        credential: &Credential,
        repo: &RepositoryCoordinate,
        sha: &str,
    ) -> Result<Blob, HostingError> {
        let req = self.http.get(self.repo_url(repo, &["git", "blobs", sha]));
        self.send_json(self.authed(req, credential)).await
    }

    async fn create_branch(
        &self,
        credential: &Credential,
        repo: &RepositoryCoordinate,
        branch: &str,
        sha: &str,
    ) -> Result<(), HostingError> {
        let req = self
            .http
            .post(self.repo_url(repo, &["git", "refs"]))
            .json(&json!({ "ref": format!("refs/heads/{branch}"), "sha": sha }));
        self.send(self.authed(req, credential)).await?;
        Ok(())
    }

    async fn delete_branch(
        &self,
        credential: &Credential,
        repo: &RepositoryCoordinate,
        branch: &str,
    ) -> Result<(), HostingError> {
        let req = self
            .http
            .delete(self.repo_path_url(repo, &["git", "refs", "heads"], branch));
        self.send(self.authed(req, credential)).await?;
        Ok(())
    }

    async fn put_file(
        &self,
        credential: &Credential,
        repo: &RepositoryCoordinate,
        commit: NewFileCommit,
    ) -> Result<(), HostingError> {
        let req = self
            .http
            .put(self.repo_path_url(repo, &["contents"], &commit.path))
            .json(&json!({
                "message": commit.message,
                "content": commit.content_base64,
                "branch": commit.branch,
            }));
        self.send(self.authed(req, credential)).await?;
        Ok(())
    }

    async fn create_pull_request(
        &self,
        credential: &Credential,
        repo: &RepositoryCoordinate,
        pull: NewPullRequest,
    ) -> Result<PullRequest, HostingError> {
        let req = self.http.post(self.repo_url(repo, &["pulls"])).json(&json!({
            "title": pull.title,
            "head": pull.head,
            "base": pull.base,
            "body": pull.body,
        }));
        self.send_json(self.authed(req, credential)).await
    }
}

#[async_trait]
impl OAuthProvider for GitHubClient {
    fn authorize_url(&self) -> String {
        format!(
            "{}/login/oauth/authorize?client_id={}&scope={}",
            self.config.web_base.trim_end_matches('/'),
            self.config.client_id,
            self.config.oauth_scope
        )
    }

    async fn exchange_code(&self, code: &str) -> Result<Credential, HostingError> {
        let url = format!(
            "{}/login/oauth/access_token",
            self.config.web_base.trim_end_matches('/')
        );
        let req = self
            .http
            .post(url)
            .header("Accept", "application/json")
            .json(&json!({
                "client_id": self.config.client_id,
                "client_secret": self.config.client_secret,
                "code": code,
            }));
        let token: TokenResponse = self.send_json(req).await?;
        match token.access_token {
            Some(t) if !t.is_empty() => {
                tracing::info!("Obtained access token from OAuth exchange");
                Ok(Credential::new(t))
            }
            _ => {
                let reason = token
                    .error_description
                    .or(token.error)
                    .unwrap_or_else(|| "no access_token in response".to_string());
                tracing::error!(reason = %reason, "OAuth exchange returned no token");
                Err(HostingError::Decode(reason))
            }
        }
    }
}
