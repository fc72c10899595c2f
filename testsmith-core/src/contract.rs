//! # contract: data model and collaborator interfaces
//!
//! This module defines the plain data types passed between pipeline stages and the
//! three traits through which the pipeline reaches the outside world:
//!
//! - [`HostingClient`]: the source-hosting platform (tree listing, blobs, refs,
//!   file contents, pull requests).
//! - [`TextGenerator`]: a single-turn prompt-in, text-out generation service.
//! - [`OAuthProvider`]: the authorization-code exchange that yields a [`Credential`].
//!
//! ## Mocking & Testing
//! - Each trait is annotated for `mockall`, exported under the `test-export-mocks`
//!   feature so that the server crate and integration tests can script collaborators.
//!
//! ## Adding New Collaborators
//! - Implement the trait for your platform or service.
//! - Convert transport failures into [`HostingError`] / [`GenerationError`]; the
//!   pipeline stages decide how those surface to callers.

use std::fmt;

use async_trait::async_trait;
use mockall::automock;
use serde::{Deserialize, Serialize};

use crate::error::{GenerationError, HostingError};

/// Bearer token authorizing hosting-platform calls on the user's behalf.
///
/// The `Debug` output never contains the token itself.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential(<redacted, {} chars>)", self.0.len())
    }
}

/// (owner, name) pair identifying a remote repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepositoryCoordinate {
    owner: String,
    name: String,
}

impl RepositoryCoordinate {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for RepositoryCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// One entry of a repository tree. Field names follow the hosting platform's
/// tree format, which is also what callers of the file listing consume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub path: String,
    /// Blob identifier, only meaningful within the originating repository.
    pub sha: String,
    /// `blob`, `tree` or `commit` (submodule).
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

impl FileEntry {
    pub fn is_blob(&self) -> bool {
        self.kind == "blob"
    }
}

/// A recursive tree listing as returned by the hosting platform.
#[derive(Debug, Clone, Default)]
pub struct Tree {
    pub entries: Vec<FileEntry>,
    /// Set when the platform hit its listing limit and omitted entries.
    pub truncated: bool,
}

/// Raw blob as returned by the hosting platform, still transport-encoded.
#[derive(Debug, Clone, Deserialize)]
pub struct Blob {
    pub sha: String,
    pub content: String,
    pub encoding: String,
    #[serde(default)]
    pub url: String,
}

/// Decoded text of one blob, keyed by its identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileContent {
    pub blob_id: String,
    /// Where the blob was fetched from; used as the path marker in prompts.
    pub source_url: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryOwner {
    pub login: String,
}

/// Repository summary as listed for the authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryDescriptor {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    pub owner: RepositoryOwner,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub default_branch: Option<String>,
    pub html_url: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// File creation/update on a branch. `content_base64` is already transport-encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFileCommit {
    pub path: String,
    pub branch: String,
    pub message: String,
    pub content_base64: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPullRequest {
    pub title: String,
    pub head: String,
    pub base: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub html_url: String,
}

/// Generated test code together with the summary that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedArtifact {
    pub summary: String,
    pub code: String,
}

/// Calls against the source-hosting platform, all on behalf of `credential`.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait HostingClient: Send + Sync {
    /// Repositories visible to the authenticated user.
    async fn list_repositories(
        &self,
        credential: &Credential,
    ) -> Result<Vec<RepositoryDescriptor>, HostingError>;

    /// Name of the repository's default branch, `None` if the platform reports none.
    async fn default_branch(
        &self,
        credential: &Credential,
        repo: &RepositoryCoordinate,
    ) -> Result<Option<String>, HostingError>;

    /// Commit SHA at the tip of `branch`.
    async fn branch_head(
        &self,
        credential: &Credential,
        repo: &RepositoryCoordinate,
        branch: &str,
    ) -> Result<String, HostingError>;

    /// Recursive tree listing at `tree_ish` (branch name or tree SHA).
    async fn get_tree(
        &self,
        credential: &Credential,
        repo: &RepositoryCoordinate,
        tree_ish: &str,
    ) -> Result<Tree, HostingError>;

    async fn get_blob(
        &self,
        credential: &Credential,
        repo: &RepositoryCoordinate,
        sha: &str,
    ) -> Result<Blob, HostingError>;

    /// Create `refs/heads/{branch}` pointing at `sha`.
    async fn create_branch(
        &self,
        credential: &Credential,
        repo: &RepositoryCoordinate,
        branch: &str,
        sha: &str,
    ) -> Result<(), HostingError>;

    async fn delete_branch(
        &self,
        credential: &Credential,
        repo: &RepositoryCoordinate,
        branch: &str,
    ) -> Result<(), HostingError>;

    /// Create or update a single file on a branch, producing one commit.
    async fn put_file(
        &self,
        credential: &Credential,
        repo: &RepositoryCoordinate,
        commit: NewFileCommit,
    ) -> Result<(), HostingError>;

    async fn create_pull_request(
        &self,
        credential: &Credential,
        repo: &RepositoryCoordinate,
        pull: NewPullRequest,
    ) -> Result<PullRequest, HostingError>;
}

/// Single-turn text generation: prompt in, plain text out.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

/// OAuth authorization-code flow against the hosting platform.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait OAuthProvider: Send + Sync {
    /// URL the user agent is redirected to in order to start authorization.
    fn authorize_url(&self) -> String;

    /// Exchange a temporary authorization code for a bearer credential.
    async fn exchange_code(&self, code: &str) -> Result<Credential, HostingError>;
}
