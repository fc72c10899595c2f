//! Publishing pipeline: generated code → branch → commit → pull request.
//!
//! The hosting platform offers no cross-request atomicity, so publishing is run as a
//! saga over five strictly ordered steps:
//!
//!   1. resolve the default branch
//!   2. resolve the commit at its tip
//!   3. create the new branch at that commit
//!   4. commit the file on the new branch
//!   5. open a pull request from the new branch into the default branch
//!
//! The default branch is resolved exactly once and used both as the base of the new
//! branch and as the pull request's target.
//!
//! # Failure and compensation
//! Any failing step aborts the remaining ones. Once step 3 has succeeded a failure
//! leaves a branch behind, so the saga tries to delete it. If that also fails the
//! error is [`PipelineError::PartiallyPublished`], carrying the branch name so it can
//! be cleaned up by hand.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::{error, info, warn};

use crate::contract::{Credential, HostingClient, NewFileCommit, NewPullRequest, RepositoryCoordinate};
use crate::error::{HostingError, PipelineError};

/// The five publish steps, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishStep {
    ResolveDefaultBranch,
    ResolveBaseCommit,
    CreateBranch,
    CommitFile,
    OpenPullRequest,
}

impl fmt::Display for PublishStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PublishStep::ResolveDefaultBranch => "resolve default branch",
            PublishStep::ResolveBaseCommit => "resolve base commit",
            PublishStep::CreateBranch => "create branch",
            PublishStep::CommitFile => "commit file",
            PublishStep::OpenPullRequest => "open pull request",
        };
        f.write_str(s)
    }
}

/// Progress of a publish run. Only moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PublishState {
    Pending,
    Resolved,
    BranchCreated,
    FileCommitted,
    PrOpened,
}

/// Everything needed to publish one generated artifact.
#[derive(Debug, Clone)]
pub struct PublishRequest {
    pub repo: RepositoryCoordinate,
    pub file_path: String,
    pub branch: String,
    pub content: String,
    pub commit_message: String,
    pub pr_title: String,
    pub pr_body: String,
}

/// Outcome of a successful publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReceipt {
    pub pr_url: String,
    pub pr_number: u64,
    pub branch: String,
    pub base_branch: String,
}

/// Record of a single saga run: the state reached and the steps that completed.
#[derive(Debug)]
struct Journal {
    state: PublishState,
    completed: Vec<PublishStep>,
}

impl Journal {
    fn new() -> Self {
        Self {
            state: PublishState::Pending,
            completed: Vec::with_capacity(5),
        }
    }

    fn record(&mut self, step: PublishStep) {
        self.completed.push(step);
        self.state = match step {
            PublishStep::ResolveDefaultBranch => self.state,
            PublishStep::ResolveBaseCommit => PublishState::Resolved,
            PublishStep::CreateBranch => PublishState::BranchCreated,
            PublishStep::CommitFile => PublishState::FileCommitted,
            PublishStep::OpenPullRequest => PublishState::PrOpened,
        };
    }

    fn branch_created(&self) -> bool {
        self.state >= PublishState::BranchCreated
    }
}

/// Runs the publish saga for `req`.
pub async fn publish<H>(
    client: &H,
    credential: &Credential,
    req: &PublishRequest,
) -> Result<PublishReceipt, PipelineError>
where
    H: HostingClient + ?Sized,
{
    let repo = &req.repo;
    let mut journal = Journal::new();
    info!(repo = %repo, branch = %req.branch, path = %req.file_path, "[PUBLISH] Starting publish");

    // Step 1
    let base_branch = match client.default_branch(credential, repo).await {
        Ok(Some(b)) if !b.is_empty() => b,
        Ok(_) => {
            let missing = HostingError::Decode(format!("repository {repo} reports no default branch"));
            return Err(fail(&journal, PublishStep::ResolveDefaultBranch, missing));
        }
        Err(e) => return Err(fail(&journal, PublishStep::ResolveDefaultBranch, e)),
    };
    journal.record(PublishStep::ResolveDefaultBranch);
    info!(repo = %repo, base_branch = %base_branch, "[PUBLISH] Resolved default branch");

    // Step 2
    let base_sha = match client.branch_head(credential, repo, &base_branch).await {
        Ok(sha) => sha,
        Err(e) => return Err(fail(&journal, PublishStep::ResolveBaseCommit, e)),
    };
    journal.record(PublishStep::ResolveBaseCommit);
    info!(repo = %repo, base_sha = %base_sha, "[PUBLISH] Resolved base commit");

    // Step 3
    if let Err(e) = client
        .create_branch(credential, repo, &req.branch, &base_sha)
        .await
    {
        return Err(fail(&journal, PublishStep::CreateBranch, e));
    }
    journal.record(PublishStep::CreateBranch);
    info!(repo = %repo, branch = %req.branch, "[PUBLISH] Created branch");

    // Step 4
    let commit = NewFileCommit {
        path: req.file_path.clone(),
        branch: req.branch.clone(),
        message: req.commit_message.clone(),
        content_base64: STANDARD.encode(req.content.as_bytes()),
    };
    if let Err(e) = client.put_file(credential, repo, commit).await {
        let cause = fail(&journal, PublishStep::CommitFile, e);
        return Err(compensate(client, credential, req, &journal, cause).await);
    }
    journal.record(PublishStep::CommitFile);
    info!(repo = %repo, path = %req.file_path, "[PUBLISH] Committed file");

    // Step 5
    let pull = NewPullRequest {
        title: req.pr_title.clone(),
        head: req.branch.clone(),
        base: base_branch.clone(),
        body: req.pr_body.clone(),
    };
    let pr = match client.create_pull_request(credential, repo, pull).await {
        Ok(pr) => pr,
        Err(e) => {
            let cause = fail(&journal, PublishStep::OpenPullRequest, e);
            return Err(compensate(client, credential, req, &journal, cause).await);
        }
    };
    journal.record(PublishStep::OpenPullRequest);
    info!(repo = %repo, pr_number = pr.number, pr_url = %pr.html_url, "[PUBLISH] Opened pull request");

    Ok(PublishReceipt {
        pr_url: pr.html_url,
        pr_number: pr.number,
        branch: req.branch.clone(),
        base_branch,
    })
}

fn fail(journal: &Journal, step: PublishStep, source: HostingError) -> PipelineError {
    error!(
        step = %step,
        state = ?journal.state,
        completed = ?journal.completed,
        error = %source,
        "[PUBLISH][ERROR] Step failed"
    );
    PipelineError::PublishFailed { step, source }
}

/// Undo step 3 after a later step failed. Turns `cause` into `PartiallyPublished`
/// when the branch cannot be removed.
async fn compensate<H>(
    client: &H,
    credential: &Credential,
    req: &PublishRequest,
    journal: &Journal,
    cause: PipelineError,
) -> PipelineError
where
    H: HostingClient + ?Sized,
{
    if !journal.branch_created() {
        return cause;
    }
    let (step, source) = match cause {
        PipelineError::PublishFailed { step, source } => (step, source),
        other => return other,
    };

    warn!(repo = %req.repo, branch = %req.branch, "[PUBLISH][COMPENSATE] Deleting branch left by failed publish");
    match client.delete_branch(credential, &req.repo, &req.branch).await {
        Ok(()) => {
            info!(branch = %req.branch, "[PUBLISH][COMPENSATE] Branch deleted");
            PipelineError::PublishFailed { step, source }
        }
        Err(e) => {
            error!(
                branch = %req.branch,
                error = %e,
                "[PUBLISH][COMPENSATE][ERROR] Branch could not be deleted, left orphaned"
            );
            PipelineError::PartiallyPublished {
                branch: req.branch.clone(),
                step,
                source,
            }
        }
    }
}
