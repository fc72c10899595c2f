//! Pull request handler
//!
//! Publishes generated code as a new branch, a single-file commit and a pull
//! request into the repository's default branch.

use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use testsmith_core::publish::{self, PublishRequest};
use tracing::info;

use super::{coordinate, non_blank, parse_body, require_credential};
use crate::error::AppError;
use crate::AppState;

pub const DEFAULT_COMMIT_MESSAGE: &str = "Add generated test case";
pub const DEFAULT_PR_TITLE: &str = "Add generated test case";

const CREATE_PR_INVALID: &str = "Owner, repo and code are required";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePrRequest {
    pub owner: Option<String>,
    pub repo: Option<String>,
    pub file_name: Option<String>,
    pub branch_name: Option<String>,
    pub code: Option<String>,
    pub commit_message: Option<String>,
    pub pr_title: Option<String>,
    pub pr_body: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePrResponse {
    pub pr_url: String,
}

fn short_token() -> String {
    let mut token = uuid::Uuid::new_v4().simple().to_string();
    token.truncate(8);
    token
}

impl CreatePrRequest {
    /// Validates required fields and fills in defaults for the optional ones.
    pub fn into_publish(self) -> Result<PublishRequest, AppError> {
        let repo = coordinate(&self.owner, &self.repo, CREATE_PR_INVALID)?;
        let content = match self.code {
            Some(code) if !code.trim().is_empty() => code,
            _ => return Err(AppError::Validation(CREATE_PR_INVALID.to_string())),
        };

        let token = short_token();
        let file_path = non_blank(&self.file_name)
            .map(|p| p.trim_start_matches('/').to_string())
            .unwrap_or_else(|| format!("tests/generated-{token}.spec.js"));
        let branch = non_blank(&self.branch_name)
            .map(str::to_string)
            .unwrap_or_else(|| format!("testsmith/test-{token}"));

        Ok(PublishRequest {
            repo,
            file_path,
            branch,
            content,
            commit_message: non_blank(&self.commit_message)
                .unwrap_or(DEFAULT_COMMIT_MESSAGE)
                .to_string(),
            pr_title: non_blank(&self.pr_title)
                .unwrap_or(DEFAULT_PR_TITLE)
                .to_string(),
            pr_body: self.pr_body.unwrap_or_default(),
        })
    }
}

/// POST /api/create-pr
pub async fn create_pr(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    let credential = require_credential(&req, &state)?;
    let request: CreatePrRequest = parse_body(&body, CREATE_PR_INVALID)?;
    let publish_request = request.into_publish()?;

    let receipt = publish::publish(state.hosting.as_ref(), &credential, &publish_request)
        .await
        .map_err(|e| AppError::from_pipeline(e, "Failed to create pull request."))?;

    info!(
        repo = %publish_request.repo,
        pr_number = receipt.pr_number,
        "[PUBLISH] Pull request opened"
    );
    Ok(HttpResponse::Ok().json(CreatePrResponse {
        pr_url: receipt.pr_url,
    }))
}

/// Mounted under `/api`.
pub fn configure_pull_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/create-pr").route(web::post().to(create_pr)));
}
