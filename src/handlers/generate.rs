//! Generation handlers
//!
//! Both endpoints fetch the selected blobs in order, then hand them to the
//! prompt pipeline. Field validation happens before any remote call.

use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use testsmith_core::contract::RepositoryCoordinate;
use testsmith_core::{prompt, retrieve};
use tracing::info;

use super::{coordinate, non_blank, parse_body, require_credential};
use crate::error::AppError;
use crate::AppState;

const SUMMARY_INVALID: &str = "Missing required information.";
const CODE_INVALID: &str = "Missing required information for code generation.";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRequest {
    pub owner: Option<String>,
    pub repo: Option<String>,
    pub file_shas: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeRequest {
    pub owner: Option<String>,
    pub repo: Option<String>,
    pub file_shas: Option<Vec<String>>,
    pub selected_summary: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub summaries: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct CodeResponse {
    pub code: String,
}

/// Non-empty list of non-blank blob ids, trimmed.
fn blob_ids(shas: &Option<Vec<String>>, message: &str) -> Result<Vec<String>, AppError> {
    let shas = shas.as_deref().unwrap_or_default();
    if shas.is_empty() || shas.iter().any(|s| s.trim().is_empty()) {
        return Err(AppError::Validation(message.to_string()));
    }
    Ok(shas.iter().map(|s| s.trim().to_string()).collect())
}

fn summary_target(request: &SummaryRequest) -> Result<(RepositoryCoordinate, Vec<String>), AppError> {
    let repo = coordinate(&request.owner, &request.repo, SUMMARY_INVALID)?;
    let ids = blob_ids(&request.file_shas, SUMMARY_INVALID)?;
    Ok((repo, ids))
}

/// POST /api/generate-summary
pub async fn generate_summary(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    let credential = require_credential(&req, &state)?;
    let request: SummaryRequest = parse_body(&body, SUMMARY_INVALID)?;
    let (repo, ids) = summary_target(&request)?;

    info!(%repo, files = ids.len(), "[SUMMARY] Generating test case summaries");
    let files = retrieve::fetch_contents(state.hosting.as_ref(), &credential, &repo, &ids)
        .await
        .map_err(|e| AppError::from_pipeline(e, "Failed to generate summaries"))?;
    let summaries = prompt::summarize(state.generator.as_ref(), &files)
        .await
        .map_err(|e| AppError::from_pipeline(e, "Failed to generate summaries"))?;

    Ok(HttpResponse::Ok().json(SummaryResponse { summaries }))
}

/// POST /api/generate-code
pub async fn generate_code(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    let credential = require_credential(&req, &state)?;
    let request: CodeRequest = parse_body(&body, CODE_INVALID)?;
    let repo = coordinate(&request.owner, &request.repo, CODE_INVALID)?;
    let ids = blob_ids(&request.file_shas, CODE_INVALID)?;
    let summary = non_blank(&request.selected_summary)
        .ok_or_else(|| AppError::Validation(CODE_INVALID.to_string()))?;

    info!(%repo, files = ids.len(), "[CODE] Generating test code");
    let files = retrieve::fetch_contents(state.hosting.as_ref(), &credential, &repo, &ids)
        .await
        .map_err(|e| AppError::from_pipeline(e, "Failed to generate code"))?;
    let artifact = prompt::generate_code(state.generator.as_ref(), &state.prompt, &files, summary)
        .await
        .map_err(|e| AppError::from_pipeline(e, "Failed to generate code"))?;

    Ok(HttpResponse::Ok().json(CodeResponse {
        code: artifact.code,
    }))
}

/// Mounted under `/api`.
pub fn configure_generate_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/generate-summary").route(web::post().to(generate_summary)));
    cfg.service(web::resource("/generate-code").route(web::post().to(generate_code)));
}
