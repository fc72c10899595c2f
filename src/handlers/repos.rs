//! Repository and file listing handlers.

use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use testsmith_core::retrieve;
use tracing::info;

use super::{coordinate, require_credential};
use crate::error::AppError;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct FilesQuery {
    pub owner: Option<String>,
    pub repo: Option<String>,
}

/// GET /api/repos
pub async fn list_repos(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let credential = require_credential(&req, &state)?;

    let repos = state
        .hosting
        .list_repositories(&credential)
        .await
        .map_err(|e| AppError::from_pipeline(e.into(), "Error fetching repositories"))?;

    info!(count = repos.len(), "[REPOS] Listed repositories");
    Ok(HttpResponse::Ok().json(repos))
}

/// GET /api/files?owner=..&repo=..
///
/// Every file (blob) on the repository's default branch.
pub async fn list_files(
    req: HttpRequest,
    state: web::Data<AppState>,
    query: web::Query<FilesQuery>,
) -> Result<HttpResponse, AppError> {
    let credential = require_credential(&req, &state)?;
    let repo = coordinate(&query.owner, &query.repo, "Owner and repo are required")?;

    let files = retrieve::list_files(state.hosting.as_ref(), &credential, &repo)
        .await
        .map_err(|e| AppError::from_pipeline(e, "Error fetching files for the repository"))?;

    Ok(HttpResponse::Ok().json(files))
}

/// Mounted under `/api`.
pub fn configure_repo_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/repos").route(web::get().to(list_repos)));
    cfg.service(web::resource("/files").route(web::get().to(list_files)));
}
