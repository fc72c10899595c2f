//! HTTP handlers for the OAuth flow and the generation pipeline.

pub mod auth;
pub mod generate;
pub mod pulls;
pub mod repos;

use actix_web::{web, HttpRequest, HttpResponse};
use serde::de::DeserializeOwned;
use testsmith_core::contract::{Credential, RepositoryCoordinate};
use testsmith_core::session::SessionId;

use crate::error::AppError;
use crate::AppState;

pub use auth::configure_auth_routes;
pub use generate::configure_generate_routes;
pub use pulls::configure_pull_routes;
pub use repos::configure_repo_routes;

/// Cookie carrying the caller's session identifier.
pub const SESSION_COOKIE: &str = "testsmith_session";

/// Health check endpoint
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "testsmith"
    }))
}

/// Registers every route the service exposes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check));
    cfg.service(web::scope("/auth").configure(configure_auth_routes));
    cfg.service(
        web::scope("/api")
            .configure(configure_repo_routes)
            .configure(configure_generate_routes)
            .configure(configure_pull_routes),
    );
}

/// Session identifier presented by the caller, if any.
pub(crate) fn session_id(req: &HttpRequest) -> Option<SessionId> {
    req.cookie(SESSION_COOKIE)
        .map(|c| SessionId::from(c.value()))
}

/// Resolves the caller's credential from its session cookie.
pub(crate) fn require_credential(
    req: &HttpRequest,
    state: &AppState,
) -> Result<Credential, AppError> {
    session_id(req)
        .and_then(|id| state.sessions.get(&id))
        .ok_or(AppError::Unauthenticated)
}

/// Parses a JSON request body. Protected handlers call this only after the
/// credential check so that unauthenticated callers always see 401.
pub(crate) fn parse_body<T: DeserializeOwned>(body: &[u8], message: &str) -> Result<T, AppError> {
    serde_json::from_slice(body).map_err(|e| {
        tracing::debug!(error = %e, "Rejecting unparseable request body");
        AppError::Validation(message.to_string())
    })
}

/// Returns the trimmed value when present and non-blank.
pub(crate) fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Builds the repository coordinate from `owner`/`repo` fields, rejecting blanks.
pub(crate) fn coordinate(
    owner: &Option<String>,
    repo: &Option<String>,
    message: &str,
) -> Result<RepositoryCoordinate, AppError> {
    match (non_blank(owner), non_blank(repo)) {
        (Some(owner), Some(repo)) => Ok(RepositoryCoordinate::new(owner, repo)),
        _ => Err(AppError::Validation(message.to_string())),
    }
}
