//! OAuth handlers
//!
//! Start the GitHub authorization flow, finish it by exchanging the code for a
//! credential bound to a session, and end the session on logout.

use actix_web::cookie::{Cookie, SameSite};
use actix_web::http::header;
use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use testsmith_core::PipelineError;
use tracing::{info, warn};

use super::{session_id, SESSION_COOKIE};
use crate::error::AppError;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
}

fn session_cookie(value: String) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, value)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .finish()
}

/// GET /auth/github
///
/// Redirects the user agent to GitHub's authorization page.
pub async fn github_login(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, state.oauth.authorize_url()))
        .finish()
}

/// GET /auth/github/callback
///
/// Exchanges the authorization code for a credential and stores it in the
/// caller's session, then redirects to the dashboard.
pub async fn github_callback(
    req: HttpRequest,
    state: web::Data<AppState>,
    query: web::Query<CallbackQuery>,
) -> Result<HttpResponse, AppError> {
    let code = match query.code.as_deref().map(str::trim) {
        Some(code) if !code.is_empty() => code.to_string(),
        _ => {
            warn!("[AUTH] Callback without authorization code");
            return Err(AppError::Validation(
                "Missing authorization code".to_string(),
            ));
        }
    };

    let credential = state
        .oauth
        .exchange_code(&code)
        .await
        .map_err(|e| AppError::from_pipeline(PipelineError::Upstream(e), "Failed to authenticate"))?;

    let id = match session_id(&req) {
        Some(existing) if state.sessions.set(&existing, credential.clone()) => {
            info!("[AUTH] Re-authenticated existing session");
            existing
        }
        _ => state.sessions.create(credential),
    };

    Ok(HttpResponse::Found()
        .insert_header((header::LOCATION, state.dashboard_url.clone()))
        .cookie(session_cookie(id.to_string()))
        .finish())
}

/// POST /auth/logout
pub async fn logout(req: HttpRequest, state: web::Data<AppState>) -> HttpResponse {
    if let Some(id) = session_id(&req) {
        if state.sessions.remove(&id) {
            info!("[AUTH] Session closed");
        }
    }

    let mut removal = session_cookie(String::new());
    removal.make_removal();
    HttpResponse::NoContent().cookie(removal).finish()
}

/// Mounted under `/auth`.
pub fn configure_auth_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/github").route(web::get().to(github_login)));
    cfg.service(web::resource("/github/callback").route(web::get().to(github_callback)));
    cfg.service(web::resource("/logout").route(web::post().to(logout)));
}
