use std::sync::Arc;
use std::time::Duration;

use actix_web::{middleware, web, App, HttpServer};
use anyhow::{Context, Result};
use testsmith_core::gemini::GeminiClient;
use testsmith_core::github::GitHubClient;
use testsmith_core::session::SessionStore;
use tracing::{debug, info};

use crate::handlers;
use crate::load_config::ServerConfig;
use crate::AppState;

/// Builds the application state from real GitHub and Gemini clients.
pub fn build_state(config: &ServerConfig) -> Result<AppState> {
    let github = Arc::new(
        GitHubClient::new(config.github.clone()).context("Failed to build GitHub client")?,
    );
    let gemini =
        Arc::new(GeminiClient::new(config.gemini.clone()).context("Failed to build Gemini client")?);

    Ok(AppState {
        hosting: github.clone(),
        oauth: github,
        generator: gemini,
        sessions: SessionStore::new(config.session_ttl),
        prompt: config.prompt.clone(),
        dashboard_url: config.dashboard_url.clone(),
    })
}

/// Drops idle sessions once per TTL period for the life of the process.
fn spawn_session_reaper(state: web::Data<AppState>, period: Duration) {
    actix_web::rt::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let purged = state.sessions.purge_expired();
            if purged > 0 {
                debug!(purged, "[AUTH] Purged expired sessions");
            }
        }
    });
}

/// Runs the HTTP service until shutdown.
pub async fn serve(config: ServerConfig) -> Result<()> {
    let app_state = web::Data::new(build_state(&config)?);
    spawn_session_reaper(app_state.clone(), config.session_ttl);

    let server_addr = format!("{}:{}", config.host, config.port);
    info!("Starting testsmith server on {}", server_addr);

    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .wrap(middleware::Logger::default())
            .configure(handlers::configure_routes)
    })
    .bind(&server_addr)
    .with_context(|| format!("Failed to bind {server_addr}"))?
    .run()
    .await?;

    Ok(())
}
