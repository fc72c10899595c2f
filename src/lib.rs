use std::sync::Arc;

use testsmith_core::config::PromptConfig;
use testsmith_core::contract::{HostingClient, OAuthProvider, TextGenerator};
use testsmith_core::session::SessionStore;

pub mod cli;
pub mod error;
pub mod handlers;
pub mod load_config;
pub mod server;

pub use error::AppError;

/// Application state shared across handlers
pub struct AppState {
    pub hosting: Arc<dyn HostingClient>,
    pub generator: Arc<dyn TextGenerator>,
    pub oauth: Arc<dyn OAuthProvider>,
    pub sessions: SessionStore,
    pub prompt: PromptConfig,
    /// Where the OAuth callback sends the browser once authenticated.
    pub dashboard_url: String,
}
