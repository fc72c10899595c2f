use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub const DEFAULT_GITHUB_API_BASE: &str = "https://api.github.com";
pub const DEFAULT_GITHUB_WEB_BASE: &str = "https://github.com";
pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_TEST_FRAMEWORK: &str = "Playwright";

/// Settings for the GitHub REST API and OAuth app.
#[derive(Clone)]
pub struct GitHubConfig {
    pub api_base: String,
    pub web_base: String,
    pub client_id: String,
    pub client_secret: String,
    pub oauth_scope: String,
    pub user_agent: String,
}

impl GitHubConfig {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            api_base: DEFAULT_GITHUB_API_BASE.to_string(),
            web_base: DEFAULT_GITHUB_WEB_BASE.to_string(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            oauth_scope: "repo".to_string(),
            user_agent: concat!("testsmith/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }

    pub fn trace_loaded(&self) {
        info!(
            api_base = %self.api_base,
            web_base = %self.web_base,
            client_id_set = !self.client_id.is_empty(),
            client_secret_len = self.client_secret.len(),
            "Loaded GitHub config"
        );
    }
}

/// Settings for the Gemini text generation API.
#[derive(Clone)]
pub struct GeminiConfig {
    pub api_base: String,
    pub model: String,
    pub api_key: String,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_base: DEFAULT_GEMINI_API_BASE.to_string(),
            model: DEFAULT_GEMINI_MODEL.to_string(),
            api_key: api_key.into(),
        }
    }

    pub fn trace_loaded(&self) {
        info!(
            api_base = %self.api_base,
            model = %self.model,
            api_key_len = self.api_key.len(),
            "Loaded Gemini config"
        );
    }
}

/// Prompt settings shared by both generation stages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    /// Test framework pinned in the code generation prompt.
    pub framework: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            framework: DEFAULT_TEST_FRAMEWORK.to_string(),
        }
    }
}

impl PromptConfig {
    pub fn trace_loaded(&self) {
        info!(framework = %self.framework, "Loaded prompt config");
        debug!(?self, "Prompt config loaded (full debug)");
    }
}

impl fmt::Debug for GitHubConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitHubConfig")
            .field("api_base", &self.api_base)
            .field("web_base", &self.web_base)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("oauth_scope", &self.oauth_scope)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .finish()
    }
}
