use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use serde::Deserialize;
use testsmith_core::config::{GeminiConfig, GitHubConfig, PromptConfig};
use tracing::{error, info};

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_DASHBOARD_URL: &str = "http://localhost:5173/dashboard";
pub const DEFAULT_SESSION_TTL_SECS: u64 = 3600;

/// Fully merged runtime configuration for the HTTP service.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub dashboard_url: String,
    pub session_ttl: Duration,
    pub github: GitHubConfig,
    pub gemini: GeminiConfig,
    pub prompt: PromptConfig,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct StaticConfig {
    server: ServerSection,
    github: GitHubSection,
    gemini: GeminiSection,
    prompt: Option<PromptConfig>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct ServerSection {
    host: Option<String>,
    port: Option<u16>,
    dashboard_url: Option<String>,
    session_ttl_secs: Option<u64>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct GitHubSection {
    api_base: Option<String>,
    web_base: Option<String>,
    oauth_scope: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct GeminiSection {
    api_base: Option<String>,
    model: Option<String>,
}

fn required_env(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => {
            info!(var = name, "Secret found in env");
            Ok(value)
        }
        Ok(_) => {
            error!(var = name, "Environment variable is empty");
            Err(anyhow::anyhow!("{name} environment variable is empty"))
        }
        Err(e) => {
            error!(error = ?e, var = name, "Environment variable not set");
            Err(anyhow::anyhow!("{name} environment variable not set: {e}"))
        }
    }
}

fn read_static(path: &Path) -> Result<StaticConfig> {
    info!(config_path = ?path, "Loading configuration from file");

    let config_content = match fs::read_to_string(path) {
        Ok(content) => {
            info!(config_path = ?path, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path, "Failed to read config file");
            return Err(anyhow::anyhow!("Failed to read config file {:?}: {}", path, e));
        }
    };

    if config_content.trim().is_empty() {
        return Ok(StaticConfig::default());
    }

    match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path, "Parsed config YAML successfully");
            Ok(conf)
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path, "Failed to parse config YAML");
            Err(anyhow::anyhow!("Failed to parse config YAML: {e}"))
        }
    }
}

/// Loads an optional YAML file (no secrets), applies `HOST`/`PORT`/`DASHBOARD_URL`
/// overrides and injects the required secrets from the environment.
pub fn load_config(path: Option<&Path>) -> Result<ServerConfig> {
    let static_conf = match path {
        Some(path) => read_static(path)?,
        None => {
            info!("No config file given, using defaults");
            StaticConfig::default()
        }
    };

    let client_id = required_env("GITHUB_CLIENT_ID")?;
    let client_secret = required_env("GITHUB_CLIENT_SECRET")?;
    let gemini_key = required_env("GEMINI_API_KEY")?;

    let host = std::env::var("HOST")
        .ok()
        .filter(|h| !h.trim().is_empty())
        .or(static_conf.server.host)
        .unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = match std::env::var("PORT") {
        Ok(var) => match var.trim().parse::<u16>() {
            Ok(port) => port,
            Err(e) => {
                error!(error = ?e, var = ?var, "PORT must be a valid port number");
                return Err(anyhow::anyhow!("PORT must be a valid port number: {e}"));
            }
        },
        Err(_) => static_conf.server.port.unwrap_or(DEFAULT_PORT),
    };

    let dashboard_url = std::env::var("DASHBOARD_URL")
        .ok()
        .filter(|u| !u.trim().is_empty())
        .or(static_conf.server.dashboard_url)
        .unwrap_or_else(|| DEFAULT_DASHBOARD_URL.to_string());

    let session_ttl = Duration::from_secs(
        static_conf
            .server
            .session_ttl_secs
            .unwrap_or(DEFAULT_SESSION_TTL_SECS),
    );
    if session_ttl.is_zero() {
        error!("server.session_ttl_secs must be greater than zero");
        anyhow::bail!("server.session_ttl_secs must be greater than zero");
    }

    let mut github = GitHubConfig::new(client_id, client_secret);
    if let Some(api_base) = static_conf.github.api_base {
        github.api_base = api_base;
    }
    if let Some(web_base) = static_conf.github.web_base {
        github.web_base = web_base;
    }
    if let Some(scope) = static_conf.github.oauth_scope {
        github.oauth_scope = scope;
    }

    let mut gemini = GeminiConfig::new(gemini_key);
    if let Some(api_base) = static_conf.gemini.api_base {
        gemini.api_base = api_base;
    }
    if let Some(model) = static_conf.gemini.model {
        gemini.model = model;
    }

    let prompt = static_conf.prompt.unwrap_or_default();

    github.trace_loaded();
    gemini.trace_loaded();
    prompt.trace_loaded();
    info!(
        host = %host,
        port = port,
        dashboard_url = %dashboard_url,
        session_ttl_secs = session_ttl.as_secs(),
        "Config loaded and merged successfully"
    );

    Ok(ServerConfig {
        host,
        port,
        dashboard_url,
        session_ttl,
        github,
        gemini,
        prompt,
    })
}
