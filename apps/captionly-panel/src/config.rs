use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelConfig {
    pub database_url: String,
    pub session_secret: String,
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,
    #[serde(default = "default_admin_path")]
    pub admin_path: String,
    pub gemini: GeminiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

fn default_listen_port() -> u16 {
    8080
}

fn default_admin_path() -> String {
    "/admin".to_string()
}

fn default_model() -> String {
    DEFAULT_GEMINI_MODEL.to_string()
}

fn default_api_base() -> String {
    DEFAULT_GEMINI_API_BASE.to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

/// Leading slash, no trailing slash.
pub fn normalize_admin_path(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return default_admin_path();
    }
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

impl PanelConfig {
    pub fn load() -> Result<Self> {
        let config_paths = ["/etc/captionly/panel.toml", "./panel.toml"];

        for path in config_paths {
            if Path::new(path).exists() {
                tracing::info!("Loading config from {}", path);
                return Self::load_from(path);
            }
        }

        tracing::info!("Loading config from environment");
        Self::from_env()
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let mut config: PanelConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        config.admin_path = normalize_admin_path(&config.admin_path);
        Ok(config)
    }

    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database_url: std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            session_secret: std::env::var("SESSION_SECRET")
                .context("SESSION_SECRET must be set")?,
            listen_port: std::env::var("LISTEN_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or_else(default_listen_port),
            admin_path: normalize_admin_path(
                &std::env::var("ADMIN_PATH").unwrap_or_else(|_| default_admin_path()),
            ),
            gemini: GeminiConfig {
                api_key: std::env::var("GEMINI_API_KEY")
                    .or_else(|_| std::env::var("API_KEY"))
                    .context("GEMINI_API_KEY must be set")?,
                model: std::env::var("GEMINI_MODEL").unwrap_or_else(|_| default_model()),
                api_base: std::env::var("GEMINI_API_BASE").unwrap_or_else(|_| default_api_base()),
                request_timeout_secs: std::env::var("GEMINI_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or_else(default_request_timeout),
                connect_timeout_secs: default_connect_timeout(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn admin_path_is_normalized() {
        assert_eq!(normalize_admin_path("admin"), "/admin");
        assert_eq!(normalize_admin_path("/console/"), "/console");
        assert_eq!(normalize_admin_path(""), "/admin");
    }

    #[test]
    fn toml_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
database_url = "postgres://captionly@localhost/captionly"
session_secret = "s3cret"
admin_path = "ops"

[gemini]
api_key = "test-key"
"#
        )
        .unwrap();

        let config = PanelConfig::load_from(file.path()).unwrap();
        assert_eq!(config.listen_port, 8080);
        assert_eq!(config.admin_path, "/ops");
        assert_eq!(config.gemini.model, DEFAULT_GEMINI_MODEL);
        assert_eq!(config.gemini.api_base, DEFAULT_GEMINI_API_BASE);
        assert_eq!(config.gemini.request_timeout_secs, 30);
    }

    #[test]
    fn missing_gemini_section_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "database_url = \"postgres://x\"\nsession_secret = \"y\"").unwrap();
        assert!(PanelConfig::load_from(file.path()).is_err());
    }
}
