//! # Application Configuration
//!
//! Settings shared by the CLI and the HTTP server.
//!
//! Sources, later ones winning:
//! 1. Built-in defaults
//! 2. An optional TOML file (`--config sciencetree.toml`)
//! 3. Environment variables:
//!    - `SCIENCETREE_CORS_ORIGINS`: comma-separated origins, or `*` for all
//!    - `SCIENCETREE_RATE_LIMIT`: requests per second, 0 disables
//!    - `SCIENCETREE_MAX_UPLOAD_BYTES`: largest accepted export file
//!
//! ```toml
//! host = "0.0.0.0"
//! port = 8080
//! rate_limit = 50
//!
//! [tree]
//! locale = "es"
//! citation_weight_step = 10
//! ```

use sciencetree_core::{TreeError, TreeOptions};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default largest accepted export file (20 MB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Default rate limit in requests per second.
pub const DEFAULT_RATE_LIMIT: u32 = 100;

/// Resolved application settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// `None` restricts CORS to localhost.
    pub cors_origins: Option<String>,
    /// Requests per second; 0 disables rate limiting.
    pub rate_limit: u32,
    pub max_upload_bytes: usize,
    /// Options passed to every generation run.
    pub tree: TreeOptions,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            cors_origins: None,
            rate_limit: DEFAULT_RATE_LIMIT,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            tree: TreeOptions::default(),
        }
    }
}

impl AppConfig {
    /// Load the configuration file (if any) and apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, TreeError> {
        let mut config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|e| {
                    TreeError::Io(format!("Cannot read config '{}': {}", path.display(), e))
                })?;
                Self::from_toml_str(&text)?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Parse a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, TreeError> {
        toml::from_str(text).map_err(|e| TreeError::Serialization(format!("Invalid config: {}", e)))
    }

    /// Apply `SCIENCETREE_*` overrides read through `lookup`.
    ///
    /// Unparseable numbers are ignored with a warning.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(origins) = lookup("SCIENCETREE_CORS_ORIGINS") {
            self.cors_origins = Some(origins);
        }
        if let Some(raw) = lookup("SCIENCETREE_RATE_LIMIT") {
            match raw.trim().parse() {
                Ok(rps) => self.rate_limit = rps,
                Err(_) => tracing::warn!("Ignoring invalid SCIENCETREE_RATE_LIMIT '{}'", raw),
            }
        }
        if let Some(raw) = lookup("SCIENCETREE_MAX_UPLOAD_BYTES") {
            match raw.trim().parse() {
                Ok(bytes) => self.max_upload_bytes = bytes,
                Err(_) => tracing::warn!("Ignoring invalid SCIENCETREE_MAX_UPLOAD_BYTES '{}'", raw),
            }
        }
    }

    /// Body limit for JSON requests carrying a base64 upload of `max_upload_bytes`.
    #[must_use]
    pub fn request_body_limit(&self) -> usize {
        (self.max_upload_bytes / 3)
            .saturating_add(1)
            .saturating_mul(4)
            .saturating_add(64 * 1024)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use sciencetree_core::Locale;
    use std::collections::BTreeMap;

    #[test]
    fn toml_overrides_defaults() {
        let config = AppConfig::from_toml_str(
            "port = 9000\nrate_limit = 5\n\n[tree]\nlocale = \"es\"\n",
        )
        .expect("parse");
        assert_eq!(config.port, 9000);
        assert_eq!(config.rate_limit, 5);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.tree.locale, Locale::Spanish);
        assert_eq!(config.tree.citation_weight_step, 10);
    }

    #[test]
    fn invalid_toml_is_rejected() {
        assert!(matches!(
            AppConfig::from_toml_str("port = \"eighty\""),
            Err(TreeError::Serialization(_))
        ));
    }

    #[test]
    fn env_overrides_apply() {
        let env: BTreeMap<&str, &str> = [
            ("SCIENCETREE_CORS_ORIGINS", "*"),
            ("SCIENCETREE_RATE_LIMIT", "0"),
            ("SCIENCETREE_MAX_UPLOAD_BYTES", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config.apply_env(|key| env.get(key).map(|v| (*v).to_string()));

        assert_eq!(config.cors_origins.as_deref(), Some("*"));
        assert_eq!(config.rate_limit, 0);
        assert_eq!(config.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
    }

    #[test]
    fn body_limit_covers_base64_expansion() {
        let config = AppConfig {
            max_upload_bytes: 3_000,
            ..AppConfig::default()
        };
        assert!(config.request_body_limit() >= 4_000);
    }
}
