//! Config schema types (server, scraper, database).

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IstariConfig {
    pub server: ServerConfig,
    pub scraper: ScraperConfig,
    pub database: DatabaseConfig,
}

/// Gateway server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to. Defaults to "127.0.0.1".
    pub bind: String,
    /// Port to listen on.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".into(),
            port: 5000,
        }
    }
}

/// Browser scraper configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    /// WebSocket endpoint of a remote session-pooling browser service
    /// (e.g. browserless). When unset or unreachable, a shared local
    /// Chromium instance is launched instead.
    pub remote_ws_endpoint: Option<String>,
    /// Target URL used when a request does not carry one.
    pub default_target_url: String,
    /// Path to the Chrome/Chromium binary (auto-detected if not set).
    pub chrome_path: Option<String>,
    /// Whether to run the local browser in headless mode.
    pub headless: bool,
    /// Additional Chrome arguments for the local browser.
    #[serde(default)]
    pub chrome_args: Vec<String>,
    /// Substring that marks an inline rejection message on the target page.
    /// Site-specific copy, so kept configurable.
    pub rejection_pattern: String,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            remote_ws_endpoint: None,
            default_target_url: "https://gandalf.lakera.ai/".into(),
            chrome_path: None,
            headless: true,
            chrome_args: Vec::new(),
            rejection_pattern: "cannot be the same".into(),
        }
    }
}

/// SQLite database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "istari.db".into(),
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = IstariConfig::default();
        assert_eq!(cfg.server.bind, "127.0.0.1");
        assert_eq!(cfg.server.port, 5000);
        assert!(cfg.scraper.remote_ws_endpoint.is_none());
        assert!(cfg.scraper.headless);
        assert_eq!(cfg.scraper.default_target_url, "https://gandalf.lakera.ai/");
        assert_eq!(cfg.scraper.rejection_pattern, "cannot be the same");
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let cfg: IstariConfig = toml::from_str(
            r#"
            [scraper]
            remote_ws_endpoint = "ws://browserless:3000"
            headless = false
            "#,
        )
        .unwrap();
        assert_eq!(
            cfg.scraper.remote_ws_endpoint.as_deref(),
            Some("ws://browserless:3000")
        );
        assert!(!cfg.scraper.headless);
        // Untouched sections keep their defaults.
        assert_eq!(cfg.server.port, 5000);
        assert_eq!(cfg.database.path, "istari.db");
    }
}
