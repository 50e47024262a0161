use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{env_subst::substitute_env, schema::IstariConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &["istari.toml", "istari.yaml", "istari.yml", "istari.json"];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<IstariConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./istari.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/istari/istari.{toml,yaml,yml,json}` (user-global)
///
/// Returns `IstariConfig::default()` if no config file is found.
pub fn discover_and_load() -> IstariConfig {
    if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => return cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            },
        }
    } else {
        debug!("no config file found, using defaults");
    }
    IstariConfig::default()
}

/// Apply environment variable overrides on top of a loaded config.
///
/// Recognized variables:
/// - `ISTARI_REMOTE_WS_ENDPOINT` — remote browser service websocket URL
/// - `ISTARI_TARGET_URL` — default scrape target
/// - `ISTARI_CHROME_PATH` — local Chrome/Chromium binary
/// - `ISTARI_DB_PATH` — SQLite database file
/// - `PORT` — server port
pub fn apply_env_overrides(config: &mut IstariConfig) {
    if let Ok(v) = std::env::var("ISTARI_REMOTE_WS_ENDPOINT")
        && !v.is_empty()
    {
        config.scraper.remote_ws_endpoint = Some(v);
    }
    if let Ok(v) = std::env::var("ISTARI_TARGET_URL")
        && !v.is_empty()
    {
        config.scraper.default_target_url = v;
    }
    if let Ok(v) = std::env::var("ISTARI_CHROME_PATH")
        && !v.is_empty()
    {
        config.scraper.chrome_path = Some(v);
    }
    if let Ok(v) = std::env::var("ISTARI_DB_PATH")
        && !v.is_empty()
    {
        config.database.path = v;
    }
    if let Ok(v) = std::env::var("PORT")
        && let Ok(port) = v.parse()
    {
        config.server.port = port;
    }
}

/// Find the first config file in standard locations.
fn find_config_file() -> Option<PathBuf> {
    // Project-local
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    // User-global: ~/.config/istari/
    if let Some(dirs) = directories::ProjectDirs::from("", "", "istari") {
        let config_dir = dirs.config_dir();
        for name in CONFIG_FILENAMES {
            let p = config_dir.join(name);
            if p.exists() {
                return Some(p);
            }
        }
    }

    None
}

/// Returns the user-global config directory (`~/.config/istari/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "istari").map(|d| d.config_dir().to_path_buf())
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<IstariConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_toml() {
        let cfg = parse_config(
            r#"
            [server]
            port = 8080
            [scraper]
            default_target_url = "https://gandalf.lakera.ai/do-not-tell"
            "#,
            Path::new("istari.toml"),
        )
        .unwrap();
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(
            cfg.scraper.default_target_url,
            "https://gandalf.lakera.ai/do-not-tell"
        );
    }

    #[test]
    fn parses_json() {
        let cfg = parse_config(
            r#"{"database": {"path": "/tmp/istari-test.db"}}"#,
            Path::new("istari.json"),
        )
        .unwrap();
        assert_eq!(cfg.database.path, "/tmp/istari-test.db");
    }

    #[test]
    fn rejects_unknown_extension() {
        assert!(parse_config("", Path::new("istari.ini")).is_err());
    }
}
