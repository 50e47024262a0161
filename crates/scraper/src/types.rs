//! Scrape request/outcome types, configuration, and the target site contract.

use std::time::Duration;

use {
    serde::{Deserialize, Serialize},
    url::Url,
};

// ── Target site DOM contract ─────────────────────────────────────────────────
// Fixed and version-sensitive: these track one specific site's markup.

/// Prompt input element.
pub(crate) const INPUT_SELECTOR: &str = "#comment";
/// Answer container; the page accumulates one node per historical answer.
pub(crate) const ANSWER_SELECTOR: &str = ".answer";
/// Inline validation errors render in red.
pub(crate) const ERROR_SELECTOR: &str = ".text-red-500";

/// Client-side storage keys driving the site's level-gating redirect logic.
pub(crate) const STORAGE_KEY_LAST_NORMAL: &str = "last_normal_level";
pub(crate) const STORAGE_KEY_LAST: &str = "last_level";
pub(crate) const STORAGE_KEY_MAX: &str = "default_max_level";
/// Marker that unlocks every challenge level.
pub(crate) const MAX_UNLOCK_LEVEL: &str = "8";

/// Level slug used when the target URL has no path component.
pub(crate) const DEFAULT_LEVEL_SLUG: &str = "baseline";

/// Returned when the answer predicate matched but the node read back empty.
pub(crate) const FALLBACK_ANSWER: &str =
    "I'm sorry, I don't understand what you're trying to say.";

// ── Timeouts ─────────────────────────────────────────────────────────────────

pub(crate) const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub(crate) const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(30);
pub(crate) const SELECTOR_TIMEOUT: Duration = Duration::from_secs(10);
pub(crate) const RESPONSE_TIMEOUT: Duration = Duration::from_secs(30);
pub(crate) const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Keep-alive requested from the remote browser service (5 minutes): long
/// enough to outlive a single interaction so the session stays warm between
/// calls from the same caller.
pub(crate) const REMOTE_KEEPALIVE_MS: u64 = 300_000;

// ── Request / outcome ────────────────────────────────────────────────────────

/// Immutable input to one scrape.
#[derive(Debug, Clone)]
pub struct ScrapeRequest {
    /// Challenge level page to interrogate.
    pub target_url: Url,
    /// Prompt text, submitted verbatim. Opaque to this layer.
    pub prompt: String,
    /// Opaque caller identity; doubles as the remote session correlation key.
    pub caller_id: String,
}

/// Result of one scrape: a genuine answer, or the page's inline rejection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Answer(String),
    ErrorMessage(String),
}

impl Outcome {
    /// Text handed back to the caller. Rejections are surfaced as response
    /// text rather than a transport failure, matching the site's own UX.
    pub fn into_text(self) -> String {
        match self {
            Self::Answer(text) | Self::ErrorMessage(text) => text,
        }
    }
}

// ── Configuration ────────────────────────────────────────────────────────────

/// Scraper configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    /// WebSocket endpoint of a remote session-pooling browser service.
    /// When unset or unreachable, a shared local browser is used.
    pub remote_ws_endpoint: Option<String>,
    /// Path to the Chrome/Chromium binary (auto-detected if not set).
    pub chrome_path: Option<String>,
    /// Whether to run the local browser in headless mode.
    pub headless: bool,
    /// Additional Chrome arguments for the local browser.
    #[serde(default)]
    pub chrome_args: Vec<String>,
    /// Substring marking an inline rejection message on the target page.
    pub rejection_pattern: String,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            remote_ws_endpoint: None,
            chrome_path: None,
            headless: true,
            chrome_args: Vec::new(),
            rejection_pattern: "cannot be the same".into(),
        }
    }
}

impl From<&istari_config::ScraperConfig> for ScraperConfig {
    fn from(cfg: &istari_config::ScraperConfig) -> Self {
        Self {
            remote_ws_endpoint: cfg.remote_ws_endpoint.clone(),
            chrome_path: cfg.chrome_path.clone(),
            headless: cfg.headless,
            chrome_args: cfg.chrome_args.clone(),
            rejection_pattern: cfg.rejection_pattern.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_into_text() {
        assert_eq!(Outcome::Answer("secret".into()).into_text(), "secret");
        assert_eq!(
            Outcome::ErrorMessage("Error: nope".into()).into_text(),
            "Error: nope"
        );
    }

    #[test]
    fn config_from_shared_schema() {
        let mut shared = istari_config::ScraperConfig::default();
        shared.remote_ws_endpoint = Some("ws://pool:3000".into());
        shared.headless = false;
        let cfg = ScraperConfig::from(&shared);
        assert_eq!(cfg.remote_ws_endpoint.as_deref(), Some("ws://pool:3000"));
        assert!(!cfg.headless);
        assert_eq!(cfg.rejection_pattern, "cannot be the same");
    }
}
