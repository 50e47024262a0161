//! Browser acquisition: remote pooled sessions, with a single-flight local
//! launch as the fallback path.

use std::{future::Future, path::PathBuf, sync::Arc};

use {
    chromiumoxide::{Browser, BrowserConfig as CdpBrowserConfig, handler::HandlerConfig},
    futures::StreamExt,
    tokio::{
        sync::{Mutex, OnceCell},
        task::JoinHandle,
        time::timeout,
    },
    tracing::{debug, info},
    url::Url,
};

use crate::{
    error::ScrapeError,
    types::{CONNECT_TIMEOUT, NAVIGATION_TIMEOUT, REMOTE_KEEPALIVE_MS, ScraperConfig},
};

/// Shared handle to the process-wide local browser.
pub(crate) type SharedBrowser = Arc<Mutex<Browser>>;

// ── Single-flight cell ───────────────────────────────────────────────────────

/// Lazily initialized value where concurrent initializers collapse into one
/// in-flight attempt.
pub(crate) struct SingleFlight<T> {
    cell: OnceCell<T>,
}

impl<T: Clone> SingleFlight<T> {
    pub(crate) fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    /// Get the value, running `init` if the cell is empty. Losers of a
    /// first-use race await the winner's attempt instead of starting their
    /// own. A failed attempt leaves the cell empty so a later call retries.
    pub(crate) async fn get_or_try_init<F, Fut, E>(&self, init: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.cell.get_or_try_init(init).await.cloned()
    }
}

// ── Local browser singleton ──────────────────────────────────────────────────

/// Process-lifetime local browser, launched at most once.
///
/// Requests never own or close this browser; they carve isolated contexts
/// out of it and dispose only those. The launch itself is guarded by a
/// single-flight cell so concurrent first users share one Chromium process.
pub struct LocalBrowser {
    browser: SingleFlight<SharedBrowser>,
}

impl Default for LocalBrowser {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalBrowser {
    pub fn new() -> Self {
        Self {
            browser: SingleFlight::new(),
        }
    }

    /// Get the shared local browser, launching it on first use.
    pub(crate) async fn get(&self, config: &ScraperConfig) -> Result<SharedBrowser, ScrapeError> {
        self.browser.get_or_try_init(|| launch_local(config)).await
    }
}

async fn launch_local(config: &ScraperConfig) -> Result<SharedBrowser, ScrapeError> {
    let Some(executable) = detect_chrome(config.chrome_path.as_deref()) else {
        return Err(ScrapeError::Acquisition(format!(
            "Chrome/Chromium not found; {INSTALL_HINT}"
        )));
    };

    let mut builder = CdpBrowserConfig::builder()
        .chrome_executable(&executable)
        .request_timeout(NAVIGATION_TIMEOUT)
        .enable_request_intercept();

    // chromiumoxide is headless by default; with_head() opts out.
    if !config.headless {
        builder = builder.with_head();
    }

    for arg in &config.chrome_args {
        builder = builder.arg(arg);
    }

    // Sandboxing is disabled for containerized execution environments.
    builder = builder
        .arg("--no-sandbox")
        .arg("--disable-setuid-sandbox")
        .arg("--disable-gpu")
        .arg("--disable-dev-shm-usage");

    let cdp_config = builder
        .build()
        .map_err(|e| ScrapeError::Acquisition(format!("failed to build browser config: {e}")))?;

    let (browser, mut handler) = Browser::launch(cdp_config)
        .await
        .map_err(|e| ScrapeError::Acquisition(format!("browser launch failed: {e}")))?;

    // Drain CDP events for the lifetime of the browser.
    tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            debug!(?event, "local browser event");
        }
        debug!("local browser event handler exited");
    });

    info!(executable = %executable.display(), "launched local browser");

    Ok(Arc::new(Mutex::new(browser)))
}

// ── Remote connection ────────────────────────────────────────────────────────

/// Build the remote service connection URL for a caller.
///
/// The service keys sessions by `sessionId`, so reconnecting with the same
/// caller id resumes the same remote session; `keepalive` asks it to hold
/// the session open between calls.
pub(crate) fn remote_connect_url(endpoint: &str, caller_id: &str) -> Result<String, ScrapeError> {
    let mut url = Url::parse(endpoint)
        .map_err(|e| ScrapeError::Acquisition(format!("invalid remote endpoint: {e}")))?;
    url.query_pairs_mut()
        .append_pair("sessionId", caller_id)
        .append_pair("keepalive", &REMOTE_KEEPALIVE_MS.to_string());
    Ok(url.into())
}

/// Connect to the remote session-pooling service for the given caller.
pub(crate) async fn connect_remote(
    endpoint: &str,
    caller_id: &str,
) -> Result<(Browser, JoinHandle<()>), ScrapeError> {
    let ws_url = remote_connect_url(endpoint, caller_id)?;

    let handler_config = HandlerConfig {
        request_timeout: NAVIGATION_TIMEOUT,
        request_intercept: true,
        ..Default::default()
    };

    let (browser, mut handler) = timeout(
        CONNECT_TIMEOUT,
        Browser::connect_with_config(&ws_url, handler_config),
    )
    .await
    .map_err(|_| {
        ScrapeError::Acquisition(format!(
            "remote connect timed out after {}ms",
            CONNECT_TIMEOUT.as_millis()
        ))
    })?
    .map_err(|e| ScrapeError::Acquisition(format!("remote connect failed: {e}")))?;

    let task = tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            debug!(?event, "remote browser event");
        }
        // Stream ends when we disconnect; the remote session itself lives on.
        debug!("remote browser event handler exited");
    });

    info!(caller_id, "connected to remote browser session");

    Ok((browser, task))
}

// ── Chrome detection ─────────────────────────────────────────────────────────

/// Known Chromium-based executable names to search in PATH.
const CHROMIUM_EXECUTABLES: &[&str] = &[
    "chrome",
    "google-chrome",
    "google-chrome-stable",
    "chromium",
    "chromium-browser",
    "msedge",
    "brave-browser",
];

pub(crate) const INSTALL_HINT: &str =
    "install Chrome or Chromium, or point scraper.chrome_path (or the CHROME env var) at a binary";

/// Locate a Chromium-based browser: config path, then the `CHROME` env var,
/// then known executable names in PATH.
fn detect_chrome(custom_path: Option<&str>) -> Option<PathBuf> {
    if let Some(path) = custom_path {
        let p = PathBuf::from(path);
        if p.exists() {
            return Some(p);
        }
    }

    if let Ok(env_path) = std::env::var("CHROME") {
        let p = PathBuf::from(env_path);
        if p.exists() {
            return Some(p);
        }
    }

    for name in CHROMIUM_EXECUTABLES {
        if let Ok(p) = which::which(name) {
            return Some(p);
        }
    }

    None
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn remote_url_is_stable_per_caller() {
        let a = remote_connect_url("ws://pool:3000", "user-42").unwrap();
        let b = remote_connect_url("ws://pool:3000", "user-42").unwrap();
        assert_eq!(a, b);
        assert!(a.contains("sessionId=user-42"));
        assert!(a.contains("keepalive=300000"));
    }

    #[test]
    fn remote_url_keeps_endpoint_path_and_encodes_caller() {
        let url = remote_connect_url("wss://pool.example/chrome", "user 42").unwrap();
        assert!(url.starts_with("wss://pool.example/chrome?"));
        assert!(url.contains("sessionId=user+42"));
    }

    #[test]
    fn remote_url_rejects_garbage_endpoint() {
        assert!(matches!(
            remote_connect_url("not a url", "u"),
            Err(ScrapeError::Acquisition(_))
        ));
    }

    #[test]
    fn detect_ignores_missing_custom_path() {
        let detected = detect_chrome(Some("/nonexistent/istari-chrome"));
        assert_ne!(
            detected,
            Some(PathBuf::from("/nonexistent/istari-chrome")),
            "a missing custom path must not be returned as-is"
        );
    }

    #[tokio::test]
    async fn concurrent_first_use_initializes_once() {
        static LAUNCHES: AtomicUsize = AtomicUsize::new(0);

        let flight = Arc::new(SingleFlight::<u32>::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let flight = Arc::clone(&flight);
            handles.push(tokio::spawn(async move {
                flight
                    .get_or_try_init(|| async {
                        LAUNCHES.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                        Ok::<_, ScrapeError>(7)
                    })
                    .await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), 7);
        }
        assert_eq!(LAUNCHES.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_initialization_can_retry() {
        let flight = SingleFlight::<u32>::new();

        let first: Result<u32, ScrapeError> = flight
            .get_or_try_init(|| async { Err(ScrapeError::Acquisition("boom".into())) })
            .await;
        assert!(first.is_err());

        let second = flight
            .get_or_try_init(|| async { Ok::<_, ScrapeError>(9) })
            .await;
        assert_eq!(second.unwrap(), 9);
    }
}
