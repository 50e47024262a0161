//! Per-request browser sessions and their teardown.

use {
    chromiumoxide::{
        Browser, Page,
        cdp::browser_protocol::{
            browser::BrowserContextId,
            target::{CreateBrowserContextParams, CreateTargetParams},
        },
    },
    tokio::task::JoinHandle,
    tracing::{debug, warn},
};

use crate::{
    error::ScrapeError,
    launch::{self, LocalBrowser, SharedBrowser},
    types::ScraperConfig,
};

/// One caller's hold on a browser for the duration of a single scrape.
///
/// Remote sessions own a dedicated connection to the pooling service; local
/// sessions borrow the shared process browser and own only a browser context
/// inside it.
pub(crate) enum ScrapeSession {
    Remote {
        browser: Browser,
        handler: JoinHandle<()>,
    },
    Local {
        browser: SharedBrowser,
        context_id: BrowserContextId,
    },
}

impl ScrapeSession {
    /// Acquire a browser for `caller_id` and open a blank page in it.
    ///
    /// Tries the remote service first when configured; any remote failure is
    /// logged and recovered by the local path.
    pub(crate) async fn open(
        config: &ScraperConfig,
        local: &LocalBrowser,
        caller_id: &str,
    ) -> Result<(Self, Page), ScrapeError> {
        if let Some(endpoint) = config.remote_ws_endpoint.as_deref() {
            match Self::open_remote(endpoint, caller_id).await {
                Ok(opened) => return Ok(opened),
                Err(error) => {
                    warn!(%error, "remote browser unavailable, falling back to local");
                }
            }
        }
        Self::open_local(config, local).await
    }

    async fn open_remote(endpoint: &str, caller_id: &str) -> Result<(Self, Page), ScrapeError> {
        let (browser, handler) = launch::connect_remote(endpoint, caller_id).await?;
        // The service keys sessions by caller; a dedicated context on top of
        // that would orphan the level progression the session exists to keep.
        let page = browser.new_page("about:blank").await?;
        Ok((Self::Remote { browser, handler }, page))
    }

    async fn open_local(
        config: &ScraperConfig,
        local: &LocalBrowser,
    ) -> Result<(Self, Page), ScrapeError> {
        let browser = local.get(config).await?;

        let (context_id, page) = {
            let guard = browser.lock().await;
            let context_id = guard
                .create_browser_context(CreateBrowserContextParams::default())
                .await?;
            // The explicit browser_context_id puts the page in the new
            // context; the default context stays untouched.
            let page = guard.new_page(isolated_target(&context_id)?).await?;
            (context_id, page)
        };

        Ok((
            Self::Local {
                browser,
                context_id,
            },
            page,
        ))
    }

    pub(crate) fn mode(&self) -> &'static str {
        match self {
            Self::Remote { .. } => "remote",
            Self::Local { .. } => "local",
        }
    }

    /// Release everything this session holds. Best-effort: teardown failures
    /// are logged, never surfaced.
    pub(crate) async fn teardown(self, page: Page) {
        if let Err(error) = page.close().await {
            debug!(%error, "failed to close page");
        }

        match self {
            Self::Remote { browser, handler } => {
                // Dropping the connection detaches from the service without
                // ending the session it holds for this caller.
                drop(browser);
                handler.abort();
            }
            Self::Local {
                browser,
                context_id,
            } => {
                let guard = browser.lock().await;
                if let Err(error) = guard.dispose_browser_context(context_id).await {
                    debug!(%error, "failed to dispose browser context");
                }
            }
        }
    }
}

/// Blank-page target pinned to a specific browser context. Isolation from
/// the default context hinges entirely on this id being set.
fn isolated_target(context_id: &BrowserContextId) -> Result<CreateTargetParams, ScrapeError> {
    CreateTargetParams::builder()
        .url("about:blank")
        .browser_context_id(context_id.clone())
        .build()
        .map_err(ScrapeError::Cdp)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_pages_are_pinned_to_their_context() {
        let context_id = BrowserContextId::from("ctx-123".to_string());
        let params = isolated_target(&context_id).unwrap();
        assert_eq!(params.url, "about:blank");
        assert_eq!(params.browser_context_id, Some(context_id));
    }
}
