//! The scrape pipeline: acquire, prepare, submit, extract, tear down.

use {
    anyhow::anyhow,
    chromiumoxide::Page,
    tokio::time::{Instant, sleep, timeout},
    tracing::{debug, error, info},
    url::Url,
};

use crate::{
    error::ScrapeError,
    extract, intercept,
    launch::LocalBrowser,
    session::ScrapeSession,
    types::{
        DEFAULT_LEVEL_SLUG, INPUT_SELECTOR, MAX_UNLOCK_LEVEL, NAVIGATION_TIMEOUT, Outcome,
        POLL_INTERVAL, SELECTOR_TIMEOUT, STORAGE_KEY_LAST, STORAGE_KEY_LAST_NORMAL,
        STORAGE_KEY_MAX, ScrapeRequest, ScraperConfig,
    },
};

/// Message returned for any failed scrape. Deliberately free of detail: what
/// went wrong inside the browser is for the logs, not for callers.
pub const OPAQUE_FAILURE: &str = "failed to get response from the interface";

/// Drives prompt/answer exchanges against the challenge site.
///
/// One value serves the whole process; it owns the lazily launched local
/// browser that remote-less or remote-failed requests share.
pub struct Scraper {
    config: ScraperConfig,
    local: LocalBrowser,
}

impl Scraper {
    pub fn new(config: ScraperConfig) -> Self {
        Self {
            config,
            local: LocalBrowser::new(),
        }
    }

    /// Submit `request.prompt` to the challenge level and return the reply
    /// text. Inline rejections from the page come back as reply text too;
    /// everything else that goes wrong collapses into [`OPAQUE_FAILURE`].
    pub async fn answer(&self, request: &ScrapeRequest) -> anyhow::Result<String> {
        match self.run(request).await {
            Ok(outcome) => {
                info!(
                    caller_id = %request.caller_id,
                    level = %level_slug(&request.target_url),
                    outcome = ?outcome,
                    "scrape finished"
                );
                Ok(outcome.into_text())
            }
            Err(err) => {
                error!(
                    caller_id = %request.caller_id,
                    level = %level_slug(&request.target_url),
                    error = %err,
                    "scrape failed"
                );
                Err(anyhow!(OPAQUE_FAILURE))
            }
        }
    }

    async fn run(&self, request: &ScrapeRequest) -> Result<Outcome, ScrapeError> {
        let (session, page) =
            ScrapeSession::open(&self.config, &self.local, &request.caller_id).await?;
        info!(mode = session.mode(), caller_id = %request.caller_id, "browser session opened");

        // Teardown must run no matter how the drive phase ends.
        let result = match intercept::install(&page).await {
            Ok(filter) => {
                let result = self.drive(&page, request).await;
                filter.abort();
                result
            }
            Err(err) => Err(err),
        };

        session.teardown(page).await;
        result
    }

    async fn drive(
        &self,
        page: &Page,
        request: &ScrapeRequest,
    ) -> Result<Outcome, ScrapeError> {
        let slug = level_slug(&request.target_url);

        // localStorage is origin-scoped, so seed it from the site root
        // before entering the level page. Skipping this gets the visit
        // redirected by the site's own level gate.
        let origin = request.target_url.origin().ascii_serialization();
        goto(page, &origin).await?;
        seed_level_state(page, &slug).await?;

        goto(page, request.target_url.as_str()).await?;

        submit_prompt(page, &request.prompt).await?;
        extract::await_outcome(page, &self.config.rejection_pattern).await
    }
}

/// Navigate and wait. CDP navigation here settles on the full load
/// lifecycle, a stronger condition than the DOM parse we strictly need;
/// acceptable because the resource filter strips the heavy loads and the
/// whole wait is bounded.
async fn goto(page: &Page, url: &str) -> Result<(), ScrapeError> {
    timeout(NAVIGATION_TIMEOUT, page.goto(url))
        .await
        .map_err(|_| {
            ScrapeError::Navigation(format!(
                "navigation to {url} timed out after {}ms",
                NAVIGATION_TIMEOUT.as_millis()
            ))
        })?
        .map_err(|e| ScrapeError::Navigation(format!("navigation to {url} failed: {e}")))?;
    debug!(url, "navigated");
    Ok(())
}

/// Mark the level (and every level up to the cap) as unlocked for this
/// browser profile.
async fn seed_level_state(page: &Page, slug: &str) -> Result<(), ScrapeError> {
    let slug_js = serde_json::to_string(slug)
        .map_err(|e| ScrapeError::JsEval(format!("unencodable level slug: {e}")))?;
    let js = format!(
        "(() => {{
            localStorage.setItem('{STORAGE_KEY_LAST_NORMAL}', {slug_js});
            localStorage.setItem('{STORAGE_KEY_LAST}', {slug_js});
            localStorage.setItem('{STORAGE_KEY_MAX}', '{MAX_UNLOCK_LEVEL}');
        }})()"
    );
    page.evaluate(js).await?;
    debug!(slug, "seeded level state");
    Ok(())
}

async fn submit_prompt(page: &Page, prompt: &str) -> Result<(), ScrapeError> {
    wait_for_selector(page, INPUT_SELECTOR, SELECTOR_TIMEOUT).await?;

    let input = page.find_element(INPUT_SELECTOR).await?;
    input.click().await?.type_str(prompt).await?.press_key("Enter").await?;

    debug!("prompt submitted");
    Ok(())
}

/// Poll until `selector` matches an element or the budget runs out.
async fn wait_for_selector(
    page: &Page,
    selector: &'static str,
    budget: std::time::Duration,
) -> Result<(), ScrapeError> {
    let deadline = Instant::now() + budget;
    let selector_js = serde_json::to_string(selector)
        .map_err(|e| ScrapeError::JsEval(format!("unencodable selector: {e}")))?;
    let js = format!("document.querySelector({selector_js}) !== null");

    loop {
        let present = page
            .evaluate(js.as_str())
            .await?
            .into_value::<bool>()
            .unwrap_or(false);
        if present {
            return Ok(());
        }
        if Instant::now() + POLL_INTERVAL > deadline {
            return Err(ScrapeError::SelectorTimeout {
                selector,
                timeout_ms: budget.as_millis() as u64,
            });
        }
        sleep(POLL_INTERVAL).await;
    }
}

/// Derive the level slug from the target URL path. A bare origin means the
/// entry-level challenge.
pub(crate) fn level_slug(url: &Url) -> String {
    let slug = url.path().trim_matches('/');
    if slug.is_empty() {
        DEFAULT_LEVEL_SLUG.to_owned()
    } else {
        slug.to_owned()
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_comes_from_the_path() {
        let url: Url = "https://gandalf.lakera.ai/do-not-tell".parse().unwrap();
        assert_eq!(level_slug(&url), "do-not-tell");
    }

    #[test]
    fn bare_origin_maps_to_entry_level() {
        let url: Url = "https://gandalf.lakera.ai/".parse().unwrap();
        assert_eq!(level_slug(&url), "baseline");
    }

    #[test]
    fn nested_paths_keep_inner_separators() {
        let url: Url = "https://gandalf.lakera.ai/adventures/misty/".parse().unwrap();
        assert_eq!(level_slug(&url), "adventures/misty");
    }
}
