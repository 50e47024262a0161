//! Scrape service seam between HTTP handlers and the browser layer.

use {
    async_trait::async_trait,
    istari_scraper::{ScrapeRequest, Scraper},
    url::Url,
};

/// What the gateway needs from the scraper. A trait so route tests can run
/// against a stub instead of a browser.
#[async_trait]
pub trait ScrapeService: Send + Sync {
    async fn answer(
        &self,
        caller_id: &str,
        target_url: Url,
        prompt: String,
    ) -> anyhow::Result<String>;
}

/// Production implementation backed by [`Scraper`].
pub struct LiveScrapeService {
    scraper: Scraper,
}

impl LiveScrapeService {
    pub fn new(scraper: Scraper) -> Self {
        Self { scraper }
    }
}

#[async_trait]
impl ScrapeService for LiveScrapeService {
    async fn answer(
        &self,
        caller_id: &str,
        target_url: Url,
        prompt: String,
    ) -> anyhow::Result<String> {
        let request = ScrapeRequest {
            target_url,
            prompt,
            caller_id: caller_id.to_owned(),
        };
        self.scraper.answer(&request).await
    }
}
