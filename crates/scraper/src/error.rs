//! Scraper error types.

use thiserror::Error;

/// Errors that can occur while driving a scrape session.
///
/// Everything here is fatal for the request it belongs to, with one
/// exception: a remote-connect [`Acquisition`](ScrapeError::Acquisition)
/// failure is recovered internally by falling back to the local browser and
/// never reaches a caller.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("browser acquisition failed: {0}")]
    Acquisition(String),

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("input control {selector} did not appear within {timeout_ms}ms")]
    SelectorTimeout {
        selector: &'static str,
        timeout_ms: u64,
    },

    #[error("neither answer nor rejection appeared within {0}ms")]
    ResponseTimeout(u64),

    #[error("JavaScript evaluation failed: {0}")]
    JsEval(String),

    #[error("CDP error: {0}")]
    Cdp(String),
}

impl From<chromiumoxide::error::CdpError> for ScrapeError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        ScrapeError::Cdp(err.to_string())
    }
}
