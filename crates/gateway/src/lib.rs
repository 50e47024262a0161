//! HTTP gateway in front of the scraper: bearer-key authentication, the
//! scrape endpoint, and per-caller prompt history.

pub mod auth;
pub mod auth_middleware;
pub mod history;
pub mod server;
pub mod services;
pub mod state;

pub use {
    auth::ApiKeyStore,
    history::HistoryStore,
    server::{build_app, serve},
    services::{LiveScrapeService, ScrapeService},
    state::GatewayState,
};
