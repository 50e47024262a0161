//! Configuration loading, validation, and env substitution.
//!
//! Config files: `istari.toml`, `istari.yaml`, or `istari.json`
//! Searched in `./` then `~/.config/istari/`.
//!
//! Supports `${ENV_VAR}` substitution in all string values.

pub mod env_subst;
pub mod loader;
pub mod schema;

pub use {
    loader::{apply_env_overrides, config_dir, discover_and_load, load_config},
    schema::{DatabaseConfig, IstariConfig, ScraperConfig, ServerConfig},
};
