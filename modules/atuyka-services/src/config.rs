use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// TOML-backed configuration loaded from disk.
/// Service tokens stay as env vars.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AtuykaConfig {
    pub services: ServicesConfig,
    pub bluesky: BlueskyConfig,
}

/// Which plugins discovery loads. An empty `include` loads every plugin.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServicesConfig {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BlueskyConfig {
    /// Public AppView, used for every unauthenticated request.
    pub base_url: String,
    /// PDS entryway, used for requests made with a token.
    pub auth_base_url: String,
    pub timeout_secs: u64,
}

impl Default for BlueskyConfig {
    fn default() -> Self {
        Self {
            base_url: "https://public.api.bsky.app".to_string(),
            auth_base_url: "https://bsky.social".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Load and parse a TOML config file.
pub fn load_config(path: &Path) -> Result<AtuykaConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let config: AtuykaConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
    Ok(config)
}

/// Name of the env var holding the token for `slug`, e.g. `BLUESKY_TOKEN`.
pub fn token_env_var(slug: &str) -> String {
    format!("{}_TOKEN", slug.to_ascii_uppercase().replace('-', "_"))
}

/// Token for `slug` from the environment. Empty values count as unset.
pub fn token_from_env(slug: &str) -> Option<String> {
    std::env::var(token_env_var(slug))
        .ok()
        .filter(|token| !token.is_empty())
}
