//! TOML-loadable configuration for the web-of-trust guard.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use palisade_store::EventStore;
use palisade_types::{Filter, Pubkey};

use crate::engine::WotOptions;
use crate::WotError;

/// Configuration as it appears in a TOML file.
///
/// ```toml
/// enabled = true
/// trust_anchor = "82341f…"
/// trust_depth = 2
/// relay_urls = ["wss://relay.example.com"]
/// refresh_interval_secs = 3600
///
/// [[skip_filters]]
/// kinds = [2333]
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WotConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Hex pubkey of the trust anchor. Required while enabled.
    #[serde(default)]
    pub trust_anchor: Option<String>,

    /// Follow-hops from the anchor considered trusted (clamped to 2).
    #[serde(default = "default_trust_depth")]
    pub trust_depth: usize,

    /// Remote relays queried for contact lists.
    #[serde(default)]
    pub relay_urls: Vec<String>,

    /// Events matching any of these filters bypass the trust check.
    #[serde(default)]
    pub skip_filters: Vec<Filter>,

    /// Seconds between scheduled refreshes; absent disables scheduling.
    #[serde(default)]
    pub refresh_interval_secs: Option<u64>,
}

fn default_true() -> bool {
    true
}

fn default_trust_depth() -> usize {
    1
}

impl WotConfig {
    /// Load from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, WotError> {
        let text = std::fs::read_to_string(path.as_ref())
            .map_err(|error| WotError::Config(error.to_string()))?;
        toml::from_str(&text).map_err(|error| WotError::Config(error.to_string()))
    }

    /// Turn the config into engine options, attaching the optional local
    /// store handle. Fails on an anchor that is not a valid hex pubkey.
    pub fn into_options(self, store: Option<Arc<dyn EventStore>>) -> Result<WotOptions, WotError> {
        let trust_anchor = self
            .trust_anchor
            .map(|raw| {
                Pubkey::parse(&raw)
                    .map_err(|_| WotError::Config(format!("invalid trust anchor: {raw:?}")))
            })
            .transpose()?;

        Ok(WotOptions {
            enabled: self.enabled,
            trust_anchor,
            trust_depth: self.trust_depth,
            relay_urls: self.relay_urls,
            skip_filters: self.skip_filters,
            refresh_interval: self.refresh_interval_secs.map(Duration::from_secs),
            store,
            ..WotOptions::default()
        })
    }
}
