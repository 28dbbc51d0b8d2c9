//! Tracing / logging initialisation.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Subscriber settings, usually loaded as the `log:` section of the indexer
/// config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Level applied to every target without an override.
    pub level: String,
    /// Per-target levels keyed by crate or module path. Dashes are accepted
    /// and normalised to underscores.
    pub targets: HashMap<String, String>,
    /// Newline-delimited JSON instead of the pretty text format.
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            targets: HashMap::new(),
            json: false,
        }
    }
}

impl LogConfig {
    /// Directive string for `EnvFilter`, e.g. `"info,tokenindex_core=debug"`.
    pub fn directives(&self) -> String {
        let mut targets: Vec<_> = self.targets.iter().collect();
        targets.sort();

        let mut directives = self.level.clone();
        for (target, level) in targets {
            directives.push_str(&format!(",{}={}", target.replace('-', "_"), level));
        }
        directives
    }
}

/// Initialise the global tracing subscriber. Call once at startup.
///
/// Falls back to `info` when the configured directives do not parse.
pub fn init_tracing(config: &LogConfig) {
    let filter = EnvFilter::try_new(config.directives()).unwrap_or_else(|_| EnvFilter::new("info"));

    if config.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .init();
    }
}
