/// Application configuration
use podcast_core::{CatalogQuery, SortOrder, DEFAULT_CATALOG_LIMIT};
use podcast_playback::PlayerConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file looked up in the working directory when none is given
pub const DEFAULT_CONFIG_FILE: &str = "podcast-player.toml";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub player: PlayerConfig,

    #[serde(default)]
    pub catalog: CatalogSettings,

    #[serde(default)]
    pub simulation: SimulationSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CatalogSettings {
    #[serde(default = "default_catalog_path")]
    pub path: PathBuf,

    #[serde(default = "default_catalog_limit")]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimulationSettings {
    /// Clock resolution of the simulated device
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,

    /// Playback speed multiplier (1.0 = real time)
    #[serde(default = "default_speed")]
    pub speed: f64,
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// An explicit `path` must exist; otherwise `podcast-player.toml` is read
    /// when present. Environment variables prefixed with `PODCAST_` override
    /// file values, with `__` between nested keys
    /// (`PODCAST_PLAYER__LOOPING=true`).
    pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut settings = config::Config::builder();

        match path {
            Some(path) => {
                settings = settings.add_source(config::File::from(path).required(true));
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    settings = settings.add_source(config::File::from(default_path));
                }
            }
        }

        settings = settings.add_source(
            config::Environment::with_prefix("PODCAST")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        settings.build()?.try_deserialize()
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.simulation.tick_ms == 0 {
            anyhow::bail!("simulation.tick_ms must be greater than zero");
        }

        if !self.simulation.speed.is_finite() || self.simulation.speed <= 0.0 {
            anyhow::bail!(
                "simulation.speed must be a positive number, got {}",
                self.simulation.speed
            );
        }

        if self.catalog.limit == Some(0) {
            anyhow::bail!("catalog.limit must be greater than zero (omit it for no limit)");
        }

        Ok(())
    }
}

impl CatalogSettings {
    /// Query for the home listing, newest first
    pub fn query(&self) -> CatalogQuery {
        CatalogQuery {
            limit: self.limit,
            order: SortOrder::NewestFirst,
        }
    }
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            path: default_catalog_path(),
            limit: default_catalog_limit(),
        }
    }
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
            speed: default_speed(),
        }
    }
}

// Default values
fn default_catalog_path() -> PathBuf {
    PathBuf::from("episodes.json")
}

fn default_catalog_limit() -> Option<usize> {
    Some(DEFAULT_CATALOG_LIMIT)
}

fn default_tick_ms() -> u64 {
    250
}

fn default_speed() -> f64 {
    1.0
}
