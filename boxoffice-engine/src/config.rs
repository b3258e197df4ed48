use std::env;

use boxoffice_alloc::AllocatorKind;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct EngineConfig {
    pub venue: VenueConfig,
    pub holds: HoldConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct VenueConfig {
    pub rows: usize,
    pub seats_per_row: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HoldConfig {
    pub duration_seconds: u64,
    #[serde(default)]
    pub allocator: AllocatorKind,
    /// Identifier salt; generated at startup when unset.
    #[serde(default)]
    pub salt: Option<String>,
}

impl EngineConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            // Start off by merging in the "default" configuration file
            .add_source(config::File::with_name("config/default"))
            // Add in the current environment file; optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Add in a local configuration file that shouldn't be checked in
            .add_source(config::File::with_name("config/local").required(false))
            // Add in settings from the environment (with a prefix of BOXOFFICE)
            .add_source(config::Environment::with_prefix("BOXOFFICE").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
