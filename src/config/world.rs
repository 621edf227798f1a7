//! World streaming settings, loaded once at startup via `serde`/`toml`, one
//! struct per subsystem.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("chunk_edge {0} must be a power of two")]
    ChunkEdgeNotPowerOfTwo(u32),
    #[error("unload_distance {unload} must be >= render_distance {render}")]
    UnloadBelowRender { render: u32, unload: u32 },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorldConfig {
    pub chunk_edge: u32,
    pub block_len: f32,
    pub render_distance: u32,
    pub load_distance: u32,
    pub unload_distance: u32,
    pub max_sunlight: u8,
    pub growth_factor: f32,
    pub worker_fraction: f32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            chunk_edge: 32,
            block_len: 0.5,
            render_distance: 8,
            load_distance: 9,
            unload_distance: 9,
            max_sunlight: 15,
            growth_factor: 1.25,
            worker_fraction: 0.25,
        }
    }
}

impl WorldConfig {
    /// Loads and validates a config from TOML text. Bad configuration
    /// refuses to start rather than limping along with nonsensical
    /// distances.
    pub fn from_toml(text: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.chunk_edge.is_power_of_two() {
            let err = ConfigError::ChunkEdgeNotPowerOfTwo(self.chunk_edge);
            log::error!("refusing to start: {err}");
            return Err(err);
        }
        if self.unload_distance < self.render_distance {
            let err = ConfigError::UnloadBelowRender { render: self.render_distance, unload: self.unload_distance };
            log::error!("refusing to start: {err}");
            return Err(err);
        }
        Ok(())
    }

    pub fn worker_count(&self, hardware_threads: usize) -> usize {
        ((hardware_threads as f32) * self.worker_fraction).round().max(1.0) as usize
    }
}
