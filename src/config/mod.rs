//! Startup configuration, `serde`+`toml` backed, one struct per subsystem,
//! validated at load time.

mod world;

pub use world::{ConfigError, WorldConfig};
