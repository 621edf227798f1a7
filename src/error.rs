//! Error taxonomy. Only initialization errors propagate to the application
//! layer; everything else is a logged skip or a debug assert, so most of
//! this crate's fallible paths return `Option` or log and continue rather
//! than returning `Result`. This module exists for the one class of error
//! that does propagate: bad configuration at startup.

use thiserror::Error;

/// The only error variant the core ever surfaces to a caller. Per-module
/// errors stay local to their module (e.g. `ConfigError` in `config`) and
/// are wrapped here only at the initialization boundary.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("configuration rejected: {0}")]
    Config(#[from] crate::config::ConfigError),
}
