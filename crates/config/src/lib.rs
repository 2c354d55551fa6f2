// Configuration Management
//
// This crate handles all configuration loading for the relying-party demo.
// Everything is environment-driven; there is no configuration file. Each
// section struct exposes `from_env()`, and the process aborts startup on the
// first error.

use thiserror::Error;

pub mod types;

// Re-export all configuration types
pub use types::*;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("required environment variable {name} is not set")]
    MissingVar { name: String },

    #[error("environment variable {name} is invalid: {reason}")]
    InvalidVar { name: String, reason: String },
}
