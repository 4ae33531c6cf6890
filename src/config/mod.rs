//! Configuration module for Product-Scout
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Configuration is read once at startup and handed to each component by value.
//!
//! # Example
//!
//! ```no_run
//! use product_scout::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("scout.toml")).unwrap();
//! println!("Bulk delay: {}ms", config.extraction.bulk_delay_ms);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    AdmissionConfig, Config, DefaultProxyConfig, ExtractionConfig, MetricsConfig, SweepMode,
};

// Re-export parser functions
pub use parser::{
    apply_env_overrides, compute_config_hash, load_config, load_config_with_hash, parse_config,
    ENV_PROXY_HOST, ENV_PROXY_PASSWORD, ENV_PROXY_PORT, ENV_PROXY_USERNAME,
};
pub use validation::validate;
