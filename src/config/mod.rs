//! Configuration module for Codetrawl
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use codetrawl::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("codetrawl.toml")).unwrap();
//! println!("Initial backoff: {}ms", config.fetcher.initial_backoff_ms);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, FetcherConfig, OutputConfig, PrimaryServiceConfig, SecondaryServiceConfig,
    SessionConfig, UserAgentConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use validation::validate;
