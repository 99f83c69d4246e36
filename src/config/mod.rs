//! Configuration module for Attendee-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Credentials never live in the file: the session cookie comes from the
//! environment (or a `.env` file) or from a separate cookie export.
//!
//! # Example
//!
//! ```no_run
//! use attendee_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Empty-page threshold: {}", config.crawler.max_consecutive_empty);
//! ```

mod parser;
mod types;
mod validation;

pub use types::{
    ClientConfig, Config, CrawlerConfig, DelayRange, OutputConfig, PacingConfig, SessionConfig,
    SourceConfig,
};

pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
