//! Configuration module for SiteGauge
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use sitegauge::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("sitegauge.toml")).unwrap();
//! println!("Crawler will fetch up to {} pages", config.crawler.max_pages);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    AiAgentEntry, Config, CrawlerConfig, OutputConfig, RobotsConfig, SiteConfig, UserAgentConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
