//! Builders
//!
//! Fluent builder patterns for login configuration.

pub mod config;

pub use config::{login_config, LoginConfigBuilder};
