//! Login Types
//!
//! Request, credential, and configuration types.

pub mod auth;
pub mod config;

pub use auth::*;
pub use config::*;
