//! Login Core Components
//!
//! Collaborator interfaces and pure helpers used by the login flow.

pub mod authorization_url;
pub mod driver;
pub mod health;
pub mod user_agent;

pub use authorization_url::*;
pub use driver::*;
pub use health::*;
pub use user_agent::*;
