//! Login Flows
//!
//! The browser-driven authorization flow.
//!
//! - **Extraction**: Write-once state machine over driver events
//! - **Attempt**: One scripted session with concurrent extraction

pub mod attempt;
pub mod extraction;

pub use attempt::AttemptRunner;
pub use extraction::{CredentialExtractor, ExtractionPhase};
