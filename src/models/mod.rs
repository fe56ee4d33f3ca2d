//! Models Module - Data Structures & Configuration
//!
//! Shared types, the central error type and runtime configuration.

pub mod config;
pub mod errors;
pub mod types;

pub use config::*;
pub use errors::*;
pub use types::*;
