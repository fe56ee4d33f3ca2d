//! Utils Module - Shared Infrastructure
//!
//! Expiring cache, keyed rate limiter, telemetry buffers and reference data.

pub mod cache;
pub mod constants;
pub mod rate_limiter;
pub mod telemetry;

pub use cache::*;
pub use constants::*;
pub use rate_limiter::*;
pub use telemetry::*;
