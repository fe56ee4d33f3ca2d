//! Core Module - Investigation Engine
//!
//! Number parsing, digit-pattern analysis, rule-based risk inference, the
//! investigation modules and the manager/orchestrator that run them.

pub mod manager;
pub mod modules;
pub mod orchestrator;
pub mod pattern;
pub mod phone;
pub mod rules;

pub use manager::*;
pub use modules::*;
pub use orchestrator::*;
pub use pattern::*;
pub use rules::*;
