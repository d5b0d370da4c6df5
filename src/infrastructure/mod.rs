//! Infrastructure layer
//!
//! Process-level concerns that sit outside the domain: configuration
//! loading and logging initialization.

pub mod config;
pub mod logging;
