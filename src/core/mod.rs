//! # Core Module
//!
//! Configuration and service-timezone helpers shared by every feature.
//!
//! - **Version**: 2.0.0
//! - **Since**: 0.7.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 2.0.0: Add timezone module for wall-clock arrival times
//! - 1.0.0: Initial creation with config module

pub mod config;
pub mod timezone;

// Re-export commonly used items
pub use config::Config;
pub use timezone::{at_time_today, format_clock, next_occurrence, parse_time_of_day};
