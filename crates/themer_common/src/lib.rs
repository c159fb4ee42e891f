//! Themer Common - Shared types for the Konsole theme switcher
//!
//! Appearance modes, profile names, the dark-scheme heuristic, and the
//! daemon configuration file.

pub mod config;
pub mod error;
pub mod mode;

pub use config::*;
pub use error::*;
pub use mode::*;
