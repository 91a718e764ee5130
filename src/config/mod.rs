//! Review Configuration Module
//!
//! Provides the detour review configuration loaded from a TOML file.
//!
//! ## Loading Order
//!
//! 1. `DESVIO_CONFIG` environment variable (path to TOML file)
//! 2. `desvio_config.toml` in the current working directory
//! 3. Built-in defaults
//!
//! The config is passed explicitly into each pass; nothing reads it from
//! global state.

mod review_config;
pub mod validation;

pub use review_config::*;
