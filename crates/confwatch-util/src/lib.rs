//! Shared utilities for confwatch.
//!
//! This crate provides common utilities used across the confwatch workspace:
//! - Logging setup with tracing
//! - Standard directories and path expansion/normalization

pub mod log;
pub mod path;

pub use log::{LogConfig, LogLevel};
