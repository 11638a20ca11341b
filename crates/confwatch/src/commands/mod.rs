//! Command handlers for the confwatch CLI.

pub mod files;
pub mod serve;

pub use files::*;
pub use serve::*;
