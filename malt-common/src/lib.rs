//! # Malt Common Library
//!
//! Shared code for the malt crates including:
//! - Error type and result alias
//! - Configuration loading and root folder resolution
//! - Timestamp helpers

pub mod config;
pub mod error;
pub mod time;

pub use error::{Error, Result};
