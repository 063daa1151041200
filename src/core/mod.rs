//! Core module - shared infrastructure for b3
//!
//! This module contains foundational types, configuration, and error handling
//! used throughout the application.

pub mod config;
pub mod error;
pub mod types;

pub use config::{Config, DispatchMode};
pub use error::{B3Error, Result};
pub use types::*;
