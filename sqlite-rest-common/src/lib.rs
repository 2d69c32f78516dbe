//! sqlite-rest Common Types and Utilities
//!
//! Shared types, configuration, and error handling for the sqlite-rest crates.

#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod types;

pub use config::ServerConfig;
pub use error::{Error, Result};
pub use types::ApiError;
