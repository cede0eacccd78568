//! Core types and utilities

pub mod types;
pub mod error;
pub mod logging;
pub mod time;
pub mod camera;
pub mod config;

pub use types::*;
pub use error::Error;
pub use config::BenchConfig;
