//! Common utilities shared across services.
//!
//! This crate provides:
//! - Unified error handling and `(success, message)` outcomes
//! - Configuration structures

pub mod config;
pub mod error;

pub use config::*;
pub use error::{AppError, AppResult, IntoOutcome, OptionExt, Outcome};
