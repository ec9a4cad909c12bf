//! Core types for plugdeps
//!
//! This module holds the error system used throughout the crate:
//! - [`PlugdepsError`] - Enumerated error types covering every failure mode
//! - [`ErrorContext`] - User-friendly error wrapper with suggestions and details
//! - [`user_friendly_error`] - Convert any error to user-friendly format
//!
//! Library functions return `Result<T, PlugdepsError>` where a caller needs to
//! branch on the failure kind (manifest loading, version parsing) and
//! `anyhow::Result` everywhere else.

pub mod error;

pub use error::{ErrorContext, PlugdepsError, user_friendly_error};
