//! Core types shared across the Twitter OAuth workspace
#![warn(missing_docs)]

use thiserror::Error;

/// Core error type
///
/// Covers failures that happen before any OAuth exchange, such as
/// building the HTTP client.
#[derive(Debug, Error)]
pub enum Error {
    /// The HTTP client could not be constructed
    #[error("HTTP client error: {0}")]
    Http(String),
}

/// Result alias
pub type Result<T> = std::result::Result<T, Error>;
