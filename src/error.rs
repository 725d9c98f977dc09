// SPDX-License-Identifier: AGPL-3.0-or-later

//! Error types for Cortado
//!
//! This module defines all error types used throughout the crate. Note that
//! the public orchestration entry points deliberately do not surface these:
//! per the error-handling contract they degrade to fallback responses.

use thiserror::Error;

/// Main error type for Cortado operations
#[derive(Error, Debug)]
pub enum CortadoError {
    /// Model-provider errors (network/auth/parse talking to the LLM backend)
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Function execution errors
    #[error("Function execution failed: {0}")]
    Function(String),

    /// Prompt template errors
    #[error("Template error: {0}")]
    Template(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Session errors
    #[error("Session error: {0}")]
    Session(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing errors
    #[error("TOML error: {0}")]
    Toml(String),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Provider-specific error types
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Authentication failed (invalid API key)
    #[error("Authentication failed: invalid API key")]
    AuthenticationFailed,

    /// Rate limited by the backend
    #[error("Rate limited: retry after {0} seconds")]
    RateLimited(u32),

    /// Network connectivity error
    #[error("Network error: {0}")]
    Network(String),

    /// Invalid response from the backend
    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),

    /// Backend returned an error
    #[error("Provider error ({status}): {message}")]
    ServerError { status: u16, message: String },

    /// Timeout waiting for response
    #[error("Request timed out")]
    Timeout,
}

/// Result type alias for Cortado operations
pub type Result<T> = std::result::Result<T, CortadoError>;

impl From<toml::de::Error> for CortadoError {
    fn from(err: toml::de::Error) -> Self {
        CortadoError::Toml(err.to_string())
    }
}

impl From<toml::ser::Error> for CortadoError {
    fn from(err: toml::ser::Error) -> Self {
        CortadoError::Toml(err.to_string())
    }
}
