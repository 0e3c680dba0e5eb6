//! Login and credential storage errors.

use thiserror::Error;

/// Errors surfaced to the operator when logging in.
#[derive(Debug, Error)]
pub enum LoginError {
    /// Controller rejected the username/password pair.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Controller could not be reached.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Controller answered with something other than a login response.
    #[error("Unexpected login response: {0}")]
    BadResponse(String),
}

/// Errors reading or writing the stored token.
#[derive(Debug, Error)]
pub enum TokenStoreError {
    #[error("Token store I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("No data directory available for the token store")]
    NoDataDir,
}
