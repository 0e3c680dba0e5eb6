//! Login boundary and client-held credential
//!
//! A session can only be constructed from an [`AuthToken`], and the only way
//! to obtain one is a successful login or a previously stored token.

mod client;
mod error;
mod token_store;

pub use client::LoginClient;
pub use error::{LoginError, TokenStoreError};
pub use token_store::TokenStore;

use std::fmt;

/// Opaque token returned by the login endpoint
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(***)")
    }
}
