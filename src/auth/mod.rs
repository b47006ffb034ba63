//! Authentication module
//!
//! Extracts and validates bearer tokens, producing the caller's identity:
//! username plus the workspaces named in the token claims.

use async_trait::async_trait;
use thiserror::Error;

pub mod jwt;

pub use jwt::JwtAuthenticator;

/// Authentication errors
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Missing authentication")]
    MissingAuth,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid signature")]
    InvalidSignature,
}

/// Authenticated caller identity
#[derive(Debug, Clone)]
pub struct Identity {
    pub username: String,
    /// Workspaces the caller belongs to, from the token claims
    pub workspaces: Vec<String>,
    pub claims: std::collections::HashMap<String, serde_json::Value>,
}

impl Identity {
    /// The caller's primary workspace, when they have one
    pub fn primary_workspace(&self) -> Option<&str> {
        self.workspaces.first().map(String::as_str)
    }
}

/// Authenticator trait
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Authenticate a request
    async fn authenticate(&self, request: &AuthRequest) -> Result<Identity, AuthError>;
}

/// Authentication request context
#[derive(Debug)]
pub struct AuthRequest {
    pub headers: std::collections::HashMap<String, String>,
    pub method: String,
    pub path: String,
}
