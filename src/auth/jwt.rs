//! JWT Authentication
//!
//! Validates bearer tokens (HS256 or RS256) and extracts the caller's
//! username and workspace memberships from the claims. The workspaces claim
//! is located by a dot-separated path and may be a single string or an array
//! of strings - both token shapes exist in the wild.

use super::{AuthError, AuthRequest, Authenticator, Identity};
use async_trait::async_trait;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// JWT Claims
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub exp: usize,
    #[serde(default)]
    pub preferred_username: Option<String>,
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub iss: Option<String>,
    /// Everything else, kept for claim-path lookups
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

/// JWT Authenticator
///
/// # Example
///
/// ```
/// use torii_gatewayr::auth::jwt::JwtAuthenticator;
///
/// let auth = JwtAuthenticator::new_hs256("my-secret", "workspaces");
/// ```
pub struct JwtAuthenticator {
    decoding_key: DecodingKey,
    validation: Validation,
    workspaces_claim: String,
}

impl JwtAuthenticator {
    /// Create a new JWT authenticator with a secret key (HS256)
    pub fn new_hs256(secret: &str, workspaces_claim: &str) -> Self {
        let decoding_key = DecodingKey::from_secret(secret.as_bytes());
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.validate_aud = false;

        Self {
            decoding_key,
            validation,
            workspaces_claim: workspaces_claim.to_string(),
        }
    }

    /// Create a new JWT authenticator with an RSA public key (RS256)
    pub fn new_rs256(public_key_pem: &str, workspaces_claim: &str) -> Result<Self, AuthError> {
        let decoding_key = DecodingKey::from_rsa_pem(public_key_pem.as_bytes())
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;
        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_exp = true;
        validation.validate_aud = false;

        Ok(Self {
            decoding_key,
            validation,
            workspaces_claim: workspaces_claim.to_string(),
        })
    }

    /// Set the required issuer (`iss` claim)
    #[must_use]
    pub fn with_issuer(mut self, issuer: &str) -> Self {
        self.validation.set_issuer(&[issuer]);
        self
    }

    /// Extract a bearer token from the Authorization header
    fn extract_token(&self, request: &AuthRequest) -> Option<String> {
        let auth = request.headers.get("authorization")?;
        auth.strip_prefix("Bearer ").map(|t| t.to_string())
    }
}

/// Retrieve a nested claim value using a dot-separated path
fn nested_claim<'a>(claims: &'a HashMap<String, Value>, path: &str) -> Option<&'a Value> {
    let mut keys = path.split('.');
    let mut current = claims.get(keys.next()?)?;
    for key in keys {
        current = current.as_object()?.get(key)?;
    }
    Some(current)
}

/// Interpret a workspaces claim value as a list of workspace names.
///
/// Accepts either a plain string (one workspace) or an array of strings.
fn workspaces_from_claim(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::String(s)) if !s.is_empty() => vec![s.clone()],
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str())
            .map(|s| s.to_string())
            .collect(),
        _ => Vec::new(),
    }
}

#[async_trait]
impl Authenticator for JwtAuthenticator {
    #[tracing::instrument(
        name = "auth.jwt",
        skip(self, request),
        fields(
            auth.method = "jwt",
            auth.token_present = %self.extract_token(request).is_some()
        ),
        err
    )]
    async fn authenticate(&self, request: &AuthRequest) -> Result<Identity, AuthError> {
        let token = self.extract_token(request).ok_or(AuthError::MissingAuth)?;

        let token_data =
            decode::<Claims>(&token, &self.decoding_key, &self.validation).map_err(|e| match e
                .kind()
            {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                jsonwebtoken::errors::ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                _ => AuthError::InvalidToken(e.to_string()),
            })?;

        let claims = token_data.claims;
        let username = claims
            .preferred_username
            .clone()
            .or_else(|| claims.sub.clone())
            .unwrap_or_default();

        let workspaces =
            workspaces_from_claim(nested_claim(&claims.extra, &self.workspaces_claim));

        tracing::info!(
            username = %username,
            workspaces = ?workspaces,
            "JWT authentication successful"
        );

        Ok(Identity {
            username,
            workspaces,
            claims: claims.extra,
        })
    }
}
