//! OPA (Open Policy Agent) Authorization
//!
//! Queries the OPA data API for a workspace-access decision. A missing or
//! null result defaults to deny; transport failures are surfaced as backend
//! errors so the gateway can answer 502.
//!
//! # Example
//!
//! ```no_run
//! use torii_gatewayr::authz::opa::{OpaAuthorizer, OpaConfig};
//! use std::time::Duration;
//!
//! let config = OpaConfig {
//!     url: "http://opal-client.opal:8181".to_string(),
//!     policy_path: "workspaces/allow".to_string(),
//!     timeout: Some(Duration::from_secs(5)),
//! };
//! let authorizer = OpaAuthorizer::new(config);
//! ```

use super::{Authorizer, AuthzError, AuthzRequest};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default timeout for OPA requests (5 seconds)
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// OPA client configuration
#[derive(Debug, Clone)]
pub struct OpaConfig {
    /// OPA server URL (e.g. "http://opal-client.opal:8181")
    pub url: String,
    /// Policy path in OPA (e.g. "workspaces/allow")
    pub policy_path: String,
    /// Request timeout (default: 5 seconds)
    pub timeout: Option<Duration>,
}

/// OPA Authorizer
pub struct OpaAuthorizer {
    config: OpaConfig,
    client: reqwest::Client,
}

/// Builder for OpaAuthorizer
#[derive(Default)]
pub struct OpaAuthorizerBuilder {
    url: Option<String>,
    policy_path: Option<String>,
    timeout: Option<Duration>,
}

/// OPA request input
#[derive(Debug, Serialize)]
struct OpaInput {
    input: OpaInputData,
}

#[derive(Debug, Serialize)]
struct OpaInputData {
    username: String,
    workspaces: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    workspace: Option<String>,
    method: String,
    path: String,
}

/// OPA response
#[derive(Debug, Deserialize)]
struct OpaResponse {
    result: Option<bool>,
}

impl OpaAuthorizerBuilder {
    /// Set the OPA server URL
    pub fn url(mut self, url: &str) -> Self {
        self.url = Some(url.to_string());
        self
    }

    /// Set the policy path
    pub fn policy_path(mut self, path: &str) -> Self {
        self.policy_path = Some(path.to_string());
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the OpaAuthorizer
    pub fn build(self) -> Result<OpaAuthorizer, AuthzError> {
        let url = self
            .url
            .ok_or_else(|| AuthzError::ConfigError("OPA URL is required".into()))?;
        let policy_path = self
            .policy_path
            .ok_or_else(|| AuthzError::ConfigError("OPA policy path is required".into()))?;

        Ok(OpaAuthorizer::new(OpaConfig {
            url,
            policy_path,
            timeout: self.timeout,
        }))
    }
}

impl OpaAuthorizer {
    /// Create a new OPA authorizer
    pub fn new(config: OpaConfig) -> Self {
        let timeout = config.timeout.unwrap_or(DEFAULT_TIMEOUT);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();

        Self { config, client }
    }

    /// Create a new builder for OpaAuthorizer
    pub fn builder() -> OpaAuthorizerBuilder {
        OpaAuthorizerBuilder::default()
    }
}

#[async_trait]
impl Authorizer for OpaAuthorizer {
    #[tracing::instrument(
        name = "authz.opa",
        skip(self, request),
        fields(
            authz.method = "opa",
            authz.path = %request.path
        ),
        err
    )]
    async fn authorize(&self, request: &AuthzRequest) -> Result<bool, AuthzError> {
        let url = format!("{}/v1/data/{}", self.config.url, self.config.policy_path);

        let input = OpaInput {
            input: OpaInputData {
                username: request.username.clone(),
                workspaces: request.workspaces.clone(),
                workspace: request.workspace.clone(),
                method: request.method.clone(),
                path: request.path.clone(),
            },
        };

        let response = self
            .client
            .post(&url)
            .json(&input)
            .send()
            .await
            .map_err(|e| AuthzError::BackendError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AuthzError::BackendError(format!(
                "OPA returned status {}",
                response.status()
            )));
        }

        let opa_response: OpaResponse = response
            .json()
            .await
            .map_err(|e| AuthzError::BackendError(e.to_string()))?;

        let allowed = opa_response.result.unwrap_or(false);

        tracing::info!(
            decision = %if allowed { "allow" } else { "deny" },
            "OPA authorization decision"
        );

        Ok(allowed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_pattern() {
        let authorizer = OpaAuthorizer::builder()
            .url("http://localhost:8181")
            .policy_path("workspaces/allow")
            .timeout(Duration::from_secs(5))
            .build();
        assert!(authorizer.is_ok());
    }

    #[test]
    fn test_builder_missing_url() {
        let result = OpaAuthorizer::builder().policy_path("workspaces/allow").build();
        assert!(result.is_err());
    }

    #[test]
    fn test_builder_missing_policy_path() {
        let result = OpaAuthorizer::builder().url("http://localhost:8181").build();
        assert!(result.is_err());
    }
}
