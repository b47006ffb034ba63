//! Authorization module
//!
//! The gateway's core contract: every inbound request carries a workspace
//! context, and the caller's authenticated identity must match it. The
//! decision itself is a direct conditional check on the token's workspace
//! claims, optionally combined with an OPA policy query.

use crate::auth::Identity;
use async_trait::async_trait;
use thiserror::Error;

pub mod opa;

/// Authorization errors
#[derive(Error, Debug)]
pub enum AuthzError {
    #[error("Access denied")]
    AccessDenied,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Backend error: {0}")]
    BackendError(String),
}

/// Authorization request
#[derive(Debug, Clone)]
pub struct AuthzRequest {
    pub username: String,
    pub workspaces: Vec<String>,
    /// Workspace segment extracted from the URL path, when the route has one
    pub workspace: Option<String>,
    pub method: String,
    pub path: String,
}

/// Authorizer trait
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Authorizer: Send + Sync {
    /// Check if the request is authorized
    async fn authorize(&self, request: &AuthzRequest) -> Result<bool, AuthzError>;
}

/// No-op authorizer that always allows
pub struct AllowAllAuthorizer;

#[async_trait]
impl Authorizer for AllowAllAuthorizer {
    async fn authorize(&self, _request: &AuthzRequest) -> Result<bool, AuthzError> {
        Ok(true)
    }
}

/// No-op authorizer that always denies
pub struct DenyAllAuthorizer;

#[async_trait]
impl Authorizer for DenyAllAuthorizer {
    async fn authorize(&self, _request: &AuthzRequest) -> Result<bool, AuthzError> {
        Ok(false)
    }
}

/// Access requirement for a route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessPolicy {
    /// The workspace named in the URL must be one of the caller's workspaces
    WorkspaceMatch,
    /// The caller must belong to at least one workspace
    AnyWorkspace,
    /// The caller must present a valid identity
    LoggedIn,
}

/// The identity-matching check: is the requested workspace one of the
/// caller's workspaces?
pub fn workspace_matches(workspaces: &[String], requested: &str) -> bool {
    workspaces.iter().any(|w| w == requested)
}

/// Workspace access guard
///
/// Applies the claim-based check for the route's [`AccessPolicy`], then the
/// policy service when one is configured. Either layer can deny.
pub struct WorkspaceGuard {
    policy_service: Option<std::sync::Arc<dyn Authorizer>>,
}

impl WorkspaceGuard {
    /// Guard using claim checks only
    pub fn new() -> Self {
        Self {
            policy_service: None,
        }
    }

    /// Guard that also consults a policy service (e.g. OPA)
    pub fn with_policy_service(service: std::sync::Arc<dyn Authorizer>) -> Self {
        Self {
            policy_service: Some(service),
        }
    }

    /// Evaluate access for an authenticated identity.
    ///
    /// Returns `Err(AccessDenied)` on any mismatch or policy denial, and
    /// `Err(BackendError)` when the policy service cannot be reached - the
    /// caller maps those to 403 and 502 respectively.
    #[tracing::instrument(
        name = "authz.check",
        skip(self, identity),
        fields(
            authz.username = %identity.username,
            authz.policy = ?policy,
            authz.workspace = ?request_workspace
        ),
        err
    )]
    pub async fn check(
        &self,
        identity: &Identity,
        policy: AccessPolicy,
        request_workspace: Option<&str>,
        method: &str,
        path: &str,
    ) -> Result<(), AuthzError> {
        let allowed = match policy {
            AccessPolicy::WorkspaceMatch => match request_workspace {
                Some(requested) => workspace_matches(&identity.workspaces, requested),
                None => false,
            },
            AccessPolicy::AnyWorkspace => !identity.workspaces.is_empty(),
            AccessPolicy::LoggedIn => !identity.username.is_empty(),
        };

        if !allowed {
            tracing::info!(
                username = %identity.username,
                workspace = ?request_workspace,
                "workspace claim check denied"
            );
            return Err(AuthzError::AccessDenied);
        }

        if let Some(service) = &self.policy_service {
            let request = AuthzRequest {
                username: identity.username.clone(),
                workspaces: identity.workspaces.clone(),
                workspace: request_workspace.map(|w| w.to_string()),
                method: method.to_string(),
                path: path.to_string(),
            };
            if !service.authorize(&request).await? {
                tracing::info!(username = %identity.username, "policy service denied");
                return Err(AuthzError::AccessDenied);
            }
        }

        Ok(())
    }
}

impl Default for WorkspaceGuard {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;

    fn identity(username: &str, workspaces: &[&str]) -> Identity {
        Identity {
            username: username.into(),
            workspaces: workspaces.iter().map(|w| w.to_string()).collect(),
            claims: HashMap::new(),
        }
    }

    #[test]
    fn test_workspace_matches() {
        let workspaces = vec!["alpha".to_string(), "beta".to_string()];
        assert!(workspace_matches(&workspaces, "alpha"));
        assert!(!workspace_matches(&workspaces, "gamma"));
        assert!(!workspace_matches(&[], "alpha"));
    }

    #[tokio::test]
    async fn test_workspace_match_allows_member() {
        let guard = WorkspaceGuard::new();
        let result = guard
            .check(
                &identity("alice", &["alpha"]),
                AccessPolicy::WorkspaceMatch,
                Some("alpha"),
                "POST",
                "/manage/catalogs/user-datasets/alpha",
            )
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_workspace_match_denies_mismatch() {
        let guard = WorkspaceGuard::new();
        let result = guard
            .check(
                &identity("alice", &["alpha"]),
                AccessPolicy::WorkspaceMatch,
                Some("beta"),
                "POST",
                "/manage/catalogs/user-datasets/beta",
            )
            .await;
        assert!(matches!(result, Err(AuthzError::AccessDenied)));
    }

    #[tokio::test]
    async fn test_workspace_match_denies_missing_segment() {
        let guard = WorkspaceGuard::new();
        let result = guard
            .check(
                &identity("alice", &["alpha"]),
                AccessPolicy::WorkspaceMatch,
                None,
                "POST",
                "/manage/catalogs/user-datasets",
            )
            .await;
        assert!(matches!(result, Err(AuthzError::AccessDenied)));
    }

    #[tokio::test]
    async fn test_any_workspace_denies_empty() {
        let guard = WorkspaceGuard::new();
        let result = guard
            .check(
                &identity("alice", &[]),
                AccessPolicy::AnyWorkspace,
                None,
                "POST",
                "/stac/catalogs/commercial",
            )
            .await;
        assert!(matches!(result, Err(AuthzError::AccessDenied)));
    }

    #[tokio::test]
    async fn test_logged_in_denies_anonymous() {
        let guard = WorkspaceGuard::new();
        let result = guard
            .check(
                &identity("", &[]),
                AccessPolicy::LoggedIn,
                None,
                "GET",
                "/stac/catalogs/commercial",
            )
            .await;
        assert!(matches!(result, Err(AuthzError::AccessDenied)));
    }

    #[tokio::test]
    async fn test_policy_service_can_deny_matching_workspace() {
        let guard = WorkspaceGuard::with_policy_service(Arc::new(DenyAllAuthorizer));
        let result = guard
            .check(
                &identity("alice", &["alpha"]),
                AccessPolicy::WorkspaceMatch,
                Some("alpha"),
                "POST",
                "/manage/catalogs/user-datasets/alpha",
            )
            .await;
        assert!(matches!(result, Err(AuthzError::AccessDenied)));
    }

    #[tokio::test]
    async fn test_policy_service_error_propagates() {
        let mut service = MockAuthorizer::new();
        service
            .expect_authorize()
            .returning(|_| Err(AuthzError::BackendError("policy service unreachable".into())));
        let guard = WorkspaceGuard::with_policy_service(Arc::new(service));
        let result = guard
            .check(
                &identity("alice", &["alpha"]),
                AccessPolicy::WorkspaceMatch,
                Some("alpha"),
                "POST",
                "/manage/catalogs/user-datasets/alpha",
            )
            .await;
        assert!(matches!(result, Err(AuthzError::BackendError(_))));
    }

    #[tokio::test]
    async fn test_policy_service_allow_passes_through() {
        let guard = WorkspaceGuard::with_policy_service(Arc::new(AllowAllAuthorizer));
        let result = guard
            .check(
                &identity("alice", &["alpha"]),
                AccessPolicy::WorkspaceMatch,
                Some("alpha"),
                "POST",
                "/manage/catalogs/user-datasets/alpha",
            )
            .await;
        assert!(result.is_ok());
    }
}
