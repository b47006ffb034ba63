//! HTTP server
//!
//! Binds the configured address and serves the gateway, one task per
//! connection. Shutdown is triggered by SIGINT.

pub mod error;
pub mod handlers;
pub mod rate_limit;

use std::sync::Arc;

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::ades::AdesClient;
use crate::airbus::AirbusClient;
use crate::auth::{Authenticator, JwtAuthenticator};
use crate::authz::opa::{OpaAuthorizer, OpaConfig};
use crate::authz::WorkspaceGuard;
use crate::catalogue::StacClient;
use crate::config::Config;
use crate::ingest::PulsarQueue;
use crate::server::handlers::Gateway;
use crate::server::rate_limit::RateLimiter;
use crate::storage::S3Storage;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// The gateway server
pub struct Server {
    address: String,
    gateway: Arc<Gateway>,
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl Server {
    /// Assemble the gateway from configuration
    pub async fn new(mut config: Config) -> Result<Self, ServerError> {
        resolve_airbus_key(&mut config)?;
        let authenticator = build_authenticator(&config)?;
        let guard = build_guard(&config)?;
        let store = Arc::new(build_storage(&config).await);
        let queue = Arc::new(PulsarQueue::new(config.pulsar.clone()));
        let ades = AdesClient::new(
            config.ades.clone(),
            config.storage.clone(),
            config.pulsar.clone(),
        );
        let airbus = AirbusClient::new(config.airbus.clone());
        let rate_limiter = RateLimiter::new(&config.rate_limit);

        let gateway = Gateway {
            authenticator,
            guard,
            store,
            queue,
            stac: StacClient::new(),
            ades,
            airbus,
            rate_limiter,
            config: config.clone(),
        };

        Ok(Self {
            address: config.server.address,
            gateway: Arc::new(gateway),
        })
    }

    /// Accept connections until SIGINT
    pub async fn run(&self) -> Result<(), ServerError> {
        let listener = TcpListener::bind(&self.address).await?;
        info!(address = %self.address, "gateway listening");

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("shutdown signal received");
                    break;
                }
                result = listener.accept() => {
                    let (stream, peer) = match result {
                        Ok(accepted) => accepted,
                        Err(e) => {
                            error!(error = %e, "accept failed");
                            continue;
                        }
                    };
                    let gateway = Arc::clone(&self.gateway);
                    tokio::spawn(async move {
                        let io = TokioIo::new(stream);
                        let service = service_fn(move |req| {
                            let gateway = Arc::clone(&gateway);
                            async move { Ok::<_, std::convert::Infallible>(gateway.handle(req).await) }
                        });
                        if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                            error!(peer = %peer, error = %e, "connection error");
                        }
                    });
                }
            }
        }
        Ok(())
    }
}

/// Decrypt an OTP-encrypted vendor key from config, when one is supplied
/// instead of the plain key
fn resolve_airbus_key(config: &mut Config) -> Result<(), ServerError> {
    if config.airbus.api_key.is_some() {
        return Ok(());
    }
    if let (Some(ciphertext), Some(otp)) = (
        config.airbus.api_key_encrypted.as_deref(),
        config.airbus.otp_key.as_deref(),
    ) {
        let key = crate::secrets::decrypt_api_key(ciphertext, otp)
            .map_err(|e| ServerError::ConfigError(format!("airbus.api_key_encrypted: {e}")))?;
        config.airbus.api_key = Some(key);
    }
    Ok(())
}

fn build_authenticator(config: &Config) -> Result<Arc<dyn Authenticator>, ServerError> {
    let secret = config
        .auth
        .secret
        .as_deref()
        .ok_or_else(|| ServerError::ConfigError("auth.secret is required".into()))?;

    let authenticator = match config.auth.algorithm.as_str() {
        "HS256" => JwtAuthenticator::new_hs256(secret, &config.auth.workspaces_claim),
        "RS256" => JwtAuthenticator::new_rs256(secret, &config.auth.workspaces_claim)
            .map_err(|e| ServerError::ConfigError(e.to_string()))?,
        other => {
            return Err(ServerError::ConfigError(format!(
                "Unsupported JWT algorithm: {other}"
            )))
        }
    };
    Ok(Arc::new(authenticator))
}

fn build_guard(config: &Config) -> Result<WorkspaceGuard, ServerError> {
    if !config.opa.enabled {
        return Ok(WorkspaceGuard::new());
    }
    let opa = OpaAuthorizer::new(OpaConfig {
        url: config.opa.url.clone(),
        policy_path: config.opa.policy_path.clone(),
        timeout: Some(std::time::Duration::from_secs(config.opa.timeout_seconds)),
    });
    Ok(WorkspaceGuard::with_policy_service(Arc::new(opa)))
}

async fn build_storage(config: &Config) -> S3Storage {
    let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_config::Region::new(config.storage.region.clone()));
    if let Some(endpoint) = &config.storage.endpoint {
        loader = loader.endpoint_url(endpoint);
    }
    let sdk_config = loader.load().await;

    // Path-style addressing for non-AWS endpoints (e.g. minio)
    let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config);
    if config.storage.endpoint.is_some() {
        builder = builder.force_path_style(true);
    }
    S3Storage::new(aws_sdk_s3::Client::from_conf(builder.build()))
}
