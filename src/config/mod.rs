//! Configuration module for Torii Gatewayr
//!
//! Handles loading and parsing of YAML configuration files with support for
//! environment variable expansion and comprehensive validation.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

mod loader;

pub use loader::ConfigLoader;

// ============================================================================
// Environment Variable Expansion
// ============================================================================

/// Expand environment variables in a string.
///
/// Supports two syntaxes:
/// - `${VAR_NAME}` - Simple expansion, keeps placeholder if var not found
/// - `${VAR_NAME:-default}` - Expansion with default value
///
/// Variable names must start with a letter or underscore and contain only
/// uppercase letters, digits, and underscores.
pub(crate) fn expand_env_vars(s: &str) -> String {
    // Regex to capture ${VAR} or ${VAR:-default}
    let re = regex_lite::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)(?::-([^}]+))?\}").unwrap();
    let mut last_match = 0;
    let mut result = String::with_capacity(s.len());

    for cap in re.captures_iter(s) {
        let full_match = cap.get(0).unwrap();
        let var_name = cap.get(1).unwrap().as_str();

        // Append the text before the match
        result.push_str(&s[last_match..full_match.start()]);

        // Get value from env, or use default from regex
        let value = match std::env::var(var_name) {
            Ok(val) => val,
            Err(_) => {
                if let Some(default) = cap.get(2) {
                    default.as_str().to_string()
                } else {
                    // No env var and no default. Keep the original placeholder.
                    full_match.as_str().to_string()
                }
            }
        };
        result.push_str(&value);

        last_match = full_match.end();
    }

    // Append the rest of the string after the last match
    result.push_str(&s[last_match..]);

    result
}

// ============================================================================
// Validation Helpers
// ============================================================================

/// Validate that a URL starts with http:// or https://
fn is_valid_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthSettings,
    #[serde(default)]
    pub opa: OpaSettings,
    pub storage: StorageConfig,
    pub pulsar: PulsarConfig,
    pub ades: AdesConfig,
    pub catalogue: CatalogueConfig,
    #[serde(default)]
    pub airbus: AirbusConfig,
    #[serde(default)]
    pub planet: PlanetConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl Config {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        ConfigLoader::load(path)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.bucket.is_empty() {
            return Err(ConfigError::ValidationError(
                "storage.bucket must not be empty".into(),
            ));
        }

        if self.opa.enabled {
            if !is_valid_http_url(&self.opa.url) {
                return Err(ConfigError::ValidationError(
                    "Invalid OPA URL: must start with http:// or https://".into(),
                ));
            }
            if self.opa.policy_path.trim().is_empty() {
                return Err(ConfigError::ValidationError(
                    "opa.policy_path must not be empty when OPA is enabled".into(),
                ));
            }
        }

        if !is_valid_http_url(&self.ades.url) {
            return Err(ConfigError::ValidationError(
                "Invalid ADES URL: must start with http:// or https://".into(),
            ));
        }

        if !is_valid_http_url(&self.catalogue.public_url) {
            return Err(ConfigError::ValidationError(
                "Invalid catalogue public URL: must start with http:// or https://".into(),
            ));
        }

        if !self.pulsar.url.starts_with("pulsar://") && !self.pulsar.url.starts_with("pulsar+ssl://")
        {
            return Err(ConfigError::ValidationError(
                "Invalid Pulsar URL: must start with pulsar:// or pulsar+ssl://".into(),
            ));
        }

        if self.planet.collections.is_empty() {
            return Err(ConfigError::ValidationError(
                "planet.collections must not be empty".into(),
            ));
        }

        if self.rate_limit.enabled && self.rate_limit.interval_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "rate_limit.interval_seconds must be greater than zero".into(),
            ));
        }

        match self.auth.algorithm.as_str() {
            "HS256" | "RS256" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid JWT algorithm '{}': must be 'HS256' or 'RS256'",
                    other
                )))
            }
        }

        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub address: String,
}

/// JWT authentication settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSettings {
    /// Shared secret (HS256) or PEM public key (RS256)
    #[serde(default)]
    pub secret: Option<String>,
    /// JWT algorithm: "HS256" or "RS256"
    #[serde(default = "default_jwt_algorithm")]
    pub algorithm: String,
    /// Dot-separated path to the workspaces claim in the token
    #[serde(default = "default_workspaces_claim")]
    pub workspaces_claim: String,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            secret: None,
            algorithm: default_jwt_algorithm(),
            workspaces_claim: default_workspaces_claim(),
        }
    }
}

fn default_jwt_algorithm() -> String {
    "HS256".to_string()
}

fn default_workspaces_claim() -> String {
    "workspaces".to_string()
}

/// OPA policy check settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpaSettings {
    /// Enable the policy check. Disabled by default for local development.
    #[serde(default)]
    pub enabled: bool,
    /// OPA server URL (e.g. "http://opal-client.opal:8181")
    #[serde(default)]
    pub url: String,
    /// Policy path in OPA (e.g. "workspaces/allow")
    #[serde(default = "default_opa_policy_path")]
    pub policy_path: String,
    /// Request timeout in seconds
    #[serde(default = "default_opa_timeout")]
    pub timeout_seconds: u64,
}

impl Default for OpaSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            url: String::new(),
            policy_path: default_opa_policy_path(),
            timeout_seconds: default_opa_timeout(),
        }
    }
}

fn default_opa_policy_path() -> String {
    "workspaces/allow".to_string()
}

fn default_opa_timeout() -> u64 {
    5
}

/// Workspace storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub bucket: String,
    pub region: String,
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Expiry for pre-signed download URLs, in seconds
    #[serde(default = "default_presign_expiry")]
    pub presign_expiry_seconds: u64,
}

fn default_presign_expiry() -> u64 {
    3600
}

/// Pulsar ingestion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PulsarConfig {
    pub url: String,
    #[serde(default = "default_pulsar_topic")]
    pub topic: String,
    #[serde(default = "default_producer_name")]
    pub producer_name: String,
}

fn default_pulsar_topic() -> String {
    "transformed".to_string()
}

fn default_producer_name() -> String {
    "torii-gatewayr".to_string()
}

/// ADES workflow runner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdesConfig {
    pub url: String,
    #[serde(default)]
    pub cluster_prefix: String,
}

/// Resource catalogue configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogueConfig {
    /// Public base URL of the catalogue (e.g. "https://dev.eodatahub.org.uk")
    pub public_url: String,
    /// Root path the gateway is mounted under
    #[serde(default = "default_root_path")]
    pub root_path: String,
}

fn default_root_path() -> String {
    "/api/catalogue".to_string()
}

/// Airbus vendor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AirbusConfig {
    /// "prod" or "dev" - selects the vendor API endpoints
    #[serde(default = "default_airbus_env")]
    pub env: String,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Alternative to `api_key`: OTP-encrypted key and pad, both base64
    #[serde(default)]
    pub api_key_encrypted: Option<String>,
    #[serde(default)]
    pub otp_key: Option<String>,
    /// Contract id used for PNEO price requests
    #[serde(default = "default_pneo_contract")]
    pub pneo_contract_id: String,
    /// Contract id used for PHR and SPOT price requests
    #[serde(default = "default_legacy_contract")]
    pub legacy_contract_id: String,
}

impl Default for AirbusConfig {
    fn default() -> Self {
        Self {
            env: default_airbus_env(),
            api_key: None,
            api_key_encrypted: None,
            otp_key: None,
            pneo_contract_id: default_pneo_contract(),
            legacy_contract_id: default_legacy_contract(),
        }
    }
}

fn default_airbus_env() -> String {
    "prod".to_string()
}

fn default_pneo_contract() -> String {
    "CTR24005241".to_string()
}

fn default_legacy_contract() -> String {
    "UNIVERSITY_OF_LEICESTER_Orders".to_string()
}

/// Planet vendor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanetConfig {
    /// Collections that can be ordered through the gateway
    #[serde(default = "default_planet_collections")]
    pub collections: Vec<String>,
}

impl Default for PlanetConfig {
    fn default() -> Self {
        Self {
            collections: default_planet_collections(),
        }
    }
}

fn default_planet_collections() -> Vec<String> {
    vec!["PSScene".to_string(), "SkySatCollect".to_string()]
}

/// Per-workspace rate limiting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_rate_interval")]
    pub interval_seconds: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_seconds: default_rate_interval(),
        }
    }
}

fn default_rate_interval() -> u64 {
    5
}

/// Metrics configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_metrics_enabled(),
        }
    }
}

fn default_metrics_enabled() -> bool {
    true
}
