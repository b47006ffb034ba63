//! Workflow execution client
//!
//! Commercial orders are fulfilled by adaptor workflows deployed on an ADES
//! (Application Deployment and Execution Service). The gateway fires the
//! workflow asynchronously and the adaptor reports back through the
//! catalogue ingestion pipeline.

use serde_json::{json, Value};
use thiserror::Error;
use tracing::{info, instrument};

use crate::config::{AdesConfig, PulsarConfig, StorageConfig};
use crate::orders::{is_airbus_optical_collection, AIRBUS_SAR};

#[derive(Error, Debug)]
pub enum AdesError {
    #[error("failed to reach workflow runner at {url}: {reason}")]
    Unreachable { url: String, reason: String },

    #[error("workflow runner returned {status} for {url}")]
    UpstreamStatus { url: String, status: u16 },
}

/// The adaptor workflow that fulfils orders for a collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Adaptor {
    /// Deployed process name on the ADES
    pub workflow_name: &'static str,
    /// Bucket the adaptor reads commercial data from, or the workspace
    /// bucket when `None`
    pub commercial_bucket: Option<&'static str>,
}

impl Adaptor {
    /// Select the adaptor for a collection id
    pub fn for_collection(collection: &str) -> Self {
        if collection == AIRBUS_SAR {
            Self {
                workflow_name: "airbus-sar-adaptor",
                commercial_bucket: Some("commercial-data-airbus"),
            }
        } else if is_airbus_optical_collection(collection) {
            Self {
                workflow_name: "airbus-optical-adaptor",
                commercial_bucket: Some("airbus-commercial-data"),
            }
        } else {
            Self {
                workflow_name: "planet-adaptor",
                commercial_bucket: None,
            }
        }
    }
}

/// Inputs for an order-fulfilment workflow execution
#[derive(Debug, Clone)]
pub struct WorkflowInputs {
    pub workspace: String,
    pub product_bundle: String,
    pub stac_key: String,
    pub coordinates: Vec<Value>,
    pub end_users: Option<Value>,
    pub licence: Option<String>,
}

/// Client for the ADES workflow runner
pub struct AdesClient {
    http: reqwest::Client,
    config: AdesConfig,
    storage: StorageConfig,
    pulsar: PulsarConfig,
}

impl AdesClient {
    pub fn new(config: AdesConfig, storage: StorageConfig, pulsar: PulsarConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            storage,
            pulsar,
        }
    }

    fn execution_url(&self, provider: &str, workflow_name: &str) -> String {
        format!(
            "{}/{}/processes/{}/execution",
            self.config.url.trim_end_matches('/'),
            provider,
            workflow_name
        )
    }

    fn inputs_payload(&self, adaptor: &Adaptor, inputs: &WorkflowInputs) -> Value {
        let commercial_bucket = adaptor
            .commercial_bucket
            .map(str::to_string)
            .unwrap_or_else(|| self.storage.bucket.clone());

        // The adaptors take list-valued inputs as serialized JSON strings
        let coordinates =
            serde_json::to_string(&inputs.coordinates).unwrap_or_else(|_| "[]".to_string());

        let mut payload = json!({
            "workspace": inputs.workspace,
            "cluster_prefix": self.config.cluster_prefix,
            "workspace_bucket": self.storage.bucket,
            "commercial_data_bucket": commercial_bucket,
            "pulsar_url": self.pulsar.url,
            "product_bundle": inputs.product_bundle,
            "stac_key": inputs.stac_key,
            "coordinates": coordinates,
        });
        if let Some(end_users) = &inputs.end_users {
            payload["end_users"] =
                json!(serde_json::to_string(end_users).unwrap_or_else(|_| "[]".to_string()));
        }
        if let Some(licence) = &inputs.licence {
            payload["licence"] = json!(licence);
        }
        payload
    }

    /// Fire the order workflow for `collection` asynchronously. The
    /// workflow runs in the data provider's workspace (`provider` is the
    /// catalogue name, e.g. "airbus").
    ///
    /// The caller's bearer token is forwarded so the ADES applies the same
    /// identity.
    #[instrument(skip(self, inputs, authorization), fields(provider = %provider, collection = %collection))]
    pub async fn execute_order_workflow(
        &self,
        provider: &str,
        collection: &str,
        inputs: &WorkflowInputs,
        authorization: &str,
    ) -> Result<(), AdesError> {
        let adaptor = Adaptor::for_collection(collection);
        let url = self.execution_url(provider, adaptor.workflow_name);
        let payload = json!({ "inputs": self.inputs_payload(&adaptor, inputs) });

        info!(workflow = adaptor.workflow_name, url = %url, "executing order workflow");
        let response = self
            .http
            .post(&url)
            .header("Authorization", authorization)
            .header("Prefer", "respond-async")
            .json(&payload)
            .send()
            .await
            .map_err(|e| AdesError::Unreachable {
                url: url.clone(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AdesError::UpstreamStatus {
                url,
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}
