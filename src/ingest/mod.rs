//! Catalogue ingestion messaging
//!
//! Every successful change to a workspace catalogue publishes a message
//! describing the added, updated and deleted object keys, so the harvest
//! pipeline picks the change up. The connection and producer are created
//! lazily on first publish.

use pulsar::{producer, Error as PulsarError, Producer, Pulsar, SerializeMessage, TokioExecutor};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use crate::config::PulsarConfig;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("failed to connect to message broker: {0}")]
    Connect(String),

    #[error("failed to publish message: {0}")]
    Publish(String),

    #[error("failed to serialize message: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A catalogue change notification
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IngestMessage {
    pub id: String,
    pub workspace: String,
    pub bucket_name: String,
    pub added_keys: Vec<String>,
    pub updated_keys: Vec<String>,
    pub deleted_keys: Vec<String>,
    pub source: String,
    pub target: String,
}

impl IngestMessage {
    /// Message for a change in `workspace`, with empty key lists
    pub fn for_workspace(workspace: &str, bucket: &str) -> Self {
        Self {
            id: format!("{workspace}/update"),
            workspace: workspace.to_string(),
            bucket_name: bucket.to_string(),
            added_keys: Vec::new(),
            updated_keys: Vec::new(),
            deleted_keys: Vec::new(),
            source: workspace.to_string(),
            target: String::new(),
        }
    }
}

impl SerializeMessage for IngestMessage {
    fn serialize_message(input: Self) -> Result<producer::Message, PulsarError> {
        let payload =
            serde_json::to_vec(&input).map_err(|e| PulsarError::Custom(e.to_string()))?;
        Ok(producer::Message {
            payload,
            ..Default::default()
        })
    }
}

/// Queue the gateway publishes catalogue changes to
#[async_trait::async_trait]
pub trait IngestQueue: Send + Sync {
    async fn publish(&self, message: IngestMessage) -> Result<(), IngestError>;
}

/// Pulsar-backed [`IngestQueue`]
pub struct PulsarQueue {
    config: PulsarConfig,
    producer: Mutex<Option<Producer<TokioExecutor>>>,
}

impl PulsarQueue {
    pub fn new(config: PulsarConfig) -> Self {
        Self {
            config,
            producer: Mutex::new(None),
        }
    }

    async fn connect(&self) -> Result<Producer<TokioExecutor>, IngestError> {
        info!(url = %self.config.url, topic = %self.config.topic, "connecting to pulsar");
        let pulsar = Pulsar::builder(&self.config.url, TokioExecutor)
            .build()
            .await
            .map_err(|e| IngestError::Connect(e.to_string()))?;
        pulsar
            .producer()
            .with_topic(&self.config.topic)
            .with_name(&self.config.producer_name)
            .build()
            .await
            .map_err(|e| IngestError::Connect(e.to_string()))
    }
}

#[async_trait::async_trait]
impl IngestQueue for PulsarQueue {
    #[instrument(skip(self, message), fields(workspace = %message.workspace))]
    async fn publish(&self, message: IngestMessage) -> Result<(), IngestError> {
        let mut guard = self.producer.lock().await;
        if guard.is_none() {
            *guard = Some(self.connect().await?);
        }
        let producer = guard
            .as_mut()
            .ok_or_else(|| IngestError::Connect("producer unavailable".into()))?;

        debug!(
            added = message.added_keys.len(),
            updated = message.updated_keys.len(),
            deleted = message.deleted_keys.len(),
            "publishing catalogue change"
        );
        let receipt = producer
            .send_non_blocking(message)
            .await
            .map_err(|e| IngestError::Publish(e.to_string()))?;
        receipt
            .await
            .map_err(|e| IngestError::Publish(e.to_string()))?;
        Ok(())
    }
}
