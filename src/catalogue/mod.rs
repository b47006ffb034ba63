//! Resource catalogue plumbing
//!
//! STAC item fetching, order-extension bookkeeping, and the key layout used
//! when mirroring catalogue entries into workspace storage.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// STAC order extension schema URL
pub const ORDER_EXTENSION_URL: &str = "https://stac-extensions.github.io/order/v1.1.0/schema.json";

/// Catalogue name that user-saved items are mirrored under
pub const SAVED_DATA_CATALOGUE: &str = "saved-data";

/// Catalogue name that commercial order records are mirrored under
pub const COMMERCIAL_CATALOGUE: &str = "commercial-data";

/// Catalogue errors
#[derive(Error, Debug)]
pub enum CatalogueError {
    #[error("Failed to fetch {url}: {reason}")]
    FetchError { url: String, reason: String },

    #[error("Catalogue returned status {status} for {url}")]
    UpstreamStatus { url: String, status: u16 },

    #[error("Invalid item: {0}")]
    InvalidItem(String),
}

/// Valid order statuses from the STAC order extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Orderable,
    Ordered,
    Pending,
    Shipping,
    Succeeded,
    Failed,
    Canceled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Orderable => "orderable",
            Self::Ordered => "ordered",
            Self::Pending => "pending",
            Self::Shipping => "shipping",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Canceled => "canceled",
        }
    }

    /// Statuses for which an order must not be re-placed
    pub fn blocks_reorder(status: &str) -> bool {
        status == "succeeded" || status == "pending"
    }
}

/// Request body for the item create, update and delete endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemRequest {
    pub url: String,
    #[serde(default)]
    pub extra_data: serde_json::Map<String, Value>,
}

/// Update a STAC item with an order status using the STAC order extension
pub fn apply_order_status(item: &mut Value, order_id: Option<&str>, status: OrderStatus) {
    if !item.is_object() {
        return;
    }
    let obj = item.as_object_mut().unwrap();

    let properties = obj
        .entry("properties")
        .or_insert_with(|| Value::Object(Default::default()));
    if let Some(props) = properties.as_object_mut() {
        if let Some(id) = order_id {
            props.insert("order:id".into(), Value::String(id.to_string()));
        }
        props.insert("order:status".into(), Value::String(status.as_str().into()));
    }

    let extensions = obj
        .entry("stac_extensions")
        .or_insert_with(|| Value::Array(Vec::new()));
    if let Some(list) = extensions.as_array_mut() {
        if !list.iter().any(|v| v.as_str() == Some(ORDER_EXTENSION_URL)) {
            list.push(Value::String(ORDER_EXTENSION_URL.into()));
        }
    }
}

/// Read the current order status of an item, when it has one
pub fn order_status_of(item: &Value) -> Option<&str> {
    item.get("properties")?.get("order:status")?.as_str()
}

/// Derive the storage key for a catalogue URL within a workspace.
///
/// The key is the URL path after the first catalogue segment, prefixed with
/// the workspace and mirror catalogue name. Keys without a file extension
/// get `.json` appended.
pub fn workspace_key(workspace: &str, catalogue_name: &str, url: &str) -> String {
    // Everything after the ninth '/' of the full URL, which is the path
    // below the top-level catalogue
    let tail: Vec<&str> = url.splitn(10, '/').collect();
    let path_after_catalog = tail.last().copied().unwrap_or(url);

    let mut key = format!("{}/{}/{}", workspace, catalogue_name, path_after_catalog);
    let last_segment = key.rsplit('/').next().unwrap_or("");
    if !last_segment.contains('.') {
        key.push_str(".json");
    }
    key
}

/// Expand an item URL into the list of URLs to mirror into a workspace.
///
/// An item under a `collections/{id}` segment also yields its collection
/// URL, placed first so the collection is uploaded before the item.
pub fn nested_urls(url: &str) -> Vec<String> {
    let Some((scheme_host, path)) = split_base(url) else {
        return vec![url.to_string()];
    };

    let parts: Vec<&str> = path.split('/').collect();
    let Some(idx) = parts.iter().position(|p| *p == "collections") else {
        return vec![url.to_string()];
    };
    if idx + 1 >= parts.len() {
        return vec![url.to_string()];
    }

    let collection_path = parts[..=idx + 1].join("/");
    vec![format!("{}{}", scheme_host, collection_path), url.to_string()]
}

fn split_base(url: &str) -> Option<(&str, &str)> {
    let scheme_end = url.find("://")? + 3;
    let path_start = url[scheme_end..].find('/')? + scheme_end;
    Some((&url[..path_start], &url[path_start..]))
}

/// Find the href of a link with the given rel
pub fn link_href<'a>(stac: &'a Value, rel: &str) -> Option<&'a str> {
    stac.get("links")?
        .as_array()?
        .iter()
        .find(|l| l.get("rel").and_then(Value::as_str) == Some(rel))?
        .get("href")?
        .as_str()
}

/// Storage keys for one commercial order record
#[derive(Debug, Clone, PartialEq)]
pub struct OrderKeys {
    pub catalog_key: String,
    pub collection_key: String,
    pub item_key: String,
    pub transformed_catalog_key: String,
    pub transformed_collection_key: String,
    pub transformed_item_key: String,
}

impl OrderKeys {
    /// Compute the workspace-facing and ingestion ("transformed") keys for
    /// an order record
    pub fn new(workspace: &str, catalog_id: &str, collection_id: &str, tagged_item: &str) -> Self {
        let transformed_base = format!(
            "transformed/catalogs/user/catalogs/{}/catalogs/{}/catalogs/{}",
            workspace, COMMERCIAL_CATALOGUE, catalog_id
        );
        Self {
            catalog_key: format!("{}/{}/{}.json", workspace, COMMERCIAL_CATALOGUE, catalog_id),
            collection_key: format!(
                "{}/{}/{}/{}.json",
                workspace, COMMERCIAL_CATALOGUE, catalog_id, collection_id
            ),
            item_key: format!(
                "{}/{}/{}/{}/{}.json",
                workspace, COMMERCIAL_CATALOGUE, catalog_id, collection_id, tagged_item
            ),
            transformed_catalog_key: format!("{}.json", transformed_base),
            transformed_collection_key: format!(
                "{}/collections/{}.json",
                transformed_base, collection_id
            ),
            transformed_item_key: format!(
                "{}/collections/{}/items/{}.json",
                transformed_base, collection_id, tagged_item
            ),
        }
    }

    /// Keys fed to the ingestion pipeline
    pub fn transformed_keys(&self) -> Vec<String> {
        vec![
            self.transformed_catalog_key.clone(),
            self.transformed_collection_key.clone(),
            self.transformed_item_key.clone(),
        ]
    }
}

/// Description attached to a mirrored order collection
pub fn order_collection_description(collection_id: &str) -> String {
    let pretty = capitalize(&collection_id.replace('_', " "));
    format!(
        "Order records for {}, including completed purchases with their associated assets, \
         as well as records of ongoing and failed orders.",
        pretty
    )
}

/// Description attached to a mirrored order catalogue
pub fn order_catalogue_description(catalog_id: &str) -> String {
    format!(
        "Order records for {}, including completed purchases with their associated assets, \
         as well as records of ongoing and failed orders.",
        capitalize(catalog_id)
    )
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// HTTP client for public catalogue reads
pub struct StacClient {
    client: reqwest::Client,
}

/// Number of attempts for catalogue fetches
const FETCH_ATTEMPTS: usize = 3;

impl StacClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Fetch a catalogue document, retrying transient failures
    #[tracing::instrument(name = "catalogue.fetch", skip(self), err)]
    pub async fn fetch_json(&self, url: &str) -> Result<Value, CatalogueError> {
        let body = self.fetch_text(url).await?;
        serde_json::from_str(&body).map_err(|e| CatalogueError::InvalidItem(e.to_string()))
    }

    /// Fetch raw document contents, retrying transient failures
    pub async fn fetch_text(&self, url: &str) -> Result<String, CatalogueError> {
        let mut last_error = String::new();
        for attempt in 0..FETCH_ATTEMPTS {
            match self.client.get(url).send().await {
                Ok(response) => {
                    let status = response.status();
                    if !status.is_success() {
                        return Err(CatalogueError::UpstreamStatus {
                            url: url.to_string(),
                            status: status.as_u16(),
                        });
                    }
                    return response.text().await.map_err(|e| CatalogueError::FetchError {
                        url: url.to_string(),
                        reason: e.to_string(),
                    });
                }
                Err(e) => {
                    last_error = e.to_string();
                    tracing::warn!(url = %url, attempt, error = %last_error, "catalogue fetch failed, retrying");
                }
            }
        }
        Err(CatalogueError::FetchError {
            url: url.to_string(),
            reason: last_error,
        })
    }
}

impl Default for StacClient {
    fn default() -> Self {
        Self::new()
    }
}
