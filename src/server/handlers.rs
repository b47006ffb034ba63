//! Gateway request handlers
//!
//! [`Gateway`] owns the authentication, authorization and upstream clients
//! and dispatches parsed routes to their handlers. Every handler returns
//! `Result<Response, ApiError>`; the error side carries the status mapping.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Body;
use hyper::{Request, Response, StatusCode};
use serde_json::{json, Value};
use tracing::{error, info, instrument, warn};

use crate::ades::{AdesClient, WorkflowInputs};
use crate::airbus::AirbusClient;
use crate::auth::{AuthRequest, Authenticator, Identity};
use crate::authz::WorkspaceGuard;
use crate::catalogue::{
    apply_order_status, link_href, nested_urls, order_catalogue_description,
    order_collection_description, order_status_of, workspace_key, CatalogueError, ItemRequest,
    OrderKeys, OrderStatus, StacClient, SAVED_DATA_CATALOGUE,
};
use crate::config::Config;
use crate::ingest::{IngestMessage, IngestQueue};
use crate::metrics;
use crate::orders::{
    is_airbus_collection, order_tag, validate_licence, validate_product_bundle,
    validate_radar_options, OrderRequest, QuoteRequest, QuoteResponse, AIRBUS_PNEO, AIRBUS_SAR,
};
use crate::planet;
use crate::router::{
    AssetKind, GatewayRoute, OrderableCatalogue, ParentCatalogue, RequestParser,
};
use crate::server::error::ApiError;
use crate::server::rate_limit::RateLimiter;
use crate::storage::ObjectStore;

type HttpResponse = Response<Full<Bytes>>;

/// The assembled gateway: identity, policy, and upstream clients
pub struct Gateway {
    pub(crate) authenticator: Arc<dyn Authenticator>,
    pub(crate) guard: WorkspaceGuard,
    pub(crate) store: Arc<dyn ObjectStore>,
    pub(crate) queue: Arc<dyn IngestQueue>,
    pub(crate) stac: StacClient,
    pub(crate) ades: AdesClient,
    pub(crate) airbus: AirbusClient,
    pub(crate) rate_limiter: RateLimiter,
    pub(crate) config: Config,
}

impl Gateway {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        authenticator: Arc<dyn Authenticator>,
        guard: WorkspaceGuard,
        store: Arc<dyn ObjectStore>,
        queue: Arc<dyn IngestQueue>,
        stac: StacClient,
        ades: AdesClient,
        airbus: AirbusClient,
        rate_limiter: RateLimiter,
        config: Config,
    ) -> Self {
        Self {
            authenticator,
            guard,
            store,
            queue,
            stac,
            ades,
            airbus,
            rate_limiter,
            config,
        }
    }

    /// Handle one request end to end, recording request metrics
    pub async fn handle<B>(&self, req: Request<B>) -> HttpResponse
    where
        B: Body<Data = Bytes>,
        B::Error: std::fmt::Display,
    {
        let started = Instant::now();
        let method = req.method().to_string();
        let path = req.uri().path().to_string();

        let (route_label, response) = match RequestParser::parse(&method, &path) {
            Ok(route) => {
                let label = route_label(&route);
                let response = match self.dispatch(route, req).await {
                    Ok(response) => response,
                    Err(err) => err.into_response(),
                };
                (label, response)
            }
            Err(err) => ("unmatched", ApiError::from(err).into_response()),
        };

        metrics::record_request(
            route_label,
            response.status().as_u16(),
            started.elapsed().as_secs_f64(),
        );
        info!(%method, %path, status = response.status().as_u16(), "request handled");
        response
    }

    async fn dispatch<B>(&self, route: GatewayRoute, req: Request<B>) -> Result<HttpResponse, ApiError>
    where
        B: Body<Data = Bytes>,
        B::Error: std::fmt::Display,
    {
        // Public routes skip identity entirely
        let identity = match route.access_policy() {
            Some(policy) => {
                let headers = header_map(&req);
                let auth_request = AuthRequest {
                    headers,
                    method: req.method().to_string(),
                    path: req.uri().path().to_string(),
                };
                let identity = match self.authenticator.authenticate(&auth_request).await {
                    Ok(identity) => {
                        metrics::record_auth_attempt(true);
                        identity
                    }
                    Err(err) => {
                        metrics::record_auth_attempt(false);
                        return Err(err.into());
                    }
                };
                let decision = self
                    .guard
                    .check(
                        &identity,
                        policy,
                        route.workspace(),
                        req.method().as_str(),
                        req.uri().path(),
                    )
                    .await;
                metrics::record_authz_decision(decision.is_ok());
                decision?;
                Some(identity)
            }
            None => None,
        };

        match route {
            GatewayRoute::Health => self.health().await,
            GatewayRoute::Metrics if self.config.metrics.enabled => Ok(metrics_response()),
            GatewayRoute::Metrics => Err(ApiError::NotFound("Not found: /metrics".into())),
            GatewayRoute::CreateItem { workspace } => {
                let body = read_body(req).await?;
                self.upsert_item(&workspace, &body, false).await
            }
            GatewayRoute::UpdateItem { workspace } => {
                let body = read_body(req).await?;
                self.upsert_item(&workspace, &body, true).await
            }
            GatewayRoute::DeleteItem { workspace } => {
                let body = read_body(req).await?;
                self.delete_item(&workspace, &body).await
            }
            GatewayRoute::OrderItem {
                parent,
                catalog,
                collection,
                item,
            } => {
                let authorization = authorization_header(&req);
                let body = read_body(req).await?;
                let identity = identity.ok_or(ApiError::Forbidden)?;
                self.order_item(
                    parent,
                    catalog,
                    &collection,
                    &item,
                    &identity,
                    authorization.as_deref(),
                    &body,
                )
                .await
            }
            GatewayRoute::QuoteItem {
                parent,
                catalog,
                collection,
                item,
            } => {
                let body = read_body(req).await?;
                self.quote_item(parent, catalog, &collection, &item, &body).await
            }
            GatewayRoute::ItemAsset {
                collection,
                item,
                asset,
            } => self.item_asset(&collection, &item, asset).await,
            GatewayRoute::CollectionThumbnail { collection } => {
                self.collection_thumbnail(&collection).await
            }
        }
    }

    /// Health check; verifies vendor connectivity when an Airbus key is
    /// configured by exchanging it for an access token
    async fn health(&self) -> Result<HttpResponse, ApiError> {
        if self.config.airbus.api_key.is_some() {
            self.airbus
                .generate_access_token()
                .await
                .map_err(|e| ApiError::Internal(format!("Health check failed: {e}")))?;
        }
        json_response(StatusCode::OK, &json!({"status": "healthy"}))
    }

    /// Mirror a public catalogue item (and its collection) into a workspace
    #[instrument(skip(self, body), fields(workspace = %workspace, update))]
    async fn upsert_item(
        &self,
        workspace: &str,
        body: &[u8],
        update: bool,
    ) -> Result<HttpResponse, ApiError> {
        self.rate_limiter.check(workspace)?;
        let request: ItemRequest = serde_json::from_slice(body)?;

        let bucket = &self.config.storage.bucket;
        let mut keys = Vec::new();
        let mut urls = serde_json::Map::new();
        for url in nested_urls(&request.url) {
            let content = self.stac.fetch_text(&url).await?;
            let key = workspace_key(workspace, SAVED_DATA_CATALOGUE, &url);
            self.store.put(bucket, &key, content.into_bytes()).await?;
            let presigned = self
                .store
                .presigned_get(bucket, &key, self.presign_expiry())
                .await?;
            urls.insert(key.clone(), Value::String(presigned));
            keys.push(key);
        }

        let action = if update { "update_item" } else { "create_item" };
        let mut message = IngestMessage::for_workspace(workspace, bucket);
        message.id = format!("{workspace}/{action}");
        message.target = format!("user-datasets/{workspace}");
        if update {
            message.updated_keys = keys.clone();
        } else {
            message.added_keys = keys.clone();
        }
        self.queue.publish(message).await?;

        let verb = if update { "updated" } else { "created" };
        json_response(
            StatusCode::OK,
            &json!({
                "message": format!("Item {verb} successfully"),
                "keys": keys,
                "urls": urls,
            }),
        )
    }

    /// Remove a mirrored item from a workspace
    #[instrument(skip(self, body), fields(workspace = %workspace))]
    async fn delete_item(&self, workspace: &str, body: &[u8]) -> Result<HttpResponse, ApiError> {
        self.rate_limiter.check(workspace)?;
        let request: ItemRequest = serde_json::from_slice(body)?;

        let bucket = &self.config.storage.bucket;
        let key = workspace_key(workspace, SAVED_DATA_CATALOGUE, &request.url);
        info!(key = %key, "deleting item from workspace");
        self.store.delete(bucket, &key).await?;

        let mut message = IngestMessage::for_workspace(workspace, bucket);
        message.id = format!("{workspace}/delete_item");
        message.target = format!("user-datasets/{workspace}");
        message.deleted_keys = vec![key];
        self.queue.publish(message).await?;

        json_response(StatusCode::OK, &json!({"message": "Item deleted successfully"}))
    }

    /// Place a commercial order: record the order item in the workspace and
    /// fire the fulfilment workflow
    #[allow(clippy::too_many_arguments)]
    #[instrument(skip(self, identity, authorization, body), fields(collection = %collection, item = %item))]
    async fn order_item(
        &self,
        parent: ParentCatalogue,
        catalog: OrderableCatalogue,
        collection: &str,
        item: &str,
        identity: &Identity,
        authorization: Option<&str>,
        body: &[u8],
    ) -> Result<HttpResponse, ApiError> {
        self.check_orderable(catalog, collection)?;
        let request: OrderRequest = serde_json::from_slice(body)?;

        let licence = validate_licence(collection, request.licence.as_deref())?;
        let bundle = validate_product_bundle(collection, &request.product_bundle)?;
        let radar = validate_radar_options(collection, request.radar_options.as_ref(), bundle.value())?;
        let tag = order_tag(&bundle, radar.as_ref(), &request.coordinates);

        let workspace = identity
            .primary_workspace()
            .ok_or_else(|| ApiError::NotFound("No workspace found for user".into()))?
            .to_string();

        let base_item_url = self.item_url(parent, catalog, collection, item);
        let location_url = format!(
            "{}{}/stac/catalogs/user/catalogs/{}/catalogs/commercial-data/catalogs/{}/collections/{}/items/{}{}",
            self.config.catalogue.public_url.trim_end_matches('/'),
            self.config.catalogue.root_path,
            workspace,
            catalog.as_str(),
            collection,
            item,
            tag
        );

        // A succeeded or pending order at the target location must not be
        // re-placed
        if let Some(existing) = self.try_fetch(&location_url).await? {
            if let Some(status) = order_status_of(&existing) {
                if OrderStatus::blocks_reorder(status) {
                    let message = format!("Order not placed. Current item status is {status}");
                    info!(%message);
                    return json_response_with_headers(
                        StatusCode::OK,
                        &existing,
                        &[("Location", &location_url), ("Message", &message)],
                    );
                }
            }
        }

        let mut item_data = self.stac.fetch_json(&base_item_url).await?;

        // Multi-acquisition PNEO items cannot be ordered yet
        if collection == AIRBUS_PNEO
            && item_data
                .pointer("/properties/composed_of_acquisition_identifiers")
                .and_then(Value::as_array)
                .is_some_and(|ids| !ids.is_empty())
        {
            return Err(ApiError::Internal(
                "Multi and Stereo orders are not currently supported".into(),
            ));
        }

        // End users accompany optical orders; PNEO requires at least one
        let mut end_users = None;
        if is_airbus_collection(collection) && collection != AIRBUS_SAR {
            let mut users = Vec::new();
            if let Some(country) = &request.end_user_country {
                self.airbus.validate_country_code(country).await?;
                users.push(json!({
                    "endUserName": identity.username,
                    "country": country,
                }));
            }
            if collection == AIRBUS_PNEO && users.is_empty() {
                return Err(ApiError::Validation(
                    "End users must be supplied for PNEO orders".into(),
                ));
            }
            end_users = Some(Value::Array(users));
        }

        let tagged_item = format!("{item}{tag}");
        self.prepare_order_item(
            &mut item_data,
            &tag,
            item,
            &request,
            licence.as_ref().map(|l| l.airbus_value.clone()),
            radar.as_ref().map(|r| r.to_value()),
        );

        let keys = OrderKeys::new(&workspace, catalog.as_str(), collection, &tagged_item);
        self.upload_order_hierarchy(&item_data, catalog.as_str(), collection, &keys)
            .await?;

        let mut message = IngestMessage::for_workspace(&workspace, &self.config.storage.bucket);
        message.id = format!("{workspace}/order_item");
        message.added_keys = keys.transformed_keys();
        message.source = "/".into();
        message.target = "/".into();

        // Radar orders carry their options grid through the product bundle
        // input
        let product_bundle_value = match &radar {
            Some(settings) => settings.to_value().to_string(),
            None => bundle.value().to_string(),
        };
        let inputs = WorkflowInputs {
            workspace: workspace.clone(),
            product_bundle: product_bundle_value,
            stac_key: format!("s3://{}/{}", self.config.storage.bucket, keys.item_key),
            coordinates: request.coordinates.clone(),
            end_users,
            licence: licence.as_ref().map(|l| l.airbus_value.clone()),
        };
        let authorization = authorization.unwrap_or_default();

        if let Err(err) = self
            .ades
            .execute_order_workflow(catalog.as_str(), collection, &inputs, authorization)
            .await
        {
            error!(error = %err, "order workflow execution failed");
            metrics::record_order(catalog.as_str(), false);
            metrics::record_upstream_error("ades");
            self.record_order_failure(&mut item_data, &keys).await;
            let _ = self.queue.publish(message).await;
            return Err(ApiError::Internal("Error executing order workflow".into()));
        }

        metrics::record_order(catalog.as_str(), true);
        self.queue.publish(message).await?;

        json_response_with_headers(
            StatusCode::CREATED,
            &item_data,
            &[("Location", &location_url)],
        )
    }

    /// Shape the ordered item: tag, pending status, order options, title,
    /// timestamps, AOI geometry
    fn prepare_order_item(
        &self,
        item_data: &mut Value,
        tag: &str,
        item: &str,
        request: &OrderRequest,
        licence_value: Option<String>,
        radar_value: Option<Value>,
    ) {
        let existing_id = item_data
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        item_data["id"] = Value::String(format!("{existing_id}{tag}"));

        apply_order_status(item_data, None, OrderStatus::Pending);
        item_data["assets"] = json!({});

        let mut title = format!("Order: {item} - {}", request.product_bundle);
        if !request.coordinates.is_empty() {
            title.push_str(" (Clipped)");
        }

        let now = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string();
        if let Some(props) = item_data
            .get_mut("properties")
            .and_then(Value::as_object_mut)
        {
            let mut order_options = json!({
                "productBundle": request.product_bundle,
                "coordinates": request.coordinates,
                "endUser": {
                    "country": request.end_user_country,
                },
                "licence": licence_value,
            });
            if let Some(radar) = radar_value {
                order_options["radarOptions"] = radar;
            }
            props.insert("order_options".into(), order_options);
            props.insert("title".into(), Value::String(title));
            props.insert("created".into(), Value::String(now.clone()));
            props.insert("updated".into(), Value::String(now));
        }

        // The AOI stands in for the clipped footprint
        if !request.coordinates.is_empty() {
            item_data["geometry"] = json!({
                "type": "Polygon",
                "coordinates": request.coordinates,
            });
        }
    }

    /// Upload the order catalogue, collection and item under both the
    /// workspace-facing and ingestion key layouts
    async fn upload_order_hierarchy(
        &self,
        item_data: &Value,
        catalog_id: &str,
        collection_id: &str,
        keys: &OrderKeys,
    ) -> Result<(), ApiError> {
        let collection_url = link_href(item_data, "collection").ok_or_else(|| {
            ApiError::BadGateway("Collection URL not found in item links".into())
        })?;
        let mut collection_data = self.stac.fetch_json(collection_url).await?;
        collection_data["description"] =
            Value::String(order_collection_description(collection_id));

        let catalog_url = link_href(&collection_data, "parent").ok_or_else(|| {
            ApiError::BadGateway("Parent catalogue URL not found in collection links".into())
        })?;
        let mut catalog_data = self.stac.fetch_json(catalog_url).await?;
        catalog_data["description"] = Value::String(order_catalogue_description(catalog_id));

        let mut item_data = item_data.clone();
        for doc in [&mut catalog_data, &mut collection_data, &mut item_data] {
            doc["links"] = json!([]);
        }

        let bucket = &self.config.storage.bucket;
        let uploads = [
            (&keys.catalog_key, &catalog_data),
            (&keys.collection_key, &collection_data),
            (&keys.item_key, &item_data),
            (&keys.transformed_catalog_key, &catalog_data),
            (&keys.transformed_collection_key, &collection_data),
            (&keys.transformed_item_key, &item_data),
        ];
        for (key, doc) in uploads {
            self.store
                .put(bucket, key, doc.to_string().into_bytes())
                .await?;
        }
        Ok(())
    }

    /// Mark the order item failed and re-upload it so the failure is
    /// visible in the catalogue
    async fn record_order_failure(&self, item_data: &mut Value, keys: &OrderKeys) {
        apply_order_status(item_data, None, OrderStatus::Failed);
        let bucket = &self.config.storage.bucket;
        let body = item_data.to_string().into_bytes();
        for key in [&keys.item_key, &keys.transformed_item_key] {
            if let Err(err) = self.store.put(bucket, key, body.clone()).await {
                warn!(key = %key, error = %err, "failed to record order failure");
            }
        }
    }

    /// Price quote for a commercial item
    #[instrument(skip(self, body), fields(collection = %collection, item = %item))]
    async fn quote_item(
        &self,
        parent: ParentCatalogue,
        catalog: OrderableCatalogue,
        collection: &str,
        item: &str,
        body: &[u8],
    ) -> Result<HttpResponse, ApiError> {
        self.check_orderable(catalog, collection)?;
        let request: QuoteRequest = serde_json::from_slice(body)?;
        let licence = validate_licence(collection, request.licence.as_deref())?;
        let base_item_url = self.item_url(parent, catalog, collection, item);

        let quote = match catalog {
            OrderableCatalogue::Airbus => {
                let licence_value = licence
                    .map(|l| l.airbus_value)
                    .ok_or_else(|| ApiError::Internal("Licence missing after validation".into()))?;
                let price = if collection == AIRBUS_SAR {
                    self.airbus.sar_quote(item, &licence_value).await?
                } else {
                    // The item document supplies the PNEO uuid and the AOI
                    // fallback
                    let item_data = if collection == AIRBUS_PNEO || request.coordinates.is_empty() {
                        self.stac.fetch_json(&base_item_url).await?
                    } else {
                        json!({})
                    };
                    self.airbus
                        .optical_quote(
                            collection,
                            item,
                            &item_data,
                            &request.coordinates,
                            &licence_value,
                        )
                        .await?
                };
                QuoteResponse {
                    value: price.value,
                    units: price.currency,
                }
            }
            OrderableCatalogue::Planet => {
                let coordinates = if request.coordinates.is_empty() {
                    let item_data = self.stac.fetch_json(&base_item_url).await?;
                    item_data
                        .pointer("/geometry/coordinates")
                        .and_then(Value::as_array)
                        .cloned()
                        .ok_or_else(|| {
                            ApiError::BadGateway("Item geometry has no coordinates".into())
                        })?
                } else {
                    request.coordinates.clone()
                };
                let estimate = planet::area_quote(collection, &coordinates)?;
                QuoteResponse {
                    value: estimate.km2,
                    units: "km2".into(),
                }
            }
        };

        json_response(StatusCode::OK, &serde_json::to_value(&quote)?)
    }

    /// Proxy an Airbus item asset (thumbnail or quicklook)
    #[instrument(skip(self), fields(collection = %collection, item = %item))]
    async fn item_asset(
        &self,
        collection: &str,
        item: &str,
        asset: AssetKind,
    ) -> Result<HttpResponse, ApiError> {
        let item_url = self.item_url(
            ParentCatalogue::SupportedDatasets,
            OrderableCatalogue::Airbus,
            collection,
            item,
        );
        let item_data = self.stac.fetch_json(&item_url).await?;
        let (bytes, content_type) = self.airbus.fetch_asset(&item_data, asset.name()).await?;

        let mut builder = Response::builder().status(StatusCode::OK);
        if let Some(content_type) = content_type {
            builder = builder.header("Content-Type", content_type);
        }
        builder
            .body(Full::new(Bytes::from(bytes)))
            .map_err(|e| ApiError::Internal(e.to_string()))
    }

    /// Serve a bundled collection thumbnail
    async fn collection_thumbnail(&self, collection: &str) -> Result<HttpResponse, ApiError> {
        if collection.contains('/') || collection.contains("..") {
            return Err(ApiError::NotFound("Thumbnail not found".into()));
        }
        let path = format!("thumbnails/{collection}.jpg");
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|_| ApiError::NotFound("Thumbnail not found".into()))?;
        Response::builder()
            .status(StatusCode::OK)
            .header("Content-Type", "image/jpeg")
            .body(Full::new(Bytes::from(bytes)))
            .map_err(|e| ApiError::Internal(e.to_string()))
    }

    /// Only configured collections are orderable through this gateway
    fn check_orderable(
        &self,
        catalog: OrderableCatalogue,
        collection: &str,
    ) -> Result<(), ApiError> {
        let known = match catalog {
            OrderableCatalogue::Airbus => is_airbus_collection(collection),
            OrderableCatalogue::Planet => self
                .config
                .planet
                .collections
                .iter()
                .any(|c| c == collection),
        };
        if known {
            Ok(())
        } else {
            Err(ApiError::NotFound(format!(
                "Collection {collection} not orderable from {}",
                catalog.as_str()
            )))
        }
    }

    /// Public catalogue URL of an item
    fn item_url(
        &self,
        parent: ParentCatalogue,
        catalog: OrderableCatalogue,
        collection: &str,
        item: &str,
    ) -> String {
        format!(
            "{}{}/stac/catalogs/{}/catalogs/{}/collections/{}/items/{}",
            self.config.catalogue.public_url.trim_end_matches('/'),
            self.config.catalogue.root_path,
            parent.as_str(),
            catalog.as_str(),
            collection,
            item
        )
    }

    /// Fetch a document that may not exist yet; missing or malformed
    /// documents are `None`
    async fn try_fetch(&self, url: &str) -> Result<Option<Value>, ApiError> {
        match self.stac.fetch_json(url).await {
            Ok(value) => Ok(Some(value)),
            Err(CatalogueError::UpstreamStatus { .. }) | Err(CatalogueError::InvalidItem(_)) => {
                Ok(None)
            }
            Err(err @ CatalogueError::FetchError { .. }) => Err(err.into()),
        }
    }

    fn presign_expiry(&self) -> Duration {
        Duration::from_secs(self.config.storage.presign_expiry_seconds)
    }
}

fn route_label(route: &GatewayRoute) -> &'static str {
    match route {
        GatewayRoute::Health => "health",
        GatewayRoute::Metrics => "metrics",
        GatewayRoute::CreateItem { .. } => "create_item",
        GatewayRoute::UpdateItem { .. } => "update_item",
        GatewayRoute::DeleteItem { .. } => "delete_item",
        GatewayRoute::OrderItem { .. } => "order_item",
        GatewayRoute::QuoteItem { .. } => "quote_item",
        GatewayRoute::ItemAsset { .. } => "item_asset",
        GatewayRoute::CollectionThumbnail { .. } => "collection_thumbnail",
    }
}

fn header_map<B>(req: &Request<B>) -> HashMap<String, String> {
    req.headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_lowercase(), v.to_string()))
        })
        .collect()
}

fn authorization_header<B>(req: &Request<B>) -> Option<String> {
    req.headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

async fn read_body<B>(req: Request<B>) -> Result<Vec<u8>, ApiError>
where
    B: Body<Data = Bytes>,
    B::Error: std::fmt::Display,
{
    let collected = req
        .into_body()
        .collect()
        .await
        .map_err(|e| ApiError::Validation(format!("Failed to read request body: {e}")))?;
    Ok(collected.to_bytes().to_vec())
}

fn json_response(status: StatusCode, body: &Value) -> Result<HttpResponse, ApiError> {
    json_response_with_headers(status, body, &[])
}

fn json_response_with_headers(
    status: StatusCode,
    body: &Value,
    headers: &[(&str, &str)],
) -> Result<HttpResponse, ApiError> {
    let mut builder = Response::builder()
        .status(status)
        .header("Content-Type", "application/json");
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    builder
        .body(Full::new(Bytes::from(body.to_string())))
        .map_err(|e| ApiError::Internal(e.to_string()))
}

fn metrics_response() -> HttpResponse {
    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "text/plain; version=0.0.4")
        .body(Full::new(Bytes::from(metrics::gather())))
        .unwrap_or_else(|_| Response::new(Full::new(Bytes::new())))
}
