//! Airbus vendor client
//!
//! Token generation against the OneAtlas identity provider, price quotes for
//! SAR and optical acquisitions, country-code validation for end users, and
//! asset fetches through the `external_*` links on Airbus items.

use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::config::AirbusConfig;
use crate::orders::{AIRBUS_PHR, AIRBUS_PNEO, AIRBUS_SPOT};

const PROD_TOKEN_URL: &str =
    "https://authenticate.foundation.api.oneatlas.airbus.com/auth/realms/IDP/protocol/openid-connect/token";
const DEV_TOKEN_URL: &str =
    "https://authenticate-int.idp.private.geoapi-airbusds.com/auth/realms/IDP/protocol/openid-connect/token";
const PROD_SAR_PRICES_URL: &str = "https://sar.api.oneatlas.airbus.com/v1/sar/prices";
const DEV_SAR_PRICES_URL: &str = "https://dev.sar.api.oneatlas.airbus.com/v1/sar/prices";
const OPTICAL_PRICES_URL: &str = "https://order.api.oneatlas.airbus.com/api/v1/prices";
const PROPERTIES_URL: &str = "https://order.api.oneatlas.airbus.com/api/v1/properties";

#[derive(Error, Debug)]
pub enum AirbusError {
    #[error("failed to generate access token")]
    TokenGeneration,

    #[error("no api key configured for Airbus")]
    MissingApiKey,

    #[error("request to {url} failed: {reason}")]
    RequestFailed { url: String, reason: String },

    #[error("{url} returned {status}")]
    UpstreamStatus { url: String, status: u16 },

    #[error("End user country code {code} is invalid. Valid codes are: {valid}")]
    InvalidCountryCode { code: String, valid: String },

    #[error("Quote not found for given acquisition ID")]
    QuoteNotFound,

    #[error("Multi and Stereo orders are not currently supported")]
    MultiNotSupported,

    #[error("External {0} link not found in item")]
    AssetLinkNotFound(String),
}

/// A vendor price quote
#[derive(Debug, Clone, PartialEq)]
pub struct Price {
    pub value: f64,
    pub currency: String,
}

/// Client for the Airbus OneAtlas APIs
pub struct AirbusClient {
    http: reqwest::Client,
    config: AirbusConfig,
    token_url: String,
    sar_prices_url: String,
    optical_prices_url: String,
    properties_url: String,
}

/// Builder for [`AirbusClient`], with endpoint overrides for testing
pub struct AirbusClientBuilder {
    config: AirbusConfig,
    token_url: Option<String>,
    sar_prices_url: Option<String>,
    optical_prices_url: Option<String>,
    properties_url: Option<String>,
}

impl AirbusClientBuilder {
    pub fn new(config: AirbusConfig) -> Self {
        Self {
            config,
            token_url: None,
            sar_prices_url: None,
            optical_prices_url: None,
            properties_url: None,
        }
    }

    pub fn token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = Some(url.into());
        self
    }

    pub fn sar_prices_url(mut self, url: impl Into<String>) -> Self {
        self.sar_prices_url = Some(url.into());
        self
    }

    pub fn optical_prices_url(mut self, url: impl Into<String>) -> Self {
        self.optical_prices_url = Some(url.into());
        self
    }

    pub fn properties_url(mut self, url: impl Into<String>) -> Self {
        self.properties_url = Some(url.into());
        self
    }

    pub fn build(self) -> AirbusClient {
        let prod = self.config.env == "prod";
        AirbusClient {
            http: reqwest::Client::new(),
            token_url: self.token_url.unwrap_or_else(|| {
                if prod { PROD_TOKEN_URL } else { DEV_TOKEN_URL }.to_string()
            }),
            sar_prices_url: self.sar_prices_url.unwrap_or_else(|| {
                if prod {
                    PROD_SAR_PRICES_URL
                } else {
                    DEV_SAR_PRICES_URL
                }
                .to_string()
            }),
            optical_prices_url: self
                .optical_prices_url
                .unwrap_or_else(|| OPTICAL_PRICES_URL.to_string()),
            properties_url: self
                .properties_url
                .unwrap_or_else(|| PROPERTIES_URL.to_string()),
            config: self.config,
        }
    }
}

impl AirbusClient {
    pub fn new(config: AirbusConfig) -> Self {
        AirbusClientBuilder::new(config).build()
    }

    pub fn builder(config: AirbusConfig) -> AirbusClientBuilder {
        AirbusClientBuilder::new(config)
    }

    /// Exchange the configured api key for an access token
    #[instrument(skip(self))]
    pub async fn generate_access_token(&self) -> Result<String, AirbusError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(AirbusError::MissingApiKey)?;
        self.token_for_key(api_key).await
    }

    /// Exchange a specific api key (e.g. a workspace-linked account key)
    pub async fn token_for_key(&self, api_key: &str) -> Result<String, AirbusError> {
        let params = [
            ("apikey", api_key),
            ("grant_type", "api_key"),
            ("client_id", "IDP"),
        ];
        let response = self
            .http
            .post(&self.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| AirbusError::RequestFailed {
                url: self.token_url.clone(),
                reason: e.to_string(),
            })?;
        let body: Value = response.json().await.map_err(|e| AirbusError::RequestFailed {
            url: self.token_url.clone(),
            reason: e.to_string(),
        })?;
        body.get("access_token")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or(AirbusError::TokenGeneration)
    }

    async fn post_json(&self, url: &str, body: &Value, token: &str) -> Result<Value, AirbusError> {
        debug!(url, "airbus api request");
        let response = self
            .http
            .post(url)
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .map_err(|e| AirbusError::RequestFailed {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(AirbusError::UpstreamStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        response.json().await.map_err(|e| AirbusError::RequestFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }

    /// Quote a SAR acquisition. The prices endpoint returns a list; the
    /// entry matching the acquisition id carries the price.
    #[instrument(skip(self, licence_value))]
    pub async fn sar_quote(&self, item: &str, licence_value: &str) -> Result<Price, AirbusError> {
        let token = self.generate_access_token().await?;
        let body = json!({ "acquisitions": [item], "orderTemplate": licence_value });
        let response = self.post_json(&self.sar_prices_url, &body, &token).await?;

        let entries = response.as_array().ok_or(AirbusError::QuoteNotFound)?;
        for entry in entries {
            if entry.get("acquisitionId").and_then(Value::as_str) == Some(item) {
                let price = entry.get("price").ok_or(AirbusError::QuoteNotFound)?;
                return Ok(Price {
                    value: price
                        .get("total")
                        .and_then(Value::as_f64)
                        .ok_or(AirbusError::QuoteNotFound)?,
                    currency: price
                        .get("currency")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                });
            }
        }
        Err(AirbusError::QuoteNotFound)
    }

    /// Quote an optical acquisition.
    ///
    /// PNEO items are referenced by their catalogue uuid, PHR and SPOT by
    /// datastrip id. `item_data` is the STAC item, used for the PNEO uuid,
    /// the multi/stereo check, and the AOI when the caller supplied none.
    #[instrument(skip(self, item_data, coordinates, licence_value))]
    pub async fn optical_quote(
        &self,
        collection: &str,
        item: &str,
        item_data: &Value,
        coordinates: &[Value],
        licence_value: &str,
    ) -> Result<Price, AirbusError> {
        let body =
            self.build_optical_price_request(collection, item, item_data, coordinates, licence_value)?;
        let token = self.generate_access_token().await?;
        let response = self.post_json(&self.optical_prices_url, &body, &token).await?;

        Ok(Price {
            value: response
                .get("totalAmount")
                .and_then(Value::as_f64)
                .ok_or(AirbusError::QuoteNotFound)?,
            currency: response
                .get("currency")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        })
    }

    fn build_optical_price_request(
        &self,
        collection: &str,
        item: &str,
        item_data: &Value,
        coordinates: &[Value],
        licence_value: &str,
    ) -> Result<Value, AirbusError> {
        let (product_type, contract_id) = match collection {
            AIRBUS_PNEO => {
                if item_data
                    .pointer("/properties/composed_of_acquisition_identifiers")
                    .and_then(Value::as_array)
                    .is_some_and(|ids| !ids.is_empty())
                {
                    return Err(AirbusError::MultiNotSupported);
                }
                ("PleiadesNeoArchiveMono", self.config.pneo_contract_id.as_str())
            }
            AIRBUS_PHR => ("PleiadesArchiveMono", self.config.legacy_contract_id.as_str()),
            AIRBUS_SPOT => ("SPOTArchive1.5Mono", self.config.legacy_contract_id.as_str()),
            other => {
                return Err(AirbusError::RequestFailed {
                    url: self.optical_prices_url.clone(),
                    reason: format!("{other} is not an Airbus optical collection"),
                })
            }
        };

        let coordinates: Value = if coordinates.is_empty() {
            item_data
                .pointer("/geometry/coordinates")
                .cloned()
                .unwrap_or_else(|| json!([]))
        } else {
            json!(coordinates)
        };

        let mut body = json!({
            "aoi": [
                {
                    "id": 1,
                    "name": "Polygon 1",
                    "geometry": {"type": "Polygon", "coordinates": coordinates},
                }
            ],
            "programReference": "",
            "contractId": contract_id,
            "items": [
                {
                    "notifications": [],
                    "stations": [],
                    "productTypeId": product_type,
                    "aoiId": 1,
                    "properties": [],
                }
            ],
            "primaryMarket": "NQUAL",
            "secondaryMarket": "",
            "customerReference": "Polygon 1",
            "optionsPerProductType": [
                {
                    "productTypeId": product_type,
                    "options": [
                        {"key": "delivery_method", "value": "on_the_flow"},
                        {"key": "fullStrip", "value": "false"},
                        {"key": "image_format", "value": "dimap_geotiff"},
                        {"key": "licence", "value": licence_value},
                        {"key": "pixel_coding", "value": "12bits"},
                        {"key": "priority", "value": "standard"},
                        {"key": "processing_level", "value": "primary"},
                        {"key": "radiometric_processing", "value": "reflectance"},
                        {"key": "spectral_processing", "value": "bundle"},
                    ],
                }
            ],
            "orderGroup": "",
            "delivery": {"type": "network"},
        });

        if collection == AIRBUS_PNEO {
            let uuid = item_data
                .pointer("/properties/id")
                .and_then(Value::as_str)
                .unwrap_or(item);
            body["items"][0]["dataSourceIds"] =
                json!([{ "catalogId": "PublicMOC", "catalogItemId": uuid }]);
        } else {
            body["items"][0]["datastripIds"] = json!([item]);
        }

        Ok(body)
    }

    /// Check an end-user country code against the vendor properties endpoint
    #[instrument(skip(self))]
    pub async fn validate_country_code(&self, country_code: &str) -> Result<(), AirbusError> {
        let token = self.generate_access_token().await?;
        let response = self
            .http
            .get(&self.properties_url)
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| AirbusError::RequestFailed {
                url: self.properties_url.clone(),
                reason: e.to_string(),
            })?;
        let body: Value = response.json().await.map_err(|e| AirbusError::RequestFailed {
            url: self.properties_url.clone(),
            reason: e.to_string(),
        })?;

        let country_ids: Vec<String> = body
            .get("properties")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter(|prop| prop.get("key").and_then(Value::as_str) == Some("countries"))
            .filter_map(|prop| prop.get("values").and_then(Value::as_array))
            .flatten()
            .filter_map(|country| country.get("id").and_then(Value::as_str))
            .map(str::to_string)
            .collect();

        if country_ids.iter().any(|id| id == country_code) {
            Ok(())
        } else {
            Err(AirbusError::InvalidCountryCode {
                code: country_code.to_string(),
                valid: country_ids.join(", "),
            })
        }
    }

    /// Fetch an `external_*` asset from an item using a generated token.
    ///
    /// Returns the asset bytes and content type.
    #[instrument(skip(self, item_data))]
    pub async fn fetch_asset(
        &self,
        item_data: &Value,
        asset_name: &str,
    ) -> Result<(Vec<u8>, Option<String>), AirbusError> {
        let asset_link = item_data
            .pointer(&format!("/assets/external_{asset_name}/href"))
            .and_then(Value::as_str)
            .ok_or_else(|| AirbusError::AssetLinkNotFound(asset_name.to_string()))?
            .to_string();
        info!(asset_name, url = %asset_link, "fetching airbus asset");

        let token = self.generate_access_token().await?;
        let response = self
            .http
            .get(&asset_link)
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| AirbusError::RequestFailed {
                url: asset_link.clone(),
                reason: e.to_string(),
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(AirbusError::UpstreamStatus {
                url: asset_link,
                status: status.as_u16(),
            });
        }
        let content_type = response
            .headers()
            .get("Content-Type")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await.map_err(|e| AirbusError::RequestFailed {
            url: asset_link,
            reason: e.to_string(),
        })?;
        Ok((bytes.to_vec(), content_type))
    }
}
