//! Commercial order validation
//!
//! Product bundles, licences and radar options for Airbus and Planet orders,
//! with the conditional requirements the vendor APIs enforce. All failures
//! here map to 400 responses.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Airbus SAR collection id
pub const AIRBUS_SAR: &str = "airbus_sar_data";
/// Airbus PNEO collection id
pub const AIRBUS_PNEO: &str = "airbus_pneo_data";
/// Airbus PHR collection id
pub const AIRBUS_PHR: &str = "airbus_phr_data";
/// Airbus SPOT collection id
pub const AIRBUS_SPOT: &str = "airbus_spot_data";

/// All orderable Airbus collections
pub const AIRBUS_COLLECTIONS: [&str; 4] = [AIRBUS_SAR, AIRBUS_PNEO, AIRBUS_PHR, AIRBUS_SPOT];

/// Order validation failure; surfaced as a 400 response
#[derive(Error, Debug)]
#[error("{0}")]
pub struct OrderValidationError(pub String);

pub fn is_airbus_collection(collection: &str) -> bool {
    AIRBUS_COLLECTIONS.contains(&collection)
}

pub fn is_airbus_optical_collection(collection: &str) -> bool {
    is_airbus_collection(collection) && collection != AIRBUS_SAR
}

/// Product bundles for Planet and Airbus optical data
pub const OPTICAL_BUNDLES: [&str; 4] = ["General use", "Visual", "Basic", "Analytic"];

/// Product bundles for Airbus SAR data
pub const RADAR_BUNDLES: [&str; 4] = ["SSC", "MGD", "GEC", "EEC"];

/// Licence types for Airbus SAR data, with their vendor API values
pub const RADAR_LICENCES: [(&str, &str); 3] = [
    ("Single User Licence", "Single User License"),
    ("Multi User (2 - 5) Licence", "Multi User (2 - 5) License"),
    ("Multi User (6 - 30) Licence", "Multi User (6 - 30) License"),
];

/// Licence types for Airbus optical data, with their vendor API values
pub const OPTICAL_LICENCES: [(&str, &str); 9] = [
    ("Standard", "standard"),
    ("Background Layer", "background_layer"),
    ("Standard + Background Layer", "stand_background_layer"),
    ("Academic", "educ"),
    ("Media Licence", "media"),
    ("Standard Multi End-Users (2-5)", "standard_1_5"),
    ("Standard Multi End-Users (6-10)", "standard_6_10"),
    ("Standard Multi End-Users (11-30)", "standard_11_30"),
    ("Standard Multi End-Users (>30)", "standard_up_30"),
];

/// A validated licence with its vendor-facing value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Licence {
    /// Value as presented at the gateway API
    pub display: String,
    /// Value expected by the Airbus API
    pub airbus_value: String,
}

/// A validated product bundle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProductBundle {
    Optical(String),
    Radar(String),
}

impl ProductBundle {
    pub fn value(&self) -> &str {
        match self {
            Self::Optical(v) | Self::Radar(v) => v,
        }
    }
}

/// Orbit types for Airbus SAR data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orbit {
    Rapid,
    Science,
}

impl Orbit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rapid => "rapid",
            Self::Science => "science",
        }
    }
}

/// Resolution variants for Airbus SAR data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolutionVariant {
    RE,
    SE,
}

impl ResolutionVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RE => "RE",
            Self::SE => "SE",
        }
    }
}

/// Projection types for Airbus SAR data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Projection {
    Auto,
    UTM,
    UPS,
}

impl Projection {
    /// Value expected by the Airbus API
    pub fn airbus_value(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::UTM => "UTM",
            Self::UPS => "UPS",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "Auto",
            Self::UTM => "UTM",
            Self::UPS => "UPS",
        }
    }
}

/// Radar options supplied with an Airbus SAR order
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RadarOptions {
    pub orbit: Orbit,
    #[serde(default)]
    pub resolution_variant: Option<ResolutionVariant>,
    #[serde(default)]
    pub projection: Option<Projection>,
}

/// Validated radar settings as forwarded to the order workflow
#[derive(Debug, Clone, PartialEq)]
pub struct RadarSettings {
    pub orbit: Orbit,
    pub resolution_variant: Option<ResolutionVariant>,
    pub projection: Option<Projection>,
    pub product_type: String,
}

impl RadarSettings {
    /// Vendor-facing representation, omitting unset options
    pub fn to_value(&self) -> Value {
        let mut map = serde_json::Map::new();
        map.insert("orbit".into(), json!(self.orbit.as_str()));
        if let Some(rv) = &self.resolution_variant {
            map.insert("resolutionVariant".into(), json!(rv.as_str()));
        }
        if let Some(p) = &self.projection {
            map.insert("projection".into(), json!(p.airbus_value()));
        }
        map.insert("product_type".into(), json!(self.product_type));
        Value::Object(map)
    }
}

/// Request body for the order endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    pub product_bundle: String,
    #[serde(default)]
    pub coordinates: Vec<Value>,
    #[serde(default)]
    pub end_user_country: Option<String>,
    #[serde(default)]
    pub licence: Option<String>,
    #[serde(default)]
    pub radar_options: Option<RadarOptions>,
}

/// Request body for the quote endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteRequest {
    #[serde(default)]
    pub coordinates: Vec<Value>,
    #[serde(default)]
    pub licence: Option<String>,
}

/// Response body for the quote endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteResponse {
    pub value: f64,
    pub units: String,
}

/// Validate the licence type against allowed values for the collection.
///
/// Airbus collections require a licence; Planet collections take none.
pub fn validate_licence(
    collection: &str,
    licence: Option<&str>,
) -> Result<Option<Licence>, OrderValidationError> {
    let (table, kind) = if collection == AIRBUS_SAR {
        (&RADAR_LICENCES[..], "radar")
    } else if is_airbus_collection(collection) {
        (&OPTICAL_LICENCES[..], "optical")
    } else {
        return Ok(None);
    };

    let allowed: Vec<&str> = table.iter().map(|(display, _)| *display).collect();
    let Some(licence) = licence else {
        return Err(OrderValidationError(format!(
            "Licence is required for {} item. Valid licences are: {:?}",
            article(kind),
            allowed
        )));
    };

    match table.iter().find(|(display, _)| *display == licence) {
        Some((display, airbus_value)) => Ok(Some(Licence {
            display: (*display).to_string(),
            airbus_value: (*airbus_value).to_string(),
        })),
        None => Err(OrderValidationError(format!(
            "Invalid licence for {} item. Valid licences are: {:?}",
            article(kind),
            allowed
        ))),
    }
}

fn article(kind: &str) -> String {
    match kind {
        "optical" => format!("an {kind}"),
        _ => format!("a {kind}"),
    }
}

/// Validate the product bundle against allowed values for the collection
pub fn validate_product_bundle(
    collection: &str,
    product_bundle: &str,
) -> Result<ProductBundle, OrderValidationError> {
    if collection == AIRBUS_SAR {
        if !RADAR_BUNDLES.contains(&product_bundle) {
            return Err(OrderValidationError(format!(
                "Invalid product bundle for a radar item. Valid bundles are: {:?}",
                RADAR_BUNDLES
            )));
        }
        return Ok(ProductBundle::Radar(product_bundle.to_string()));
    }

    if !OPTICAL_BUNDLES.contains(&product_bundle) {
        return Err(OrderValidationError(format!(
            "Invalid product bundle. Valid bundles are: {:?}",
            OPTICAL_BUNDLES
        )));
    }
    Ok(ProductBundle::Optical(product_bundle.to_string()))
}

/// Validate the radar options for Airbus SAR data.
///
/// The SSC bundle carries its own resolution and projection, and MGD its own
/// projection, so those options are rejected where the bundle implies them
/// and required everywhere else.
pub fn validate_radar_options(
    collection: &str,
    radar_options: Option<&RadarOptions>,
    product_bundle: &str,
) -> Result<Option<RadarSettings>, OrderValidationError> {
    if collection != AIRBUS_SAR {
        return Ok(None);
    }

    let Some(options) = radar_options else {
        return Err(OrderValidationError(
            "Radar options missing for a radar item.".into(),
        ));
    };

    let is_ssc = product_bundle == "SSC";
    let is_ssc_or_mgd = is_ssc || product_bundle == "MGD";

    if !is_ssc && options.resolution_variant.is_none() {
        return Err(OrderValidationError(
            "Resolution variant is required for a radar item when the product bundle is not SSC."
                .into(),
        ));
    }
    if is_ssc && options.resolution_variant.is_some() {
        return Err(OrderValidationError(
            "Resolution variant should not be provided for a radar item when the product bundle \
             is SSC."
                .into(),
        ));
    }
    if !is_ssc_or_mgd && options.projection.is_none() {
        return Err(OrderValidationError(
            "Projection is required for a radar item when the product bundle is not SSC or MGD."
                .into(),
        ));
    }
    if is_ssc_or_mgd && options.projection.is_some() {
        return Err(OrderValidationError(
            "Projection should not be provided for a radar item when the product bundle is SSC \
             or MGD."
                .into(),
        ));
    }

    Ok(Some(RadarSettings {
        orbit: options.orbit,
        resolution_variant: options.resolution_variant,
        projection: options.projection,
        product_type: product_bundle.to_string(),
    }))
}

/// Derive the tag appended to an ordered item's id.
///
/// Encodes the bundle, radar options and a digest of the AOI coordinates so
/// distinct order configurations land on distinct catalogue entries.
pub fn order_tag(
    product_bundle: &ProductBundle,
    radar_settings: Option<&RadarSettings>,
    coordinates: &[Value],
) -> String {
    let mut tag = format!("-{}", product_bundle.value());

    if let Some(radar) = radar_settings {
        tag.push('-');
        tag.push_str(radar.orbit.as_str());
        if let Some(rv) = &radar.resolution_variant {
            tag.push('-');
            tag.push_str(rv.as_str());
        }
        if let Some(p) = &radar.projection {
            tag.push('-');
            tag.push_str(p.airbus_value());
        }
    }

    if !coordinates.is_empty() {
        let serialized = serde_json::to_string(coordinates).unwrap_or_default();
        let digest = Sha256::digest(serialized.as_bytes());
        tag.push('-');
        tag.push_str(&hex::encode(&digest[..16]));
    }

    // Leading hyphen becomes an underscore separator
    format!("_{}", &tag[1..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_licence_radar() {
        let licence = validate_licence(AIRBUS_SAR, Some("Single User Licence"))
            .unwrap()
            .unwrap();
        assert_eq!(licence.airbus_value, "Single User License");
    }

    #[test]
    fn test_validate_licence_required_for_airbus() {
        assert!(validate_licence(AIRBUS_SAR, None).is_err());
        assert!(validate_licence(AIRBUS_PNEO, None).is_err());
    }

    #[test]
    fn test_validate_licence_optical_mapping() {
        let licence = validate_licence(AIRBUS_PHR, Some("Media Licence"))
            .unwrap()
            .unwrap();
        assert_eq!(licence.airbus_value, "media");
    }

    #[test]
    fn test_validate_licence_invalid() {
        assert!(validate_licence(AIRBUS_SAR, Some("Standard")).is_err());
        assert!(validate_licence(AIRBUS_PNEO, Some("Single User Licence")).is_err());
    }

    #[test]
    fn test_validate_licence_planet_is_none() {
        assert!(validate_licence("PSScene", Some("Standard")).unwrap().is_none());
        assert!(validate_licence("PSScene", None).unwrap().is_none());
    }

    #[test]
    fn test_validate_product_bundle() {
        assert_eq!(
            validate_product_bundle(AIRBUS_SAR, "GEC").unwrap(),
            ProductBundle::Radar("GEC".into())
        );
        assert_eq!(
            validate_product_bundle("PSScene", "Analytic").unwrap(),
            ProductBundle::Optical("Analytic".into())
        );
        assert!(validate_product_bundle(AIRBUS_SAR, "Analytic").is_err());
        assert!(validate_product_bundle("PSScene", "SSC").is_err());
    }

    fn radar_opts(
        rv: Option<ResolutionVariant>,
        projection: Option<Projection>,
    ) -> RadarOptions {
        RadarOptions {
            orbit: Orbit::Rapid,
            resolution_variant: rv,
            projection,
        }
    }

    #[test]
    fn test_radar_options_required() {
        assert!(validate_radar_options(AIRBUS_SAR, None, "GEC").is_err());
        assert!(validate_radar_options("PSScene", None, "Analytic").unwrap().is_none());
    }

    #[test]
    fn test_radar_options_ssc_rules() {
        // SSC: no resolution variant, no projection
        let ok = validate_radar_options(AIRBUS_SAR, Some(&radar_opts(None, None)), "SSC")
            .unwrap()
            .unwrap();
        assert_eq!(ok.product_type, "SSC");

        let err = validate_radar_options(
            AIRBUS_SAR,
            Some(&radar_opts(Some(ResolutionVariant::RE), None)),
            "SSC",
        );
        assert!(err.is_err());
    }

    #[test]
    fn test_radar_options_mgd_rules() {
        // MGD: resolution variant required, projection rejected
        let ok = validate_radar_options(
            AIRBUS_SAR,
            Some(&radar_opts(Some(ResolutionVariant::SE), None)),
            "MGD",
        )
        .unwrap()
        .unwrap();
        assert_eq!(ok.resolution_variant, Some(ResolutionVariant::SE));

        let err = validate_radar_options(
            AIRBUS_SAR,
            Some(&radar_opts(Some(ResolutionVariant::SE), Some(Projection::Auto))),
            "MGD",
        );
        assert!(err.is_err());
    }

    #[test]
    fn test_radar_options_gec_requires_projection() {
        let err = validate_radar_options(
            AIRBUS_SAR,
            Some(&radar_opts(Some(ResolutionVariant::RE), None)),
            "GEC",
        );
        assert!(err.is_err());

        let ok = validate_radar_options(
            AIRBUS_SAR,
            Some(&radar_opts(Some(ResolutionVariant::RE), Some(Projection::Auto))),
            "GEC",
        )
        .unwrap()
        .unwrap();
        assert_eq!(ok.projection, Some(Projection::Auto));
    }

    #[test]
    fn test_radar_settings_to_value_maps_projection() {
        let settings = RadarSettings {
            orbit: Orbit::Rapid,
            resolution_variant: Some(ResolutionVariant::RE),
            projection: Some(Projection::Auto),
            product_type: "GEC".into(),
        };
        let value = settings.to_value();
        assert_eq!(value["orbit"], "rapid");
        assert_eq!(value["resolutionVariant"], "RE");
        assert_eq!(value["projection"], "auto");
        assert_eq!(value["product_type"], "GEC");
    }

    #[test]
    fn test_order_tag_bundle_only() {
        let tag = order_tag(&ProductBundle::Optical("Analytic".into()), None, &[]);
        assert_eq!(tag, "_Analytic");
    }

    #[test]
    fn test_order_tag_with_radar_and_coords() {
        let settings = RadarSettings {
            orbit: Orbit::Rapid,
            resolution_variant: Some(ResolutionVariant::RE),
            projection: Some(Projection::Auto),
            product_type: "GEC".into(),
        };
        let coords = vec![serde_json::json!([[0.0, 0.0], [0.0, 1.0], [1.0, 1.0], [0.0, 0.0]])];
        let tag = order_tag(&ProductBundle::Radar("GEC".into()), Some(&settings), &coords);

        assert!(tag.starts_with("_GEC-rapid-RE-auto-"));
        // Same inputs give the same tag
        assert_eq!(
            tag,
            order_tag(&ProductBundle::Radar("GEC".into()), Some(&settings), &coords)
        );
    }

    #[test]
    fn test_order_request_deserializes_camel_case() {
        let body: OrderRequest = serde_json::from_str(
            r#"{
                "productBundle": "GEC",
                "endUserCountry": "GB",
                "licence": "Single User Licence",
                "radarOptions": {"orbit": "rapid", "resolutionVariant": "RE", "projection": "Auto"}
            }"#,
        )
        .unwrap();
        assert_eq!(body.product_bundle, "GEC");
        assert_eq!(body.end_user_country.as_deref(), Some("GB"));
        let radar = body.radar_options.unwrap();
        assert_eq!(radar.orbit, Orbit::Rapid);
        assert_eq!(radar.projection, Some(Projection::Auto));
    }
}
