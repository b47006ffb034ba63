//! Gateway Router
//!
//! Parses incoming method + path pairs into typed gateway routes and carries
//! the per-route access policy. Catalogue segment values are validated here
//! so handlers only ever see well-formed routes.

use crate::authz::AccessPolicy;
use percent_encoding::percent_decode_str;
use thiserror::Error;

/// Router errors
#[derive(Error, Debug)]
pub enum RouterError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Method not allowed: {0}")]
    MethodNotAllowed(String),

    #[error("Invalid path segment: {0}")]
    InvalidSegment(String),
}

/// Parent catalogue for commercial data in the resource catalogue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentCatalogue {
    SupportedDatasets,
    Commercial,
}

impl ParentCatalogue {
    fn parse(segment: &str) -> Result<Self, RouterError> {
        match segment {
            "supported-datasets" => Ok(Self::SupportedDatasets),
            "commercial" => Ok(Self::Commercial),
            other => Err(RouterError::InvalidSegment(format!(
                "Unknown parent catalogue '{}'",
                other
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SupportedDatasets => "supported-datasets",
            Self::Commercial => "commercial",
        }
    }
}

/// Catalogues that commercial data can be ordered from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderableCatalogue {
    Planet,
    Airbus,
}

impl OrderableCatalogue {
    fn parse(segment: &str) -> Result<Self, RouterError> {
        match segment {
            "planet" => Ok(Self::Planet),
            "airbus" => Ok(Self::Airbus),
            other => Err(RouterError::InvalidSegment(format!(
                "Unknown catalogue '{}'",
                other
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Planet => "planet",
            Self::Airbus => "airbus",
        }
    }
}

/// Item asset kinds served through the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Thumbnail,
    Quicklook,
}

impl AssetKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Thumbnail => "thumbnail",
            Self::Quicklook => "quicklook",
        }
    }
}

/// Typed gateway routes
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayRoute {
    /// GET /manage/health
    Health,
    /// GET /metrics
    Metrics,
    /// POST /manage/catalogs/user-datasets/{workspace}
    CreateItem { workspace: String },
    /// PUT /manage/catalogs/user-datasets/{workspace}
    UpdateItem { workspace: String },
    /// DELETE /manage/catalogs/user-datasets/{workspace}
    DeleteItem { workspace: String },
    /// POST /stac/catalogs/{parent}/catalogs/{catalog}/collections/{collection}/items/{item}/order
    OrderItem {
        parent: ParentCatalogue,
        catalog: OrderableCatalogue,
        collection: String,
        item: String,
    },
    /// POST /stac/catalogs/{parent}/catalogs/{catalog}/collections/{collection}/items/{item}/quote
    QuoteItem {
        parent: ParentCatalogue,
        catalog: OrderableCatalogue,
        collection: String,
        item: String,
    },
    /// GET .../catalogs/airbus/collections/{collection}/items/{item}/{thumbnail|quicklook}
    ItemAsset {
        collection: String,
        item: String,
        asset: AssetKind,
    },
    /// GET .../catalogs/airbus/collections/{collection}/thumbnail
    CollectionThumbnail { collection: String },
}

impl GatewayRoute {
    /// The workspace segment carried by the route, if any
    pub fn workspace(&self) -> Option<&str> {
        match self {
            Self::CreateItem { workspace }
            | Self::UpdateItem { workspace }
            | Self::DeleteItem { workspace } => Some(workspace),
            _ => None,
        }
    }

    /// Access policy required for this route, `None` for public routes
    pub fn access_policy(&self) -> Option<AccessPolicy> {
        match self {
            Self::CreateItem { .. } | Self::UpdateItem { .. } | Self::DeleteItem { .. } => {
                Some(AccessPolicy::WorkspaceMatch)
            }
            Self::OrderItem { .. } => Some(AccessPolicy::AnyWorkspace),
            Self::QuoteItem { .. } | Self::ItemAsset { .. } => Some(AccessPolicy::LoggedIn),
            Self::Health | Self::Metrics | Self::CollectionThumbnail { .. } => None,
        }
    }
}

/// Gateway request parser
pub struct RequestParser;

impl RequestParser {
    /// Parse an HTTP method and path into a gateway route
    pub fn parse(method: &str, path: &str) -> Result<GatewayRoute, RouterError> {
        let segments: Vec<String> = path
            .trim_matches('/')
            .split('/')
            .filter(|s| !s.is_empty())
            .map(decode_segment)
            .collect::<Result<_, _>>()?;
        let segs: Vec<&str> = segments.iter().map(String::as_str).collect();

        match segs.as_slice() {
            ["manage", "health"] => expect_method(method, "GET", GatewayRoute::Health),
            ["metrics"] => expect_method(method, "GET", GatewayRoute::Metrics),

            ["manage", "catalogs", "user-datasets", workspace] => {
                let workspace = (*workspace).to_string();
                match method {
                    "POST" => Ok(GatewayRoute::CreateItem { workspace }),
                    "PUT" => Ok(GatewayRoute::UpdateItem { workspace }),
                    "DELETE" => Ok(GatewayRoute::DeleteItem { workspace }),
                    other => Err(RouterError::MethodNotAllowed(other.to_string())),
                }
            }

            ["stac", "catalogs", parent, "catalogs", catalog, "collections", collection, "items", item, action @ ("order" | "quote")] =>
            {
                if method != "POST" {
                    return Err(RouterError::MethodNotAllowed(method.to_string()));
                }
                let parent = ParentCatalogue::parse(parent)?;
                let catalog = OrderableCatalogue::parse(catalog)?;
                let collection = (*collection).to_string();
                let item = (*item).to_string();
                if *action == "order" {
                    Ok(GatewayRoute::OrderItem {
                        parent,
                        catalog,
                        collection,
                        item,
                    })
                } else {
                    Ok(GatewayRoute::QuoteItem {
                        parent,
                        catalog,
                        collection,
                        item,
                    })
                }
            }

            // Current and legacy airbus asset paths
            ["stac", "catalogs", parent, "catalogs", "airbus", "collections", collection, "items", item, asset @ ("thumbnail" | "quicklook")] =>
            {
                ParentCatalogue::parse(parent)?;
                parse_asset(method, collection, item, asset)
            }
            ["stac", "catalogs", "supported-datasets", "airbus", "collections", collection, "items", item, asset @ ("thumbnail" | "quicklook")] => {
                parse_asset(method, collection, item, asset)
            }

            ["stac", "catalogs", parent, "catalogs", "airbus", "collections", collection, "thumbnail"] =>
            {
                ParentCatalogue::parse(parent)?;
                expect_method(
                    method,
                    "GET",
                    GatewayRoute::CollectionThumbnail {
                        collection: (*collection).to_string(),
                    },
                )
            }

            _ => Err(RouterError::NotFound(path.to_string())),
        }
    }
}

fn parse_asset(
    method: &str,
    collection: &str,
    item: &str,
    asset: &str,
) -> Result<GatewayRoute, RouterError> {
    let kind = if asset == "thumbnail" {
        AssetKind::Thumbnail
    } else {
        AssetKind::Quicklook
    };
    expect_method(
        method,
        "GET",
        GatewayRoute::ItemAsset {
            collection: collection.to_string(),
            item: item.to_string(),
            asset: kind,
        },
    )
}

fn expect_method(
    method: &str,
    expected: &str,
    route: GatewayRoute,
) -> Result<GatewayRoute, RouterError> {
    if method == expected {
        Ok(route)
    } else {
        Err(RouterError::MethodNotAllowed(method.to_string()))
    }
}

fn decode_segment(segment: &str) -> Result<String, RouterError> {
    percent_decode_str(segment)
        .decode_utf8()
        .map(|s| s.to_string())
        .map_err(|_| RouterError::InvalidSegment(segment.to_string()))
}
