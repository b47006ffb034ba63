//! Planet quote estimation
//!
//! Planet charges by area, so a quote is the AOI polygon's surface area in
//! km², rounded up. The area comes from a spherical approximation of the
//! WGS84 geoid, which is within a fraction of a percent for AOI-sized
//! polygons.

use serde_json::Value;
use thiserror::Error;
use tracing::instrument;

/// Mean Earth radius in kilometres (IUGG)
const EARTH_RADIUS_KM: f64 = 6371.0088;

/// Minimum order size in km² for SkySat collections
const SKYSAT_MIN_AREA_KM2: f64 = 3.0;

#[derive(Error, Debug)]
pub enum PlanetError {
    #[error("invalid AOI coordinates: {0}")]
    InvalidCoordinates(String),
}

/// Area estimate for an order, in whole km²
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AreaEstimate {
    pub km2: f64,
}

/// Quote a Planet order from its AOI polygon coordinates.
///
/// `coordinates` is the STAC nested polygon form: a list of rings, each a
/// list of `[lon, lat]` positions. Only the outer ring contributes.
#[instrument(skip(coordinates))]
pub fn area_quote(collection: &str, coordinates: &[Value]) -> Result<AreaEstimate, PlanetError> {
    let ring = outer_ring(coordinates)?;
    let mut area = polygon_area_km2(&ring).ceil();
    if collection.starts_with("SkySat") && area < SKYSAT_MIN_AREA_KM2 {
        area = SKYSAT_MIN_AREA_KM2;
    }
    Ok(AreaEstimate { km2: area })
}

fn outer_ring(coordinates: &[Value]) -> Result<Vec<(f64, f64)>, PlanetError> {
    let ring = coordinates
        .first()
        .and_then(Value::as_array)
        .ok_or_else(|| PlanetError::InvalidCoordinates("expected a nested polygon".into()))?;

    let mut positions = Vec::with_capacity(ring.len());
    for position in ring {
        let pair = position
            .as_array()
            .filter(|p| p.len() >= 2)
            .ok_or_else(|| {
                PlanetError::InvalidCoordinates("positions must be [lon, lat] pairs".into())
            })?;
        let lon = pair[0].as_f64().ok_or_else(|| {
            PlanetError::InvalidCoordinates("longitude is not a number".into())
        })?;
        let lat = pair[1]
            .as_f64()
            .ok_or_else(|| PlanetError::InvalidCoordinates("latitude is not a number".into()))?;
        positions.push((lon, lat));
    }
    if positions.len() < 3 {
        return Err(PlanetError::InvalidCoordinates(
            "a polygon ring needs at least 3 positions".into(),
        ));
    }
    Ok(positions)
}

/// Spherical polygon area via the signed spherical excess sum.
fn polygon_area_km2(ring: &[(f64, f64)]) -> f64 {
    let mut sum = 0.0;
    for window in ring.windows(2) {
        let (lon1, lat1) = window[0];
        let (lon2, lat2) = window[1];
        sum += (lon2 - lon1).to_radians()
            * (2.0 + lat1.to_radians().sin() + lat2.to_radians().sin());
    }
    // Close the ring if the input doesn't repeat the first position
    if ring.first() != ring.last() {
        if let (Some(&(lon1, lat1)), Some(&(lon2, lat2))) = (ring.last(), ring.first()) {
            sum += (lon2 - lon1).to_radians()
                * (2.0 + lat1.to_radians().sin() + lat2.to_radians().sin());
        }
    }
    (sum * EARTH_RADIUS_KM * EARTH_RADIUS_KM / 2.0).abs()
}
