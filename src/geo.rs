//! Campus resolution. Mensa addresses are geocoded via Nominatim and mapped
//! onto the nearest of the three campuses; both the coordinates and the
//! campus assignments are cached so a catalog reload never re-geocodes.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::constants::{GEOCODER_ENDPOINT, MAX_CAMPUS_DISTANCE_M};
use crate::data_types::{Campus, Mensa};
use crate::db_operations;
use crate::errors::ApiError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

pub fn campus_coordinate(campus: Campus) -> Coordinate {
    match campus {
        Campus::Zentrum => Coordinate {
            lat: 47.377399461702936,
            lon: 8.548341273815552,
        },
        Campus::Irchel => Coordinate {
            lat: 47.39747781967301,
            lon: 8.549434449904433,
        },
        Campus::Hoenggerberg => Coordinate {
            lat: 47.40862508665355,
            lon: 8.50779324765029,
        },
    }
}

/// Great-circle distance in meters.
pub fn haversine_m(a: Coordinate, b: Coordinate) -> f64 {
    const EARTH_RADIUS_M: f64 = 6_371_000.0;
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lon = (b.lon - a.lon).to_radians();
    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().asin()
}

/// The campus closest to the coordinate, or `None` if every campus is further
/// than the cutoff away.
pub fn nearest_campus(coordinate: Coordinate) -> Option<Campus> {
    Campus::ALL
        .into_iter()
        .map(|campus| (campus, haversine_m(coordinate, campus_coordinate(campus))))
        .min_by(|(_, a), (_, b)| a.total_cmp(b))
        .filter(|(_, distance)| *distance <= MAX_CAMPUS_DISTANCE_M)
        .map(|(campus, _)| campus)
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Resolves a free-text address to a coordinate. `Ok(None)` means the
    /// geocoder answered but found nothing.
    async fn geocode(&self, address: &str) -> Result<Option<Coordinate>, ApiError>;
}

pub struct NominatimGeocoder {
    client: reqwest::Client,
}

impl NominatimGeocoder {
    pub fn new() -> Self {
        Self {
            // Nominatim requires an identifying user agent
            client: reqwest::Client::builder()
                .user_agent(concat!(
                    env!("CARGO_PKG_NAME"),
                    "/",
                    env!("CARGO_PKG_VERSION")
                ))
                .build()
                .unwrap_or_default(),
        }
    }
}

impl Default for NominatimGeocoder {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn geocode(&self, address: &str) -> Result<Option<Coordinate>, ApiError> {
        let places: Vec<NominatimPlace> = self
            .client
            .get(GEOCODER_ENDPOINT)
            .query(&[("format", "jsonv2"), ("limit", "1"), ("q", address)])
            .send()
            .await?
            .json()
            .await?;
        Ok(places.first().and_then(|place| {
            let lat = place.lat.parse().ok()?;
            let lon = place.lon.parse().ok()?;
            Some(Coordinate { lat, lon })
        }))
    }
}

/// Caches coordinates per address and campus assignments per mensa.
/// Failed lookups are cached as `None` so one bad address cannot spam the
/// geocoder on every filter run.
pub struct LocationResolver {
    geocoder: Arc<dyn Geocoder>,
    coordinates: Mutex<HashMap<String, Option<Coordinate>>>,
    campuses: Mutex<HashMap<String, Option<Campus>>>,
}

impl LocationResolver {
    pub fn new(geocoder: Arc<dyn Geocoder>) -> Self {
        Self {
            geocoder,
            coordinates: Mutex::new(HashMap::new()),
            campuses: Mutex::new(HashMap::new()),
        }
    }

    pub async fn campus_of(&self, mensa: &Mensa) -> Option<Campus> {
        let id = mensa.id();
        if let Some(cached) = self.campuses.lock().await.get(&id) {
            return *cached;
        }
        let campus = match &mensa.address {
            Some(address) => self.coordinates_of(address).await.and_then(nearest_campus),
            None => None,
        };
        self.campuses.lock().await.insert(id, campus);
        campus
    }

    async fn coordinates_of(&self, address: &str) -> Option<Coordinate> {
        if let Some(cached) = self.coordinates.lock().await.get(address) {
            return *cached;
        }
        let coordinate = match db_operations::read_geo_cache(address) {
            Ok(Some(coordinate)) => Some(coordinate),
            Ok(None) => {
                let resolved = self.resolve(address).await;
                if let Some(coordinate) = resolved {
                    if let Err(e) = db_operations::update_geo_cache(address, coordinate) {
                        log::warn!("persisting geocode result failed: {e}");
                    }
                }
                resolved
            }
            Err(e) => {
                log::warn!("geo cache read failed: {e}");
                self.resolve(address).await
            }
        };
        self.coordinates
            .lock()
            .await
            .insert(address.to_string(), coordinate);
        coordinate
    }

    /// Geocodes the full address first, then retries without the first line.
    /// Nominatim often chokes on the building name in line one but resolves
    /// the street address fine.
    async fn resolve(&self, address: &str) -> Option<Coordinate> {
        let full = address.replace('\n', " ");
        match self.geocoder.geocode(&full).await {
            Ok(Some(coordinate)) => return Some(coordinate),
            Ok(None) => {}
            Err(e) => log::warn!("geocoding \"{full}\" failed: {e}"),
        }
        let without_first_line = address.splitn(2, '\n').nth(1)?;
        match self.geocoder.geocode(without_first_line).await {
            Ok(coordinate) => coordinate,
            Err(e) => {
                log::warn!("geocoding \"{without_first_line}\" failed: {e}");
                None
            }
        }
    }
}
