use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::{
    ExplorerError,
    error::Result,
    location::{GeocodeMatch, Geocoder},
    model::Coordinate,
    provider::truncate_body,
};

const USER_AGENT: &str = concat!("meteomap/", env!("CARGO_PKG_VERSION"));

/// Forward geocoding through the Nominatim (OpenStreetMap) search API.
#[derive(Debug, Clone)]
pub struct NominatimGeocoder {
    base_url: String,
    http: Client,
}

impl NominatimGeocoder {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder().timeout(timeout).user_agent(USER_AGENT).build()?;

        Ok(Self { base_url: base_url.trim_end_matches('/').to_string(), http })
    }
}

// Nominatim returns coordinates as strings.
#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
    display_name: String,
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn geocode(&self, address: &str) -> Result<Option<GeocodeMatch>> {
        let url = format!("{}/search", self.base_url);

        let res = self
            .http
            .get(&url)
            .query(&[("q", address), ("format", "json"), ("limit", "1")])
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(ExplorerError::network(format!(
                "Nominatim request failed with status {}: {}",
                status,
                truncate_body(&body),
            )));
        }

        let places: Vec<NominatimPlace> = serde_json::from_str(&body).map_err(|e| {
            tracing::error!("Unexpected Nominatim response: {e}");
            ExplorerError::malformed(format!("Failed to parse Nominatim JSON: {e}"))
        })?;

        let Some(place) = places.into_iter().next() else {
            return Ok(None);
        };

        let lat = place.lat.parse::<f64>();
        let lon = place.lon.parse::<f64>();
        let (Ok(lat), Ok(lon)) = (lat, lon) else {
            return Err(ExplorerError::malformed(format!(
                "Nominatim returned invalid coordinates: {}, {}",
                place.lat, place.lon
            )));
        };

        Ok(Some(GeocodeMatch {
            coordinate: Coordinate::new(lat, lon),
            display_name: place.display_name,
        }))
    }
}
