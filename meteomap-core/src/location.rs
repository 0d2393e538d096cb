//! Two-tier location resolution: explicit address geocoding, or the
//! caller's position derived from their IP address.
//!
//! The two entry points fail independently; an address that cannot be
//! geocoded is reported as such and never silently replaced by the IP
//! position.

use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc};

use crate::{
    Config, ExplorerError,
    error::Result,
    location::{ip_api::IpApiLocator, nominatim::NominatimGeocoder},
    model::{Coordinate, LocationSource, ResolvedLocation},
};

pub mod ip_api;
pub mod nominatim;

/// Best match returned by a geocoder.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodeMatch {
    pub coordinate: Coordinate,
    pub display_name: String,
}

/// Position reported by an IP geolocation service.
#[derive(Debug, Clone, PartialEq)]
pub struct IpPosition {
    pub coordinate: Coordinate,
    pub city: Option<String>,
    pub country: Option<String>,
}

#[async_trait]
pub trait Geocoder: Send + Sync + Debug {
    /// Single best match for `address`, or `None` when nothing matched.
    async fn geocode(&self, address: &str) -> Result<Option<GeocodeMatch>>;
}

#[async_trait]
pub trait IpLocator: Send + Sync + Debug {
    async fn locate(&self) -> Result<IpPosition>;
}

#[derive(Debug, Clone)]
pub struct LocationResolver {
    geocoder: Arc<dyn Geocoder>,
    ip_locator: Arc<dyn IpLocator>,
}

impl LocationResolver {
    pub fn new(geocoder: Arc<dyn Geocoder>, ip_locator: Arc<dyn IpLocator>) -> Self {
        Self { geocoder, ip_locator }
    }

    /// Resolver backed by Nominatim and ip-api.com, as configured.
    pub fn from_config(config: &Config) -> Result<Self> {
        let geocoder = NominatimGeocoder::new(&config.endpoints.geocode_url, config.timeouts.geocode())?;
        let ip_locator = IpApiLocator::new(&config.endpoints.ip_url, config.timeouts.ip())?;

        Ok(Self::new(Arc::new(geocoder), Arc::new(ip_locator)))
    }

    pub async fn resolve_by_address(&self, text: &str) -> Result<ResolvedLocation> {
        let query = text.trim();
        if query.is_empty() {
            return Err(ExplorerError::NotFound { query: String::new() });
        }

        tracing::debug!("Geocoding address: {query}");

        let found = self.geocoder.geocode(query).await?.ok_or_else(|| {
            tracing::info!("No geocoding match for '{query}'");
            ExplorerError::NotFound { query: query.to_string() }
        })?;

        tracing::info!(
            "Geocoded '{query}' to {} ({})",
            found.display_name,
            found.coordinate
        );

        Ok(ResolvedLocation {
            coordinate: found.coordinate,
            display_name: found.display_name,
            source: LocationSource::Geocode,
        })
    }

    pub async fn resolve_by_ip(&self) -> Result<ResolvedLocation> {
        tracing::debug!("Resolving location from IP address");

        let position = self.ip_locator.locate().await?;
        let display_name = ip_display_name(&position);

        tracing::info!("IP location: {display_name} ({})", position.coordinate);

        Ok(ResolvedLocation {
            coordinate: position.coordinate,
            display_name,
            source: LocationSource::Ip,
        })
    }
}

fn ip_display_name(position: &IpPosition) -> String {
    let city = position.city.as_deref().filter(|c| !c.is_empty());
    let country = position.country.as_deref().filter(|c| !c.is_empty());

    match (city, country) {
        (Some(city), Some(country)) => format!("{city}, {country}"),
        (Some(name), None) | (None, Some(name)) => name.to_string(),
        (None, None) => position.coordinate.to_string(),
    }
}
