use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{convert::TryFrom, fmt};

use crate::background::BackgroundCategory;

const OSM_BASE_URL: &str = "https://www.openstreetmap.org";
pub const DEFAULT_ZOOM: u8 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Link to an OpenStreetMap view centered on this point.
    pub fn osm_url(&self, zoom: u8) -> String {
        format!(
            "{OSM_BASE_URL}/?mlat={lat:.4}&mlon={lon:.4}#map={zoom}/{lat:.4}/{lon:.4}",
            lat = self.lat,
            lon = self.lon,
        )
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}, {:.4}", self.lat, self.lon)
    }
}

/// Which collaborator produced a [`ResolvedLocation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationSource {
    Geocode,
    Ip,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedLocation {
    pub coordinate: Coordinate,
    pub display_name: String,
    pub source: LocationSource,
}

/// What the user asked to locate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocationRequest {
    Address(String),
    Ip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Uk,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Uk => "uk",
        }
    }

    pub const fn all() -> &'static [Language] {
        &[Language::En, Language::Uk]
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Language {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.trim().to_lowercase();

        match lower.as_str() {
            "en" | "english" => Ok(Language::En),
            "uk" | "ua" | "ukrainian" => Ok(Language::Uk),
            _ => Err(anyhow::anyhow!(
                "Unknown language '{value}'. Supported languages: en, uk."
            )),
        }
    }
}

/// Point-in-time weather observation. Numeric fields are `None` when the
/// provider did not report them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub description: String,
    pub temp_c: Option<f64>,
    pub feels_like_c: Option<f64>,
    pub humidity_pct: Option<f64>,
    pub pressure_hpa: Option<f64>,
    pub wind_ms: Option<f64>,
    pub observed_at_utc: Option<DateTime<Utc>>,
    pub location_label: String,
    pub language: Language,
}

/// Rendered view of the current snapshot handed to the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherSummary {
    pub text: String,
    pub category: BackgroundCategory,
    pub temp_c: Option<f64>,
}
