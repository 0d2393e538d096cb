use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc};

use crate::{
    Config, ExplorerError,
    error::Result,
    model::{Coordinate, Language},
    provider::openweather::OpenWeatherProvider,
};

pub mod openweather;

/// Source of raw current-weather payloads.
///
/// Implementations return the provider's JSON untouched; turning it into a
/// [`crate::WeatherSnapshot`] is the normalizer's job.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn fetch_current(
        &self,
        coordinate: Coordinate,
        language: Language,
    ) -> Result<serde_json::Value>;
}

/// Construct the weather provider from config.
pub fn provider_from_config(config: &Config) -> anyhow::Result<Arc<dyn WeatherProvider>> {
    let api_key = config.api_key()?;
    let provider = OpenWeatherProvider::new(
        api_key,
        &config.endpoints.weather_url,
        config.timeouts.weather(),
    )?;

    Ok(Arc::new(provider))
}

/// Provider for sessions without an API key; every request fails with
/// [`ExplorerError::Credential`].
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredProvider;

#[async_trait]
impl WeatherProvider for UnconfiguredProvider {
    async fn fetch_current(
        &self,
        _coordinate: Coordinate,
        _language: Language,
    ) -> Result<serde_json::Value> {
        tracing::warn!("Weather requested without an API key");
        Err(ExplorerError::Credential("no API key configured".to_string()))
    }
}

/// Shortens a response body for inclusion in error messages.
pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
