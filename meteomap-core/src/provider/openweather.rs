use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;

use crate::{
    ExplorerError,
    error::Result,
    model::{Coordinate, Language},
    provider::truncate_body,
};

use super::WeatherProvider;

/// Current weather from the OpenWeather `data/2.5/weather` endpoint.
#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(api_key: String, base_url: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn fetch_current(
        &self,
        coordinate: Coordinate,
        language: Language,
    ) -> Result<serde_json::Value> {
        let url = format!("{}/data/2.5/weather", self.base_url);
        tracing::debug!("Requesting weather for ({coordinate}) in '{language}'");

        let res = self
            .http
            .get(&url)
            .query(&[
                ("lat", coordinate.lat.to_string()),
                ("lon", coordinate.lon.to_string()),
                ("units", "metric".to_string()),
                ("lang", language.as_str().to_string()),
                ("appid", self.api_key.clone()),
            ])
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("OpenWeather request failed: {e}");
                ExplorerError::from(e)
            })?;

        let status = res.status();
        let body = res.text().await?;

        if status == StatusCode::UNAUTHORIZED {
            tracing::error!("OpenWeather rejected the API key");
            return Err(ExplorerError::Credential(format!(
                "OpenWeather answered {}: {}",
                status,
                truncate_body(&body),
            )));
        }

        if !status.is_success() {
            return Err(ExplorerError::network(format!(
                "OpenWeather request failed with status {}: {}",
                status,
                truncate_body(&body),
            )));
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!("OpenWeather returned non-JSON body: {e}");
            ExplorerError::malformed(format!("Failed to parse OpenWeather JSON: {e}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer) -> OpenWeatherProvider {
        OpenWeatherProvider::new("KEY".into(), &server.uri(), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn sends_metric_units_language_and_key() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .and(query_param("units", "metric"))
            .and(query_param("lang", "uk"))
            .and(query_param("appid", "KEY"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "Kyiv", "weather": [{"description": "ясно"}]
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let raw = provider(&mock_server)
            .fetch_current(Coordinate::new(50.45, 30.52), Language::Uk)
            .await
            .unwrap();

        assert_eq!(raw["name"], "Kyiv");
    }

    #[tokio::test]
    async fn unauthorized_is_credential_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "cod": 401, "message": "Invalid API key"
            })))
            .mount(&mock_server)
            .await;

        let err = provider(&mock_server)
            .fetch_current(Coordinate::new(0.0, 0.0), Language::En)
            .await
            .unwrap_err();

        assert!(matches!(err, ExplorerError::Credential(_)));
    }

    #[tokio::test]
    async fn server_error_is_network_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&mock_server)
            .await;

        let err = provider(&mock_server)
            .fetch_current(Coordinate::new(0.0, 0.0), Language::En)
            .await
            .unwrap_err();

        assert!(matches!(err, ExplorerError::Network(_)));
    }

    #[tokio::test]
    async fn unreachable_host_is_network_error() {
        let provider =
            OpenWeatherProvider::new("KEY".into(), "http://127.0.0.1:9", Duration::from_secs(2))
                .unwrap();

        let err = provider
            .fetch_current(Coordinate::new(0.0, 0.0), Language::En)
            .await
            .unwrap_err();

        assert!(matches!(err, ExplorerError::Network(_)));
    }

    #[tokio::test]
    async fn non_json_body_is_malformed() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&mock_server)
            .await;

        let err = provider(&mock_server)
            .fetch_current(Coordinate::new(0.0, 0.0), Language::En)
            .await
            .unwrap_err();

        assert!(matches!(err, ExplorerError::MalformedPayload(_)));
    }
}
