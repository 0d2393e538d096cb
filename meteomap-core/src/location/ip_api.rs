use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::{
    ExplorerError,
    error::Result,
    location::{IpLocator, IpPosition},
    model::Coordinate,
    provider::truncate_body,
};

/// IP geolocation through ip-api.com.
#[derive(Debug, Clone)]
pub struct IpApiLocator {
    base_url: String,
    http: Client,
}

impl IpApiLocator {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;

        Ok(Self { base_url: base_url.trim_end_matches('/').to_string(), http })
    }
}

#[derive(Debug, Deserialize)]
struct IpApiResponse {
    status: Option<String>,
    message: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
    city: Option<String>,
    country: Option<String>,
}

#[async_trait]
impl IpLocator for IpApiLocator {
    async fn locate(&self) -> Result<IpPosition> {
        let url = format!("{}/json/", self.base_url);

        let res = self.http.get(&url).send().await?;
        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(ExplorerError::network(format!(
                "IP lookup failed with status {}: {}",
                status,
                truncate_body(&body),
            )));
        }

        let parsed: IpApiResponse = serde_json::from_str(&body).map_err(|e| {
            ExplorerError::network(format!("IP lookup returned unreadable body: {e}"))
        })?;

        // HTTP 200 alone is not success; the service reports failures in `status`.
        if parsed.status.as_deref() != Some("success") {
            let reason = parsed.message.unwrap_or_else(|| "no reason given".to_string());
            tracing::warn!("IP lookup reported failure: {reason}");
            return Err(ExplorerError::network(format!("IP lookup failed: {reason}")));
        }

        let (Some(lat), Some(lon)) = (parsed.lat, parsed.lon) else {
            return Err(ExplorerError::network("IP lookup succeeded without coordinates"));
        };

        Ok(IpPosition {
            coordinate: Coordinate::new(lat, lon),
            city: parsed.city,
            country: parsed.country,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn locator_with(body: serde_json::Value) -> (MockServer, IpApiLocator) {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/json/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&mock_server)
            .await;

        let locator = IpApiLocator::new(&mock_server.uri(), Duration::from_secs(5)).unwrap();
        (mock_server, locator)
    }

    #[tokio::test]
    async fn success_status_yields_position() {
        let (_server, locator) = locator_with(serde_json::json!({
            "status": "success", "lat": 49.84, "lon": 24.03, "city": "Lviv", "country": "Ukraine"
        }))
        .await;

        let position = locator.locate().await.unwrap();
        assert_eq!(position.coordinate, Coordinate::new(49.84, 24.03));
        assert_eq!(position.city.as_deref(), Some("Lviv"));
    }

    #[tokio::test]
    async fn fail_status_with_http_200_is_network_error() {
        let (_server, locator) = locator_with(serde_json::json!({
            "status": "fail", "message": "reserved range"
        }))
        .await;

        let err = locator.locate().await.unwrap_err();
        assert!(matches!(err, ExplorerError::Network(msg) if msg.contains("reserved range")));
    }

    #[tokio::test]
    async fn missing_status_is_not_success() {
        let (_server, locator) = locator_with(serde_json::json!({"lat": 1.0, "lon": 2.0})).await;
        assert!(matches!(locator.locate().await, Err(ExplorerError::Network(_))));
    }
}
