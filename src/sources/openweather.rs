use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use super::provider::Source;
use crate::error::FetchError;
use crate::models::{RawBatch, RawRecord};

/// Client for the OpenWeatherMap current-weather endpoint.
#[derive(Clone)]
pub struct OpenWeatherClient {
    http: Client,
    api_key: String,
    /// Base URL for overriding in tests
    base_url: String,
}

impl OpenWeatherClient {
    pub fn new(http: Client, api_key: &str, base_url: &str) -> Self {
        OpenWeatherClient {
            http,
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Current weather for `city` in metric units.
    ///
    /// Error bodies carry a `message` field ("city not found"); it is
    /// returned verbatim as [`FetchError::Upstream`]. A reply without a
    /// temperature or description is a [`FetchError::Payload`].
    pub async fn current(&self, city: &str) -> Result<Value, FetchError> {
        let url = format!("{}/data/2.5/weather", self.base_url);
        debug!("Fetching weather for {}", city);

        let resp = self
            .http
            .get(&url)
            .query(&[("q", city), ("units", "metric"), ("APPID", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| FetchError::transport(format!("No data available for {}", city), e))?;

        let status = resp.status();
        let body: Value = resp.json().await.map_err(|e| {
            FetchError::transport(format!("Failed to parse weather response for {}", city), e)
        })?;

        if let Some(message) = body.get("message").and_then(Value::as_str) {
            return Err(FetchError::Upstream(message.to_string()));
        }
        if !status.is_success() {
            return Err(FetchError::Status {
                context: format!("weather for {}", city),
                status,
            });
        }
        if body["main"]["temp"].as_f64().is_none() {
            return Err(FetchError::Payload("weather response has no main.temp".into()));
        }
        if body["weather"][0]["description"].as_str().is_none() {
            return Err(FetchError::Payload(
                "weather response has no weather description".into(),
            ));
        }
        Ok(body)
    }
}

/// Current weather for one city.
pub struct WeatherSource {
    client: OpenWeatherClient,
    city: String,
}

impl WeatherSource {
    pub fn new(client: OpenWeatherClient, city: &str) -> Self {
        WeatherSource {
            client,
            city: city.to_string(),
        }
    }
}

#[async_trait]
impl Source for WeatherSource {
    fn name(&self) -> &str {
        "openweathermap"
    }

    async fn fetch(&self) -> Result<RawBatch, FetchError> {
        let body = self.client.current(&self.city).await?;
        Ok(RawBatch::new(
            vec![RawRecord::Weather(body)],
            Arc::from(Vec::new()),
        ))
    }
}
