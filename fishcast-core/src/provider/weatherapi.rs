use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::model::{Coordinates, WeatherObservation};

use super::{ProviderId, WeatherProvider, truncate_body};

const DEFAULT_BASE_URL: &str = "https://api.weatherapi.com";

#[derive(Debug, Clone)]
pub struct WeatherApiProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl WeatherApiProvider {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL.to_string())
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self::with_client(api_key, base_url, Client::new())
    }

    pub fn with_client(api_key: String, base_url: String, http: Client) -> Self {
        Self { api_key, base_url: base_url.trim_end_matches('/').to_string(), http }
    }

    /// `q` accepts either a place name or `"lat,lon"`.
    async fn fetch_current(&self, q: &str) -> Result<WeatherObservation> {
        let url = format!("{}/v1/current.json", self.base_url);
        debug!(%url, q, "requesting WeatherAPI current conditions");

        let res = self
            .http
            .get(&url)
            .query(&[("key", self.api_key.as_str()), ("q", q)])
            .send()
            .await
            .context("Failed to send request to WeatherAPI.com (current)")?;

        let status = res.status();
        let body = res.text().await.context("Failed to read WeatherAPI current response body")?;

        if !status.is_success() {
            return Err(anyhow::anyhow!(
                "WeatherAPI current request failed with status {}: {}",
                status,
                truncate_body(&body),
            ));
        }

        parse_current(&body)
    }
}

fn parse_current(body: &str) -> Result<WeatherObservation> {
    let parsed: WaResponse =
        serde_json::from_str(body).context("Failed to parse WeatherAPI current JSON")?;

    let ts = parsed.current.last_updated_epoch.or(parsed.location.localtime_epoch);
    let observation_time =
        ts.and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0)).unwrap_or_else(Utc::now);

    let WaCondition { text, code } = parsed.current.condition;
    let condition = code
        .and_then(category_for_code)
        .map(str::to_string)
        .unwrap_or_else(|| text.clone());

    Ok(WeatherObservation {
        provider: ProviderId::WeatherApi.to_string(),
        location_name: parsed.location.name,
        temperature_c: parsed.current.temp_c,
        description: text,
        condition,
        wind_speed_mps: (parsed.current.wind_kph / 3.6).max(0.0),
        observation_time,
    })
}

/// Maps a WeatherAPI condition code onto the OpenWeather-style category
/// ("Clear", "Clouds", "Rain"). Other codes have no category equivalent.
fn category_for_code(code: u16) -> Option<&'static str> {
    match code {
        1000 => Some("Clear"),
        1003 | 1006 | 1009 => Some("Clouds"),
        1063 | 1150..=1201 | 1240..=1246 => Some("Rain"),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
struct WaLocation {
    name: String,
    localtime_epoch: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct WaCondition {
    text: String,
    code: Option<u16>,
}

#[derive(Debug, Deserialize)]
struct WaCurrent {
    temp_c: f64,
    wind_kph: f64,
    condition: WaCondition,
    last_updated_epoch: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct WaResponse {
    location: WaLocation,
    current: WaCurrent,
}

#[async_trait]
impl WeatherProvider for WeatherApiProvider {
    fn id(&self) -> ProviderId {
        ProviderId::WeatherApi
    }

    async fn current_by_name(&self, name: &str) -> Result<WeatherObservation> {
        self.fetch_current(name).await
    }

    async fn current_by_coordinates(&self, coordinates: Coordinates) -> Result<WeatherObservation> {
        self.fetch_current(&format!("{},{}", coordinates.lat, coordinates.lon)).await
    }
}
