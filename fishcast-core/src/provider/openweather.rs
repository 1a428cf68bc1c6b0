use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::model::{Coordinates, WeatherObservation};

use super::{ProviderId, WeatherProvider, truncate_body};

const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org";

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL.to_string())
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self::with_client(api_key, base_url, Client::new())
    }

    pub fn with_client(api_key: String, base_url: String, http: Client) -> Self {
        Self { api_key, base_url: base_url.trim_end_matches('/').to_string(), http }
    }

    async fn fetch_current(&self, location: &[(&str, String)]) -> Result<WeatherObservation> {
        let url = format!("{}/data/2.5/weather", self.base_url);
        debug!(%url, ?location, "requesting OpenWeather current conditions");

        let res = self
            .http
            .get(&url)
            .query(location)
            .query(&[("appid", self.api_key.as_str()), ("units", "metric")])
            .send()
            .await
            .context("Failed to send request to OpenWeather (current weather)")?;

        let status = res.status();
        let body = res
            .text()
            .await
            .context("Failed to read OpenWeather current response body")?;

        if !status.is_success() {
            return Err(anyhow!(
                "OpenWeather current request failed with status {}: {}",
                status,
                truncate_body(&body),
            ));
        }

        parse_current(&body)
    }
}

fn parse_current(body: &str) -> Result<WeatherObservation> {
    let parsed: OwCurrentResponse =
        serde_json::from_str(body).context("Failed to parse OpenWeather current JSON")?;

    let observation_time = parsed
        .dt
        .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0))
        .unwrap_or_else(Utc::now);

    let (condition, description) = parsed
        .weather
        .into_iter()
        .next()
        .map(|w| (w.main, w.description))
        .unwrap_or_else(|| ("Unknown".to_string(), "Unknown".to_string()));

    Ok(WeatherObservation {
        provider: ProviderId::OpenWeather.to_string(),
        location_name: parsed.name,
        temperature_c: parsed.main.temp,
        condition,
        description,
        wind_speed_mps: parsed.wind.speed.max(0.0),
        observation_time,
    })
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    main: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    name: String,
    dt: Option<i64>,
    main: OwMain,
    #[serde(default)]
    weather: Vec<OwWeather>,
    wind: OwWind,
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    fn id(&self) -> ProviderId {
        ProviderId::OpenWeather
    }

    async fn current_by_name(&self, name: &str) -> Result<WeatherObservation> {
        self.fetch_current(&[("q", name.to_string())]).await
    }

    async fn current_by_coordinates(&self, coordinates: Coordinates) -> Result<WeatherObservation> {
        self.fetch_current(&[
            ("lat", coordinates.lat.to_string()),
            ("lon", coordinates.lon.to_string()),
        ])
        .await
    }
}
