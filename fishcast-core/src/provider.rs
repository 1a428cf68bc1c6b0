use crate::{
    Config,
    model::{Coordinates, WeatherObservation},
    provider::{openweather::OpenWeatherProvider, weatherapi::WeatherApiProvider},
};
use async_trait::async_trait;
use std::{convert::TryFrom, fmt::Debug};

pub mod openweather;
pub mod weatherapi;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    OpenWeather,
    WeatherApi,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::OpenWeather => "openweather",
            ProviderId::WeatherApi => "weatherapi",
        }
    }

    pub const fn all() -> &'static [ProviderId] {
        &[ProviderId::OpenWeather, ProviderId::WeatherApi]
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ProviderId {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.to_lowercase();

        match lower.as_str() {
            "openweather" => Ok(ProviderId::OpenWeather),
            "weatherapi" => Ok(ProviderId::WeatherApi),
            _ => Err(anyhow::anyhow!(
                "Unknown provider '{value}'. Supported providers: openweather, weatherapi."
            )),
        }
    }
}

/// A source of current weather conditions.
///
/// Errors carry the full technical detail; the resolver logs them and
/// replaces them with a user-facing message.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    fn id(&self) -> ProviderId;

    async fn current_by_name(&self, name: &str) -> anyhow::Result<WeatherObservation>;

    async fn current_by_coordinates(
        &self,
        coordinates: Coordinates,
    ) -> anyhow::Result<WeatherObservation>;
}

/// Construct a provider from config and explicit ProviderId.
pub fn provider_from_config(
    id: ProviderId,
    config: &Config,
) -> anyhow::Result<Box<dyn WeatherProvider>> {
    let provider_config = config.provider_config(id).ok_or_else(|| {
        anyhow::anyhow!(
            "No API key configured for provider '{id}'.\n\
                 Hint: run `fishcast configure {id}` and enter your API key."
        )
    })?;
    let api_key = provider_config.api_key.clone();
    let base_url = provider_config.base_url.clone();

    let boxed: Box<dyn WeatherProvider> = match (id, base_url) {
        (ProviderId::OpenWeather, Some(url)) => {
            Box::new(OpenWeatherProvider::with_base_url(api_key, url))
        }
        (ProviderId::OpenWeather, None) => Box::new(OpenWeatherProvider::new(api_key)),
        (ProviderId::WeatherApi, Some(url)) => {
            Box::new(WeatherApiProvider::with_base_url(api_key, url))
        }
        (ProviderId::WeatherApi, None) => Box::new(WeatherApiProvider::new(api_key)),
    };

    Ok(boxed)
}

/// Construct the default provider from config, using `default_provider` field.
pub fn default_provider_from_config(config: &Config) -> anyhow::Result<Box<dyn WeatherProvider>> {
    let id = config.default_provider_id()?;
    provider_from_config(id, config)
}

pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.chars().count() > MAX {
        format!("{}...", body.chars().take(MAX).collect::<String>())
    } else {
        body.to_string()
    }
}
