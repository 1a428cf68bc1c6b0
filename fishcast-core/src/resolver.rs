use tracing::{debug, warn};

use crate::{
    error::{COORDINATE_LOOKUP_FAILED, FishcastError, NAME_LOOKUP_FAILED, Result},
    geolocation::Geolocator,
    model::{Coordinates, LocationQuery, WeatherObservation},
    provider::WeatherProvider,
};

/// Turns a location into a weather observation.
///
/// The resolver never touches scoring state; it only hands back owned
/// observations. Calls are one-shot: no caching and no retries.
#[derive(Debug)]
pub struct EnvironmentResolver {
    provider: Box<dyn WeatherProvider>,
    geolocator: Box<dyn Geolocator>,
}

impl EnvironmentResolver {
    pub fn new(provider: Box<dyn WeatherProvider>, geolocator: Box<dyn Geolocator>) -> Self {
        Self { provider, geolocator }
    }

    pub async fn resolve(&self, query: &LocationQuery) -> Result<WeatherObservation> {
        match query {
            LocationQuery::Name(name) => self.resolve_by_name(name).await,
            LocationQuery::Coordinates(c) => self.resolve_by_coordinates(c.lat, c.lon).await,
        }
    }

    pub async fn resolve_by_name(&self, name: &str) -> Result<WeatherObservation> {
        let name = name.trim();
        if name.is_empty() {
            return Err(FishcastError::InvalidInput("Please enter a location.".to_string()));
        }

        self.provider.current_by_name(name).await.map_err(|e| {
            warn!(provider = %self.provider.id(), location = name, error = %format!("{e:#}"), "weather lookup by name failed");
            FishcastError::ProviderError(NAME_LOOKUP_FAILED.to_string())
        })
    }

    pub async fn resolve_by_coordinates(&self, lat: f64, lon: f64) -> Result<WeatherObservation> {
        let coordinates = Coordinates::new(lat, lon);
        if let Err(e) = coordinates.validate() {
            warn!(%coordinates, "{e}");
        }

        self.provider.current_by_coordinates(coordinates).await.map_err(|e| {
            warn!(provider = %self.provider.id(), %coordinates, error = %format!("{e:#}"), "weather lookup by coordinates failed");
            FishcastError::ProviderError(COORDINATE_LOOKUP_FAILED.to_string())
        })
    }

    pub async fn locate_current_position(&self) -> Result<Coordinates> {
        let position = self.geolocator.current_position().await?;
        debug!(%position, "located current position");
        Ok(position)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{geolocation::GeolocationError, provider::ProviderId};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    /// Records every outbound call and answers from a fixed script.
    #[derive(Debug, Clone, Default)]
    pub(crate) struct ScriptedProvider {
        pub calls: Arc<AtomicUsize>,
        pub fail: bool,
        pub condition: String,
    }

    impl ScriptedProvider {
        pub fn ok(condition: &str) -> Self {
            Self { condition: condition.to_string(), ..Self::default() }
        }

        pub fn failing() -> Self {
            Self { fail: true, ..Self::default() }
        }

        fn answer(&self, name: &str) -> anyhow::Result<WeatherObservation> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("status 404: city not found");
            }
            Ok(WeatherObservation {
                provider: "scripted".to_string(),
                location_name: name.to_string(),
                temperature_c: 17.0,
                condition: self.condition.clone(),
                description: self.condition.to_lowercase(),
                wind_speed_mps: 3.0,
                observation_time: Utc::now(),
            })
        }
    }

    #[async_trait]
    impl WeatherProvider for ScriptedProvider {
        fn id(&self) -> ProviderId {
            ProviderId::OpenWeather
        }

        async fn current_by_name(&self, name: &str) -> anyhow::Result<WeatherObservation> {
            self.answer(name)
        }

        async fn current_by_coordinates(
            &self,
            coordinates: Coordinates,
        ) -> anyhow::Result<WeatherObservation> {
            self.answer(&coordinates.to_string())
        }
    }

    #[derive(Debug, Clone, Copy)]
    pub(crate) struct FailingGeolocator(pub GeolocationError);

    #[async_trait]
    impl Geolocator for FailingGeolocator {
        async fn current_position(&self) -> std::result::Result<Coordinates, GeolocationError> {
            Err(self.0)
        }
    }

    fn resolver(provider: ScriptedProvider) -> EnvironmentResolver {
        EnvironmentResolver::new(
            Box::new(provider),
            Box::new(FailingGeolocator(GeolocationError::PositionUnavailable)),
        )
    }

    #[tokio::test]
    async fn empty_name_fails_before_any_call() {
        let provider = ScriptedProvider::ok("Clear");
        let calls = provider.calls.clone();
        let resolver = resolver(provider);

        for name in ["", "   "] {
            let err = resolver.resolve_by_name(name).await.unwrap_err();
            assert!(matches!(err, FishcastError::InvalidInput(_)));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn name_lookup_failure_has_user_facing_message() {
        let resolver = resolver(ScriptedProvider::failing());
        let err = resolver.resolve_by_name("Atlantis").await.unwrap_err();
        assert_eq!(err, FishcastError::ProviderError(NAME_LOOKUP_FAILED.to_string()));
        assert_eq!(err.to_string(), "Could not fetch weather data. Please check the location.");
    }

    #[tokio::test]
    async fn coordinate_lookup_failure_has_user_facing_message() {
        let resolver = resolver(ScriptedProvider::failing());
        let err = resolver.resolve_by_coordinates(10.0, 20.0).await.unwrap_err();
        assert_eq!(err.to_string(), "Could not fetch weather data for your location.");
    }

    #[tokio::test]
    async fn name_is_trimmed_before_lookup() {
        let resolver = resolver(ScriptedProvider::ok("Clouds"));
        let obs = resolver.resolve_by_name("  Bergen ").await.expect("observation");
        assert_eq!(obs.location_name, "Bergen");
        assert_eq!(obs.condition, "Clouds");
    }

    #[tokio::test]
    async fn out_of_range_coordinates_are_advisory() {
        let provider = ScriptedProvider::ok("Clear");
        let calls = provider.calls.clone();
        let resolver = resolver(provider);

        assert!(resolver.resolve_by_coordinates(95.0, 200.0).await.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn resolve_dispatches_on_query_kind() {
        let resolver = resolver(ScriptedProvider::ok("Rain"));

        let by_name = resolver.resolve(&LocationQuery::Name("Tromsø".into())).await.unwrap();
        assert_eq!(by_name.location_name, "Tromsø");

        let query = LocationQuery::Coordinates(Coordinates::new(1.5, 2.5));
        let by_coords = resolver.resolve(&query).await.unwrap();
        assert_eq!(by_coords.location_name, "1.5000, 2.5000");
    }

    #[tokio::test]
    async fn geolocation_failures_pass_through() {
        let resolver = EnvironmentResolver::new(
            Box::new(ScriptedProvider::ok("Clear")),
            Box::new(FailingGeolocator(GeolocationError::Timeout)),
        );
        let err = resolver.locate_current_position().await.unwrap_err();
        assert_eq!(err, FishcastError::Geolocation(GeolocationError::Timeout));
        assert_eq!(err.to_string(), "The request to get user location timed out.");
    }
}
