//! State a front end renders: the current observation, prediction, error
//! message and the two busy flags.

use serde::Serialize;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tracing::info;

use crate::{
    error::{FishcastError, Result},
    model::{Prediction, PredictionInput, WeatherObservation},
    resolver::EnvironmentResolver,
    scorer,
};

/// Busy flags, shareable with whatever renders a spinner.
#[derive(Debug, Default)]
pub struct BusyFlags {
    fetching_weather: AtomicBool,
    geolocating: AtomicBool,
}

impl BusyFlags {
    pub fn is_fetching_weather(&self) -> bool {
        self.fetching_weather.load(Ordering::SeqCst)
    }

    pub fn is_geolocating(&self) -> bool {
        self.geolocating.load(Ordering::SeqCst)
    }
}

/// Raises a flag for as long as it lives.
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn raise(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Serializable snapshot of a [`Session`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionView {
    pub observation: Option<WeatherObservation>,
    pub prediction: Option<Prediction>,
    pub error: Option<String>,
    pub fetching_weather: bool,
    pub geolocating: bool,
}

#[derive(Debug)]
pub struct Session {
    resolver: EnvironmentResolver,
    busy: Arc<BusyFlags>,
    observation: Option<WeatherObservation>,
    prediction: Option<Prediction>,
    error: Option<String>,
}

impl Session {
    pub fn new(resolver: EnvironmentResolver) -> Self {
        Self {
            resolver,
            busy: Arc::new(BusyFlags::default()),
            observation: None,
            prediction: None,
            error: None,
        }
    }

    pub fn observation(&self) -> Option<&WeatherObservation> {
        self.observation.as_ref()
    }

    pub fn prediction(&self) -> Option<&Prediction> {
        self.prediction.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_fetching_weather(&self) -> bool {
        self.busy.is_fetching_weather()
    }

    pub fn is_geolocating(&self) -> bool {
        self.busy.is_geolocating()
    }

    /// Handle for observing the busy flags while a lookup is in flight.
    pub fn busy_flags(&self) -> Arc<BusyFlags> {
        Arc::clone(&self.busy)
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            observation: self.observation.clone(),
            prediction: self.prediction.clone(),
            error: self.error.clone(),
            fetching_weather: self.is_fetching_weather(),
            geolocating: self.is_geolocating(),
        }
    }

    pub async fn lookup_by_name(&mut self, name: &str) -> Result<()> {
        self.error = None;
        let result = {
            let _busy = BusyGuard::raise(&self.busy.fetching_weather);
            self.resolver.resolve_by_name(name).await
        };
        self.store_observation(result)
    }

    pub async fn lookup_by_coordinates(&mut self, lat: f64, lon: f64) -> Result<()> {
        self.error = None;
        let result = {
            let _busy = BusyGuard::raise(&self.busy.fetching_weather);
            self.resolver.resolve_by_coordinates(lat, lon).await
        };
        self.store_observation(result)
    }

    /// Geolocates, then looks up the weather at that position.
    pub async fn lookup_current_location(&mut self) -> Result<()> {
        self.error = None;
        let position = {
            let _busy = BusyGuard::raise(&self.busy.geolocating);
            self.resolver.locate_current_position().await
        };
        let position = match position {
            Ok(position) => position,
            Err(e) => return Err(self.record_error(e)),
        };

        self.lookup_by_coordinates(position.lat, position.lon).await
    }

    /// Scores `input` against the current observation and keeps the result.
    pub fn predict(&mut self, input: &PredictionInput) -> Result<Prediction> {
        self.error = None;
        match scorer::score(input, self.observation.as_ref()) {
            Ok(prediction) => {
                info!(score = prediction.score, tier = %prediction.tier, "computed bite prediction");
                self.prediction = Some(prediction.clone());
                Ok(prediction)
            }
            Err(e) => Err(self.record_error(e)),
        }
    }

    fn store_observation(&mut self, result: Result<WeatherObservation>) -> Result<()> {
        match result {
            Ok(observation) => {
                info!(location = %observation.location_name, condition = %observation.condition, "resolved weather");
                self.observation = Some(observation);
                // Old prediction was computed against different weather.
                self.prediction = None;
                Ok(())
            }
            Err(e) => Err(self.record_error(e)),
        }
    }

    fn record_error(&mut self, e: FishcastError) -> FishcastError {
        self.error = Some(e.to_string());
        e
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        geolocation::{FixedGeolocator, GeolocationError, Geolocator},
        model::{Coordinates, MoonPhase, Tier},
        provider::{ProviderId, WeatherProvider},
        resolver::tests::{FailingGeolocator, ScriptedProvider},
    };
    use async_trait::async_trait;
    use std::{sync::Mutex, time::Duration};

    /// Records the busy flags seen while it runs.
    #[derive(Debug)]
    struct WatchingGeolocator {
        flags: Mutex<Option<Arc<BusyFlags>>>,
        seen: Arc<Mutex<Vec<(bool, bool)>>>,
    }

    #[async_trait]
    impl Geolocator for WatchingGeolocator {
        async fn current_position(&self) -> std::result::Result<Coordinates, GeolocationError> {
            let flags = self.flags.lock().unwrap().clone();
            if let Some(flags) = flags {
                self.seen
                    .lock()
                    .unwrap()
                    .push((flags.is_geolocating(), flags.is_fetching_weather()));
            }
            Ok(Coordinates::new(60.0, 5.0))
        }
    }

    fn session(provider: ScriptedProvider, geolocator: Box<dyn Geolocator>) -> Session {
        Session::new(EnvironmentResolver::new(Box::new(provider), geolocator))
    }

    fn home() -> Box<dyn Geolocator> {
        Box::new(FixedGeolocator::new(Coordinates::new(60.39, 5.32)))
    }

    #[test]
    fn fresh_session_is_empty_and_idle() {
        let s = session(ScriptedProvider::ok("Clear"), home());
        let view = s.view();
        assert!(view.observation.is_none());
        assert!(view.prediction.is_none());
        assert!(view.error.is_none());
        assert!(!view.fetching_weather);
        assert!(!view.geolocating);
    }

    #[test]
    fn predicting_without_observation_sets_error() {
        let mut s = session(ScriptedProvider::ok("Clear"), home());

        let err = s.predict(&PredictionInput::default()).unwrap_err();
        assert_eq!(err, FishcastError::MissingObservation);
        assert!(s.prediction().is_none());
        assert_eq!(s.error(), Some(FishcastError::MissingObservation.to_string().as_str()));
    }

    #[tokio::test]
    async fn lookup_then_predict() {
        let mut s = session(ScriptedProvider::ok("Clear"), home());

        s.lookup_by_name("Bergen").await.expect("lookup");
        assert_eq!(s.observation().map(|o| o.location_name.as_str()), Some("Bergen"));
        assert!(!s.is_fetching_weather());

        let input = PredictionInput { moon_phase: MoonPhase::Half, ..PredictionInput::default() };
        // 50 + 20 + 15 + 10 (clear) + 10 (wind 3)
        let prediction = s.predict(&input).expect("prediction");
        assert_eq!(prediction.score, 100);
        assert_eq!(prediction.tier, Tier::Excellent);
        assert_eq!(s.prediction(), Some(&prediction));
        assert!(s.error().is_none());
    }

    #[tokio::test]
    async fn failed_lookup_keeps_previous_observation() {
        let provider = ScriptedProvider::ok("Clouds");
        let mut s = session(provider.clone(), home());
        s.lookup_by_name("Bergen").await.expect("lookup");

        let err = s.lookup_by_name("").await.unwrap_err();
        assert!(matches!(err, FishcastError::InvalidInput(_)));
        assert_eq!(s.error(), Some("Please enter a location."));
        assert_eq!(s.observation().map(|o| o.location_name.as_str()), Some("Bergen"));
        assert!(!s.is_fetching_weather());
    }

    #[tokio::test]
    async fn provider_failure_clears_busy_flag_and_reports_message() {
        let mut s = session(ScriptedProvider::failing(), home());

        assert!(s.lookup_by_name("Atlantis").await.is_err());
        assert_eq!(s.error(), Some("Could not fetch weather data. Please check the location."));
        assert!(!s.is_fetching_weather());
        assert!(s.observation().is_none());
    }

    #[tokio::test]
    async fn new_observation_drops_stale_prediction() {
        let mut s = session(ScriptedProvider::ok("Clear"), home());
        s.lookup_by_name("Bergen").await.unwrap();
        s.predict(&PredictionInput::default()).unwrap();
        assert!(s.prediction().is_some());

        s.lookup_by_name("Oslo").await.unwrap();
        assert!(s.prediction().is_none());
    }

    #[tokio::test]
    async fn permission_denied_surfaces_native_message() {
        let mut s = session(
            ScriptedProvider::ok("Clear"),
            Box::new(FailingGeolocator(GeolocationError::PermissionDenied)),
        );

        let err = s.lookup_current_location().await.unwrap_err();
        assert_eq!(err, FishcastError::Geolocation(GeolocationError::PermissionDenied));
        assert_eq!(s.error(), Some("User denied the request for Geolocation."));
        assert!(!s.is_geolocating());
        assert!(!s.is_fetching_weather());
    }

    #[tokio::test]
    async fn coordinate_failure_reports_location_message() {
        let mut s = session(ScriptedProvider::failing(), home());

        assert!(s.lookup_by_coordinates(60.0, 5.0).await.is_err());
        assert_eq!(s.error(), Some("Could not fetch weather data for your location."));
        assert!(!s.is_fetching_weather());
    }

    #[tokio::test]
    async fn current_location_lookup_resolves_by_coordinates() {
        let provider = ScriptedProvider::ok("Rain");
        let calls = provider.calls.clone();
        let mut s = session(provider, home());

        s.lookup_current_location().await.expect("lookup");
        assert_eq!(
            s.observation().map(|o| o.location_name.as_str()),
            Some("60.3900, 5.3200")
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn geolocating_flag_is_raised_only_while_locating() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let geolocator =
            Arc::new(WatchingGeolocator { flags: Mutex::new(None), seen: Arc::clone(&seen) });

        #[derive(Debug)]
        struct Shared(Arc<WatchingGeolocator>);

        #[async_trait]
        impl Geolocator for Shared {
            async fn current_position(
                &self,
            ) -> std::result::Result<Coordinates, GeolocationError> {
                self.0.current_position().await
            }
        }

        let mut s = session(ScriptedProvider::ok("Clear"), Box::new(Shared(Arc::clone(&geolocator))));
        *geolocator.flags.lock().unwrap() = Some(s.busy_flags());

        s.lookup_current_location().await.expect("lookup");

        assert_eq!(*seen.lock().unwrap(), vec![(true, false)]);
        assert!(!s.is_geolocating());
        assert!(!s.is_fetching_weather());
    }

    /// Never answers, so a lookup stays in flight until it is dropped.
    #[derive(Debug)]
    struct PendingProvider;

    #[async_trait]
    impl WeatherProvider for PendingProvider {
        fn id(&self) -> ProviderId {
            ProviderId::OpenWeather
        }

        async fn current_by_name(&self, _name: &str) -> anyhow::Result<WeatherObservation> {
            std::future::pending().await
        }

        async fn current_by_coordinates(
            &self,
            _coordinates: Coordinates,
        ) -> anyhow::Result<WeatherObservation> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn dropped_lookup_clears_fetching_flag() {
        let mut s = Session::new(EnvironmentResolver::new(Box::new(PendingProvider), home()));
        let flags = s.busy_flags();

        {
            let mut lookup = Box::pin(s.lookup_by_name("Bergen"));
            let elapsed =
                tokio::time::timeout(Duration::from_millis(50), lookup.as_mut()).await;
            assert!(elapsed.is_err());
            assert!(flags.is_fetching_weather());
            drop(lookup);
        }

        assert!(!flags.is_fetching_weather());
        assert!(!s.is_fetching_weather());
        assert!(s.observation().is_none());
        assert!(s.error().is_none());
    }

    #[tokio::test]
    async fn sessions_do_not_share_state() {
        let mut first = session(ScriptedProvider::ok("Clear"), home());
        let mut second = session(ScriptedProvider::ok("Rain"), home());

        first.lookup_by_name("Bergen").await.unwrap();
        second.lookup_by_name("Oslo").await.unwrap();

        let a = first.predict(&PredictionInput::default()).unwrap();
        let b = second.predict(&PredictionInput::default()).unwrap();
        assert_ne!(a.score, b.score);
        assert_eq!(first.observation().unwrap().condition, "Clear");
        assert_eq!(second.observation().unwrap().condition, "Rain");
    }

    #[tokio::test]
    async fn view_serializes_to_json() {
        let mut s = session(ScriptedProvider::ok("Clear"), home());
        s.lookup_by_name("Bergen").await.unwrap();
        s.predict(&PredictionInput::default()).unwrap();

        let json = serde_json::to_value(s.view()).expect("serializable");
        assert_eq!(json["prediction"]["tier"], "excellent");
        assert_eq!(json["observation"]["location_name"], "Bergen");
        assert_eq!(json["error"], serde_json::Value::Null);
        assert_eq!(json["fetching_weather"], false);
    }
}
