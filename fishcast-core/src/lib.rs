//! Core library for the `fishcast` CLI.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - Abstraction over weather providers and geolocation
//! - The environment resolver that turns a location into an observation
//! - The pure bite probability scorer
//! - Session state consumed by front ends (current observation, prediction,
//!   error message and busy flags)
//!
//! It is used by `fishcast-cli`, but can also be reused by other binaries or services.

pub mod config;
pub mod error;
pub mod geolocation;
pub mod model;
pub mod provider;
pub mod resolver;
pub mod scorer;
pub mod session;

#[cfg(test)]
mod test_http;

pub use config::{Config, ProviderConfig};
pub use error::{FishcastError, Result};
pub use geolocation::{GeolocationError, Geolocator};
pub use model::{
    Coordinates, LocationQuery, MoonPhase, Prediction, PredictionInput, Tier, TimeOfDay,
    WeatherObservation,
};
pub use provider::{ProviderId, WeatherProvider};
pub use resolver::EnvironmentResolver;
pub use scorer::score;
pub use session::{BusyFlags, Session, SessionView};
