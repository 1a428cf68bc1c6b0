use thiserror::Error;

use crate::geolocation::GeolocationError;

/// Message shown when a lookup by place name fails.
pub const NAME_LOOKUP_FAILED: &str = "Could not fetch weather data. Please check the location.";

/// Message shown when a lookup by coordinates fails.
pub const COORDINATE_LOOKUP_FAILED: &str = "Could not fetch weather data for your location.";

/// Every failure the core can surface to a caller.
///
/// Each variant renders as a single human-readable message; none of them
/// are fatal, and the caller is free to issue the next request right away.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FishcastError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    ProviderError(String),

    #[error("{0}")]
    Geolocation(#[from] GeolocationError),

    #[error("No weather data available. Fetch the weather before predicting.")]
    MissingObservation,
}

pub type Result<T> = std::result::Result<T, FishcastError>;
