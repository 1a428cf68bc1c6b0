//! Current-position lookup.
//!
//! Failures mirror the four categories platform geolocation APIs report,
//! each with the message those APIs conventionally show to users.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::{fmt::Debug, time::Duration};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{config::GeolocationConfig, model::Coordinates, Config};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum GeolocationError {
    #[error("User denied the request for Geolocation.")]
    PermissionDenied,

    #[error("Location information is unavailable.")]
    PositionUnavailable,

    #[error("The request to get user location timed out.")]
    Timeout,

    #[error("An unknown error occurred.")]
    UnknownLocationError,
}

impl GeolocationError {
    /// Maps a platform error code (1 denied, 2 unavailable, 3 timeout).
    pub fn from_code(code: u16) -> Self {
        match code {
            1 => GeolocationError::PermissionDenied,
            2 => GeolocationError::PositionUnavailable,
            3 => GeolocationError::Timeout,
            _ => GeolocationError::UnknownLocationError,
        }
    }
}

#[async_trait]
pub trait Geolocator: Send + Sync + Debug {
    async fn current_position(&self) -> Result<Coordinates, GeolocationError>;
}

/// Always reports the same position, e.g. a configured home location.
#[derive(Debug, Clone, Copy)]
pub struct FixedGeolocator {
    position: Coordinates,
}

impl FixedGeolocator {
    pub fn new(position: Coordinates) -> Self {
        Self { position }
    }
}

#[async_trait]
impl Geolocator for FixedGeolocator {
    async fn current_position(&self) -> Result<Coordinates, GeolocationError> {
        Ok(self.position)
    }
}

/// Approximates the current position from the public IP address.
#[derive(Debug, Clone)]
pub struct IpGeolocator {
    endpoint: String,
    timeout: Duration,
    enabled: bool,
    http: Client,
}

#[derive(Debug, Deserialize)]
struct IpLookupResponse {
    status: String,
    lat: Option<f64>,
    lon: Option<f64>,
    message: Option<String>,
}

impl IpGeolocator {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self::with_client(endpoint, timeout, Client::new())
    }

    pub fn with_client(endpoint: impl Into<String>, timeout: Duration, http: Client) -> Self {
        Self { endpoint: endpoint.into(), timeout, enabled: true, http }
    }

    pub fn from_config(config: &GeolocationConfig) -> Self {
        let mut geolocator =
            Self::new(config.endpoint.clone(), Duration::from_secs(config.timeout_secs));
        geolocator.enabled = config.enabled;
        geolocator
    }

    async fn lookup(&self) -> Result<Coordinates, GeolocationError> {
        debug!(endpoint = %self.endpoint, "looking up position from IP address");

        let res = self.http.get(&self.endpoint).send().await.map_err(|e| {
            warn!(error = %e, "IP geolocation request failed");
            if e.is_timeout() {
                GeolocationError::Timeout
            } else {
                GeolocationError::PositionUnavailable
            }
        })?;

        if !res.status().is_success() {
            warn!(status = %res.status(), "IP geolocation returned an error status");
            return Err(GeolocationError::PositionUnavailable);
        }

        let body: IpLookupResponse = res.json().await.map_err(|e| {
            warn!(error = %e, "IP geolocation returned an unreadable body");
            GeolocationError::UnknownLocationError
        })?;

        if body.status != "success" {
            warn!(message = ?body.message, "IP geolocation could not place this address");
            return Err(GeolocationError::PositionUnavailable);
        }

        match (body.lat, body.lon) {
            (Some(lat), Some(lon)) => Ok(Coordinates::new(lat, lon)),
            _ => Err(GeolocationError::UnknownLocationError),
        }
    }
}

#[async_trait]
impl Geolocator for IpGeolocator {
    async fn current_position(&self) -> Result<Coordinates, GeolocationError> {
        if !self.enabled {
            return Err(GeolocationError::PermissionDenied);
        }

        tokio::time::timeout(self.timeout, self.lookup())
            .await
            .map_err(|_| GeolocationError::Timeout)?
    }
}

/// The configured home position when present, IP lookup otherwise.
pub fn geolocator_from_config(config: &Config) -> Box<dyn Geolocator> {
    match config.home_coordinates() {
        Some(home) => Box::new(FixedGeolocator::new(home)),
        None => Box::new(IpGeolocator::from_config(&config.geolocation)),
    }
}
