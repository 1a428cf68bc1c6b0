use chrono::{DateTime, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::error::FishcastError;

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Checks the WGS84 ranges. Coordinates usually come from a trusted
    /// geolocation source, so callers treat a failure here as advisory.
    pub fn validate(&self) -> Result<(), FishcastError> {
        if !(-90.0..=90.0).contains(&self.lat) {
            return Err(FishcastError::InvalidInput(format!(
                "Latitude {} is outside [-90, 90]",
                self.lat
            )));
        }
        if !(-180.0..=180.0).contains(&self.lon) {
            return Err(FishcastError::InvalidInput(format!(
                "Longitude {} is outside [-180, 180]",
                self.lon
            )));
        }
        Ok(())
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}, {:.4}", self.lat, self.lon)
    }
}

/// Where to look up the weather: a place name or a coordinate pair.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationQuery {
    Name(String),
    Coordinates(Coordinates),
}

/// Current weather at a resolved location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherObservation {
    pub provider: String,
    pub location_name: String,
    pub temperature_c: f64,
    /// Provider category such as "Clear", "Clouds" or "Rain". Free text.
    pub condition: String,
    pub description: String,
    pub wind_speed_mps: f64,
    pub observation_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoonPhase {
    #[default]
    Full,
    Half,
    New,
}

impl MoonPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            MoonPhase::Full => "full",
            MoonPhase::Half => "half",
            MoonPhase::New => "new",
        }
    }

    pub const fn all() -> &'static [MoonPhase] {
        &[MoonPhase::Full, MoonPhase::Half, MoonPhase::New]
    }
}

impl fmt::Display for MoonPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MoonPhase {
    type Err = FishcastError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "full" => Ok(MoonPhase::Full),
            "half" => Ok(MoonPhase::Half),
            "new" => Ok(MoonPhase::New),
            _ => Err(FishcastError::InvalidInput(format!(
                "Unknown moon phase '{s}'. Expected one of: full, half, new."
            ))),
        }
    }
}

/// Wall-clock time of the outing, 24h.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay(NaiveTime);

impl TimeOfDay {
    pub fn from_hm(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(Self)
    }

    pub fn hour(&self) -> u32 {
        self.0.hour()
    }

    pub fn minute(&self) -> u32 {
        self.0.minute()
    }
}

impl Default for TimeOfDay {
    fn default() -> Self {
        Self(NaiveTime::from_hms_opt(8, 0, 0).unwrap_or(NaiveTime::MIN))
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%H:%M"))
    }
}

impl FromStr for TimeOfDay {
    type Err = FishcastError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveTime::parse_from_str(s.trim(), "%H:%M")
            .map(Self)
            .map_err(|_| FishcastError::InvalidInput(format!("Invalid time '{s}'. Use HH:MM (24h).")))
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = FishcastError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimeOfDay> for String {
    fn from(value: TimeOfDay) -> Self {
        value.to_string()
    }
}

/// The user-adjustable half of the scorer's arguments.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictionInput {
    pub water_temp_c: f64,
    /// Also read as `time`, matching the command-line flag.
    #[serde(alias = "time")]
    pub time_of_day: TimeOfDay,
    #[serde(alias = "moon")]
    pub moon_phase: MoonPhase,
}

impl Default for PredictionInput {
    fn default() -> Self {
        Self {
            water_temp_c: 20.0,
            time_of_day: TimeOfDay::default(),
            moon_phase: MoonPhase::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Excellent,
    Moderate,
    Poor,
}

impl Tier {
    pub fn from_score(score: u8) -> Self {
        if score > 70 {
            Tier::Excellent
        } else if score > 40 {
            Tier::Moderate
        } else {
            Tier::Poor
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Excellent => "excellent",
            Tier::Moderate => "moderate",
            Tier::Poor => "poor",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Factor {
    WaterTemperature,
    MorningWindow,
    EveningWindow,
    Condition,
    Wind,
    MoonPhase,
}

impl Factor {
    pub fn as_str(&self) -> &'static str {
        match self {
            Factor::WaterTemperature => "water temperature",
            Factor::MorningWindow => "morning feeding window",
            Factor::EveningWindow => "evening feeding window",
            Factor::Condition => "weather condition",
            Factor::Wind => "wind",
            Factor::MoonPhase => "moon phase",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Adjustment {
    pub factor: Factor,
    pub delta: i32,
}

/// Outcome of one scoring run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prediction {
    pub score: u8,
    pub tier: Tier,
    /// Non-zero adjustments in the order they were applied.
    pub adjustments: Vec<Adjustment>,
}

impl Prediction {
    /// One line per adjustment, e.g. `+20 water temperature`.
    pub fn explain(&self) -> Vec<String> {
        self.adjustments
            .iter()
            .map(|a| format!("{:+} {}", a.delta, a.factor.as_str()))
            .collect()
    }
}
