use anyhow::{Context, anyhow};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use fishcast_core::{
    Config, Coordinates, EnvironmentResolver, Geolocator, LocationQuery, MoonPhase, PredictionInput,
    ProviderId, Session, TimeOfDay, WeatherObservation,
    geolocation::{IpGeolocator, geolocator_from_config},
    provider::{default_provider_from_config, provider_from_config},
    score,
};
use inquire::{Confirm, Password, PasswordDisplayMode};

use crate::output;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "fishcast", version, about = "Bite probability forecasts for your next fishing trip")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Configure credentials for a specific provider.
    Configure {
        /// Provider short name, e.g. "openweather" or "weatherapi".
        provider: String,
    },

    /// Fetch current weather for a location and predict the bite.
    Predict {
        #[command(flatten)]
        location: LocationArgs,

        #[command(flatten)]
        input: InputArgs,

        /// Weather provider to use instead of the configured default.
        #[arg(long)]
        provider: Option<String>,

        /// Print the full session state as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Score hand-entered conditions without any network access.
    Score {
        /// Weather condition category, e.g. "Clear", "Clouds", "Rain".
        #[arg(long)]
        condition: String,

        /// Wind speed in m/s.
        #[arg(long)]
        wind: f64,

        /// Air temperature in °C; recorded as unknown when omitted.
        #[arg(long, allow_negative_numbers = true)]
        air_temp: Option<f64>,

        #[command(flatten)]
        input: InputArgs,

        /// Print the prediction as JSON.
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Args)]
pub struct LocationArgs {
    /// Place name, e.g. "Bergen" or "Lake Tahoe".
    #[arg(long, conflicts_with_all = ["lat", "here"])]
    pub location: Option<String>,

    /// Latitude in decimal degrees.
    #[arg(long, requires = "lon", allow_negative_numbers = true, conflicts_with = "here")]
    pub lat: Option<f64>,

    /// Longitude in decimal degrees.
    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    pub lon: Option<f64>,

    /// Look up the current position over the network, ignoring any home location.
    #[arg(long)]
    pub here: bool,
}

#[derive(Debug, Args)]
pub struct InputArgs {
    /// Water temperature in °C.
    #[arg(long, allow_negative_numbers = true)]
    pub water_temp: Option<f64>,

    /// Time of the outing, HH:MM (24h).
    #[arg(long)]
    pub time: Option<TimeOfDay>,

    /// Moon phase: full, half or new.
    #[arg(long)]
    pub moon: Option<MoonPhase>,
}

impl InputArgs {
    /// Command-line values win over the configured defaults.
    pub fn merge(&self, defaults: PredictionInput) -> PredictionInput {
        PredictionInput {
            water_temp_c: self.water_temp.unwrap_or(defaults.water_temp_c),
            time_of_day: self.time.unwrap_or(defaults.time_of_day),
            moon_phase: self.moon.unwrap_or(defaults.moon_phase),
        }
    }
}

impl LocationArgs {
    /// `None` means "use the current position".
    pub fn query(&self) -> Option<LocationQuery> {
        if let Some(name) = &self.location {
            return Some(LocationQuery::Name(name.clone()));
        }
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Some(LocationQuery::Coordinates(Coordinates::new(lat, lon))),
            _ => None,
        }
    }
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure { provider } => configure(&provider),
            Command::Predict { location, input, provider, json } => {
                predict(&location, &input, provider.as_deref(), json).await
            }
            Command::Score { condition, wind, air_temp, input, json } => {
                score_offline(manual_observation(condition, wind, air_temp), &input, json)
            }
        }
    }
}

fn configure(provider: &str) -> anyhow::Result<()> {
    let id = ProviderId::try_from(provider)?;
    let mut config = Config::load()?;

    let api_key = Password::new(&format!("API key for {id}:"))
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;

    let api_key = api_key.trim().to_string();
    if api_key.is_empty() {
        return Err(anyhow!("API key must not be empty"));
    }

    config.upsert_provider_api_key(id, api_key);

    if config.default_provider_id().ok() != Some(id) {
        let make_default = Confirm::new(&format!("Make {id} the default provider?"))
            .with_default(false)
            .prompt()
            .context("Failed to read confirmation")?;
        if make_default {
            config.set_default_provider(id);
        }
    }

    config.save()?;
    println!("Saved {id} credentials to {}", Config::config_file_path()?.display());
    Ok(())
}

async fn predict(
    location: &LocationArgs,
    input: &InputArgs,
    provider: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    let config = Config::load()?;

    let weather = match provider {
        Some(id) => provider_from_config(ProviderId::try_from(id)?, &config)?,
        None => default_provider_from_config(&config)?,
    };
    let geolocator: Box<dyn Geolocator> = if location.here {
        Box::new(IpGeolocator::from_config(&config.geolocation))
    } else {
        geolocator_from_config(&config)
    };

    let mut session = Session::new(EnvironmentResolver::new(weather, geolocator));
    let input = input.merge(config.defaults);

    let looked_up = match location.query() {
        Some(LocationQuery::Name(name)) => session.lookup_by_name(&name).await,
        Some(LocationQuery::Coordinates(c)) => {
            session.lookup_by_coordinates(c.lat, c.lon).await
        }
        None => session.lookup_current_location().await,
    };
    if looked_up.is_ok() {
        // A failure here is already recorded on the session.
        let _ = session.predict(&input);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&session.view())?);
    } else {
        print!("{}", output::render_session(&session, &input));
    }

    match session.error() {
        Some(message) => Err(anyhow!("{message}")),
        None => Ok(()),
    }
}

/// Water temperature is a separate input and never stands in for the air reading,
/// so an omitted air temperature is NaN.
fn manual_observation(condition: String, wind: f64, air_temp: Option<f64>) -> WeatherObservation {
    WeatherObservation {
        provider: "manual".to_string(),
        location_name: "manual entry".to_string(),
        temperature_c: air_temp.unwrap_or(f64::NAN),
        description: condition.to_lowercase(),
        condition,
        wind_speed_mps: wind.max(0.0),
        observation_time: Utc::now(),
    }
}

fn score_offline(observation: WeatherObservation, input: &InputArgs, json: bool) -> anyhow::Result<()> {
    let config = Config::load()?;
    let input = input.merge(config.defaults);

    let prediction = score(&input, Some(&observation))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&prediction)?);
    } else {
        print!("{}", output::render_prediction(&prediction, &input));
    }
    Ok(())
}
