//! Bite probability scoring.
//!
//! Scoring starts at [`BASE_SCORE`] and every rule adds or subtracts a fixed
//! amount. Rules are independent, so their order only affects the order of
//! [`Prediction::adjustments`]. The total is clamped to `0..=100`.

use crate::{
    error::{FishcastError, Result},
    model::{Adjustment, Factor, MoonPhase, Prediction, PredictionInput, Tier, WeatherObservation},
};

pub const BASE_SCORE: i32 = 50;

/// Scores an outing. Fails with [`FishcastError::MissingObservation`] when no
/// weather has been resolved yet.
pub fn score(input: &PredictionInput, observation: Option<&WeatherObservation>) -> Result<Prediction> {
    let observation = observation.ok_or(FishcastError::MissingObservation)?;

    let hour = input.time_of_day.hour();
    let candidates = [
        (Factor::WaterTemperature, water_temperature_delta(input.water_temp_c)),
        (Factor::MorningWindow, if (6..=10).contains(&hour) { 15 } else { 0 }),
        (Factor::EveningWindow, if (16..=19).contains(&hour) { 15 } else { 0 }),
        (Factor::Condition, condition_delta(&observation.condition)),
        (Factor::Wind, wind_delta(observation.wind_speed_mps)),
        (Factor::MoonPhase, moon_delta(input)),
    ];

    let adjustments: Vec<Adjustment> = candidates
        .into_iter()
        .filter(|(_, delta)| *delta != 0)
        .map(|(factor, delta)| Adjustment { factor, delta })
        .collect();

    let total = BASE_SCORE + adjustments.iter().map(|a| a.delta).sum::<i32>();
    let score = total.clamp(0, 100) as u8;

    Ok(Prediction { score, tier: Tier::from_score(score), adjustments })
}

fn water_temperature_delta(water_temp_c: f64) -> i32 {
    if (18.0..=24.0).contains(&water_temp_c) { 20 } else { 0 }
}

/// First match wins: clear, then clouds, then rain.
fn condition_delta(condition: &str) -> i32 {
    let condition = condition.to_lowercase();
    if condition.contains("clear") {
        10
    } else if condition.contains("clouds") {
        5
    } else if condition.contains("rain") {
        -10
    } else {
        0
    }
}

// 5 and 10 themselves land in the neutral band.
fn wind_delta(wind_speed_mps: f64) -> i32 {
    if wind_speed_mps < 5.0 {
        10
    } else if wind_speed_mps > 10.0 {
        -10
    } else {
        0
    }
}

fn moon_delta(input: &PredictionInput) -> i32 {
    match input.moon_phase {
        MoonPhase::Full => 10,
        MoonPhase::Half => 0,
        MoonPhase::New => -5,
    }
}
