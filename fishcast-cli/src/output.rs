//! Human-readable rendering of observations and predictions.

use fishcast_core::{Prediction, PredictionInput, Session, WeatherObservation};
use std::fmt::Write;

pub fn render_observation(observation: &WeatherObservation) -> String {
    format!(
        "{}: {} ({}), {:.1}°C, wind {:.1} m/s [{}]\n",
        observation.location_name,
        observation.condition,
        observation.description,
        observation.temperature_c,
        observation.wind_speed_mps,
        observation.provider,
    )
}

pub fn render_prediction(prediction: &Prediction, input: &PredictionInput) -> String {
    let mut out = format!(
        "Water {:.1}°C at {}, {} moon\nBite probability: {}/100 ({})\n",
        input.water_temp_c, input.time_of_day, input.moon_phase, prediction.score, prediction.tier,
    );
    for line in prediction.explain() {
        let _ = writeln!(out, "  {line}");
    }
    out
}

/// Everything worth showing from a finished session; errors go to stderr via `main`.
pub fn render_session(session: &Session, input: &PredictionInput) -> String {
    let mut out = String::new();
    if let Some(observation) = session.observation() {
        out.push_str(&render_observation(observation));
    }
    if let Some(prediction) = session.prediction() {
        out.push_str(&render_prediction(prediction, input));
    }
    out
}
