use serde_json::Value;

use crate::models::WeatherItem;

/// Normalize a current-weather payload:
/// `{ "main": { "temp": 21.456 }, "weather": [{ "description": "..." }] }`.
pub fn normalize_weather(raw: &Value) -> Option<WeatherItem> {
    let temp = raw["main"]["temp"].as_f64()?;
    let description = raw["weather"][0]["description"].as_str()?;
    Some(WeatherItem {
        temperature: round_tenths(temp),
        description: description.to_string(),
    })
}

pub fn round_tenths(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}
