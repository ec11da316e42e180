//! Time span parsing for step policies
//!
//! Accepts bare numbers (seconds) or a number followed by `ms`, `s`, `m`,
//! `h` or `d`.

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Deserializer};
use std::time::Duration;

pub fn parse_duration(spec: &str) -> Result<Duration> {
    let spec = spec.trim();
    let invalid = || ConfigError::InvalidDuration(spec.to_string());

    let split = spec
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(spec.len());
    let (number, unit) = spec.split_at(split);
    let value: f64 = number.parse().map_err(|_| invalid())?;

    let multiplier = match unit.trim() {
        "" | "s" => 1.0,
        "ms" => 0.001,
        "m" => 60.0,
        "h" => 3600.0,
        "d" => 86400.0,
        _ => return Err(invalid()),
    };

    Duration::try_from_secs_f64(value * multiplier).map_err(|_| invalid())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDuration {
    Seconds(u64),
    Fractional(f64),
    Text(String),
}

pub(crate) fn deserialize_opt<'de, D>(deserializer: D) -> std::result::Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawDuration>::deserialize(deserializer)?;
    raw.map(|raw| match raw {
        RawDuration::Seconds(secs) => Ok(Duration::from_secs(secs)),
        RawDuration::Fractional(secs) => Duration::try_from_secs_f64(secs)
            .map_err(|_| ConfigError::InvalidDuration(secs.to_string())),
        RawDuration::Text(text) => parse_duration(&text),
    })
    .transpose()
    .map_err(serde::de::Error::custom)
}
