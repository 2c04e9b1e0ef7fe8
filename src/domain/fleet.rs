// Fleet-level domain models: filters, counts and statistics
use super::vehicle::{parse_timestamp, Vehicle, VehicleStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterState {
    #[default]
    All,
    Idle,
    EnRoute,
    Delivered,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown filter '{0}' (expected all, idle, en_route or delivered)")]
pub struct UnknownFilter(pub String);

impl FilterState {
    /// The status a non-`all` filter selects on.
    pub fn status(&self) -> Option<VehicleStatus> {
        match self {
            Self::All => None,
            Self::Idle => Some(VehicleStatus::Idle),
            Self::EnRoute => Some(VehicleStatus::EnRoute),
            Self::Delivered => Some(VehicleStatus::Delivered),
        }
    }

    pub fn as_key(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Idle => "idle",
            Self::EnRoute => "en_route",
            Self::Delivered => "delivered",
        }
    }
}

impl FromStr for FilterState {
    type Err = UnknownFilter;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "idle" => Ok(Self::Idle),
            "en_route" => Ok(Self::EnRoute),
            "delivered" => Ok(Self::Delivered),
            _ => Err(UnknownFilter(raw.to_string())),
        }
    }
}

impl fmt::Display for FilterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_key())
    }
}

/// Per-status counts over the canonical collection. `all` covers every
/// vehicle; statuses without a named bucket only contribute to `all`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StatusCounts {
    pub all: usize,
    pub idle: usize,
    pub en_route: usize,
    pub delivered: usize,
}

impl StatusCounts {
    pub fn from_vehicles(vehicles: &[Vehicle]) -> Self {
        let mut counts = Self {
            all: vehicles.len(),
            ..Self::default()
        };
        for vehicle in vehicles {
            match vehicle.status {
                VehicleStatus::Idle => counts.idle += 1,
                VehicleStatus::EnRoute => counts.en_route += 1,
                VehicleStatus::Delivered => counts.delivered += 1,
                VehicleStatus::Moving | VehicleStatus::Unknown => {}
            }
        }
        counts
    }
}

/// Aggregates as reported by `GET /api/statistics`. Every field is optional,
/// and a field of the wrong type reads as absent without spoiling the others.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerStatistics {
    #[serde(default, deserialize_with = "lenient_count")]
    pub total_vehicles: Option<u64>,
    #[serde(default, deserialize_with = "lenient_speed")]
    pub average_speed: Option<f64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub moving_vehicles: Option<u64>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub last_updated: Option<String>,
}

fn lenient_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    Ok(Option::<Value>::deserialize(deserializer)?.and_then(|value| match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| *f >= 0.0 && f.fract() == 0.0)
                .map(|f| f as u64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }))
}

fn lenient_speed<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    Ok(Option::<Value>::deserialize(deserializer)?.and_then(|value| match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }))
}

// Epoch milliseconds are accepted alongside RFC 3339 strings.
fn lenient_timestamp<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Ok(Option::<Value>::deserialize(deserializer)?.and_then(|value| match value {
        Value::String(s) => Some(s),
        Value::Number(n) => n
            .as_i64()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .map(|ts| ts.to_rfc3339()),
        _ => None,
    }))
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct StatisticsSnapshot {
    pub total_vehicles: u64,
    pub average_speed: f64,
    pub moving_vehicles: u64,
    pub last_updated: Option<DateTime<Utc>>,
}

impl StatisticsSnapshot {
    /// Derive the aggregates from the vehicle set alone.
    pub fn derive(vehicles: &[Vehicle]) -> Self {
        let average_speed = if vehicles.is_empty() {
            0.0
        } else {
            let total: f64 = vehicles.iter().map(|v| v.speed.unwrap_or(0.0)).sum();
            (total / vehicles.len() as f64 * 10.0).round() / 10.0
        };

        Self {
            total_vehicles: vehicles.len() as u64,
            average_speed,
            moving_vehicles: vehicles.iter().filter(|v| v.is_moving()).count() as u64,
            last_updated: vehicles.iter().filter_map(Vehicle::last_updated_at).max(),
        }
    }

    /// Prefer server figures field by field; a missing or zero server value
    /// defers to the local derivation.
    pub fn resolve(server: Option<&ServerStatistics>, vehicles: &[Vehicle]) -> Self {
        let local = Self::derive(vehicles);
        let Some(server) = server else {
            return local;
        };

        Self {
            total_vehicles: server
                .total_vehicles
                .filter(|total| *total > 0)
                .unwrap_or(local.total_vehicles),
            average_speed: server
                .average_speed
                .filter(|speed| *speed > 0.0)
                .unwrap_or(local.average_speed),
            moving_vehicles: server
                .moving_vehicles
                .filter(|moving| *moving > 0)
                .unwrap_or(local.moving_vehicles),
            last_updated: parse_timestamp(server.last_updated.as_deref()).or(local.last_updated),
        }
    }
}
