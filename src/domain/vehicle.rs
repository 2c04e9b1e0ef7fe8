// Vehicle domain model
use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleStatus {
    Idle,
    EnRoute,
    Delivered,
    Moving,
    #[default]
    Unknown,
}

impl VehicleStatus {
    /// Case-insensitive lookup; anything unrecognised lands in `Unknown`.
    pub fn from_key(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "idle" => Self::Idle,
            "en_route" => Self::EnRoute,
            "delivered" => Self::Delivered,
            "moving" => Self::Moving,
            _ => Self::Unknown,
        }
    }

    pub fn as_key(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::EnRoute => "en_route",
            Self::Delivered => "delivered",
            Self::Moving => "moving",
            Self::Unknown => "unknown",
        }
    }
}

// Status arrives as free text from the feed; null, numbers and unknown
// strings must never fail the whole payload.
impl<'de> Deserialize<'de> for VehicleStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
        Ok(raw
            .as_ref()
            .and_then(|value| value.as_str())
            .map(Self::from_key)
            .unwrap_or_default())
    }
}

/// Latitude/longitude pair. The feed uses both `lat`/`lng` and
/// `latitude`/`longitude`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    #[serde(default, alias = "lat")]
    pub latitude: Option<f64>,
    #[serde(default, alias = "lng")]
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Location {
    Coordinates(Coordinates),
    Label(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default)]
    pub vehicle_number: Option<String>,
    #[serde(default)]
    pub driver_name: Option<String>,
    #[serde(default)]
    pub driver_phone: Option<String>,
    #[serde(default)]
    pub status: VehicleStatus,
    #[serde(default)]
    pub speed: Option<f64>,
    #[serde(default)]
    pub battery_level: Option<f64>,
    #[serde(default)]
    pub fuel_level: Option<f64>,
    #[serde(default)]
    pub current_location: Option<Location>,
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub estimated_arrival: Option<String>,
    #[serde(default)]
    pub last_updated: Option<String>,
}

impl Vehicle {
    pub fn new(id: impl Into<String>, status: VehicleStatus) -> Self {
        Self {
            id: id.into(),
            vehicle_number: None,
            driver_name: None,
            driver_phone: None,
            status,
            speed: None,
            battery_level: None,
            fuel_level: None,
            current_location: None,
            destination: None,
            estimated_arrival: None,
            last_updated: None,
        }
    }

    pub fn is_moving(&self) -> bool {
        self.speed.is_some_and(|speed| speed > 0.0)
    }

    pub fn last_updated_at(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(self.last_updated.as_deref())
    }
}

pub fn parse_timestamp(raw: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = raw?.trim();
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .ok()
}

fn deserialize_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(id) => Ok(id),
        serde_json::Value::Number(id) => Ok(id.to_string()),
        other => Err(D::Error::custom(format!(
            "vehicle id must be a string or number, got {}",
            other
        ))),
    }
}
