// Display formatting for vehicle and fleet fields
use super::vehicle::{parse_timestamp, Coordinates, Location, VehicleStatus};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusColor {
    pub background: &'static str,
    pub text: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelKind {
    Battery,
    Fuel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LevelSeverity {
    Success,
    Warning,
    Error,
}

/// "EN ROUTE", "IDLE", ... or "Unknown".
pub fn format_status(status: VehicleStatus) -> String {
    match status {
        VehicleStatus::Unknown => "Unknown".to_string(),
        known => known.as_key().replace('_', " ").to_uppercase(),
    }
}

/// Badge colours per status; `None` leaves the renderer's default in place.
pub fn status_color(status: VehicleStatus) -> Option<StatusColor> {
    match status {
        VehicleStatus::Delivered => Some(StatusColor {
            background: "#ebfcf4",
            text: "#008f60",
        }),
        VehicleStatus::Idle => Some(StatusColor {
            background: "#f2f3f6",
            text: "#424c5b",
        }),
        VehicleStatus::EnRoute | VehicleStatus::Moving => Some(StatusColor {
            background: "#f0f5ff",
            text: "#407fe2",
        }),
        VehicleStatus::Unknown => None,
    }
}

pub fn format_speed(speed: Option<f64>) -> String {
    format!("{} mph", format_number(speed.unwrap_or(0.0)))
}

pub fn format_coordinates(latitude: Option<f64>, longitude: Option<f64>) -> String {
    match (non_zero(latitude), non_zero(longitude)) {
        (Some(lat), Some(lng)) => format!("{:.4}, {:.4}", lat, lng),
        _ => "N/A".to_string(),
    }
}

pub fn format_location(location: Option<&Location>) -> String {
    match location {
        Some(Location::Label(label)) => label.clone(),
        Some(Location::Coordinates(Coordinates {
            latitude,
            longitude,
        })) if non_zero(*latitude).is_some() && non_zero(*longitude).is_some() => {
            format_coordinates(*latitude, *longitude)
        }
        _ => "-".to_string(),
    }
}

pub fn format_phone(phone: Option<&str>) -> String {
    match phone.map(str::trim).filter(|p| !p.is_empty()) {
        None => "N/A".to_string(),
        Some(phone) if phone.starts_with('+') => phone.to_string(),
        Some(phone) => format!("+{}", phone),
    }
}

pub fn level_severity(kind: LevelKind, level: Option<f64>) -> LevelSeverity {
    let level = level.unwrap_or(0.0);
    let warning_floor = match kind {
        LevelKind::Battery => 20.0,
        LevelKind::Fuel => 25.0,
    };

    if level > 50.0 {
        LevelSeverity::Success
    } else if level > warning_floor {
        LevelSeverity::Warning
    } else {
        LevelSeverity::Error
    }
}

pub fn format_level(level: Option<f64>) -> String {
    format!("{}%", format_number(level.unwrap_or(0.0)))
}

/// `dd/mm/yyyy, HH:MM:SS` in UTC, or "-" when absent or unparseable.
pub fn format_timestamp(raw: Option<&str>) -> String {
    parse_timestamp(raw)
        .map(|ts| ts.format("%d/%m/%Y, %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string())
}

pub fn format_clock_time(timestamp: Option<DateTime<Utc>>) -> String {
    timestamp
        .map(|ts| ts.format("%H:%M").to_string())
        .unwrap_or_else(|| "--:--".to_string())
}

/// Coarse staleness label. There is deliberately no hour tier.
pub fn format_ago(seconds: u64) -> String {
    if seconds < 60 {
        format!("{}s", seconds)
    } else {
        format!("{}m", seconds / 60)
    }
}

fn non_zero(value: Option<f64>) -> Option<f64> {
    value.filter(|v| *v != 0.0 && v.is_finite())
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        value.to_string()
    }
}
