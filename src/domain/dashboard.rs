// Dashboard read model - what a renderer needs for one frame
use super::fleet::{FilterState, StatisticsSnapshot, StatusCounts};
use super::status_format::{
    format_clock_time, format_level, format_location, format_phone, format_speed, format_status,
    format_timestamp, level_severity, status_color, LevelKind, LevelSeverity, StatusColor,
};
use super::vehicle::Vehicle;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadState {
    Loading,
    Ready,
    Error,
}

/// One row of the vehicle table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleRow {
    pub id: String,
    pub vehicle_number: String,
    pub driver_name: String,
    pub status: String,
    pub status_color: Option<StatusColor>,
    pub speed: String,
    pub location: String,
    pub estimated_arrival: String,
    pub last_updated: String,
}

impl VehicleRow {
    pub fn from_vehicle(vehicle: &Vehicle) -> Self {
        Self {
            id: vehicle.id.clone(),
            vehicle_number: vehicle.vehicle_number.clone().unwrap_or_default(),
            driver_name: vehicle.driver_name.clone().unwrap_or_default(),
            status: format_status(vehicle.status),
            status_color: status_color(vehicle.status),
            speed: format_speed(vehicle.speed),
            location: format_location(vehicle.current_location.as_ref()),
            estimated_arrival: format_timestamp(vehicle.estimated_arrival.as_deref()),
            last_updated: format_timestamp(vehicle.last_updated.as_deref()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleDetail {
    pub row: VehicleRow,
    pub driver_phone: String,
    pub destination: String,
    pub battery: String,
    pub battery_severity: LevelSeverity,
    pub fuel: String,
    pub fuel_severity: LevelSeverity,
}

impl VehicleDetail {
    pub fn from_vehicle(vehicle: &Vehicle) -> Self {
        Self {
            row: VehicleRow::from_vehicle(vehicle),
            driver_phone: format_phone(vehicle.driver_phone.as_deref()),
            destination: vehicle
                .destination
                .clone()
                .unwrap_or_else(|| "N/A".to_string()),
            battery: format_level(vehicle.battery_level),
            battery_severity: level_severity(LevelKind::Battery, vehicle.battery_level),
            fuel: format_level(vehicle.fuel_level),
            fuel_severity: level_severity(LevelKind::Fuel, vehicle.fuel_level),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsView {
    pub total_vehicles: u64,
    pub average_speed: f64,
    pub moving_vehicles: u64,
    pub last_updated: String,
}

impl From<&StatisticsSnapshot> for StatisticsView {
    fn from(stats: &StatisticsSnapshot) -> Self {
        Self {
            total_vehicles: stats.total_vehicles,
            average_speed: stats.average_speed,
            moving_vehicles: stats.moving_vehicles,
            last_updated: format_clock_time(stats.last_updated),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub filter: FilterState,
    pub load_state: LoadState,
    pub live: bool,
    pub vehicles: Vec<VehicleRow>,
    pub counts: StatusCounts,
    pub statistics: StatisticsView,
    pub seconds_since_update: u64,
    pub updated_ago: String,
    pub notification: Option<String>,
    pub selected: Option<VehicleDetail>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::vehicle::VehicleStatus;

    #[test]
    fn test_row_for_sparse_vehicle() {
        let row = VehicleRow::from_vehicle(&Vehicle::new("v9", VehicleStatus::Unknown));

        assert_eq!(row.status, "Unknown");
        assert_eq!(row.status_color, None);
        assert_eq!(row.speed, "0 mph");
        assert_eq!(row.location, "-");
        assert_eq!(row.last_updated, "-");
    }

    #[test]
    fn test_detail_levels() {
        let mut vehicle = Vehicle::new("v1", VehicleStatus::EnRoute);
        vehicle.battery_level = Some(64.0);
        vehicle.fuel_level = Some(22.0);
        vehicle.driver_phone = Some("4412345".to_string());

        let detail = VehicleDetail::from_vehicle(&vehicle);

        assert_eq!(detail.battery, "64%");
        assert_eq!(detail.battery_severity, LevelSeverity::Success);
        assert_eq!(detail.fuel_severity, LevelSeverity::Error);
        assert_eq!(detail.driver_phone, "+4412345");
        assert_eq!(detail.destination, "N/A");
        assert_eq!(detail.row.status, "EN ROUTE");
    }
}
