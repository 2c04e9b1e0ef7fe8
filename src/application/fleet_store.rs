// In-memory fleet state: canonical set, filtered view and active filter
use crate::domain::fleet::{FilterState, StatusCounts};
use crate::domain::vehicle::{Vehicle, VehicleStatus};
use std::collections::HashSet;

#[derive(Debug, Default)]
pub struct FleetStore {
    vehicles: Vec<Vehicle>,
    filtered: Vec<Vehicle>,
    filter: FilterState,
}

impl FleetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the canonical collection wholesale. Ids stay unique: the first
    /// record for an id wins and later duplicates are dropped.
    pub fn replace_all(&mut self, vehicles: Vec<Vehicle>) {
        let incoming = vehicles.len();
        let mut seen = HashSet::with_capacity(incoming);
        let vehicles: Vec<Vehicle> = vehicles
            .into_iter()
            .filter(|vehicle| seen.insert(vehicle.id.clone()))
            .collect();

        if vehicles.len() != incoming {
            tracing::warn!(
                incoming,
                kept = vehicles.len(),
                "Dropped vehicles with duplicate ids"
            );
        }

        self.vehicles = vehicles;
    }

    /// Set the collection shown while a non-`all` filter is active.
    pub fn set_filtered(&mut self, vehicles: Vec<Vehicle>) {
        self.filtered = vehicles;
    }

    pub fn set_filter(&mut self, filter: FilterState) {
        self.filter = filter;
    }

    pub fn filter(&self) -> FilterState {
        self.filter
    }

    pub fn vehicles(&self) -> &[Vehicle] {
        &self.vehicles
    }

    /// What the user sees: the canonical set under `all`, the filtered
    /// collection otherwise.
    pub fn view(&self) -> &[Vehicle] {
        match self.filter {
            FilterState::All => &self.vehicles,
            _ => &self.filtered,
        }
    }

    pub fn counts_by_status(&self) -> StatusCounts {
        StatusCounts::from_vehicles(&self.vehicles)
    }

    /// Local subset of the canonical collection.
    pub fn select_by_status(&self, status: VehicleStatus) -> Vec<Vehicle> {
        self.vehicles
            .iter()
            .filter(|vehicle| vehicle.status == status)
            .cloned()
            .collect()
    }

    /// Look a vehicle up in the canonical set first, then the view.
    pub fn find(&self, id: &str) -> Option<&Vehicle> {
        self.vehicles
            .iter()
            .chain(self.filtered.iter())
            .find(|vehicle| vehicle.id == id)
    }
}
