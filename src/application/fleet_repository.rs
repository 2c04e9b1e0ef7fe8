// Repository trait for fleet data access
use crate::application::errors::FetchError;
use crate::domain::fleet::ServerStatistics;
use crate::domain::vehicle::{Vehicle, VehicleStatus};
use async_trait::async_trait;

#[async_trait]
pub trait FleetRepository: Send + Sync {
    /// Full current vehicle set (`GET /api/vehicles`)
    async fn list_vehicles(&self) -> Result<Vec<Vehicle>, FetchError>;

    /// Detail record for one vehicle; `None` when the server returns an empty record
    async fn get_vehicle(&self, id: &str) -> Result<Option<Vehicle>, FetchError>;

    /// Server-side filtered set
    async fn list_vehicles_by_status(
        &self,
        status: VehicleStatus,
    ) -> Result<Vec<Vehicle>, FetchError>;

    async fn get_statistics(&self) -> Result<ServerStatistics, FetchError>;
}
