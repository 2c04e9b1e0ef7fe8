// REST repository implementation for the fleet API
use crate::application::errors::FetchError;
use crate::application::fleet_repository::FleetRepository;
use crate::domain::fleet::ServerStatistics;
use crate::domain::vehicle::{Vehicle, VehicleStatus};
use anyhow::Context;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct HttpFleetRepository {
    base_url: String,
    client: reqwest::Client,
}

/// `{ "data": ... }` wrapper used by the vehicle endpoints.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

impl HttpFleetRepository {
    pub fn new(base_url: &str, request_timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, FetchError> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(endpoint = path, "GET");

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| transport_error(path, e))?;

        if !response.status().is_success() {
            return Err(FetchError::Status {
                endpoint: path.to_string(),
                status: response.status().as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|e| transport_error(path, e))?;
        serde_json::from_slice(&body).map_err(|e| FetchError::Decode {
            endpoint: path.to_string(),
            message: e.to_string(),
        })
    }
}

fn transport_error(endpoint: &str, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            endpoint: endpoint.to_string(),
        }
    } else {
        FetchError::Transport {
            endpoint: endpoint.to_string(),
            message: error.to_string(),
        }
    }
}

#[async_trait]
impl FleetRepository for HttpFleetRepository {
    async fn list_vehicles(&self) -> Result<Vec<Vehicle>, FetchError> {
        let envelope: Envelope<Vec<Vehicle>> = self.get_json("/api/vehicles").await?;
        Ok(envelope.data)
    }

    async fn get_vehicle(&self, id: &str) -> Result<Option<Vehicle>, FetchError> {
        let path = format!("/api/vehicles/{}", urlencoding::encode(id));
        let envelope: Envelope<Option<serde_json::Value>> = self.get_json(&path).await?;

        match envelope.data {
            None => Ok(None),
            Some(serde_json::Value::Object(fields)) if fields.is_empty() => Ok(None),
            Some(record) => serde_json::from_value(record)
                .map(Some)
                .map_err(|e| FetchError::Decode {
                    endpoint: path,
                    message: e.to_string(),
                }),
        }
    }

    async fn list_vehicles_by_status(
        &self,
        status: VehicleStatus,
    ) -> Result<Vec<Vehicle>, FetchError> {
        let path = format!("/api/vehicles/status/{}", urlencoding::encode(status.as_key()));
        let envelope: Envelope<Vec<Vehicle>> = self.get_json(&path).await?;
        Ok(envelope.data)
    }

    async fn get_statistics(&self) -> Result<ServerStatistics, FetchError> {
        self.get_json("/api/statistics").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Path;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::{json, Value};

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}/", addr)
    }

    async fn fleet_api() -> String {
        let router = Router::new()
            .route(
                "/api/vehicles",
                get(|| async {
                    Json(json!({ "data": [
                        {
                            "id": "v1",
                            "status": "idle",
                            "currentLocation": { "lat": 1.5, "lng": 2.5 }
                        },
                        { "id": 2, "status": "en_route" }
                    ]}))
                }),
            )
            .route(
                "/api/vehicles/:id",
                get(|Path(id): Path<String>| async move {
                    match id.as_str() {
                        "v1" => Json(json!({
                            "data": { "id": "v1", "status": "idle", "fuelLevel": 40 }
                        })),
                        _ => Json(json!({ "data": {} })),
                    }
                }),
            )
            .route(
                "/api/vehicles/status/:status",
                get(|Path(status): Path<String>| async move {
                    Json(json!({ "data": [{ "id": "s1", "status": status }] }))
                }),
            )
            .route(
                "/api/statistics",
                get(|| async {
                    Json(json!({ "totalVehicles": 12, "averageSpeed": 31.4, "movingVehicles": 7 }))
                }),
            );
        serve(router).await
    }

    #[tokio::test]
    async fn test_list_vehicles() {
        let base = fleet_api().await;
        let repository = HttpFleetRepository::new(&base, Duration::from_secs(5)).unwrap();

        let vehicles = repository.list_vehicles().await.unwrap();

        assert_eq!(vehicles.len(), 2);
        assert_eq!(vehicles[1].id, "2");
        assert_eq!(vehicles[1].status, VehicleStatus::EnRoute);
    }

    #[tokio::test]
    async fn test_vehicle_detail_and_empty_record() {
        let base = fleet_api().await;
        let repository = HttpFleetRepository::new(&base, Duration::from_secs(5)).unwrap();

        let detail = repository.get_vehicle("v1").await.unwrap().unwrap();
        assert_eq!(detail.fuel_level, Some(40.0));

        assert_eq!(repository.get_vehicle("nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_filtered_fetch_uses_status_path() {
        let base = fleet_api().await;
        let repository = HttpFleetRepository::new(&base, Duration::from_secs(5)).unwrap();

        let vehicles = repository
            .list_vehicles_by_status(VehicleStatus::Delivered)
            .await
            .unwrap();

        assert_eq!(vehicles.len(), 1);
        assert_eq!(vehicles[0].status, VehicleStatus::Delivered);
    }

    #[tokio::test]
    async fn test_statistics() {
        let base = fleet_api().await;
        let repository = HttpFleetRepository::new(&base, Duration::from_secs(5)).unwrap();

        let stats = repository.get_statistics().await.unwrap();

        assert_eq!(stats.total_vehicles, Some(12));
        assert_eq!(stats.moving_vehicles, Some(7));
        assert_eq!(stats.last_updated, None);
    }

    #[tokio::test]
    async fn test_error_status_and_wrong_shape() {
        let router = Router::new()
            .route(
                "/api/vehicles",
                get(|| async { Json(json!({ "data": { "not": "a list" } })) }),
            )
            .route(
                "/api/statistics",
                get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, Json(Value::Null)) }),
            );
        let base = serve(router).await;
        let repository = HttpFleetRepository::new(&base, Duration::from_secs(5)).unwrap();

        assert!(matches!(
            repository.list_vehicles().await,
            Err(FetchError::Decode { .. })
        ));
        assert!(matches!(
            repository.get_statistics().await,
            Err(FetchError::Status { status: 500, .. })
        ));
    }

    #[tokio::test]
    async fn test_request_timeout() {
        let router = Router::new().route(
            "/api/vehicles",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Json(json!({ "data": [] }))
            }),
        );
        let base = serve(router).await;
        let repository = HttpFleetRepository::new(&base, Duration::from_millis(100)).unwrap();

        assert!(matches!(
            repository.list_vehicles().await,
            Err(FetchError::Timeout { .. })
        ));
    }
}
