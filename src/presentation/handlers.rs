// HTTP request handlers
use crate::domain::dashboard::{DashboardView, VehicleDetail};
use crate::domain::fleet::FilterState;
use crate::presentation::app_state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Current reconciled view
pub async fn fleet_view(State(state): State<Arc<AppState>>) -> Json<DashboardView> {
    Json(state.controller.snapshot().await)
}

/// Switch the status filter; `all` is served locally
pub async fn change_filter(
    Path(status): Path<String>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let filter = match status.parse::<FilterState>() {
        Ok(filter) => filter,
        Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    };

    state.controller.change_filter(filter).await;
    Json(state.controller.snapshot().await).into_response()
}

pub async fn refresh_fleet(State(state): State<Arc<AppState>>) -> Json<DashboardView> {
    state.controller.refresh().await;
    Json(state.controller.snapshot().await)
}

pub async fn dismiss_notification(State(state): State<Arc<AppState>>) -> StatusCode {
    state.controller.dismiss_notification().await;
    StatusCode::NO_CONTENT
}

/// Open the detail view for one vehicle
pub async fn vehicle_detail(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    match state.controller.select_vehicle(&id).await {
        Some(vehicle) => Json(VehicleDetail::from_vehicle(&vehicle)).into_response(),
        None => (StatusCode::NOT_FOUND, format!("vehicle {} not found", id)).into_response(),
    }
}

pub async fn close_detail(State(state): State<Arc<AppState>>) -> StatusCode {
    state.controller.close_detail().await;
    StatusCode::NO_CONTENT
}
