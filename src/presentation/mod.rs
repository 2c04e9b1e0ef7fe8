// Presentation layer - JSON surface over the reconciled fleet view
pub mod app_state;
pub mod handlers;

use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    change_filter, close_detail, dismiss_notification, fleet_view, health_check, refresh_fleet,
    vehicle_detail,
};
use axum::routing::{delete, get, post, put};
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .route("/fleet", get(fleet_view))
        .route("/fleet/filter/:status", put(change_filter))
        .route("/fleet/refresh", post(refresh_fleet))
        .route("/fleet/notification", delete(dismiss_notification))
        .route("/vehicles/selected", delete(close_detail))
        .route("/vehicles/:id", get(vehicle_detail))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
