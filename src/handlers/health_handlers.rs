//! Health endpoints.
//!
//! - `GET /health` on the gateway reports object-store connectivity. It is
//!   always 200; a failed check shows up as `"status": "degraded"`.
//! - `GET /health` on the analytics worker is a cheap liveness check.

use crate::{models::gateway::HealthReport, services::gateway_service::GatewayService};
use axum::{Json, extract::State};
use serde::Serialize;

pub const ANALYTICS_SERVICE_NAME: &str = "analytics";

#[derive(Serialize)]
pub struct LivenessResponse {
    status: &'static str,
    service: &'static str,
}

pub async fn gateway_health(State(service): State<GatewayService>) -> Json<HealthReport> {
    Json(service.health().await)
}

pub async fn analytics_health() -> Json<LivenessResponse> {
    Json(LivenessResponse {
        status: "healthy",
        service: ANALYTICS_SERVICE_NAME,
    })
}
