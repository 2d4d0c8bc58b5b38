use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use chrono::{DateTime, Utc};
use rentx_core::CoreError;
use serde::Serialize;
use uuid::Uuid;

use crate::state::AppState;

pub const OCCUPIED_MESSAGE: &str = "Just missed it! Someone else reserved the rig a moment ago.";
pub const HOLD_FAILED_MESSAGE: &str = "Could not reserve the rig right now. Please try again.";

#[derive(Debug, Serialize)]
pub struct HoldResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl HoldResponse {
    fn failed(message: impl Into<String>) -> Self {
        Self { success: false, message: Some(message.into()), booking_id: None, expires_at: None }
    }
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/hold", post(create_hold))
}

/// POST /api/hold
/// Lock the rig for a few minutes while the customer pays
async fn create_hold(State(state): State<AppState>) -> Response {
    match state.bookings.hold().await {
        Ok(booking) => {
            state.metrics.holds.with_label_values(&["granted"]).inc();
            let body = HoldResponse {
                success: true,
                message: None,
                booking_id: Some(booking.id),
                expires_at: Some(booking.end_time),
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(CoreError::Occupied { .. }) => {
            state.metrics.holds.with_label_values(&["conflict"]).inc();
            (StatusCode::CONFLICT, Json(HoldResponse::failed(OCCUPIED_MESSAGE))).into_response()
        }
        Err(e) => {
            state.metrics.holds.with_label_values(&["error"]).inc();
            tracing::error!("Hold failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, Json(HoldResponse::failed(HOLD_FAILED_MESSAGE))).into_response()
        }
    }
}
