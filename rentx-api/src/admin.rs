use axum::{
    extract::{Extension, Query, State},
    routing::{get, post},
    Json, Router,
};
use rentx_core::Booking;
use serde::{Deserialize, Serialize};

use crate::{error::AppError, middleware::AdminClaims, state::AppState};

const DEFAULT_HISTORY: i64 = 20;
const MAX_HISTORY: i64 = 100;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct StartSessionRequest {
    pub hours: u32,
    pub contact: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CurrentSessionResponse {
    pub current: Option<Booking>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
}

// ============================================================================
// Handlers
// ============================================================================

/// Routes behind `admin_auth_middleware`
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/admin/session", get(current_session))
        .route("/admin/sessions", post(start_session))
        .route("/admin/force-stop", post(force_stop))
        .route("/admin/history", get(history))
}

/// GET /admin/session
async fn current_session(State(state): State<AppState>) -> Result<Json<CurrentSessionResponse>, AppError> {
    let current = state.bookings.current().await?;
    Ok(Json(CurrentSessionResponse { current }))
}

/// POST /admin/sessions
/// Manually lock the rig for a number of hours
async fn start_session(
    State(state): State<AppState>,
    Extension(claims): Extension<AdminClaims>,
    Json(req): Json<StartSessionRequest>,
) -> Result<Json<Booking>, AppError> {
    let booking = state.bookings.start_session(req.hours, req.contact).await?;
    tracing::info!("{} locked the rig for {}h (booking {})", claims.sub, req.hours, booking.id);
    Ok(Json(booking))
}

/// POST /admin/force-stop
/// End the current booking now
async fn force_stop(
    State(state): State<AppState>,
    Extension(claims): Extension<AdminClaims>,
) -> Result<Json<Booking>, AppError> {
    let booking = state.bookings.force_stop().await?;
    tracing::info!("{} force-stopped booking {}", claims.sub, booking.id);
    Ok(Json(booking))
}

/// GET /admin/history
async fn history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<Booking>>, AppError> {
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY).clamp(1, MAX_HISTORY);
    Ok(Json(state.bookings.history(limit).await?))
}
