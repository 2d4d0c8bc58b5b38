use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use rentx_core::package::{chat_link, Package};
use serde::{Deserialize, Serialize};

use crate::{error::AppError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub package: String,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub url: String,
    pub package: Package,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/packages", get(list_packages))
        .route("/api/checkout", post(checkout))
}

/// GET /api/packages
async fn list_packages() -> Json<&'static [Package]> {
    Json(Package::catalog())
}

/// POST /api/checkout
/// Deep link into the operator's chat with the order pre-typed
async fn checkout(
    State(state): State<AppState>,
    Json(req): Json<CheckoutRequest>,
) -> Result<Json<CheckoutResponse>, AppError> {
    let package = Package::find(&req.package)
        .ok_or_else(|| AppError::ValidationError(format!("Unknown package: {}", req.package)))?;

    Ok(Json(CheckoutResponse {
        url: chat_link(&state.messenger_page_id, &package),
        package,
    }))
}
