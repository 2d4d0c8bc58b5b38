use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    routing::post,
    Json, Router,
};
use rentx_core::Package;
use serde_json::{json, Value};

use crate::{
    error::AppError,
    notifier::{PaymentNotice, Slip},
    state::AppState,
};

const MAX_SLIP_BYTES: usize = 10 * 1024 * 1024;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/notify", post(notify_payment))
        .layer(DefaultBodyLimit::max(MAX_SLIP_BYTES))
}

/// Known package codes are expanded to their full description.
fn package_label(raw: &str) -> String {
    Package::find(raw)
        .map(|p| p.describe())
        .unwrap_or_else(|| raw.to_string())
}

/// POST /api/notify
/// Multipart form: `contact`, `package`, `slip`
async fn notify_payment(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<Value>, AppError> {
    let mut contact = String::new();
    let mut package = String::new();
    let mut slip = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::ValidationError(e.body_text()))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("contact") => {
                contact = field.text().await.map_err(|e| AppError::ValidationError(e.body_text()))?;
            }
            Some("package") => {
                package = field.text().await.map_err(|e| AppError::ValidationError(e.body_text()))?;
            }
            Some("slip") => {
                let file_name = field.file_name().unwrap_or("slip").to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map_err(|e| AppError::ValidationError(e.body_text()))?;
                slip = Some(Slip { file_name, content_type, bytes: bytes.to_vec() });
            }
            _ => {}
        }
    }

    let slip = slip.ok_or_else(|| AppError::ValidationError("No file uploaded".to_string()))?;

    let notice = PaymentNotice {
        contact,
        package: package_label(&package),
        slip,
    };

    match state.notifier.notify(notice).await {
        Ok(()) => {
            state.metrics.notifications.with_label_values(&["sent"]).inc();
            Ok(Json(json!({ "success": true })))
        }
        Err(e) => {
            state.metrics.notifications.with_label_values(&["failed"]).inc();
            Err(AppError::NotificationError(format!("{:#}", e)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_package_label() {
        assert_eq!(package_label("7h"), "7 hours (55 THB)");
        assert_eq!(package_label("custom deal"), "custom deal");
    }
}
