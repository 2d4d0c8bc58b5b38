use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
};
use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

use crate::state::AppState;

pub struct Metrics {
    registry: Registry,
    pub holds: IntCounterVec,
    pub notifications: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let holds = IntCounterVec::new(
            Opts::new("rentx_holds_total", "Hold requests by outcome"),
            &["outcome"],
        )?;
        let notifications = IntCounterVec::new(
            Opts::new("rentx_payment_notifications_total", "Payment notices forwarded to chat"),
            &["result"],
        )?;

        registry.register(Box::new(holds.clone()))?;
        registry.register(Box::new(notifications.clone()))?;

        Ok(Self { registry, holds, notifications })
    }

    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// GET /metrics
pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    match state.metrics.render() {
        Ok(body) => (StatusCode::OK, [(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body).into_response(),
        Err(e) => {
            tracing::error!("Failed to render metrics: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_includes_counters() {
        let metrics = Metrics::new().unwrap();
        metrics.holds.with_label_values(&["granted"]).inc();
        let text = metrics.render().unwrap();
        assert!(text.contains("rentx_holds_total{outcome=\"granted\"} 1"));
    }
}
