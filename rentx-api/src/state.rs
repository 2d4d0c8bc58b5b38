use std::sync::Arc;

use rentx_core::{BookingService, StatusWatcher};
use rentx_store::app_config::RateLimitConfig;
use rentx_store::RedisClient;
use tokio_util::sync::CancellationToken;

use crate::metrics::Metrics;
use crate::notifier::PaymentNotifier;

#[derive(Clone)]
pub struct AuthConfig {
    pub admin_password: String,
    pub secret: String,
    pub expiration: u64,
}

#[derive(Clone)]
pub struct AppState {
    pub bookings: BookingService,
    pub watcher: Arc<StatusWatcher>,
    pub notifier: Arc<dyn PaymentNotifier>,
    pub redis: Option<Arc<RedisClient>>,
    pub rate_limit: RateLimitConfig,
    pub auth: AuthConfig,
    pub messenger_page_id: String,
    pub metrics: Arc<Metrics>,
    /// Cancelled when the server starts shutting down; ends open SSE streams.
    pub shutdown: CancellationToken,
}
