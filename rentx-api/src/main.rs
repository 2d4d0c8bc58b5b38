use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use chrono::Duration;
use rentx_api::{
    app,
    metrics::Metrics,
    notifier::ChatWebhookNotifier,
    state::{AppState, AuthConfig},
};
use rentx_core::{BookingRepository, BookingService, ChangeFeed, HoldPolicy, MemoryBookingRepository, StatusWatcher};
use rentx_store::{app_config::Config, ChangeListener, DbClient, PgBookingRepository, RedisClient};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rentx_api=debug,rentx_core=debug,rentx_store=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting Rent-X API on port {}", config.server.port);

    let feed = ChangeFeed::new();
    let shutdown = CancellationToken::new();
    let mut listener_task = None;

    // Postgres when configured, otherwise everything stays in this process
    let repo: Arc<dyn BookingRepository> = match config.database.url.as_deref() {
        Some(url) => {
            let db = DbClient::new(url, config.database.max_connections)
                .await
                .context("Failed to connect to Postgres")?;
            db.migrate().await.context("Failed to run migrations")?;
            let listener = ChangeListener::connect(&db.pool, feed.clone())
                .await
                .context("Failed to listen for booking changes")?;
            listener_task = Some(listener.spawn());
            Arc::new(PgBookingRepository::new(db.pool.clone()))
        }
        None => {
            tracing::warn!("No database configured, using the in-memory store");
            Arc::new(MemoryBookingRepository::new(feed.clone()))
        }
    };

    let redis = match config.redis.as_ref() {
        Some(redis) => Some(Arc::new(
            RedisClient::new(&redis.url).await.context("Failed to connect to Redis")?,
        )),
        None => None,
    };

    let policy = HoldPolicy {
        hold: Duration::minutes(config.business_rules.hold_minutes as i64),
        max_session_hours: config.business_rules.max_session_hours,
    };
    let bookings = BookingService::new(repo, policy);
    let watcher = Arc::new(
        StatusWatcher::spawn(bookings.clone(), feed.clone())
            .await
            .context("Failed to read initial status")?,
    );

    let app_state = AppState {
        bookings,
        watcher: watcher.clone(),
        notifier: Arc::new(ChatWebhookNotifier::new(config.chat.webhook_url.clone())),
        redis,
        rate_limit: config.rate_limit.clone(),
        auth: AuthConfig {
            admin_password: config.auth.admin_password.clone(),
            secret: config.auth.jwt_secret.clone(),
            expiration: config.auth.jwt_expiration_seconds,
        },
        messenger_page_id: config.chat.messenger_page_id.clone(),
        metrics: Arc::new(Metrics::new().context("Failed to register metrics")?),
        shutdown: shutdown.clone(),
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(shutdown))
    .await?;

    watcher.shutdown();
    if let Some(task) = listener_task {
        task.abort();
    }
    tracing::info!("Server shut down");
    Ok(())
}

async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
        tracing::info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                tracing::info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    // Ends open status streams
    token.cancel();
}
