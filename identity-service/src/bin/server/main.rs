use std::sync::Arc;

use auth::Authenticator;
use auth::SystemClock;
use identity_service::config::Config;
use identity_service::inbound::http::router::create_router;
use identity_service::repositories::InMemoryRefreshTokenRepository;
use identity_service::repositories::InMemoryUserRepository;
use identity_service::repositories::PostgresRefreshTokenRepository;
use identity_service::repositories::PostgresUserRepository;
use identity_service::session::ports::SessionServicePort;
use identity_service::session::service::SessionService;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "identity_service=debug,auth=info,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        service = "identity-service",
        version = env!("CARGO_PKG_VERSION"),
        "Service starting"
    );

    let config = Config::load()?;

    tracing::info!(
        run_mode = ?config.run_mode,
        http_port = config.server.http_port,
        issuer = %config.jwt.issuer,
        access_token_ttl_seconds = config.jwt.access_token_ttl_seconds,
        refresh_token_ttl_days = config.session.refresh_token_ttl_days,
        store_timeout_ms = config.session.store_timeout_ms,
        "Configuration loaded"
    );

    let authenticator = Arc::new(
        Authenticator::new(
            &config.signing_secret()?,
            config.token_settings(),
            Arc::new(SystemClock),
        )
        .with_password_hasher(config.password_hasher()?),
    );

    match config.database.url.as_deref() {
        Some(database_url) => {
            let pg_pool = PgPoolOptions::new()
                .max_connections(config.database.max_connections)
                .connect(database_url)
                .await?;
            tracing::info!(
                max_connections = config.database.max_connections,
                database = "postgresql",
                "Database connection pool created"
            );

            sqlx::migrate!("./migrations").run(&pg_pool).await?;
            tracing::info!(database = "postgresql", "Database migrations completed");

            let session_service = SessionService::new(
                Arc::new(PostgresUserRepository::new(pg_pool.clone())),
                Arc::new(PostgresRefreshTokenRepository::new(pg_pool)),
                Arc::clone(&authenticator),
            )
            .with_store_timeout(config.store_timeout());

            serve(&config, Arc::new(session_service), authenticator).await
        }
        None => {
            tracing::warn!("database.url is not set; sessions are kept in memory");

            let session_service = SessionService::new(
                Arc::new(InMemoryUserRepository::new()),
                Arc::new(InMemoryRefreshTokenRepository::new()),
                Arc::clone(&authenticator),
            )
            .with_store_timeout(config.store_timeout());

            serve(&config, Arc::new(session_service), authenticator).await
        }
    }
}

async fn serve<S: SessionServicePort>(
    config: &Config,
    session_service: Arc<S>,
    authenticator: Arc<Authenticator>,
) -> Result<(), anyhow::Error> {
    let http_address = format!("0.0.0.0:{}", config.server.http_port);
    let http_listener = tokio::net::TcpListener::bind(&http_address).await?;
    tracing::info!(
        address = %http_address,
        port = config.server.http_port,
        protocol = "http",
        "Http server listening"
    );

    let http_application = create_router(session_service, authenticator, config.request_timeout());

    axum::serve(http_listener, http_application)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server exited successfully");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
