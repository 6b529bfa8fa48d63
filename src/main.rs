use spacematch::{
    config::AppConfig, notification::email_sender_from_config, oauth::OAuthProviders, router,
    AppState,
};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "spacematch=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting spacematch server");

    let config = AppConfig::from_env();
    let bind_addr = config.bind_addr.clone();
    let email_sender = email_sender_from_config(&config);
    let oauth_providers = OAuthProviders::from_config(&config);
    info!(providers = ?oauth_providers.names(), "OAuth providers configured");

    // PostgreSQL when DATABASE_URL is set, in-memory repositories otherwise
    let app_state = match config.database_url.clone() {
        Some(database_url) => {
            let pool = match sqlx::PgPool::connect(&database_url).await {
                Ok(pool) => pool,
                Err(e) => {
                    error!(error = %e, "Failed to connect to database");
                    return;
                }
            };
            if let Err(e) = sqlx::migrate!("./migrations").run(&pool).await {
                error!(error = %e, "Failed to run database migrations");
                return;
            }
            info!("Connected to PostgreSQL and applied migrations");
            AppState::postgres(config, pool, email_sender, oauth_providers)
        }
        None => {
            warn!("DATABASE_URL not set, using in-memory repositories");
            AppState::in_memory(config, email_sender, oauth_providers)
        }
    };

    match app_state.session_service.cleanup_expired_sessions().await {
        Ok(removed) => info!(removed, "Removed expired sessions"),
        Err(e) => warn!(error = %e, "Failed to clean up expired sessions"),
    }

    let app = router(app_state);

    let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(error = %e, bind_addr = %bind_addr, "Failed to bind");
            return;
        }
    };
    info!("Server running on http://{}", bind_addr);
    if let Err(e) = axum::serve(listener, app).await {
        error!(error = %e, "Server error");
    }
}
