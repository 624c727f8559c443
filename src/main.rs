use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use farpay_core::adapters::PostgresTransactionStore;
use farpay_core::config::Config;
use farpay_core::gateway::GatewayClient;
use farpay_core::services::PaymentOrchestrator;
use farpay_core::{AppState, create_app};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Setup logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Database pool
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;

    // Run migrations
    let migrator = Migrator::new(Path::new("./migrations")).await?;
    migrator.run(&pool).await?;
    tracing::info!("Database migrations completed");

    let gateway = GatewayClient::new(
        config.pesapal_base_url.clone(),
        config.pesapal_consumer_key.clone(),
        config.pesapal_consumer_secret.clone(),
    );
    tracing::info!("Gateway client initialized with URL: {}", config.pesapal_base_url);

    // Register the IPN endpoint once per deployment, unless an existing
    // registration id was supplied.
    let notification_id = match config.pesapal_ipn_id.clone() {
        Some(ipn_id) => ipn_id,
        None => {
            let credential = gateway
                .acquire_credential()
                .await
                .map_err(|e| anyhow::anyhow!("failed to acquire gateway credential: {}", e))?;
            let registration = gateway
                .register_ipn(&credential, &config.ipn_callback_url())
                .await
                .map_err(|e| anyhow::anyhow!("failed to register IPN endpoint: {}", e))?;
            tracing::info!(ipn_id = %registration.ipn_id, "IPN endpoint registered");
            registration.ipn_id
        }
    };

    let store = Arc::new(PostgresTransactionStore::new(pool.clone()));
    let orchestrator = PaymentOrchestrator::new(
        store,
        gateway,
        config.public_base_url.clone(),
        notification_id,
    );

    let app = create_app(AppState {
        orchestrator: Arc::new(orchestrator),
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    tracing::info!("listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
