//! # PartnerDesk API Server
//!
//! Account management backend: email and phone signup, cookie sessions,
//! allow-listed admin login and the partner invite flow.
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=postgresql://localhost/partnerdesk \
//! JWT_SECRET=$(openssl rand -hex 32) \
//! cargo run -p partnerdesk-api
//! ```

use partnerdesk_api::{
    app::{build_router, AppState},
    config::Config,
};
use partnerdesk_shared::{
    db::{
        migrations::run_migrations,
        pool::{close_pool, create_pool, DatabaseConfig},
    },
    mail::{LogMailer, Mailer, SmtpConfig, SmtpMailer},
    store::postgres::PgAccountStore,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_LOG_FILTER: &str = "partnerdesk_api=debug,partnerdesk_shared=debug,tower_http=debug";

fn init_tracing(production: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let registry = tracing_subscriber::registry().with(filter);

    if production {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn build_mailer(config: &Config) -> anyhow::Result<Arc<dyn Mailer>> {
    match &config.mail.smtp {
        Some(smtp) => {
            let mailer: Arc<dyn Mailer> = Arc::new(SmtpMailer::new(SmtpConfig {
                host: smtp.host.clone(),
                port: smtp.port,
                username: smtp.username.clone(),
                password: smtp.password.clone(),
                from: smtp.from.clone(),
            })?);
            Ok(mailer)
        }
        None => {
            tracing::warn!("SMTP_HOST not set, invite emails will only be logged");
            Ok(Arc::new(LogMailer))
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing(config.api.production);

    tracing::info!(
        "PartnerDesk API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let pool = create_pool(DatabaseConfig {
        max_connections: config.database.max_connections,
        ..DatabaseConfig::new(config.database.url.clone())
    })
    .await?;
    run_migrations(&pool).await?;

    let mailer = build_mailer(&config)?;
    let store = Arc::new(PgAccountStore::new(pool.clone()));
    let bind_address = config.bind_address();

    let app = build_router(AppState::new(config, store, mailer));

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    close_pool(pool).await;
    tracing::info!("Server stopped");

    Ok(())
}
