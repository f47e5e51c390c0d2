/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use partnerdesk_api::{app::AppState, config::Config};
/// use partnerdesk_shared::{mail::LogMailer, store::memory::MemoryAccountStore};
/// use std::sync::Arc;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let state = AppState::new(config, Arc::new(MemoryAccountStore::new()), Arc::new(LogMailer));
/// let app = partnerdesk_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, routes};
use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use partnerdesk_shared::{
    auth::{
        admin::AdminBootstrap,
        cookie::CookiePolicy,
        jwt::{TokenLifetimes, TokenService},
        middleware::{require_admin, require_session, AuthGuard},
    },
    invite::InviteManager,
    mail::Mailer,
    store::AccountStore,
};
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Every field is cheap to clone.
#[derive(Clone)]
pub struct AppState {
    /// Account persistence
    pub store: Arc<dyn AccountStore>,

    /// Token issuance and verification
    pub tokens: TokenService,

    /// Session and admin guards
    pub guard: AuthGuard,

    /// Allow-listed admin login
    pub admin: AdminBootstrap,

    /// Invite issuance and redemption
    pub invites: Arc<InviteManager>,

    /// Attributes for credential cookies
    pub cookies: CookiePolicy,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Creates application state with the default token lifetimes
    pub fn new(config: Config, store: Arc<dyn AccountStore>, mailer: Arc<dyn Mailer>) -> Self {
        Self::with_lifetimes(config, store, mailer, TokenLifetimes::default())
    }

    pub fn with_lifetimes(
        config: Config,
        store: Arc<dyn AccountStore>,
        mailer: Arc<dyn Mailer>,
        lifetimes: TokenLifetimes,
    ) -> Self {
        let tokens = TokenService::new(config.jwt.secret.clone(), lifetimes);

        let guard = AuthGuard::new(store.clone(), tokens.clone());
        let admin = AdminBootstrap::new(&config.admin.emails, store.clone(), tokens.clone());
        let invites = Arc::new(InviteManager::new(
            store.clone(),
            tokens.clone(),
            mailer,
            config.mail.frontend_url.clone(),
        ));

        Self {
            store,
            tokens,
            guard,
            admin,
            invites,
            cookies: CookiePolicy::for_environment(config.api.production),
            config: Arc::new(config),
        }
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── GET  /health                  # Health check (public)
/// ├── POST /signup, /signup/email   # Public
/// ├── POST /signup/phone            # Public
/// ├── POST /login                   # Public
/// ├── POST /setup-partner           # Public, invite token in body
/// ├── POST /logout                  # Session cookie
/// ├── GET  /profile                 # Session cookie
/// ├── POST /admin/login             # Public, allow-list
/// └── /admin/...                    # Admin cookie
///     ├── POST  /logout
///     ├── GET   /verify
///     ├── POST  /account, /accounts
///     ├── POST  /invite-partner
///     └── GET/PATCH/PUT /partner/:id
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Logging (tower-http TraceLayer)
/// 2. CORS (tower-http CorsLayer)
/// 3. Session or admin guard (per sub-router)
pub fn build_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/signup", post(routes::auth::signup))
        .route("/signup/email", post(routes::auth::signup))
        .route("/signup/phone", post(routes::auth::signup_phone))
        .route("/login", post(routes::auth::login))
        .route("/setup-partner", post(routes::auth::setup_partner))
        .route("/admin/login", post(routes::admin::admin_login));

    let session_routes = Router::new()
        .route("/logout", post(routes::auth::logout))
        .route("/profile", get(routes::auth::profile))
        .layer(middleware::from_fn_with_state(
            state.guard.clone(),
            require_session,
        ));

    let admin_routes = Router::new()
        .route("/admin/logout", post(routes::admin::admin_logout))
        .route("/admin/verify", get(routes::admin::admin_verify))
        .route("/admin/account", post(routes::admin::list_accounts))
        .route("/admin/accounts", post(routes::admin::list_accounts))
        .route("/admin/invite-partner", post(routes::admin::invite_partner))
        .route(
            "/admin/partner/:id",
            get(routes::admin::get_partner)
                .patch(routes::admin::patch_partner)
                .put(routes::admin::put_partner),
        )
        .layer(middleware::from_fn_with_state(
            state.guard.clone(),
            require_admin,
        ));

    let cors = cors_layer(&state.config.api.cors_origins);

    Router::new()
        .merge(public_routes)
        .merge(session_routes)
        .merge(admin_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .with_state(state)
}

/// Permissive when the origin list contains `*`; otherwise credentialed
/// requests from the listed origins only
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|origin| origin == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring unparsable CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}
