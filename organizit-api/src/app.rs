/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use organizit_api::{app::AppState, config::Config};
/// use organizit_shared::payments::flutterwave::FlutterwaveClient;
/// use organizit_shared::store::MemoryStore;
/// use std::sync::Arc;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let processor = FlutterwaveClient::new(config.payment.flutterwave())?;
/// let state = AppState::new(Arc::new(MemoryStore::new()), Arc::new(processor), config);
/// let app = organizit_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, error::ApiError, middleware::security::SecurityHeadersLayer};
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{get, patch, post},
    Router,
};
use organizit_shared::auth::middleware::authenticate;
use organizit_shared::payments::{
    PaymentProcessor, UpgradeService, WebhookHandler, WebhookVerifier,
};
use organizit_shared::store::Store;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Uses Arc internally for cheap cloning.
#[derive(Clone)]
pub struct AppState {
    /// Users, tasks and pending upgrades
    pub store: Arc<dyn Store>,

    /// Initialize/Verify flow
    pub upgrades: UpgradeService,

    /// Processor notifications
    pub webhooks: Arc<WebhookHandler>,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Wires the upgrade flow and webhook handler onto `store` and `processor`
    pub fn new(
        store: Arc<dyn Store>,
        processor: Arc<dyn PaymentProcessor>,
        config: Config,
    ) -> Self {
        let settings = config.payment.upgrade_settings();
        let verifier = WebhookVerifier::new(config.payment.webhook_secret_hash.clone());
        let webhooks = WebhookHandler::new(store.clone(), verifier, settings.price);
        let upgrades = UpgradeService::new(store.clone(), processor, settings);

        Self {
            store,
            upgrades,
            webhooks: Arc::new(webhooks),
            config: Arc::new(config),
        }
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── /health                        # Health check (public)
/// └── /api/
///     ├── /tasks/                    # Task CRUD (authenticated)
///     │   ├── GET    /               # List
///     │   ├── POST   /               # Create (plan gated)
///     │   ├── GET    /:id
///     │   ├── PUT    /:id
///     │   ├── DELETE /:id
///     │   └── PATCH  /:id/toggle
///     ├── /user/                     # Account (authenticated)
///     │   ├── GET    /plan
///     │   ├── GET    /profile
///     │   └── PUT    /profile
///     └── /payment/
///         ├── POST   /initialize     # authenticated
///         ├── GET    /verify         # authenticated
///         └── POST   /webhook        # public, signature checked
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Logging (tower-http TraceLayer)
/// 2. Compression (gzip/br, negotiated)
/// 3. CORS (tower-http CorsLayer)
/// 4. Security headers
/// 5. Authentication (per-route basis)
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    // Health check (public, no auth)
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let task_routes = Router::new()
        .route(
            "/",
            get(routes::tasks::list_tasks).post(routes::tasks::create_task),
        )
        .route(
            "/:id",
            get(routes::tasks::get_task)
                .put(routes::tasks::update_task)
                .delete(routes::tasks::delete_task),
        )
        .route("/:id/toggle", patch(routes::tasks::toggle_task));

    let user_routes = Router::new()
        .route("/plan", get(routes::user::get_plan))
        .route(
            "/profile",
            get(routes::user::get_profile).put(routes::user::update_profile),
        );

    let payment_routes = Router::new()
        .route("/initialize", post(routes::payment::initialize))
        .route("/verify", get(routes::payment::verify));

    // Everything except the webhook requires a JWT
    let authenticated = Router::new()
        .nest("/tasks", task_routes)
        .nest("/user", user_routes)
        .nest("/payment", payment_routes)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    // Processor callbacks authenticate by shared-secret header instead
    let webhook_routes =
        Router::new().route("/payment/webhook", post(routes::payment::webhook));

    let api_routes = Router::new().merge(authenticated).merge(webhook_routes);

    Router::new()
        .merge(health_routes)
        .nest("/api", api_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CompressionLayer::new())
        .layer(cors_layer(&state.config.api.cors_origins))
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

/// CORS policy: permissive when no origins (or `*`) are configured
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
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
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}

/// JWT authentication middleware layer
///
/// Validates the bearer token and injects `AuthContext` into request
/// extensions.
async fn jwt_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_context = authenticate(req.headers(), state.jwt_secret())?;

    req.extensions_mut().insert(auth_context);

    Ok(next.run(req).await)
}
