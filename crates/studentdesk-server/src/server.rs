use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    extract::{DefaultBodyLimit, FromRef, State},
    http::HeaderValue,
    middleware,
    response::Redirect,
    routing::{get, post},
};
use studentdesk_auth::{AuthState, IdentityService, renew_session_cookie};
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::bootstrap::{self, Backends};
use crate::cache::StudentCache;
use crate::config::AppConfig;
use crate::handlers::{account, health, student, users};
use crate::middleware::{self as app_middleware, HttpsRedirect};
use crate::service::StudentService;

// =============================================================================
// Application State
// =============================================================================

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub students: StudentService,
    pub cache: StudentCache,
    pub identity: IdentityService,
    pub auth: AuthState,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(config: AppConfig, backends: Backends) -> Self {
        Self {
            students: StudentService::new(backends.students),
            cache: StudentCache::from_config(&config.cache),
            identity: IdentityService::new(
                backends.users,
                backends.roles,
                config.auth.password.clone(),
            ),
            auth: AuthState::new(config.auth.cookie.clone()),
            config: Arc::new(config),
        }
    }
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}

// =============================================================================
// Router
// =============================================================================

pub fn build_app(state: AppState) -> Router {
    let cfg = state.config.clone();
    let auth = state.auth.clone();

    let mut app = Router::new()
        .route("/healthz", get(health::healthz))
        // Students
        .route("/Student/StudentDashboard", get(student::dashboard))
        .route("/Student/Index", get(student::index))
        .route(
            "/Student/Create",
            get(student::create_form).post(student::create),
        )
        .route("/Student/Edit/{id}", get(student::edit_form))
        .route("/Student/Edit", post(student::edit))
        .route(
            "/Student/Delete/{id}",
            get(student::delete_confirm).post(student::delete),
        )
        // Users and roles
        .route("/Users/UserLists", get(users::user_lists))
        .route("/Users/Create", get(users::create_form).post(users::create))
        // Account
        .route(
            "/Account/Login",
            get(account::login_form).post(account::login),
        )
        .route("/Account/Logout", post(account::logout))
        .route("/Account/AccessDenied", get(account::access_denied))
        .fallback(fallback)
        .layer(middleware::from_fn_with_state(auth, renew_session_cookie))
        .with_state(state);

    if cfg.https_redirect_enabled() {
        app = app.layer(middleware::from_fn_with_state(
            HttpsRedirect {
                https_port: cfg.server.https_port,
            },
            app_middleware::https_redirect,
        ));
    }

    // Middleware stack, innermost first: cookie renewal, https redirect, request id, cors, compression, trace, body limit
    app.layer(middleware::from_fn(app_middleware::request_id))
        .layer(cors_layer(&cfg.server.cors_allow_origins))
        .layer(CompressionLayer::new())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    use tracing::field::Empty;
                    let req_id = req
                        .headers()
                        .get(app_middleware::REQUEST_ID_HEADER)
                        .or_else(|| req.extensions().get::<HeaderValue>())
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("")
                        .to_string();
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri(),
                        http.status_code = Empty,
                        request_id = %req_id
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        span.record(
                            "http.status_code",
                            tracing::field::display(res.status().as_u16()),
                        );
                        tracing::info!(
                            http.status = %res.status().as_u16(),
                            elapsed_ms = %latency.as_millis(),
                            "request handled"
                        );
                    },
                ),
        )
        .layer(DefaultBodyLimit::max(cfg.server.body_limit_bytes))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new().allow_origin(AllowOrigin::list(allowed))
}

/// Unknown routes land on the sign-in page.
async fn fallback(State(state): State<AppState>) -> Redirect {
    Redirect::to(&state.auth.cookie.login_path)
}

// =============================================================================
// Server
// =============================================================================

pub struct StudentDeskServer {
    addr: SocketAddr,
    app: Router,
}

pub struct ServerBuilder {
    addr: SocketAddr,
    config: AppConfig,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        let cfg = AppConfig::default();
        Self {
            addr: cfg.addr(),
            config: cfg,
        }
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.addr = cfg.addr();
        self.config = cfg;
        self
    }

    /// Opens the configured stores, seeds roles and the bootstrap admin,
    /// and assembles the router.
    pub async fn build(self) -> anyhow::Result<StudentDeskServer> {
        let backends = bootstrap::init_backends(&self.config).await?;
        let state = AppState::new(self.config, backends);

        if let Err(e) = bootstrap::seed_identity(&state.identity, &state.config.bootstrap).await {
            tracing::error!(error = %e, "Identity seeding failed");
        }

        Ok(StudentDeskServer {
            addr: self.addr,
            app: build_app(state),
        })
    }
}

impl StudentDeskServer {
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install SIGTERM handler");
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
    tracing::info!("shutdown signal received");
}
