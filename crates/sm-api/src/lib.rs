use std::env;
use std::net::{IpAddr, SocketAddr};
use std::num::NonZeroU32;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::{
    Router,
    body::Body,
    extract::DefaultBodyLimit,
    extract::State,
    extract::connect_info::ConnectInfo,
    http::Method,
    http::Request,
    http::header::{CONTENT_TYPE, HeaderName, HeaderValue},
    middleware,
    middleware::Next,
    response::Response,
    routing::{get, post},
};
use clap::{Parser, ValueEnum};
use dotenvy::dotenv;
use governor::{
    Quota, RateLimiter, clock::DefaultClock, middleware::NoOpMiddleware,
    state::keyed::DashMapStateStore,
};
use sm_common::db::{MemoryStore, PgStore, StaffingStore, create_pool_from_url_checked, run_migrations};
use sm_common::logging::{init_tracing_subscriber, install_tracing_panic_hook};
use sm_common::{Staffing, StaffingOptions};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::info;

pub mod error;
pub mod extract;
pub mod handlers;

use error::ApiError;
use handlers::{dictionaries, employees, health, projects, requests};

const SHUTDOWN_DRAIN_GRACE: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl StorageBackend {
    pub fn as_str(self) -> &'static str {
        match self {
            StorageBackend::Postgres => "postgres",
            StorageBackend::Memory => "memory",
        }
    }
}

#[derive(Debug, Clone, Parser)]
#[command(name = "sm-api", about = "Staffing management HTTP API")]
struct Cli {
    /// Storage backend: postgres | memory
    #[arg(long, env = "SM_STORAGE", default_value = "postgres", value_enum)]
    storage: StorageBackend,

    /// PostgreSQL connection string (required for the postgres backend)
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Server port
    #[arg(long, env = "PORT", default_value_t = 3000)]
    port: u16,

    /// Comma separated list of allowed CORS origins
    #[arg(long, env = "SM_CORS_ORIGINS", default_value = "http://localhost:5173")]
    cors_origins: String,

    /// Directory with `<dictionary>.json` seed files
    #[arg(long, env = "SM_SEED_DIR", default_value = "seed-data")]
    seed_dir: PathBuf,

    /// Check request vocabulary fields against seeded dictionaries
    #[arg(
        long,
        env = "SM_DICTIONARY_VALIDATION",
        default_value_t = true,
        action = clap::ArgAction::Set
    )]
    dictionary_validation: bool,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub storage: StorageBackend,
    pub database_url: Option<String>,
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub seed_dir: PathBuf,
    pub dictionary_validation: bool,
}

type IpRateLimiter = RateLimiter<IpAddr, DashMapStateStore<IpAddr>, DefaultClock, NoOpMiddleware>;

#[derive(Clone)]
pub struct RateLimits {
    global: Arc<IpRateLimiter>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub per_sec: u64,
    pub burst: u32,
}

impl RateLimitConfig {
    fn parse_env<T: std::str::FromStr + PartialOrd + Default>(name: &str) -> Option<T> {
        env::var(name)
            .ok()
            .and_then(|value| value.parse::<T>().ok())
            .filter(|value| *value > T::default())
    }

    fn from_env() -> Self {
        Self {
            per_sec: Self::parse_env("SM_RATE_LIMIT_PER_SEC").unwrap_or(50),
            burst: Self::parse_env("SM_RATE_LIMIT_BURST").unwrap_or(100),
        }
    }
}

impl AppConfig {
    fn from_cli(cli: Cli) -> Result<Self, ApiError> {
        let cors_origins = cli
            .cors_origins
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect::<Vec<_>>();

        if cors_origins.iter().any(|origin| origin == "*") {
            return Err(ApiError::BadRequest(
                "SM_CORS_ORIGINS must list explicit origins".into(),
            ));
        }

        if cli.storage == StorageBackend::Postgres && cli.database_url.is_none() {
            return Err(ApiError::BadRequest(
                "DATABASE_URL is required when SM_STORAGE=postgres".into(),
            ));
        }

        Ok(Self {
            storage: cli.storage,
            database_url: cli.database_url,
            port: cli.port,
            cors_origins,
            seed_dir: cli.seed_dir,
            dictionary_validation: cli.dictionary_validation,
        })
    }

    pub fn for_tests() -> Self {
        Self {
            storage: StorageBackend::Memory,
            database_url: None,
            port: 3000,
            cors_origins: vec!["http://localhost:5173".into()],
            seed_dir: PathBuf::from("seed-data"),
            dictionary_validation: false,
        }
    }

    fn staffing_options(&self) -> StaffingOptions {
        StaffingOptions {
            dictionary_validation: self.dictionary_validation,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub staffing: Staffing,
    pub config: AppConfig,
    pub(crate) rate_limits: RateLimits,
    pub readiness: Arc<AtomicBool>,
}

pub type SharedState = Arc<AppState>;

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed = origins
        .iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect::<Vec<_>>();

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, HeaderName::from_static("x-request-id")])
}

fn build_ip_limiter(per_second: u64, burst_size: u32) -> Arc<IpRateLimiter> {
    let nanos_per_token = 1_000_000_000u64 / per_second.max(1);
    let burst = NonZeroU32::new(burst_size).unwrap_or(NonZeroU32::MIN);
    let quota = Quota::with_period(Duration::from_nanos(nanos_per_token.max(1)))
        .map(|quota| quota.allow_burst(burst))
        .unwrap_or_else(|| Quota::per_second(burst));

    Arc::new(RateLimiter::keyed(quota))
}

pub fn default_rate_limits() -> RateLimits {
    let cfg = RateLimitConfig::from_env();
    RateLimits {
        global: build_ip_limiter(cfg.per_sec, cfg.burst),
    }
}

fn request_ip<B>(req: &Request<B>) -> Option<IpAddr> {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip())
}

fn enforce_rate_limit(limiter: &IpRateLimiter, ip: Option<IpAddr>) -> Result<(), ApiError> {
    if let Some(client_ip) = ip {
        if limiter.check_key(&client_ip).is_err() {
            return Err(ApiError::TooManyRequests("rate limit exceeded".into()));
        }
    }

    Ok(())
}

async fn global_rate_limit(
    State(state): State<SharedState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    enforce_rate_limit(&state.rate_limits.global, request_ip(&req))?;
    Ok(next.run(req).await)
}

async fn attach_request_id_context(req: Request<Body>, next: Next) -> Result<Response, ApiError> {
    let request_id = req
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string());

    Ok(error::with_request_id(request_id, next.run(req)).await)
}

fn entity_routes() -> Router<SharedState> {
    Router::new()
        .route("/employees", post(employees::create).get(employees::list))
        .route("/employees/batch", post(employees::create_many))
        .route("/employees/search", post(employees::search))
        .route(
            "/employees/:id",
            get(employees::get)
                .patch(employees::update)
                .delete(employees::remove),
        )
        .route("/employees/:id/projects", post(employees::assign_project))
        .route(
            "/employees/:id/projects/:project_id",
            axum::routing::delete(employees::remove_project),
        )
        .route("/employees/:id/requests", post(employees::assign_request))
        .route(
            "/employees/:id/requests/:request_id",
            axum::routing::delete(employees::remove_request),
        )
        .route("/projects", post(projects::create).get(projects::list))
        .route("/projects/batch", post(projects::create_many))
        .route("/projects/search", post(projects::search))
        .route(
            "/projects/:id",
            get(projects::get)
                .patch(projects::update)
                .delete(projects::remove),
        )
        .route("/projects/:id/employees", post(projects::assign_employee))
        .route(
            "/projects/:id/employees/:employee_id",
            axum::routing::delete(projects::remove_employee),
        )
        .route("/projects/:id/requests", post(projects::assign_request))
        .route(
            "/projects/:id/requests/:request_id",
            axum::routing::delete(projects::remove_request),
        )
        .route("/requests", post(requests::create).get(requests::list))
        .route("/requests/batch", post(requests::create_many))
        .route("/requests/search", post(requests::search))
        .route(
            "/requests/:id",
            get(requests::get)
                .patch(requests::update)
                .delete(requests::remove),
        )
        .route("/requests/:id/employees", post(requests::assign_employee))
        .route(
            "/requests/:id/employees/:employee_id",
            axum::routing::delete(requests::remove_employee),
        )
        .route("/requests/:id/project", post(requests::assign_project))
        .route(
            "/requests/:id/project/:project_id",
            axum::routing::delete(requests::remove_project),
        )
        .route("/dictionaries/:name", get(dictionaries::get))
}

pub fn create_router(state: SharedState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);

    let request_id_header = HeaderName::from_static("x-request-id");
    let trace_header = request_id_header.clone();

    let trace = TraceLayer::new_for_http().make_span_with(move |request: &Request<Body>| {
        let request_id = request
            .headers()
            .get(&trace_header)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("");

        tracing::info_span!(
            "http_request",
            method = %request.method(),
            uri = %request.uri(),
            request_id = %request_id,
            status = tracing::field::Empty,
        )
    });

    Router::new()
        .route("/health", get(health::readyz))
        .route("/livez", get(health::livez))
        .route("/readyz", get(health::readyz))
        .merge(entity_routes())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            global_rate_limit,
        ))
        .layer(middleware::from_fn(attach_request_id_context))
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(trace)
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(SetRequestIdLayer::new(
            request_id_header,
            MakeRequestUuid,
        ))
        .layer(cors)
        .with_state(state)
}

/// In-memory state with dictionary validation off.
pub fn test_state() -> SharedState {
    test_state_with(AppConfig::for_tests())
}

pub fn test_state_with(config: AppConfig) -> SharedState {
    let staffing = Staffing::new(Arc::new(MemoryStore::new()), config.staffing_options());
    Arc::new(AppState {
        staffing,
        config,
        rate_limits: default_rate_limits(),
        readiness: Arc::new(AtomicBool::new(true)),
    })
}

async fn open_store(config: &AppConfig) -> Result<Arc<dyn StaffingStore>, ApiError> {
    match config.storage {
        StorageBackend::Memory => Ok(Arc::new(MemoryStore::new())),
        StorageBackend::Postgres => {
            let url = config.database_url.as_deref().ok_or_else(|| {
                ApiError::BadRequest("DATABASE_URL is required when SM_STORAGE=postgres".into())
            })?;
            let pool = create_pool_from_url_checked(url)
                .await
                .map_err(|err| ApiError::Database(format!("failed to create pool: {err}")))?;
            run_migrations(&pool)
                .await
                .map_err(|err| ApiError::Database(format!("failed to run migrations: {err}")))?;
            Ok(Arc::new(PgStore::new(pool)))
        }
    }
}

pub async fn run() -> Result<(), ApiError> {
    dotenv().ok();
    init_tracing_subscriber(env!("CARGO_PKG_NAME"));
    install_tracing_panic_hook(env!("CARGO_PKG_NAME"));

    let cli = Cli::parse();
    let config = AppConfig::from_cli(cli)?;
    let store = open_store(&config).await?;
    let staffing = Staffing::new(store, config.staffing_options());

    let report = staffing.dictionaries().seed_from_dir(&config.seed_dir).await;
    info!(
        inserted = report.inserted.len(),
        skipped = report.skipped.len(),
        failed = report.failed.len(),
        "dictionary seeding finished"
    );

    let state = Arc::new(AppState {
        staffing,
        config: config.clone(),
        rate_limits: default_rate_limits(),
        readiness: Arc::new(AtomicBool::new(true)),
    });

    let addr: SocketAddr = ([0, 0, 0, 0], config.port).into();
    let app = create_router(state.clone());

    info!(%addr, storage = config.storage.as_str(), "sm-api listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|err| ApiError::Internal(err.to_string()))?;

    let service = app.into_make_service_with_connect_info::<SocketAddr>();

    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal(state.clone()))
        .await
        .map_err(|err| ApiError::Internal(err.to_string()))?;

    Ok(())
}

async fn shutdown_signal(state: SharedState) {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
            let _ = sigterm.recv().await;
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    state.readiness.store(false, Ordering::SeqCst);

    // Let load balancers see /readyz fail before new connections are refused.
    tokio::time::sleep(SHUTDOWN_DRAIN_GRACE).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        http::{Request, StatusCode},
        routing::get,
    };
    use std::sync::Mutex;
    use tower::ServiceExt;

    static ENV_GUARD: Mutex<()> = Mutex::new(());

    fn with_envs(vars: &[(&str, Option<&str>)], f: impl FnOnce()) {
        let _guard = ENV_GUARD.lock().unwrap();

        let previous: Vec<(&str, Option<String>)> = vars
            .iter()
            .map(|(var, value)| {
                let old = env::var(var).ok();
                match value {
                    Some(v) => unsafe { env::set_var(var, v) },
                    None => unsafe { env::remove_var(var) },
                }
                (*var, old)
            })
            .collect();

        f();

        for (var, previous_value) in previous {
            match previous_value {
                Some(v) => unsafe { env::set_var(var, v) },
                None => unsafe { env::remove_var(var) },
            }
        }
    }

    #[tokio::test]
    async fn sets_request_id_when_missing() {
        let app = Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                "x-request-id",
            )))
            .layer(SetRequestIdLayer::new(
                HeaderName::from_static("x-request-id"),
                MakeRequestUuid,
            ));

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[test]
    fn rate_limit_config_respects_env_overrides() {
        with_envs(
            &[
                ("SM_RATE_LIMIT_PER_SEC", Some("10")),
                ("SM_RATE_LIMIT_BURST", Some("25")),
            ],
            || {
                assert_eq!(
                    RateLimitConfig::from_env(),
                    RateLimitConfig {
                        per_sec: 10,
                        burst: 25,
                    }
                );
            },
        );
        with_envs(
            &[
                ("SM_RATE_LIMIT_PER_SEC", Some("0")),
                ("SM_RATE_LIMIT_BURST", Some("many")),
            ],
            || {
                assert_eq!(
                    RateLimitConfig::from_env(),
                    RateLimitConfig {
                        per_sec: 50,
                        burst: 100,
                    }
                );
            },
        );
    }

    #[test]
    fn postgres_backend_requires_a_database_url() {
        let cli = Cli::parse_from(["sm-api", "--storage", "postgres"]);
        let cli = Cli {
            database_url: None,
            ..cli
        };
        assert!(matches!(AppConfig::from_cli(cli), Err(ApiError::BadRequest(_))));

        let cli = Cli::parse_from([
            "sm-api",
            "--storage",
            "memory",
            "--cors-origins",
            "http://a.test, http://b.test",
            "--dictionary-validation",
            "false",
        ]);
        let config = AppConfig::from_cli(cli).unwrap();
        assert_eq!(config.storage, StorageBackend::Memory);
        assert_eq!(config.cors_origins, vec!["http://a.test", "http://b.test"]);
        assert!(!config.dictionary_validation);
    }

    #[test]
    fn wildcard_cors_is_rejected() {
        let cli = Cli::parse_from(["sm-api", "--storage", "memory", "--cors-origins", "*"]);
        assert!(matches!(AppConfig::from_cli(cli), Err(ApiError::BadRequest(_))));
    }
}
