use axum::{Router, extract::FromRef, http::HeaderName, routing::get};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod media;
pub mod models;
pub mod repository;
pub mod storage;

// Module for routing segregation (auth, member, admin, free).
pub mod routes;

// --- Public Re-exports ---

// Makes core state types easily accessible to the main application entry
// point (main.rs) and the integration tests.
pub use auth::AuthService;
pub use config::{AppConfig, Env};
pub use repository::{PostgresRepository, Repository, RepositoryState};
pub use storage::{MockStorageService, S3StorageClient, StorageService, StorageState};

/// ApiDoc
///
/// Auto-generates the OpenAPI documentation (Swagger JSON) for the
/// application by aggregating every handler decorated with `#[utoipa::path]`
/// and every schema decorated with `#[derive(utoipa::ToSchema)]`.
/// The resulting JSON is served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::auth::login, handlers::auth::register, handlers::auth::logout,
        handlers::auth::me, handlers::auth::edit_avatar, handlers::auth::edit_id_card_photo,
        handlers::member::list_activities, handlers::member::get_activity,
        handlers::member::create_activity, handlers::member::upload_activity_media,
        handlers::member::update_activity, handlers::member::update_activity_media,
        handlers::member::delete_activity,
        handlers::admin::list_members, handlers::admin::patch_member_status,
        handlers::admin::create_member, handlers::admin::delete_member,
        handlers::admin::create_structure, handlers::admin::update_structure,
        handlers::admin::delete_structure, handlers::admin::list_activities,
        handlers::admin::patch_activity_status, handlers::admin::list_news,
        handlers::admin::get_news, handlers::admin::create_news,
        handlers::admin::upload_news_media, handlers::admin::update_news,
        handlers::admin::update_news_media, handlers::admin::delete_news,
        handlers::free::list_structures,
    ),
    components(
        schemas(
            models::User, models::Identity, models::Role, models::MemberStatus,
            models::ActivityStatus, models::ProgramType, models::OrganizationPosition,
            models::ActivityProgram, models::MediaActivity, models::News, models::MediaNews,
            models::OrganizationStructure, models::LoginRequest, models::RegisterRequest,
            models::ActivityTextRequest, models::NewsRequest, models::StatusPatch,
            models::Pagination, models::MemberSummary, models::ActivityAdminRow,
            models::ActivityWithMedia, models::NewsWithMedia, models::MediaDeleteResult,
        )
    ),
    tags(
        (name = "member-portal", description = "Membership organization portal API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single, thread-safe, immutable container holding all application
/// services and configuration, shared across every incoming request.
#[derive(Clone)]
pub struct AppState {
    /// Repository layer: abstracts database access via the PgPool connection.
    pub repo: RepositoryState,
    /// Storage layer: abstracts S3/MinIO blob access.
    pub storage: StorageState,
    /// Session lifecycle service on top of the repository.
    pub auth: AuthService,
    /// The loaded, immutable environment configuration.
    pub config: AppConfig,
}

impl AppState {
    /// Wires the state graph from its leaves: the auth service shares the
    /// same repository handle the handlers use.
    pub fn new(repo: RepositoryState, storage: StorageState, config: AppConfig) -> Self {
        let auth = AuthService::new(repo.clone());
        Self {
            repo,
            storage,
            auth,
            config,
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

// Allow handlers and extractors to selectively pull components from the
// shared AppState.

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for StorageState {
    fn from_ref(app_state: &AppState) -> StorageState {
        app_state.storage.clone()
    }
}

impl FromRef<AppState> for AuthService {
    fn from_ref(app_state: &AppState) -> AuthService {
        app_state.auth.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles the application's entire routing structure, applies global and
/// scoped middleware, and registers the application state. Role gates live on
/// the /member and /admin sub-routers; /auth and /free carry none.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for request correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(|| async { "ok" }))
        .nest("/auth", routes::auth::router())
        .nest("/member", routes::member::router(state.clone()))
        .nest("/admin", routes::admin::router(state.clone()))
        .nest("/free", routes::free::router())
        .with_state(state);

    // Observability and correlation layers, applied outermost.
    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// Customizes the `TraceLayer` span so every log line of a request is
/// correlated by its generated `x-request-id`.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
