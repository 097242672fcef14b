//! # Server Configuration
//!
//! Router assembly, shared state and the OpenAPI document for the facility
//! operations API.

use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use sea_orm::DatabaseConnection;
use tower_http::trace::TraceLayer;
use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::auth_middleware;
use crate::config::AppConfig;
use crate::handlers;
use crate::repositories::DocumentRepository;
use crate::store::DocumentStore;
use crate::telemetry::trace_context_middleware;

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DatabaseConnection,
    pub store: Arc<dyn DocumentStore>,
}

impl AppState {
    /// State backed by the `documents` table of `db`.
    pub fn new(config: AppConfig, db: DatabaseConnection) -> Self {
        let store: Arc<dyn DocumentStore> = Arc::new(DocumentRepository::new(db.clone()));
        Self {
            config: Arc::new(config),
            db,
            store,
        }
    }
}

/// Creates and configures the Axum application router
pub fn create_app(state: AppState) -> Router {
    let operator_routes = Router::new()
        .route(
            "/api/v1/spatial/manage",
            post(handlers::spatial::manage_spatial_structure),
        )
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state.config),
            auth_middleware,
        ));

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route(
            "/api/v1/spatial/{level}/children",
            get(handlers::spatial::list_children),
        )
        .route(
            "/api/v1/reports/evaluations",
            get(handlers::reports::evaluation_report),
        )
        .merge(operator_routes)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
        .layer(middleware::from_fn(trace_context_middleware))
        .layer(TraceLayer::new_for_http())
}

/// Starts the server with the given configuration
pub async fn run_server(
    config: AppConfig,
    db: DatabaseConnection,
) -> Result<(), Box<dyn std::error::Error>> {
    let addr = config
        .bind_addr()
        .map_err(|e| format!("Invalid server address: {}", e))?;
    let profile = config.profile.clone();

    let app = create_app(AppState::new(config, db));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, %profile, "Server listening");

    axum::serve(listener, app).await?;

    Ok(())
}

/// Registers the operator bearer scheme referenced by protected paths.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
        );
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::health,
        crate::handlers::spatial::list_children,
        crate::handlers::spatial::manage_spatial_structure,
        crate::handlers::reports::evaluation_report,
    ),
    components(
        schemas(
            crate::models::ServiceInfo,
            crate::handlers::HealthResponse,
            crate::handlers::spatial::ChildrenResponse,
            crate::handlers::reports::ReportQuery,
            crate::models::spatial::SpatialLevel,
            crate::models::spatial::SpatialItem,
            crate::models::spatial::ParentRef,
            crate::spatial::mutation::ManageRequest,
            crate::spatial::mutation::ManageResponse,
            crate::spatial::mutation::MutationAction,
            crate::evaluation::EvaluationReport,
            crate::evaluation::AggregatedResult,
            crate::evaluation::TrendSeries,
            crate::evaluation::DateFilter,
            crate::evaluation::AggregationAxis,
            crate::spatial::services::Language,
            crate::error::ApiError,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "root", description = "Service metadata"),
        (name = "spatial", description = "Spatial hierarchy navigation and maintenance"),
        (name = "reports", description = "Evaluation aggregation reports"),
    ),
    info(
        title = "Facility Operations API",
        description = "Spatial hierarchy navigation and security evaluation reporting",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;
