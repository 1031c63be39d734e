use std::sync::Arc;

use axum::http::Method;
use axum::routing::{delete, get, post};
use axum::Router;
use sqlx::SqlitePool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::authz::{AuthorizationEngine, AuthzConfig, SystemClock};
use crate::db::SqliteAuthzStore;
use crate::errors::AppError;
use crate::jwt::JwtConfig;
use crate::routes::{authorization, health};

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub jwt: Arc<JwtConfig>,
    pub authz: Arc<AuthorizationEngine>,
}

impl AppState {
    pub fn new(pool: SqlitePool, jwt: JwtConfig, authz_config: &AuthzConfig) -> Self {
        let store = Arc::new(SqliteAuthzStore::new(pool.clone()));
        let engine = AuthorizationEngine::new(store, authz_config, Arc::new(SystemClock));

        Self {
            pool,
            jwt: Arc::new(jwt),
            authz: Arc::new(engine),
        }
    }
}

pub async fn create_app(pool: SqlitePool) -> Result<Router, AppError> {
    let jwt_config = JwtConfig::from_env()?;
    let authz_config = AuthzConfig::from_env()?;
    let state = AppState::new(pool, jwt_config, &authz_config);

    tracing::info!(
        cache_ttl_secs = authz_config.cache_ttl.num_seconds(),
        insufficient_grant = ?authz_config.insufficient_grant,
        "authorization engine ready"
    );

    Ok(router(state))
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_origin(Any)
        .allow_headers(Any);

    let authorization_routes = Router::new()
        .route("/check", post(authorization::check))
        .route("/direct", post(authorization::check_direct))
        .route("/validate", post(authorization::validate))
        .route("/cache", delete(authorization::clear_cache));

    Router::new()
        .route("/api/health", get(health::health))
        .nest("/authorization", authorization_routes)
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
