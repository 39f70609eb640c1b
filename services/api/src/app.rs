//! 应用装配：路由、守卫、CORS 与监听。

use std::sync::Arc;

use axum::{
    Json, Router,
    http::{
        HeaderName, Method, StatusCode, Uri,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    middleware,
    routing::{get, post},
};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::{
    api::{error::ApiError, types::HealthBody},
    auth::{
        guard::{API_KEY_HEADER, require_api_key},
        handlers::{
            forgot_password_handler, list_users_handler, login_handler, me_handler,
            register_handler, reset_password_handler,
        },
    },
    config::Config,
    delivery::UnconfiguredDelivery,
    state::AppState,
};

/// 服务入口：装配状态、写入种子账号并开始监听。
pub(crate) async fn run(config: Config) -> anyhow::Result<()> {
    let state = AppState::new(&config, Arc::new(UnconfiguredDelivery));
    if let Some(seed) = &config.seed_user {
        state
            .seed_user(seed)
            .await
            .map_err(|err| anyhow::anyhow!("seed user failed: {}", err.message))?;
    }

    let app = router(state);
    let listener = tokio::net::TcpListener::bind(&config.addr).await?;
    info!(
        addr = %config.addr,
        token_ttl = %config.token.default_ttl,
        api_key_guard = config.api_key.is_some(),
        "mailer-api listening"
    );
    axum::serve(listener, app).await?;
    Ok(())
}

/// 构造完整路由。
pub(crate) fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            CONTENT_TYPE,
            AUTHORIZATION,
            HeaderName::from_static(API_KEY_HEADER),
        ]);

    let mut auth_routes = Router::new()
        .route("/register", post(register_handler))
        .route("/login", post(login_handler))
        .route("/forgot-password", post(forgot_password_handler))
        .route("/reset-password/{token}", post(reset_password_handler))
        .route("/users", get(list_users_handler))
        .route("/me", get(me_handler));
    if state.api_key.is_some() {
        auth_routes = auth_routes.route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_api_key,
        ));
    }

    Router::new()
        .route("/health", get(health))
        .nest("/api/auth", auth_routes)
        .fallback(not_found)
        .layer(cors)
        .with_state(state)
}

/// 健康检查接口。
async fn health() -> Json<HealthBody> {
    Json(HealthBody { status: "ok" })
}

async fn not_found(uri: Uri) -> ApiError {
    ApiError::new(
        StatusCode::NOT_FOUND,
        "NOT_FOUND",
        format!("Route not found: {}", uri.path()),
    )
}
