//! 角色与 API key 守卫。

use axum::{
    extract::{Request, State},
    http::{Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use mailer_auth::{Claims, constant_time_eq};
use tracing::debug;

use crate::{api::error::ApiError, state::AppState, users::Role};

/// API key 请求头。
pub(crate) const API_KEY_HEADER: &str = "x-api-key";

/// 校验 token 中的角色是否在允许列表内。
pub(crate) fn require_role(claims: &Claims, allowed: &[Role]) -> Result<Role, ApiError> {
    let Some(raw) = claims.role() else {
        return Err(ApiError::new(
            StatusCode::UNAUTHORIZED,
            "ROLE_MISSING",
            "User role is missing from token.",
        ));
    };
    match raw.parse::<Role>() {
        Ok(role) if allowed.contains(&role) => Ok(role),
        _ => Err(ApiError::new(
            StatusCode::FORBIDDEN,
            "FORBIDDEN",
            "You are not authorized to perform this action.",
        )),
    }
}

/// 变更类方法（POST/PUT/PATCH/DELETE）必须携带正确的 `x-api-key`。
pub(crate) async fn require_api_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let mutating = matches!(
        *request.method(),
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    );
    if !mutating {
        return next.run(request).await;
    }

    let provided = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok());
    let accepted = match (state.api_key.as_deref(), provided) {
        (Some(expected), Some(provided)) => {
            constant_time_eq(expected.as_bytes(), provided.as_bytes())
        }
        _ => false,
    };
    if !accepted {
        debug!(path = %request.uri().path(), "api key rejected");
        return ApiError::new(
            StatusCode::UNAUTHORIZED,
            "INVALID_API_KEY",
            "Invalid API key.",
        )
        .into_response();
    }

    next.run(request).await
}
