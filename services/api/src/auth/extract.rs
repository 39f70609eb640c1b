//! bearer token 身份提取。

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
};
use mailer_auth::Claims;
use tracing::debug;

use crate::{api::error::ApiError, state::AppState};

/// 已通过 token 校验的请求身份。
#[derive(Debug, Clone)]
pub(crate) struct AuthUser(pub(crate) Claims);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(bearer_token)
            .ok_or_else(|| {
                ApiError::new(
                    StatusCode::UNAUTHORIZED,
                    "AUTH_TOKEN_REQUIRED",
                    "Authorization token is required.",
                )
            })?;

        // 失败原因只进日志，客户端统一收到“未认证”。
        state.codec.verify(token).map(AuthUser).map_err(|err| {
            debug!(reason = %err, "bearer token rejected");
            ApiError::unauthenticated()
        })
    }
}

/// 解析 `Bearer <token>` 头。
fn bearer_token(header: &str) -> Option<&str> {
    let token = header.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}
