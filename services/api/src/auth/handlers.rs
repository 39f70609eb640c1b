//! 认证 HTTP 路由处理函数。

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode, header::HOST},
};
use mailer_auth::{issue_reset_token, reset_token_digest, unix_now};
use serde_json::Value;
use tracing::{debug, error, info};

use super::{extract::AuthUser, guard::require_role};
use crate::{
    api::{
        error::ApiError,
        response::{ApiReply, ok_response},
        types::{
            AuthData, ForgotPasswordRequest, LoginRequest, MIN_PASSWORD_LEN, MeData,
            RegisterRequest, ResetPasswordRequest, non_blank,
        },
    },
    state::AppState,
    users::{DirectoryError, NewUser, Role, UserView},
};

/// 可以查看用户列表的角色。
const DIRECTORY_READERS: &[Role] = &[Role::Admin, Role::Manager];
/// 找回密码统一回复，不暴露邮箱是否存在。
const FORGOT_PASSWORD_REPLY: &str = "If the email exists, a reset link has been sent.";

/// 注册接口。
pub(crate) async fn register_handler(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<ApiReply<AuthData>, ApiError> {
    let req = json_body(payload)?;
    let (Some(name), Some(email), Some(password)) = (
        non_blank(req.name),
        non_blank(req.email),
        non_blank(req.password),
    ) else {
        return Err(ApiError::validation(
            "name, email and password are required.",
        ));
    };
    let role = match non_blank(req.role) {
        Some(raw) => raw.trim().parse::<Role>().map_err(ApiError::validation)?,
        None => Role::Staff,
    };
    check_password_len(&password)?;

    if state.users.email_taken(&email).await {
        return Err(email_conflict());
    }
    let credential = state.kdf.derive(password).await?;
    let user = state
        .users
        .insert(NewUser {
            name,
            email,
            credential,
            role,
        })
        .await
        .map_err(|DirectoryError::EmailTaken| email_conflict())?;

    info!(user_id = %user.id, role = %user.role, "user registered");
    let token = state.issue_token(&user);
    Ok(ok_response(
        StatusCode::CREATED,
        "User registered successfully.",
        Some(AuthData {
            user: user.view(),
            token,
        }),
    ))
}

/// 登录接口：邮箱不存在与口令错误返回同一 401。
pub(crate) async fn login_handler(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<ApiReply<AuthData>, ApiError> {
    let req = json_body(payload)?;
    let (Some(email), Some(password)) = (non_blank(req.email), non_blank(req.password)) else {
        return Err(ApiError::validation("email and password are required."));
    };

    let Some(user) = state.users.find_by_email(&email).await else {
        // 未知邮箱同样付出一次派生成本，响应耗时不暴露账号是否存在。
        state.kdf.verify_decoy(password).await?;
        debug!("login rejected: unknown email");
        return Err(invalid_credentials());
    };
    let verdict = state.kdf.verify(password, user.credential.clone()).await?;
    if !verdict.is_match() {
        debug!(user_id = %user.id, "login rejected: password mismatch");
        return Err(invalid_credentials());
    }

    let token = state.issue_token(&user);
    Ok(ok_response(
        StatusCode::OK,
        "Login successful.",
        Some(AuthData {
            user: user.view(),
            token,
        }),
    ))
}

/// 找回密码接口：已知邮箱签发重置票据并投递链接。
pub(crate) async fn forgot_password_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<ForgotPasswordRequest>, JsonRejection>,
) -> Result<ApiReply<Value>, ApiError> {
    let req = json_body(payload)?;
    let Some(email) = non_blank(req.email) else {
        return Err(ApiError::validation("email is required."));
    };

    let Some(user) = state.users.find_by_email(&email).await else {
        return Ok(ok_response(StatusCode::OK, FORGOT_PASSWORD_REPLY, None));
    };

    let issued = issue_reset_token(unix_now()).map_err(|err| {
        error!("issue reset token failed: {err}");
        ApiError::internal("Failed to process forgot password request.")
    })?;
    state
        .users
        .set_reset(user.id, issued.digest, issued.expires_at)
        .await;

    let reset_url = build_reset_url(state.reset_url_base.as_deref(), &headers, &issued.raw);
    state
        .reset_delivery
        .deliver(&user.email, &user.name, &reset_url)
        .map_err(|err| {
            error!(user_id = %user.id, "deliver reset link failed: {err:#}");
            ApiError::internal("Failed to process forgot password request.")
        })?;

    info!(user_id = %user.id, "password reset issued");
    Ok(ok_response(StatusCode::OK, FORGOT_PASSWORD_REPLY, None))
}

/// 重置密码接口：票据单次有效。
pub(crate) async fn reset_password_handler(
    State(state): State<AppState>,
    Path(token): Path<String>,
    payload: Result<Json<ResetPasswordRequest>, JsonRejection>,
) -> Result<ApiReply<Value>, ApiError> {
    let req = json_body(payload)?;
    let token = token.trim();
    let Some(password) = non_blank(req.password).filter(|_| !token.is_empty()) else {
        return Err(ApiError::validation("token and password are required."));
    };
    check_password_len(&password)?;

    let digest = reset_token_digest(token);
    let Some(user) = state.users.find_by_reset_digest(&digest, unix_now()).await else {
        return Err(invalid_reset_token());
    };
    let credential = state.kdf.derive(password).await?;
    // 派生期间票据可能已被并发请求用掉，以目录内的原子替换为准。
    if !state
        .users
        .complete_reset(user.id, &digest, credential, unix_now())
        .await
    {
        return Err(invalid_reset_token());
    }

    info!(user_id = %user.id, "password reset completed");
    Ok(ok_response(StatusCode::OK, "Password reset successful.", None))
}

/// 用户列表接口：仅 admin/manager。
pub(crate) async fn list_users_handler(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<ApiReply<Vec<UserView>>, ApiError> {
    require_role(&claims, DIRECTORY_READERS)?;
    let users = state.users.list().await;
    Ok(ok_response(StatusCode::OK, "Users fetched.", Some(users)))
}

/// 当前身份接口。
pub(crate) async fn me_handler(AuthUser(claims): AuthUser) -> ApiReply<MeData> {
    ok_response(StatusCode::OK, "Authenticated.", Some(MeData { claims }))
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiError::validation(rejection.body_text()))
}

fn check_password_len(password: &str) -> Result<(), ApiError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters."
        )));
    }
    Ok(())
}

fn email_conflict() -> ApiError {
    ApiError::new(
        StatusCode::CONFLICT,
        "EMAIL_TAKEN",
        "A user with this email already exists.",
    )
}

fn invalid_credentials() -> ApiError {
    ApiError::new(
        StatusCode::UNAUTHORIZED,
        "INVALID_CREDENTIALS",
        "Invalid email or password.",
    )
}

fn invalid_reset_token() -> ApiError {
    ApiError::new(
        StatusCode::BAD_REQUEST,
        "RESET_TOKEN_INVALID",
        "Reset token is invalid or has expired.",
    )
}

/// 拼接重置链接：配置了前缀走前端页面，否则指回本服务。
fn build_reset_url(base: Option<&str>, headers: &HeaderMap, raw_token: &str) -> String {
    if let Some(base) = base {
        return format!("{base}/reset-password/{raw_token}");
    }
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or("http");
    let host = headers
        .get(HOST)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("localhost");
    format!("{scheme}://{host}/api/auth/reset-password/{raw_token}")
}
