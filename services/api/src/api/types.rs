//! API 请求/响应类型。

use mailer_auth::Claims;
use serde::{Deserialize, Serialize};

use crate::users::UserView;

/// 口令最小长度（字符数）。
pub(crate) const MIN_PASSWORD_LEN: usize = 6;

/// 注册请求。字段均可缺省，由处理函数给出可读的校验错误。
#[derive(Debug, Default, Deserialize)]
pub(crate) struct RegisterRequest {
    #[serde(default)]
    pub(crate) name: Option<String>,
    #[serde(default)]
    pub(crate) email: Option<String>,
    #[serde(default)]
    pub(crate) password: Option<String>,
    #[serde(default)]
    pub(crate) role: Option<String>,
}

/// 登录请求。
#[derive(Debug, Default, Deserialize)]
pub(crate) struct LoginRequest {
    #[serde(default)]
    pub(crate) email: Option<String>,
    #[serde(default)]
    pub(crate) password: Option<String>,
}

/// 找回密码请求。
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ForgotPasswordRequest {
    #[serde(default)]
    pub(crate) email: Option<String>,
}

/// 重置密码请求（token 走路径参数）。
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ResetPasswordRequest {
    #[serde(default)]
    pub(crate) password: Option<String>,
}

/// 注册/登录返回数据。
#[derive(Debug, Serialize)]
pub(crate) struct AuthData {
    pub(crate) user: UserView,
    pub(crate) token: String,
}

/// 当前身份返回数据。
#[derive(Debug, Serialize)]
pub(crate) struct MeData {
    pub(crate) claims: Claims,
}

/// 健康检查返回体。
#[derive(Debug, Serialize)]
pub(crate) struct HealthBody {
    pub(crate) status: &'static str,
}

/// 取出非空（去除首尾空白后）的字段值。
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|raw| !raw.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::{RegisterRequest, non_blank};

    #[test]
    fn missing_fields_deserialize_as_none() {
        let req: RegisterRequest = serde_json::from_str(r#"{"email":"a@b.c"}"#).unwrap();
        assert_eq!(req.email.as_deref(), Some("a@b.c"));
        assert!(req.name.is_none());
        assert!(req.password.is_none());
        assert!(req.role.is_none());
    }

    #[test]
    fn blank_values_are_treated_as_missing() {
        assert_eq!(non_blank(Some("  ".to_string())), None);
        assert_eq!(non_blank(None), None);
        assert_eq!(non_blank(Some(" x ".to_string())).as_deref(), Some(" x "));
    }
}
