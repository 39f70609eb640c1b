//! 紧凑签名 token（HS256）签发与校验。
//!
//! 线上格式：`<header_b64url>.<claims_b64url>.<sig_b64url>`，三段均为无填充
//! base64url；签名为 `HMAC-SHA256(secret, "<header>.<claims>")`。

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::{
    encoding::{b64url_decode, b64url_encode, constant_time_eq, hmac_b64url},
    error::{ConfigError, TokenError},
    ttl::Ttl,
};

/// 固定 header，键序与既有 token 保持一致。
const HEADER_JSON: &str = r#"{"alg":"HS256","typ":"JWT"}"#;

/// 当前 unix 秒。
pub fn unix_now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_secs()).unwrap_or(i64::MAX))
        .unwrap_or_default()
}

/// 签名密钥；构造时拒绝空值，签名器内部不再做空值判断。
#[derive(Clone)]
pub struct SigningSecret(Vec<u8>);

impl SigningSecret {
    pub fn new(secret: impl Into<Vec<u8>>) -> Result<Self, ConfigError> {
        let secret = secret.into();
        if secret.is_empty() {
            return Err(ConfigError::EmptySecret);
        }
        Ok(Self(secret))
    }

    fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningSecret(<redacted>)")
    }
}

/// 签名器配置：由宿主服务显式传入，核心不读取环境变量。
#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub secret: SigningSecret,
    pub default_ttl: Ttl,
}

impl TokenConfig {
    pub fn new(secret: SigningSecret, default_ttl: Ttl) -> Self {
        Self {
            secret,
            default_ttl,
        }
    }
}

/// token 负载：保序的字符串键映射。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Claims(Map<String, Value>);

impl Claims {
    pub const SUBJECT: &'static str = "sub";
    pub const EMAIL: &'static str = "email";
    pub const ROLE: &'static str = "role";
    pub const DISPLAY_NAME: &'static str = "name";
    pub const ISSUED_AT: &'static str = "iat";
    pub const EXPIRES_AT: &'static str = "exp";

    pub fn new() -> Self {
        Self::default()
    }

    /// 身份 claims 最小集合（`iat`/`exp` 由签名器注入）。
    pub fn identity(subject: &str, email: &str, role: &str, display_name: &str) -> Self {
        Self::new()
            .with(Self::SUBJECT, subject)
            .with(Self::EMAIL, email)
            .with(Self::ROLE, role)
            .with(Self::DISPLAY_NAME, display_name)
    }

    /// 链式追加一个 claim。
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// 写入 claim；键已存在时原位覆盖。
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    fn str_claim(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn subject(&self) -> Option<&str> {
        self.str_claim(Self::SUBJECT)
    }

    pub fn email(&self) -> Option<&str> {
        self.str_claim(Self::EMAIL)
    }

    pub fn role(&self) -> Option<&str> {
        self.str_claim(Self::ROLE)
    }

    pub fn display_name(&self) -> Option<&str> {
        self.str_claim(Self::DISPLAY_NAME)
    }

    pub fn issued_at(&self) -> Option<i64> {
        self.0.get(Self::ISSUED_AT).and_then(Value::as_i64)
    }

    pub fn expires_at(&self) -> Option<i64> {
        self.0.get(Self::EXPIRES_AT).and_then(Value::as_i64)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for Claims {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// HS256 token 签发/校验器。无内部可变状态，可跨线程共享。
#[derive(Debug, Clone)]
pub struct TokenCodec {
    secret: SigningSecret,
    default_ttl: Ttl,
}

impl TokenCodec {
    pub fn new(config: TokenConfig) -> Self {
        Self {
            secret: config.secret,
            default_ttl: config.default_ttl,
        }
    }

    pub fn default_ttl(&self) -> Ttl {
        self.default_ttl
    }

    /// 以当前时间签发 token；`ttl` 缺省时使用配置的默认有效期。
    pub fn sign(&self, claims: &Claims, ttl: Option<Ttl>) -> String {
        self.sign_at(claims, ttl, unix_now())
    }

    /// 以指定时间签发 token。相同 claims、密钥与时间得到相同输出。
    pub fn sign_at(&self, claims: &Claims, ttl: Option<Ttl>, now: i64) -> String {
        let ttl = ttl.unwrap_or(self.default_ttl);
        let mut body = claims.clone();
        body.insert(Claims::ISSUED_AT, now);
        body.insert(Claims::EXPIRES_AT, now.saturating_add(ttl.as_secs()));

        let header_b64 = b64url_encode(HEADER_JSON);
        let body_raw = serde_json::to_string(&body).expect("claims map must be serializable");
        let body_b64 = b64url_encode(body_raw);
        let sig_b64 = hmac_b64url(
            self.secret.as_bytes(),
            format!("{header_b64}.{body_b64}").as_bytes(),
        );
        format!("{header_b64}.{body_b64}.{sig_b64}")
    }

    /// 以当前时间校验 token，成功时返回完整 claims（含 `iat`/`exp`）。
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_at(token, unix_now())
    }

    /// 以指定时间校验 token：段数 → 签名 → claims 解码 → 过期。
    pub fn verify_at(&self, token: &str, now: i64) -> Result<Claims, TokenError> {
        let mut parts = token.split('.');
        let (Some(header_b64), Some(body_b64), Some(sig_b64), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(TokenError::Malformed);
        };

        let expected = hmac_b64url(
            self.secret.as_bytes(),
            format!("{header_b64}.{body_b64}").as_bytes(),
        );
        if !constant_time_eq(expected.as_bytes(), sig_b64.as_bytes()) {
            return Err(TokenError::BadSignature);
        }

        let body_raw = b64url_decode(body_b64).ok_or(TokenError::Malformed)?;
        let claims: Map<String, Value> =
            serde_json::from_slice(&body_raw).map_err(|_| TokenError::Malformed)?;
        let claims = Claims::from(claims);

        match claims.get(Claims::EXPIRES_AT) {
            None | Some(Value::Null) => {
                // 缺少 exp 的 token 永不过期，保留既有行为并记录。
                warn!(
                    sub = claims.subject().unwrap_or_default(),
                    "accepted token without exp; it never expires"
                );
            }
            Some(exp) => {
                let exp = exp.as_i64().ok_or(TokenError::Malformed)?;
                if exp <= now {
                    return Err(TokenError::Expired);
                }
            }
        }

        Ok(claims)
    }
}
