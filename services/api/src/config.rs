//! 配置模块职责：
//! 1. 启动时一次性读取环境变量，构造显式的 [`Config`]。
//! 2. 签名密钥缺失/为空、有效期或 URL 非法时给出可读的配置错误。
//! 3. 解析可选的种子管理员账号。

use std::fmt;

use anyhow::{Context, anyhow};
use mailer_auth::{SigningSecret, TokenConfig, Ttl};
use url::Url;

use crate::{kdf::KdfPool, users::Role};

/// 默认监听端口。
const DEFAULT_PORT: &str = "5000";
/// token 默认有效期。
const DEFAULT_TOKEN_TTL: &str = "1d";
/// 种子账号默认显示名。
const DEFAULT_SEED_NAME: &str = "System Admin";

/// 启动时创建的种子账号。
#[derive(Clone)]
pub(crate) struct SeedUser {
    pub(crate) name: String,
    pub(crate) email: String,
    pub(crate) password: String,
    pub(crate) role: Role,
}

impl fmt::Debug for SeedUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeedUser")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

/// 服务运行时配置。
#[derive(Debug, Clone)]
pub(crate) struct Config {
    /// HTTP 监听地址。
    pub(crate) addr: String,
    /// token 签名配置。
    pub(crate) token: TokenConfig,
    /// 变更类请求需要携带的 `x-api-key`；未配置时不挂载该校验。
    pub(crate) api_key: Option<String>,
    /// 重置链接前缀；未配置时按请求 Host 拼接。
    pub(crate) reset_url_base: Option<String>,
    /// KDF 并发上限。
    pub(crate) kdf_max_parallel: usize,
    pub(crate) seed_user: Option<SeedUser>,
}

impl Config {
    /// 从进程环境变量构建配置。
    pub(crate) fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 从任意键值来源构建配置。
    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|raw| raw.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let secret = lookup("JWT_SECRET").unwrap_or_default();
        let secret = SigningSecret::new(secret).context("JWT_SECRET is not configured")?;
        let ttl_raw = non_empty("JWT_EXPIRES_IN").unwrap_or_else(|| DEFAULT_TOKEN_TTL.to_string());
        let default_ttl = ttl_raw
            .parse::<Ttl>()
            .context("JWT_EXPIRES_IN is invalid")?;

        let addr = non_empty("API_ADDR").unwrap_or_else(|| {
            let port = non_empty("PORT").unwrap_or_else(|| DEFAULT_PORT.to_string());
            format!("0.0.0.0:{port}")
        });

        let reset_url_base = non_empty("RESET_PASSWORD_URL_BASE")
            .or_else(|| non_empty("CLIENT_URL"))
            .map(|raw| {
                Url::parse(&raw)
                    .with_context(|| format!("reset password url base is not a valid url: {raw}"))?;
                Ok::<_, anyhow::Error>(raw.trim_end_matches('/').to_string())
            })
            .transpose()?;

        let kdf_max_parallel = match non_empty("KDF_MAX_PARALLEL") {
            Some(raw) => raw
                .parse::<usize>()
                .ok()
                .filter(|value| *value > 0)
                .ok_or_else(|| anyhow!("KDF_MAX_PARALLEL must be a positive integer: {raw}"))?,
            None => KdfPool::host_default_parallelism(),
        };

        let seed_user = match (non_empty("SEED_USER_EMAIL"), lookup("SEED_USER_PASSWORD")) {
            (Some(email), Some(password)) if !password.is_empty() => {
                let role = match non_empty("SEED_USER_ROLE") {
                    Some(raw) => raw
                        .parse::<Role>()
                        .map_err(|err| anyhow!("SEED_USER_ROLE is invalid: {err}"))?,
                    None => Role::Admin,
                };
                Some(SeedUser {
                    name: non_empty("SEED_USER_NAME")
                        .unwrap_or_else(|| DEFAULT_SEED_NAME.to_string()),
                    email,
                    password,
                    role,
                })
            }
            _ => None,
        };

        Ok(Self {
            addr,
            token: TokenConfig::new(secret, default_ttl),
            api_key: non_empty("API_KEY"),
            reset_url_base,
            kdf_max_parallel,
            seed_user,
        })
    }
}
