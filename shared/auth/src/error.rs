//! 认证核心错误类型。

use thiserror::Error;

/// token 校验失败原因。
///
/// 调用方（HTTP 层）应把所有变体统一映射为“未认证”，不向客户端区分原因。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    /// 段数不为 3，或 claims 段无法解码/解析。
    #[error("malformed token")]
    Malformed,
    /// 签名与重新计算的结果不一致。
    #[error("token signature mismatch")]
    BadSignature,
    /// `exp` 不晚于当前时间。
    #[error("token has expired")]
    Expired,
}

/// 配置错误：在构造签名器之前由调用方发现。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("signing secret must not be empty")]
    EmptySecret,
    #[error("invalid token ttl `{0}`: expected seconds or <integer><s|m|h|d>")]
    InvalidTtl(String),
}

/// 口令派生失败：随机源不可用，或调用方给出的 salt 不是非空 hex 文本。
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("random source unavailable: {0}")]
    RandomSource(#[from] rand::Error),
    #[error("credential salt must be non-empty hex")]
    InvalidSalt,
}
