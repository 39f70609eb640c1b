//! 找回密码票据：随机原文下发给用户，仅持久化其 sha256 摘要。

use rand::{RngCore, rngs::OsRng};

use crate::{encoding::sha256_hex, error::CredentialError};

/// 重置票据原文字节数（hex 后 64 字符）。
pub const RESET_TOKEN_BYTES: usize = 32;
/// 重置票据有效期（秒）。
pub const RESET_TOKEN_TTL_SEC: i64 = 24 * 60 * 60;

/// 新签发的重置票据。
pub struct IssuedReset {
    /// 下发给用户的原文，不得落库或写日志。
    pub raw: String,
    /// 落库用摘要。
    pub digest: String,
    /// 过期时间（unix 秒）。
    pub expires_at: i64,
}

/// 签发重置票据。
pub fn issue_reset_token(now: i64) -> Result<IssuedReset, CredentialError> {
    let mut bytes = [0u8; RESET_TOKEN_BYTES];
    OsRng.try_fill_bytes(&mut bytes)?;
    let raw = hex::encode(bytes);
    let digest = reset_token_digest(&raw);
    Ok(IssuedReset {
        raw,
        digest,
        expires_at: now.saturating_add(RESET_TOKEN_TTL_SEC),
    })
}

/// 计算重置票据摘要，用于按摘要查找用户。
pub fn reset_token_digest(raw: &str) -> String {
    sha256_hex(raw)
}
