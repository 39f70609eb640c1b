//! 邮件服务认证核心：
//! 1. HS256 紧凑签名 token 的签发与校验（[`TokenCodec`]）。
//! 2. scrypt 口令凭证的派生与校验（[`Credential`]、[`verify_password`]）。
//! 3. 找回密码票据的签发与摘要（[`issue_reset_token`]）。
//!
//! 两个组件均为无状态纯计算，可跨线程共享；口令派生是 CPU/内存密集操作，
//! 异步调用方应放到阻塞线程池执行。

mod encoding;
mod error;

pub mod credential;
pub mod reset;
pub mod token;
pub mod ttl;

pub use credential::{Credential, PasswordVerdict, verify_password};
pub use encoding::{constant_time_eq, sha256_hex};
pub use error::{ConfigError, CredentialError, TokenError};
pub use reset::{IssuedReset, issue_reset_token, reset_token_digest};
pub use token::{Claims, SigningSecret, TokenCodec, TokenConfig, unix_now};
pub use ttl::{DEFAULT_TTL_SEC, Ttl};
