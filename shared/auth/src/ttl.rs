//! token 有效期解析：整数秒或 `<integer><unit>` 简写。

use std::{fmt, str::FromStr};

use crate::error::ConfigError;

/// 未指定有效期时的默认值（1 天）。
pub const DEFAULT_TTL_SEC: i64 = 24 * 60 * 60;

/// token 有效期（秒）。允许负值，用于签发即过期的 token。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ttl(i64);

impl Ttl {
    /// 按秒构造；0 视为未指定，回退到默认值。
    pub const fn from_secs(secs: i64) -> Self {
        if secs == 0 {
            Self(DEFAULT_TTL_SEC)
        } else {
            Self(secs)
        }
    }

    /// 有效期秒数。
    pub const fn as_secs(self) -> i64 {
        self.0
    }
}

impl Default for Ttl {
    fn default() -> Self {
        Self(DEFAULT_TTL_SEC)
    }
}

impl fmt::Display for Ttl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0)
    }
}

impl FromStr for Ttl {
    type Err = ConfigError;

    /// 解析 `90`、`-1`、`30s`、`15m`、`1h`、`7d`（单位大小写不敏感）；空串取默认值。
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let value = raw.trim();
        let invalid = || ConfigError::InvalidTtl(raw.to_string());
        let Some((split, unit)) = value.char_indices().next_back() else {
            return Ok(Self::default());
        };
        let digits = &value[..split];
        let multiplier = match unit.to_ascii_lowercase() {
            's' => Some(1),
            'm' => Some(60),
            'h' => Some(3600),
            'd' => Some(86_400),
            _ => None,
        };

        match multiplier {
            Some(multiplier) => {
                if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(invalid());
                }
                let count = digits.parse::<i64>().map_err(|_| invalid())?;
                let secs = count.checked_mul(multiplier).ok_or_else(invalid)?;
                Ok(Self::from_secs(secs))
            }
            None => value.parse::<i64>().map(Self::from_secs).map_err(|_| invalid()),
        }
    }
}
