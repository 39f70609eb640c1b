//! 口令凭证：scrypt 派生与常量时间校验。
//!
//! 存储格式为 `<salt_hex>:<derived_key_hex>`。salt 的 hex 文本本身作为 KDF 的
//! salt 输入，与既有库中的凭证保持兼容。

use std::fmt;

use rand::{RngCore, rngs::OsRng};
use scrypt::{Params, scrypt};

use crate::{encoding::constant_time_eq, error::CredentialError};

/// 随机 salt 字节数（hex 后 32 字符）。
pub const SALT_LEN: usize = 16;
/// 派生密钥字节数。
pub const KEY_LEN: usize = 64;
/// scrypt 代价参数：N = 2^14，r = 8，p = 1。固定常量，不对外开放配置。
const SCRYPT_LOG_N: u8 = 14;
const SCRYPT_R: u32 = 8;
const SCRYPT_P: u32 = 1;

/// 口令校验结果。
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordVerdict {
    Match,
    Mismatch,
}

impl PasswordVerdict {
    pub fn is_match(self) -> bool {
        self == Self::Match
    }
}

/// 已派生的口令凭证（`salt:key` 字符串）。
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// 生成新随机 salt 并派生凭证。随机源不可用时返回错误。
    pub fn derive(password: &str) -> Result<Self, CredentialError> {
        let mut salt = [0u8; SALT_LEN];
        OsRng.try_fill_bytes(&mut salt)?;
        Ok(Self::from_parts(password, &hex::encode(salt)))
    }

    /// 以给定 salt 派生凭证；相同输入总得到相同结果。
    ///
    /// salt 必须是非空 hex 文本，否则派生结果无法按 `salt:key` 格式回读校验。
    pub fn derive_with_salt(password: &str, salt: &str) -> Result<Self, CredentialError> {
        if salt.is_empty() || !salt.bytes().all(|c| c.is_ascii_hexdigit()) {
            return Err(CredentialError::InvalidSalt);
        }
        Ok(Self::from_parts(password, salt))
    }

    fn from_parts(password: &str, salt: &str) -> Self {
        let key = derive_key(password, salt);
        Self(format!("{salt}:{}", hex::encode(key)))
    }

    pub fn salt(&self) -> &str {
        self.0.split_once(':').map(|(salt, _)| salt).unwrap_or_default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn verify(&self, password: &str) -> PasswordVerdict {
        verify_password(password, &self.0)
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential({}:<redacted>)", self.salt())
    }
}

/// 校验明文口令与存储凭证。
///
/// 凭证格式不合法（缺少 `:`、任一半为空、key 非 hex、长度不符）一律视为不匹配，
/// 不返回错误也不 panic。
pub fn verify_password(password: &str, stored: &str) -> PasswordVerdict {
    let Some((salt, key_hex)) = stored.split_once(':') else {
        return PasswordVerdict::Mismatch;
    };
    if salt.is_empty() || key_hex.is_empty() {
        return PasswordVerdict::Mismatch;
    }
    let Ok(stored_key) = hex::decode(key_hex) else {
        return PasswordVerdict::Mismatch;
    };
    if stored_key.len() != KEY_LEN {
        return PasswordVerdict::Mismatch;
    }

    let derived = derive_key(password, salt);
    if constant_time_eq(&derived, &stored_key) {
        PasswordVerdict::Match
    } else {
        PasswordVerdict::Mismatch
    }
}

fn derive_key(password: &str, salt: &str) -> [u8; KEY_LEN] {
    let params = Params::new(SCRYPT_LOG_N, SCRYPT_R, SCRYPT_P, KEY_LEN)
        .expect("scrypt cost constants must be valid");
    let mut key = [0u8; KEY_LEN];
    scrypt(password.as_bytes(), salt.as_bytes(), &params, &mut key)
        .expect("scrypt output buffer length must be valid");
    key
}

#[cfg(test)]
mod tests {
    use super::{Credential, KEY_LEN, PasswordVerdict, SALT_LEN, verify_password};
    use crate::error::CredentialError;

    const FIXED_SALT: &str = "abc123abc123abc123abc123abc123ab";
    /// scrypt("admin123", FIXED_SALT, N=16384, r=8, p=1, 64)。
    const ADMIN123_KEY: &str = "02f11d4b83aca6bb0e3b392f7a9671e1444126cad4772fad017ba235082f899c\
                                f5191f78a59ac63bc936f4dd4de2a16bba0ee5cf42e03954e964b46ba58502bd";

    #[test]
    fn fixed_salt_reproduces_known_key() {
        let first = Credential::derive_with_salt("admin123", FIXED_SALT).unwrap();
        let second = Credential::derive_with_salt("admin123", FIXED_SALT).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.as_str(), format!("{FIXED_SALT}:{ADMIN123_KEY}"));
        assert_eq!(first.salt(), FIXED_SALT);
    }

    #[test]
    fn derived_credential_verifies_only_its_password() {
        let credential = Credential::derive("admin123").unwrap();

        assert_eq!(credential.verify("admin123"), PasswordVerdict::Match);
        assert_eq!(credential.verify("admin124"), PasswordVerdict::Mismatch);
        assert_eq!(credential.verify(""), PasswordVerdict::Mismatch);
        assert!(verify_password("admin123", credential.as_str()).is_match());
    }

    #[test]
    fn fresh_salts_differ_but_both_verify() {
        let a = Credential::derive("correct horse").unwrap();
        let b = Credential::derive("correct horse").unwrap();

        assert_ne!(a, b);
        assert_eq!(a.salt().len(), SALT_LEN * 2);
        assert!(a.salt().bytes().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(
            a.as_str().len(),
            SALT_LEN * 2 + 1 + KEY_LEN * 2,
            "salt:key layout"
        );
        assert!(a.verify("correct horse").is_match());
        assert!(b.verify("correct horse").is_match());
    }

    #[test]
    fn malformed_stored_credentials_never_match() {
        let valid_key = ADMIN123_KEY;
        let cases = [
            String::new(),
            "no-delimiter".to_string(),
            ":".to_string(),
            format!(":{valid_key}"),
            format!("{FIXED_SALT}:"),
            format!("{FIXED_SALT}:zz{}", &valid_key[2..]),
            format!("{FIXED_SALT}:{}", &valid_key[..64]),
            format!("{FIXED_SALT}:{valid_key}:extra"),
        ];

        for stored in &cases {
            assert_eq!(
                verify_password("admin123", stored),
                PasswordVerdict::Mismatch,
                "{stored:?}"
            );
        }
    }

    #[test]
    fn stored_string_from_existing_records_is_accepted() {
        let stored = format!("{FIXED_SALT}:{ADMIN123_KEY}");
        assert!(verify_password("admin123", &stored).is_match());
        // 大写 hex 也能解码。
        let upper = format!("{FIXED_SALT}:{}", ADMIN123_KEY.to_ascii_uppercase());
        assert!(verify_password("admin123", &upper).is_match());
    }

    #[test]
    fn salts_that_cannot_round_trip_are_rejected() {
        for salt in ["", "ab:cd", "salt", "abc 123", "ab\ncd"] {
            assert!(
                matches!(
                    Credential::derive_with_salt("admin123", salt),
                    Err(CredentialError::InvalidSalt)
                ),
                "{salt:?}"
            );
        }

        let odd_length = Credential::derive_with_salt("admin123", "abc").unwrap();
        assert_eq!(odd_length.salt(), "abc");
        assert!(odd_length.verify("admin123").is_match());
    }

    #[test]
    fn debug_output_hides_derived_key() {
        let credential = Credential::derive_with_salt("admin123", FIXED_SALT).unwrap();
        let rendered = format!("{credential:?}");
        assert!(rendered.contains(FIXED_SALT));
        assert!(!rendered.contains(&ADMIN123_KEY[..16]));
    }
}
