//! base64url 编解码、HMAC 签名与常量时间比较辅助函数。

use base64::{
    Engine as _, alphabet,
    engine::{
        DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig, general_purpose::URL_SAFE_NO_PAD,
    },
};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// 解码用引擎：兼容带 `=` 填充与不带填充的输入。
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// 无填充 base64url 编码。
pub(crate) fn b64url_encode(input: impl AsRef<[u8]>) -> String {
    URL_SAFE_NO_PAD.encode(input)
}

/// base64url 解码（填充可有可无）。
pub(crate) fn b64url_decode(input: &str) -> Option<Vec<u8>> {
    URL_SAFE_LENIENT.decode(input.as_bytes()).ok()
}

/// HMAC-SHA256 并输出无填充 base64url。
pub(crate) fn hmac_b64url(secret: &[u8], payload: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret).expect("hmac accepts keys of any length");
    mac.update(payload);
    b64url_encode(mac.finalize().into_bytes())
}

/// sha256 hex。
pub fn sha256_hex(value: &str) -> String {
    hex::encode(Sha256::digest(value.as_bytes()))
}

/// 常量时间比较两段字节；长度不同直接返回 false。
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}

#[cfg(test)]
mod tests {
    use super::{b64url_decode, b64url_encode, constant_time_eq, hmac_b64url, sha256_hex};

    #[test]
    fn encoded_output_is_url_safe_without_padding() {
        // 0xfb 0xff 在标准字母表下会产生 `+` 与 `/`。
        let encoded = b64url_encode([0xfb, 0xff, 0xfe]);
        assert_eq!(encoded, "-__-");

        let short = b64url_encode(b"a");
        assert!(!short.contains('='));
    }

    #[test]
    fn decoder_accepts_padded_and_unpadded_input() {
        assert_eq!(b64url_decode("YQ").as_deref(), Some(&b"a"[..]));
        assert_eq!(b64url_decode("YQ==").as_deref(), Some(&b"a"[..]));
        assert!(b64url_decode("not base64!").is_none());
    }

    #[test]
    fn hmac_matches_rfc4231_case_two() {
        let sig = hmac_b64url(b"Jefe", b"what do ya want for nothing?");
        // 5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843
        assert_eq!(sig, "W9zBRr9gdU5qBCQmCJV1x1oAPwidJzmDnexYuWTsOEM");
    }

    #[test]
    fn sha256_hex_is_lowercase_digest() {
        assert_eq!(
            sha256_hex("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn constant_time_eq_rejects_length_mismatch() {
        assert!(constant_time_eq(b"same", b"same"));
        assert!(!constant_time_eq(b"same", b"sam"));
        assert!(!constant_time_eq(b"same", b"fame"));
    }
}
