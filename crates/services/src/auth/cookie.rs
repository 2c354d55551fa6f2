// Session cookie integrity
//
// The cookie value is `<token>.<base64url(HMAC-SHA256(token))>`, keyed by
// the shared cookie secret. The token itself is base64url and therefore
// never contains the `.` separator.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Sign a session token for transport in the cookie
pub fn sign(token: &str, secret: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(token.as_bytes());
    let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
    format!("{token}.{signature}")
}

/// Verify a cookie value and return the embedded session token
///
/// Comparison is constant-time via `Mac::verify_slice`. Any malformed or
/// tampered value yields `None`.
pub fn verify(value: &str, secret: &str) -> Option<String> {
    let (token, signature) = value.rsplit_once('.')?;
    let signature = URL_SAFE_NO_PAD.decode(signature).ok()?;

    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(token.as_bytes());
    mac.verify_slice(&signature).ok()?;

    Some(token.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_verify_roundtrip() {
        let signed = sign("abc123", "secret");
        assert_eq!(verify(&signed, "secret"), Some("abc123".to_string()));
    }

    #[test]
    fn test_tampered_token_is_rejected() {
        let signed = sign("abc123", "secret");
        let tampered = signed.replacen("abc123", "abc124", 1);
        assert_eq!(verify(&tampered, "secret"), None);
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let signed = sign("abc123", "secret");
        assert_eq!(verify(&signed, "other-secret"), None);
    }

    #[test]
    fn test_garbage_values_are_rejected() {
        assert_eq!(verify("", "secret"), None);
        assert_eq!(verify("no-separator", "secret"), None);
        assert_eq!(verify("token.!!!not-base64!!!", "secret"), None);
    }
}
