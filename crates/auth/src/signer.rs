//! HMAC-SHA256 request signing (L2 authentication).

use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::credentials::Credentials;
use crate::error::AuthError;

type HmacSha256 = Hmac<Sha256>;

/// The five headers attached to every authenticated request.
#[derive(Debug, Clone)]
pub struct AuthHeaders {
    pub address: String,
    pub signature: String,
    pub timestamp: String,
    pub api_key: String,
    pub passphrase: String,
}

impl AuthHeaders {
    /// Header name/value pairs in wire form.
    pub fn as_pairs(&self) -> [(&'static str, &str); 5] {
        [
            ("POLY_ADDRESS", &self.address),
            ("POLY_SIGNATURE", &self.signature),
            ("POLY_TIMESTAMP", &self.timestamp),
            ("POLY_API_KEY", &self.api_key),
            ("POLY_PASSPHRASE", &self.passphrase),
        ]
    }
}

/// Signs requests with the decoded API secret.
///
/// The secret arrives URL-safe base64 encoded; some older keys use the
/// standard alphabet, so decoding falls back before failing.
pub struct RequestSigner {
    key: HmacSha256,
    address: String,
    api_key: String,
    passphrase: String,
}

impl RequestSigner {
    /// Build a signer from a configured credential set.
    pub fn new(creds: &Credentials) -> Result<Self, AuthError> {
        if !creds.configured() {
            return Err(AuthError::NotConfigured);
        }
        let secret = decode_secret(&creds.api_secret)?;
        let key = HmacSha256::new_from_slice(&secret).map_err(|_| AuthError::InvalidSecret)?;

        Ok(Self {
            key,
            address: creds.auth_address().to_string(),
            api_key: creds.api_key.clone(),
            passphrase: creds.api_passphrase.clone(),
        })
    }

    /// Sign `timestamp ‖ method ‖ path [‖ body]`, base64url-encoded.
    pub fn sign(&self, timestamp: i64, method: &str, path: &str, body: Option<&str>) -> String {
        let mut message =
            String::with_capacity(20 + method.len() + path.len() + body.map_or(0, str::len));
        message.push_str(&timestamp.to_string());
        message.push_str(method);
        message.push_str(path);
        if let Some(b) = body {
            message.push_str(b);
        }

        let mut mac = self.key.clone();
        mac.update(message.as_bytes());
        URL_SAFE.encode(mac.finalize().into_bytes())
    }

    /// Full header set for one request at the given unix-seconds timestamp.
    pub fn headers(&self, timestamp: i64, method: &str, path: &str, body: Option<&str>) -> AuthHeaders {
        AuthHeaders {
            address: self.address.clone(),
            signature: self.sign(timestamp, method, path, body),
            timestamp: timestamp.to_string(),
            api_key: self.api_key.clone(),
            passphrase: self.passphrase.clone(),
        }
    }
}

fn decode_secret(secret: &str) -> Result<Vec<u8>, AuthError> {
    URL_SAFE
        .decode(secret)
        .or_else(|_| STANDARD.decode(secret))
        .map_err(|_| AuthError::InvalidSecret)
}

#[cfg(test)]
mod tests {
    use super::*;

    const WALLET: &str = "0xabcdef0123456789abcdef0123456789abcdef01";

    fn signer() -> RequestSigner {
        // "test-secret!" in URL-safe base64
        let creds = Credentials::new(
            "api-key",
            URL_SAFE.encode(b"test-secret!"),
            "passphrase",
            WALLET,
            None,
            "0xpk",
        )
        .unwrap();
        RequestSigner::new(&creds).unwrap()
    }

    #[test]
    fn signature_is_deterministic_and_urlsafe() {
        let s = signer();
        let a = s.sign(1_700_000_000, "GET", "/data/trades", None);
        let b = s.sign(1_700_000_000, "GET", "/data/trades", None);
        assert_eq!(a, b);
        assert!(!a.contains('+') && !a.contains('/'));
    }

    #[test]
    fn body_changes_the_signature() {
        let s = signer();
        let without = s.sign(1_700_000_000, "POST", "/order", None);
        let with = s.sign(1_700_000_000, "POST", "/order", Some("{\"order\":{}}"));
        assert_ne!(without, with);
    }

    #[test]
    fn standard_base64_secret_is_accepted() {
        // A secret that is valid standard base64 but not URL-safe.
        let std_secret = STANDARD.encode([0xfbu8, 0xef, 0xbe, 0x01, 0x02]);
        assert!(std_secret.contains('+') || std_secret.contains('/'));

        let creds =
            Credentials::new("k", std_secret, "p", WALLET, None, "0xpk").unwrap();
        assert!(RequestSigner::new(&creds).is_ok());
    }

    #[test]
    fn header_set_is_complete() {
        let s = signer();
        let h = s.headers(1_700_000_000, "GET", "/balance-allowance", None);
        let pairs = h.as_pairs();
        assert_eq!(pairs[0], ("POLY_ADDRESS", WALLET));
        assert_eq!(pairs[2].1, "1700000000");
        assert_eq!(pairs[3].1, "api-key");
        assert_eq!(pairs[4].1, "passphrase");
    }

    #[test]
    fn unconfigured_credentials_cannot_sign() {
        let creds = Credentials::new("", "", "", WALLET, None, "").unwrap();
        assert!(matches!(RequestSigner::new(&creds), Err(AuthError::NotConfigured)));
    }
}
