//! Venue credentials: API key triple, wallet addresses, signing key.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::error::AuthError;

/// The singleton credentials record.
///
/// Addresses are validated against `0x` + 40 hex chars and stored
/// lowercased. The private key never appears in `Debug` output.
#[derive(Clone)]
pub struct Credentials {
    pub api_key: String,
    pub api_secret: String,
    pub api_passphrase: String,
    /// Funding wallet; `maker` of every signed order.
    pub wallet_address: String,
    /// Optional separate signing address (proxy mode when it differs from
    /// the wallet).
    pub signer_address: Option<String>,
    private_key: SecretString,
}

impl Credentials {
    pub fn new(
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
        api_passphrase: impl Into<String>,
        wallet_address: &str,
        signer_address: Option<&str>,
        private_key: impl Into<String>,
    ) -> Result<Self, AuthError> {
        let wallet_address = normalize_address(wallet_address)?;
        let signer_address = signer_address.map(normalize_address).transpose()?;

        Ok(Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            api_passphrase: api_passphrase.into(),
            wallet_address,
            signer_address,
            private_key: SecretString::from(private_key.into()),
        })
    }

    /// True when every field needed for authenticated trading is present.
    pub fn configured(&self) -> bool {
        !self.api_key.is_empty()
            && !self.api_secret.is_empty()
            && !self.api_passphrase.is_empty()
            && !self.wallet_address.is_empty()
            && !self.expose_private_key().is_empty()
    }

    /// Address sent in `POLY_ADDRESS`: the signer when set, else the wallet.
    pub fn auth_address(&self) -> &str {
        self.signer_address.as_deref().unwrap_or(&self.wallet_address)
    }

    /// Proxy-signer mode: a distinct signer trades on behalf of the wallet.
    pub fn uses_proxy_signer(&self) -> bool {
        matches!(&self.signer_address, Some(s) if s != &self.wallet_address)
    }

    /// Expose the wallet private key for signing. Never log the result.
    pub fn expose_private_key(&self) -> &str {
        self.private_key.expose_secret()
    }

    /// Display form with every secret masked.
    pub fn masked(&self) -> MaskedCredentials {
        MaskedCredentials {
            api_key: mask_secret(&self.api_key),
            api_secret: mask_secret(&self.api_secret),
            api_passphrase: mask_secret(&self.api_passphrase),
            wallet_address: self.wallet_address.clone(),
            signer_address: self.signer_address.clone(),
            private_key: mask_secret(self.expose_private_key()),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &mask_secret(&self.api_key))
            .field("wallet_address", &self.wallet_address)
            .field("signer_address", &self.signer_address)
            .field("private_key", &"[REDACTED]")
            .finish()
    }
}

/// Credentials with secrets bulleted out, safe to render.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaskedCredentials {
    pub api_key: String,
    pub api_secret: String,
    pub api_passphrase: String,
    pub wallet_address: String,
    pub signer_address: Option<String>,
    pub private_key: String,
}

/// Keep the first and last 4 chars, bullet the middle; short values are
/// bulleted entirely.
pub fn mask_secret(value: &str) -> String {
    let n = value.chars().count();
    if n == 0 {
        return String::new();
    }
    if n <= 8 {
        return "•".repeat(n);
    }
    let head: String = value.chars().take(4).collect();
    let tail: String = value.chars().skip(n - 4).collect();
    format!("{head}{}{tail}", "•".repeat(n - 8))
}

/// Validate `0x` + 40 hex chars and lowercase. An empty address is kept
/// empty: the record exists before the operator fills it in, and
/// `configured()` gates every use.
fn normalize_address(addr: &str) -> Result<String, AuthError> {
    let lower = addr.trim().to_lowercase();
    if lower.is_empty() {
        return Ok(lower);
    }
    let hex_part = lower
        .strip_prefix("0x")
        .ok_or_else(|| AuthError::InvalidAddress(addr.to_string()))?;
    if hex_part.len() != 40 || !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(AuthError::InvalidAddress(addr.to_string()));
    }
    Ok(lower)
}

#[cfg(test)]
mod tests {
    use super::*;

    const WALLET: &str = "0xAbCdEf0123456789abcdef0123456789ABCDEF01";

    fn creds() -> Credentials {
        Credentials::new("key", "secret", "pass", WALLET, None, "0xdeadbeef").unwrap()
    }

    #[test]
    fn addresses_are_lowercased() {
        assert_eq!(creds().wallet_address, WALLET.to_lowercase());
    }

    #[test]
    fn bad_addresses_are_rejected() {
        for bad in ["0x123", "abcdef0123456789abcdef0123456789abcdef01", "0xzzzdef0123456789abcdef0123456789abcdef01"] {
            assert!(Credentials::new("k", "s", "p", bad, None, "pk").is_err());
        }
    }

    #[test]
    fn configured_requires_all_fields() {
        assert!(creds().configured());
        let empty_key = Credentials::new("", "s", "p", WALLET, None, "pk").unwrap();
        assert!(!empty_key.configured());
        let empty_pk = Credentials::new("k", "s", "p", WALLET, None, "").unwrap();
        assert!(!empty_pk.configured());
    }

    #[test]
    fn proxy_mode_only_when_signer_differs() {
        let eoa = Credentials::new("k", "s", "p", WALLET, Some(WALLET), "pk").unwrap();
        assert!(!eoa.uses_proxy_signer());
        assert_eq!(eoa.auth_address(), WALLET.to_lowercase());

        let proxy = Credentials::new(
            "k",
            "s",
            "p",
            WALLET,
            Some("0x1111111111111111111111111111111111111111"),
            "pk",
        )
        .unwrap();
        assert!(proxy.uses_proxy_signer());
        assert_eq!(proxy.auth_address(), "0x1111111111111111111111111111111111111111");
    }

    #[test]
    fn masking_keeps_edges() {
        assert_eq!(mask_secret("abcd1234efgh"), "abcd••••efgh");
        assert_eq!(mask_secret("short"), "•••••");
        assert_eq!(mask_secret(""), "");
    }

    #[test]
    fn debug_never_prints_the_key() {
        let c = Credentials::new("k", "s", "p", WALLET, None, "super-secret-pk").unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("super-secret-pk"));
        assert!(dbg.contains("[REDACTED]"));
    }
}
