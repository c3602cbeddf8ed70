//! Store handle, connection lifecycle, credentials and settings.

use std::str::FromStr;
use std::sync::Arc;

use auth::Credentials;
use model::SizingMode;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::Decimal;
use tracing::info;

use crate::error::StoreError;
use crate::schema;
use crate::types::CopyTradingSettings;

const SINGLETON_ID: &str = "default";

/// Handle to the embedded database. Cheap to clone; all access is
/// serialised through one connection.
#[derive(Clone)]
pub struct Store {
    pub(crate) conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Open (or create) the database file and run migrations.
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        schema::migrate(&conn)?;
        info!(path = %path, "database ready");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// In-memory store for tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        schema::migrate(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub(crate) fn now() -> i64 {
        chrono::Utc::now().timestamp()
    }

    // ------------------------------------------------------------------
    // Credentials (singleton row keyed "default")
    // ------------------------------------------------------------------

    /// Replace the credential set. Addresses are validated and lowercased
    /// by [`auth::Credentials`] before anything is written.
    pub fn update_credentials(&self, creds: &Credentials) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO credentials
                 (id, api_key, api_secret, api_passphrase, wallet_address,
                  signer_address, private_key, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(id) DO UPDATE SET
                 api_key = excluded.api_key,
                 api_secret = excluded.api_secret,
                 api_passphrase = excluded.api_passphrase,
                 wallet_address = excluded.wallet_address,
                 signer_address = excluded.signer_address,
                 private_key = excluded.private_key,
                 updated_at = excluded.updated_at",
            params![
                SINGLETON_ID,
                creds.api_key,
                creds.api_secret,
                creds.api_passphrase,
                creds.wallet_address,
                creds.signer_address,
                creds.expose_private_key(),
                Self::now(),
            ],
        )?;
        Ok(())
    }

    /// Load the credential set, or `None` when the row was never written.
    pub fn credentials(&self) -> Result<Option<Credentials>, StoreError> {
        let conn = self.conn.lock();
        let row = conn
            .query_row(
                "SELECT api_key, api_secret, api_passphrase, wallet_address,
                        signer_address, private_key
                 FROM credentials WHERE id = ?1",
                params![SINGLETON_ID],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, Option<String>>(4)?,
                        row.get::<_, String>(5)?,
                    ))
                },
            )
            .optional()?;

        let Some((key, secret, pass, wallet, signer, pk)) = row else {
            return Ok(None);
        };
        let creds = Credentials::new(key, secret, pass, &wallet, signer.as_deref(), pk)?;
        Ok(Some(creds))
    }

    // ------------------------------------------------------------------
    // Copy trading settings (singleton row)
    // ------------------------------------------------------------------

    pub fn update_settings(&self, settings: &CopyTradingSettings) -> Result<(), StoreError> {
        settings.validate()?;
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO copy_trading_settings
                 (id, sizing_mode, fixed_amount, proportional_factor,
                  percentage, enabled, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(id) DO UPDATE SET
                 sizing_mode = excluded.sizing_mode,
                 fixed_amount = excluded.fixed_amount,
                 proportional_factor = excluded.proportional_factor,
                 percentage = excluded.percentage,
                 enabled = excluded.enabled,
                 updated_at = excluded.updated_at",
            params![
                SINGLETON_ID,
                settings.sizing_mode.as_str(),
                settings.fixed_amount.to_string(),
                settings.proportional_factor.to_string(),
                settings.percentage.to_string(),
                settings.enabled,
                Self::now(),
            ],
        )?;
        Ok(())
    }

    /// Current settings; defaults when the row was never written.
    pub fn settings(&self) -> Result<CopyTradingSettings, StoreError> {
        let conn = self.conn.lock();
        let row = conn
            .query_row(
                "SELECT sizing_mode, fixed_amount, proportional_factor, percentage, enabled
                 FROM copy_trading_settings WHERE id = ?1",
                params![SINGLETON_ID],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, bool>(4)?,
                    ))
                },
            )
            .optional()?;

        let Some((mode, fixed, factor, pct, enabled)) = row else {
            return Ok(CopyTradingSettings::default());
        };
        Ok(CopyTradingSettings {
            sizing_mode: SizingMode::from_str(&mode)
                .ok_or_else(|| corrupt("sizing_mode", &mode))?,
            fixed_amount: parse_decimal("fixed_amount", &fixed)?,
            proportional_factor: parse_decimal("proportional_factor", &factor)?,
            percentage: parse_decimal("percentage", &pct)?,
            enabled,
        })
    }
}

pub(crate) fn parse_decimal(column: &'static str, value: &str) -> Result<Decimal, StoreError> {
    Decimal::from_str(value).map_err(|_| corrupt(column, value))
}

pub(crate) fn corrupt(column: &'static str, value: &str) -> StoreError {
    StoreError::Corrupt {
        column,
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const WALLET: &str = "0xAbCdef0123456789abcdef0123456789abcdef01";

    #[test]
    fn credentials_round_trip_and_lowercase() {
        let store = Store::open_in_memory().unwrap();
        assert!(store.credentials().unwrap().is_none());

        let creds = Credentials::new("k", "s", "p", WALLET, None, "0xpk").unwrap();
        store.update_credentials(&creds).unwrap();

        let loaded = store.credentials().unwrap().unwrap();
        assert_eq!(loaded.wallet_address, WALLET.to_lowercase());
        assert_eq!(loaded.api_key, "k");
        assert!(loaded.configured());
    }

    #[test]
    fn updating_credentials_replaces_the_singleton() {
        let store = Store::open_in_memory().unwrap();
        let a = Credentials::new("a", "s", "p", WALLET, None, "pk").unwrap();
        let b = Credentials::new("b", "s", "p", WALLET, None, "pk").unwrap();
        store.update_credentials(&a).unwrap();
        store.update_credentials(&b).unwrap();

        assert_eq!(store.credentials().unwrap().unwrap().api_key, "b");
    }

    #[test]
    fn settings_default_then_round_trip() {
        let store = Store::open_in_memory().unwrap();
        assert_eq!(store.settings().unwrap(), CopyTradingSettings::default());

        let s = CopyTradingSettings {
            sizing_mode: SizingMode::Percentage,
            fixed_amount: dec!(25),
            proportional_factor: dec!(0.5),
            percentage: dec!(2.5),
            enabled: true,
        };
        store.update_settings(&s).unwrap();
        assert_eq!(store.settings().unwrap(), s);
    }

    #[test]
    fn invalid_settings_are_refused() {
        let store = Store::open_in_memory().unwrap();
        let mut s = CopyTradingSettings::default();
        s.percentage = dec!(0);
        assert!(store.update_settings(&s).is_err());
        // Nothing was written.
        assert_eq!(store.settings().unwrap(), CopyTradingSettings::default());
    }
}
