//! Tracked users and copy trades.

use model::{CopyTradeStatus, Side};
use rusqlite::{params, OptionalExtension, Row};

use crate::error::StoreError;
use crate::store::{corrupt, parse_decimal, Store};
use crate::types::{CopyTrade, NewCopyTrade, TrackedUser};

impl Store {
    // ------------------------------------------------------------------
    // Tracked users
    // ------------------------------------------------------------------

    /// Upsert a tracked wallet with `active = true`.
    pub fn track_user(&self, address: &str, label: &str) -> Result<TrackedUser, StoreError> {
        let address = address.trim().to_lowercase();
        let now = Self::now();
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO tracked_users (address, label, active, created_at, updated_at)
             VALUES (?1, ?2, 1, ?3, ?3)
             ON CONFLICT(address) DO UPDATE SET
                 label = excluded.label,
                 active = 1,
                 updated_at = excluded.updated_at",
            params![address, label, now],
        )?;
        drop(conn);
        self.tracked_user(&address)?
            .ok_or(StoreError::NotFound("tracked user"))
    }

    pub fn tracked_user(&self, address: &str) -> Result<Option<TrackedUser>, StoreError> {
        let conn = self.conn.lock();
        let user = conn
            .query_row(
                "SELECT address, label, active, created_at, updated_at
                 FROM tracked_users WHERE address = ?1",
                params![address.to_lowercase()],
                tracked_user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    /// All tracked users, optionally only the active ones.
    pub fn tracked_users(&self, active_only: bool) -> Result<Vec<TrackedUser>, StoreError> {
        let conn = self.conn.lock();
        let sql = if active_only {
            "SELECT address, label, active, created_at, updated_at
             FROM tracked_users WHERE active = 1 ORDER BY created_at"
        } else {
            "SELECT address, label, active, created_at, updated_at
             FROM tracked_users ORDER BY created_at"
        };
        let mut stmt = conn.prepare(sql)?;
        let users = stmt
            .query_map([], tracked_user_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(users)
    }

    /// Archive: stop polling but keep history.
    pub fn untrack_user(&self, address: &str) -> Result<(), StoreError> {
        self.set_tracked_active(address, false)
    }

    /// Undo an archive.
    pub fn restore_user(&self, address: &str) -> Result<(), StoreError> {
        self.set_tracked_active(address, true)
    }

    fn set_tracked_active(&self, address: &str, active: bool) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        let n = conn.execute(
            "UPDATE tracked_users SET active = ?2, updated_at = ?3 WHERE address = ?1",
            params![address.to_lowercase(), active, Self::now()],
        )?;
        if n == 0 {
            return Err(StoreError::NotFound("tracked user"));
        }
        Ok(())
    }

    /// Permanent removal; only archived users may be deleted.
    pub fn delete_tracked_user(&self, address: &str) -> Result<(), StoreError> {
        let address = address.to_lowercase();
        let Some(user) = self.tracked_user(&address)? else {
            return Err(StoreError::NotFound("tracked user"));
        };
        if user.active {
            return Err(StoreError::Conflict(
                "tracked user must be archived before deletion".to_string(),
            ));
        }
        let conn = self.conn.lock();
        conn.execute("DELETE FROM tracked_users WHERE address = ?1", params![address])?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Copy trades
    // ------------------------------------------------------------------

    /// The anti-duplication gate: has this source trade been copied?
    pub fn copy_trade_exists(&self, original_trade_id: &str) -> Result<bool, StoreError> {
        let conn = self.conn.lock();
        let found: Option<i64> = conn
            .query_row(
                "SELECT id FROM copy_trades WHERE original_trade_id = ?1",
                params![original_trade_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Idempotent insert keyed on `original_trade_id`. Returns the stored
    /// row, or `None` when a row for this source trade already existed
    /// (nothing is written in that case).
    pub fn insert_copy_trade(&self, new: &NewCopyTrade) -> Result<Option<CopyTrade>, StoreError> {
        let now = Self::now();
        let executed_at =
            matches!(new.status, CopyTradeStatus::Executed | CopyTradeStatus::Simulated)
                .then_some(now);
        let conn = self.conn.lock();
        let n = conn.execute(
            "INSERT OR IGNORE INTO copy_trades
                 (source_address, original_trade_id, market, asset_id, side,
                  original_size, original_price, copy_size, status,
                  executed_at, error_message, title, outcome, event_slug,
                  inserted_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            params![
                new.source_address,
                new.original_trade_id,
                new.market,
                new.asset_id,
                new.side.as_venue_str(),
                new.original_size.to_string(),
                new.original_price.to_string(),
                new.copy_size.to_string(),
                new.status.as_str(),
                executed_at,
                new.error_message,
                new.title,
                new.outcome,
                new.event_slug,
                now,
            ],
        )?;
        drop(conn);
        if n == 0 {
            return Ok(None);
        }
        self.copy_trade_by_original(&new.original_trade_id)
    }

    pub fn copy_trade(&self, id: i64) -> Result<Option<CopyTrade>, StoreError> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT id, source_address, original_trade_id, market, asset_id, side,
                    original_size, original_price, copy_size, status, executed_at,
                    error_message, title, outcome, event_slug
             FROM copy_trades WHERE id = ?1",
            params![id],
            copy_trade_from_row,
        )
        .optional()?
        .transpose()
    }

    pub fn copy_trade_by_original(
        &self,
        original_trade_id: &str,
    ) -> Result<Option<CopyTrade>, StoreError> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT id, source_address, original_trade_id, market, asset_id, side,
                    original_size, original_price, copy_size, status, executed_at,
                    error_message, title, outcome, event_slug
             FROM copy_trades WHERE original_trade_id = ?1",
            params![original_trade_id],
            copy_trade_from_row,
        )
        .optional()?
        .transpose()
    }

    /// Newest first.
    pub fn recent_copy_trades(&self, limit: u32) -> Result<Vec<CopyTrade>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, source_address, original_trade_id, market, asset_id, side,
                    original_size, original_price, copy_size, status, executed_at,
                    error_message, title, outcome, event_slug
             FROM copy_trades ORDER BY inserted_at DESC, id DESC LIMIT ?1",
        )?;
        let rows = stmt
            .query_map(params![limit], copy_trade_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().collect()
    }

    /// Transition after a retry: `failed -> executed | failed`.
    pub fn update_copy_trade_status(
        &self,
        id: i64,
        status: CopyTradeStatus,
        error_message: Option<&str>,
    ) -> Result<(), StoreError> {
        let executed_at =
            matches!(status, CopyTradeStatus::Executed | CopyTradeStatus::Simulated)
                .then_some(Self::now());
        let conn = self.conn.lock();
        let n = conn.execute(
            "UPDATE copy_trades
             SET status = ?2, executed_at = COALESCE(?3, executed_at), error_message = ?4
             WHERE id = ?1",
            params![id, status.as_str(), executed_at, error_message],
        )?;
        if n == 0 {
            return Err(StoreError::NotFound("copy trade"));
        }
        Ok(())
    }

    pub fn delete_copy_trade(&self, id: i64) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        let n = conn.execute("DELETE FROM copy_trades WHERE id = ?1", params![id])?;
        if n == 0 {
            return Err(StoreError::NotFound("copy trade"));
        }
        Ok(())
    }
}

fn tracked_user_from_row(row: &Row<'_>) -> rusqlite::Result<TrackedUser> {
    Ok(TrackedUser {
        address: row.get(0)?,
        label: row.get(1)?,
        active: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

fn copy_trade_from_row(row: &Row<'_>) -> rusqlite::Result<Result<CopyTrade, StoreError>> {
    let side: String = row.get(5)?;
    let original_size: String = row.get(6)?;
    let original_price: String = row.get(7)?;
    let copy_size: String = row.get(8)?;
    let status: String = row.get(9)?;

    Ok((|| {
        Ok(CopyTrade {
            id: row.get(0)?,
            source_address: row.get(1)?,
            original_trade_id: row.get(2)?,
            market: row.get(3)?,
            asset_id: row.get(4)?,
            side: Side::from_venue_str(&side).ok_or_else(|| corrupt("side", &side))?,
            original_size: parse_decimal("original_size", &original_size)?,
            original_price: parse_decimal("original_price", &original_price)?,
            copy_size: parse_decimal("copy_size", &copy_size)?,
            status: CopyTradeStatus::from_str(&status).ok_or_else(|| corrupt("status", &status))?,
            executed_at: row.get(10)?,
            error_message: row.get(11)?,
            title: row.get(12)?,
            outcome: row.get(13)?,
            event_slug: row.get(14)?,
        })
    })())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn new_copy(id: &str, status: CopyTradeStatus) -> NewCopyTrade {
        NewCopyTrade {
            source_address: "0xabc".to_string(),
            original_trade_id: id.to_string(),
            market: "0xcond".to_string(),
            asset_id: "123".to_string(),
            side: Side::Buy,
            original_size: dec!(20),
            original_price: dec!(0.9),
            copy_size: dec!(11.11),
            status,
            error_message: None,
            title: "Will it?".to_string(),
            outcome: "Yes".to_string(),
            event_slug: "will-it".to_string(),
        }
    }

    #[test]
    fn track_archive_restore_delete() {
        let store = Store::open_in_memory().unwrap();
        let user = store.track_user("0xABCDEF", "whale").unwrap();
        assert_eq!(user.address, "0xabcdef");
        assert!(user.active);

        // Delete refused while active.
        assert!(matches!(
            store.delete_tracked_user("0xabcdef"),
            Err(StoreError::Conflict(_))
        ));

        store.untrack_user("0xabcdef").unwrap();
        assert!(!store.tracked_user("0xabcdef").unwrap().unwrap().active);
        assert!(store.tracked_users(true).unwrap().is_empty());

        store.restore_user("0xabcdef").unwrap();
        assert!(store.tracked_user("0xabcdef").unwrap().unwrap().active);

        store.untrack_user("0xabcdef").unwrap();
        store.delete_tracked_user("0xabcdef").unwrap();
        assert!(store.tracked_user("0xabcdef").unwrap().is_none());
    }

    #[test]
    fn re_tracking_reactivates_and_relabels() {
        let store = Store::open_in_memory().unwrap();
        store.track_user("0xabc", "old").unwrap();
        store.untrack_user("0xabc").unwrap();

        let user = store.track_user("0xAbC", "new").unwrap();
        assert!(user.active);
        assert_eq!(user.label, "new");
        assert_eq!(store.tracked_users(false).unwrap().len(), 1);
    }

    #[test]
    fn copy_trade_insert_is_idempotent() {
        let store = Store::open_in_memory().unwrap();

        let first = store
            .insert_copy_trade(&new_copy("0xhash1", CopyTradeStatus::Executed))
            .unwrap();
        assert!(first.is_some());
        assert!(store.copy_trade_exists("0xhash1").unwrap());

        // Same source trade again: no new row.
        let second = store
            .insert_copy_trade(&new_copy("0xhash1", CopyTradeStatus::Executed))
            .unwrap();
        assert!(second.is_none());
        assert_eq!(store.recent_copy_trades(10).unwrap().len(), 1);
    }

    #[test]
    fn failed_copy_can_be_retried_to_executed() {
        let store = Store::open_in_memory().unwrap();
        let mut failed = new_copy("0xhash2", CopyTradeStatus::Failed);
        failed.error_message = Some("insufficient balance".to_string());
        let row = store.insert_copy_trade(&failed).unwrap().unwrap();
        assert_eq!(row.status, CopyTradeStatus::Failed);
        assert!(row.executed_at.is_none());

        store
            .update_copy_trade_status(row.id, CopyTradeStatus::Executed, None)
            .unwrap();
        let updated = store.copy_trade(row.id).unwrap().unwrap();
        assert_eq!(updated.status, CopyTradeStatus::Executed);
        assert!(updated.executed_at.is_some());
        assert!(updated.error_message.is_none());
    }

    #[test]
    fn executed_rows_get_a_timestamp() {
        let store = Store::open_in_memory().unwrap();
        let row = store
            .insert_copy_trade(&new_copy("0xhash3", CopyTradeStatus::Executed))
            .unwrap()
            .unwrap();
        assert!(row.executed_at.is_some());
    }
}
