//! Strategies, their event log, positions and trades.

use model::{EventKind, Position, PositionSide, Side, StrategyStatus, TradeStatus};
use rusqlite::{params, OptionalExtension, Row};
use rust_decimal::Decimal;
use serde_json::Value;

use crate::error::StoreError;
use crate::store::{corrupt, parse_decimal, Store};
use crate::types::{NewTrade, StrategyEvent, StrategyRow, TradeRow};

impl Store {
    // ------------------------------------------------------------------
    // Strategies
    // ------------------------------------------------------------------

    pub fn insert_strategy(
        &self,
        name: &str,
        kind: &str,
        config: &Value,
        paper_mode: bool,
    ) -> Result<StrategyRow, StoreError> {
        let now = Self::now();
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO strategies (name, kind, config, status, paper_mode, inserted_at, updated_at)
             VALUES (?1, ?2, ?3, 'stopped', ?4, ?5, ?5)",
            params![name, kind, config.to_string(), paper_mode, now],
        )?;
        let id = conn.last_insert_rowid();
        drop(conn);
        self.strategy(id)?.ok_or(StoreError::NotFound("strategy"))
    }

    pub fn strategy(&self, id: i64) -> Result<Option<StrategyRow>, StoreError> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT id, name, kind, config, status, paper_mode FROM strategies WHERE id = ?1",
            params![id],
            strategy_from_row,
        )
        .optional()?
        .transpose()
    }

    pub fn strategies(&self) -> Result<Vec<StrategyRow>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, name, kind, config, status, paper_mode FROM strategies ORDER BY id",
        )?;
        let rows = stmt
            .query_map([], strategy_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().collect()
    }

    /// Strategies whose persisted intent matches `status`; used at boot to
    /// re-start everything that was running before the restart.
    pub fn strategies_with_status(
        &self,
        status: StrategyStatus,
    ) -> Result<Vec<StrategyRow>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, name, kind, config, status, paper_mode
             FROM strategies WHERE status = ?1 ORDER BY id",
        )?;
        let rows = stmt
            .query_map(params![status.as_str()], strategy_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().collect()
    }

    pub fn update_strategy_status(&self, id: i64, status: StrategyStatus) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        let n = conn.execute(
            "UPDATE strategies SET status = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, status.as_str(), Self::now()],
        )?;
        if n == 0 {
            return Err(StoreError::NotFound("strategy"));
        }
        Ok(())
    }

    pub fn update_strategy_config(&self, id: i64, config: &Value) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        let n = conn.execute(
            "UPDATE strategies SET config = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, config.to_string(), Self::now()],
        )?;
        if n == 0 {
            return Err(StoreError::NotFound("strategy"));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Strategy event log (append-only)
    // ------------------------------------------------------------------

    pub fn append_event(
        &self,
        strategy_id: i64,
        kind: EventKind,
        message: &str,
        metadata: &Value,
    ) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO strategy_events (strategy_id, kind, message, metadata, inserted_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![strategy_id, kind.as_str(), message, metadata.to_string(), Self::now()],
        )?;
        Ok(())
    }

    /// Newest first.
    pub fn recent_events(
        &self,
        strategy_id: i64,
        limit: u32,
    ) -> Result<Vec<StrategyEvent>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, strategy_id, kind, message, metadata, inserted_at
             FROM strategy_events WHERE strategy_id = ?1
             ORDER BY inserted_at DESC, id DESC LIMIT ?2",
        )?;
        let rows = stmt
            .query_map(params![strategy_id, limit], event_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().collect()
    }

    // ------------------------------------------------------------------
    // Positions
    // ------------------------------------------------------------------

    pub fn position(&self, strategy_id: i64, token_id: &str) -> Result<Option<Position>, StoreError> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT strategy_id, token_id, side, size, avg_price, current_price
             FROM positions WHERE strategy_id = ?1 AND token_id = ?2",
            params![strategy_id, token_id],
            position_from_row,
        )
        .optional()?
        .transpose()
    }

    pub fn positions(&self, strategy_id: i64) -> Result<Vec<Position>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT strategy_id, token_id, side, size, avg_price, current_price
             FROM positions WHERE strategy_id = ?1 ORDER BY token_id",
        )?;
        let rows = stmt
            .query_map(params![strategy_id], position_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().collect()
    }

    /// Apply a fill to the `(strategy_id, token_id)` position inside one
    /// transaction: BUYs grow size and re-weight the average price, SELLs
    /// only shrink size. A missing position is created from the fill.
    pub fn apply_fill(
        &self,
        strategy_id: i64,
        token_id: &str,
        side: Side,
        size: Decimal,
        price: Decimal,
    ) -> Result<Position, StoreError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        let existing = tx
            .query_row(
                "SELECT strategy_id, token_id, side, size, avg_price, current_price
                 FROM positions WHERE strategy_id = ?1 AND token_id = ?2",
                params![strategy_id, token_id],
                position_from_row,
            )
            .optional()?
            .transpose()?;

        let position = match existing {
            Some(mut pos) => {
                match side {
                    Side::Buy => pos.apply_buy(size, price),
                    Side::Sell => pos.apply_sell(size, price),
                }
                pos
            }
            None => Position::open(strategy_id, token_id, side, size, price),
        };

        tx.execute(
            "INSERT INTO positions
                 (strategy_id, token_id, side, size, avg_price, current_price, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(strategy_id, token_id) DO UPDATE SET
                 size = excluded.size,
                 avg_price = excluded.avg_price,
                 current_price = excluded.current_price,
                 updated_at = excluded.updated_at",
            params![
                strategy_id,
                token_id,
                position.side.as_str(),
                position.size.to_string(),
                position.avg_price.to_string(),
                position.current_price.to_string(),
                Self::now(),
            ],
        )?;
        tx.commit()?;
        Ok(position)
    }

    // ------------------------------------------------------------------
    // Trades
    // ------------------------------------------------------------------

    pub fn insert_trade(&self, new: &NewTrade) -> Result<i64, StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO trades
                 (strategy_id, market_id, asset_id, side, price, size, status,
                  title, outcome, inserted_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                new.strategy_id,
                new.market_id,
                new.asset_id,
                new.side.as_venue_str(),
                new.price.to_string(),
                new.size.to_string(),
                new.status.as_str(),
                new.title,
                new.outcome,
                Self::now(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn trade(&self, id: i64) -> Result<Option<TradeRow>, StoreError> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT id, strategy_id, market_id, asset_id, side, price, size, status,
                    order_id, error_message, title, outcome, pnl, inserted_at
             FROM trades WHERE id = ?1",
            params![id],
            trade_from_row,
        )
        .optional()?
        .transpose()
    }

    pub fn recent_trades(&self, strategy_id: i64, limit: u32) -> Result<Vec<TradeRow>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, strategy_id, market_id, asset_id, side, price, size, status,
                    order_id, error_message, title, outcome, pnl, inserted_at
             FROM trades WHERE strategy_id = ?1
             ORDER BY inserted_at DESC, id DESC LIMIT ?2",
        )?;
        let rows = stmt
            .query_map(params![strategy_id, limit], trade_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().collect()
    }

    /// `pending -> submitted` with the venue order id.
    pub fn mark_trade_submitted(&self, id: i64, order_id: &str) -> Result<(), StoreError> {
        self.update_trade(id, TradeStatus::Submitted, Some(order_id), None)
    }

    /// Paper fills go straight to `filled`.
    pub fn mark_trade_filled(&self, id: i64) -> Result<(), StoreError> {
        self.update_trade(id, TradeStatus::Filled, None, None)
    }

    pub fn mark_trade_failed(&self, id: i64, error: &str) -> Result<(), StoreError> {
        self.update_trade(id, TradeStatus::Failed, None, Some(error))
    }

    fn update_trade(
        &self,
        id: i64,
        status: TradeStatus,
        order_id: Option<&str>,
        error: Option<&str>,
    ) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        let n = conn.execute(
            "UPDATE trades
             SET status = ?2, order_id = COALESCE(?3, order_id),
                 error_message = COALESCE(?4, error_message)
             WHERE id = ?1",
            params![id, status.as_str(), order_id, error],
        )?;
        if n == 0 {
            return Err(StoreError::NotFound("trade"));
        }
        Ok(())
    }
}

fn strategy_from_row(row: &Row<'_>) -> rusqlite::Result<Result<StrategyRow, StoreError>> {
    let config: String = row.get(3)?;
    let status: String = row.get(4)?;
    Ok((|| {
        Ok(StrategyRow {
            id: row.get(0)?,
            name: row.get(1)?,
            kind: row.get(2)?,
            config: serde_json::from_str(&config).map_err(|_| corrupt("config", &config))?,
            status: StrategyStatus::from_str(&status).ok_or_else(|| corrupt("status", &status))?,
            paper_mode: row.get(5)?,
        })
    })())
}

fn event_from_row(row: &Row<'_>) -> rusqlite::Result<Result<StrategyEvent, StoreError>> {
    let kind: String = row.get(2)?;
    let metadata: String = row.get(4)?;
    Ok((|| {
        Ok(StrategyEvent {
            id: row.get(0)?,
            strategy_id: row.get(1)?,
            kind: EventKind::from_str(&kind).ok_or_else(|| corrupt("kind", &kind))?,
            message: row.get(3)?,
            metadata: serde_json::from_str(&metadata).map_err(|_| corrupt("metadata", &metadata))?,
            inserted_at: row.get(5)?,
        })
    })())
}

fn position_from_row(row: &Row<'_>) -> rusqlite::Result<Result<Position, StoreError>> {
    let side: String = row.get(2)?;
    let size: String = row.get(3)?;
    let avg_price: String = row.get(4)?;
    let current_price: String = row.get(5)?;
    Ok((|| {
        Ok(Position {
            strategy_id: row.get(0)?,
            token_id: row.get(1)?,
            side: PositionSide::from_str(&side).ok_or_else(|| corrupt("side", &side))?,
            size: parse_decimal("size", &size)?,
            avg_price: parse_decimal("avg_price", &avg_price)?,
            current_price: parse_decimal("current_price", &current_price)?,
        })
    })())
}

fn trade_from_row(row: &Row<'_>) -> rusqlite::Result<Result<TradeRow, StoreError>> {
    let side: String = row.get(4)?;
    let price: String = row.get(5)?;
    let size: String = row.get(6)?;
    let status: String = row.get(7)?;
    let pnl: Option<String> = row.get(12)?;
    Ok((|| {
        Ok(TradeRow {
            id: row.get(0)?,
            strategy_id: row.get(1)?,
            market_id: row.get(2)?,
            asset_id: row.get(3)?,
            side: Side::from_venue_str(&side).ok_or_else(|| corrupt("side", &side))?,
            price: parse_decimal("price", &price)?,
            size: parse_decimal("size", &size)?,
            status: TradeStatus::from_str(&status).ok_or_else(|| corrupt("status", &status))?,
            order_id: row.get(8)?,
            error_message: row.get(9)?,
            title: row.get(10)?,
            outcome: row.get(11)?,
            pnl: pnl.map(|p| parse_decimal("pnl", &p)).transpose()?,
            inserted_at: row.get(13)?,
        })
    })())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn store_with_strategy() -> (Store, i64) {
        let store = Store::open_in_memory().unwrap();
        let row = store
            .insert_strategy("decay-15m", "time_decay", &json!({"interval": "15m"}), true)
            .unwrap();
        (store, row.id)
    }

    #[test]
    fn strategy_lifecycle_round_trip() {
        let (store, id) = store_with_strategy();
        let row = store.strategy(id).unwrap().unwrap();
        assert_eq!(row.kind, "time_decay");
        assert_eq!(row.status, StrategyStatus::Stopped);
        assert!(row.paper_mode);

        store.update_strategy_status(id, StrategyStatus::Running).unwrap();
        assert_eq!(
            store.strategies_with_status(StrategyStatus::Running).unwrap().len(),
            1
        );

        store.update_strategy_status(id, StrategyStatus::Error).unwrap();
        assert!(store
            .strategies_with_status(StrategyStatus::Running)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn event_log_is_append_only_and_ordered() {
        let (store, id) = store_with_strategy();
        store
            .append_event(id, EventKind::Info, "started", &json!({}))
            .unwrap();
        store
            .append_event(id, EventKind::Signal, "buy signal", &json!({"price": "0.96"}))
            .unwrap();

        let events = store.recent_events(id, 10).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, EventKind::Signal);
        assert_eq!(events[1].message, "started");
    }

    #[test]
    fn fills_upsert_one_position_per_token() {
        let (store, id) = store_with_strategy();

        store.apply_fill(id, "tok", Side::Buy, dec!(10), dec!(0.40)).unwrap();
        let pos = store.apply_fill(id, "tok", Side::Buy, dec!(30), dec!(0.60)).unwrap();
        assert_eq!(pos.size, dec!(40));
        assert_eq!(pos.avg_price, dec!(0.55));

        let pos = store.apply_fill(id, "tok", Side::Sell, dec!(15), dec!(0.70)).unwrap();
        assert_eq!(pos.size, dec!(25));
        assert_eq!(pos.avg_price, dec!(0.55));

        assert_eq!(store.positions(id).unwrap().len(), 1);
    }

    #[test]
    fn trade_status_transitions() {
        let (store, id) = store_with_strategy();
        let trade_id = store
            .insert_trade(&NewTrade {
                strategy_id: id,
                market_id: "0xcond".to_string(),
                asset_id: "tok".to_string(),
                side: Side::Buy,
                price: dec!(0.96),
                size: dec!(10),
                status: TradeStatus::Pending,
                title: "Will it?".to_string(),
                outcome: "Yes".to_string(),
            })
            .unwrap();

        store.mark_trade_submitted(trade_id, "order-123").unwrap();
        let row = store.trade(trade_id).unwrap().unwrap();
        assert_eq!(row.status, TradeStatus::Submitted);
        assert_eq!(row.order_id.as_deref(), Some("order-123"));

        store.mark_trade_failed(trade_id, "venue rejected").unwrap();
        let row = store.trade(trade_id).unwrap().unwrap();
        assert_eq!(row.status, TradeStatus::Failed);
        assert_eq!(row.error_message.as_deref(), Some("venue rejected"));
    }
}
