//! Schema creation and migrations, applied at boot.

use rusqlite::Connection;

/// Create all tables and indexes. Idempotent.
pub fn migrate(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS credentials (
            id              TEXT PRIMARY KEY,
            api_key         TEXT NOT NULL DEFAULT '',
            api_secret      TEXT NOT NULL DEFAULT '',
            api_passphrase  TEXT NOT NULL DEFAULT '',
            wallet_address  TEXT NOT NULL DEFAULT '',
            signer_address  TEXT,
            private_key     TEXT NOT NULL DEFAULT '',
            updated_at      INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS copy_trading_settings (
            id                  TEXT PRIMARY KEY,
            sizing_mode         TEXT NOT NULL DEFAULT 'fixed',
            fixed_amount        TEXT NOT NULL DEFAULT '10',
            proportional_factor TEXT NOT NULL DEFAULT '0.1',
            percentage          TEXT NOT NULL DEFAULT '1',
            enabled             INTEGER NOT NULL DEFAULT 0,
            updated_at          INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS tracked_users (
            address     TEXT PRIMARY KEY,
            label       TEXT NOT NULL DEFAULT '',
            active      INTEGER NOT NULL DEFAULT 1,
            created_at  INTEGER NOT NULL,
            updated_at  INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS copy_trades (
            id                INTEGER PRIMARY KEY AUTOINCREMENT,
            source_address    TEXT NOT NULL,
            original_trade_id TEXT NOT NULL UNIQUE,
            market            TEXT NOT NULL DEFAULT '',
            asset_id          TEXT NOT NULL,
            side              TEXT NOT NULL,
            original_size     TEXT NOT NULL,
            original_price    TEXT NOT NULL,
            copy_size         TEXT NOT NULL,
            status            TEXT NOT NULL,
            executed_at       INTEGER,
            error_message     TEXT,
            title             TEXT NOT NULL DEFAULT '',
            outcome           TEXT NOT NULL DEFAULT '',
            event_slug        TEXT NOT NULL DEFAULT '',
            inserted_at       INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_copy_trades_source
            ON copy_trades(source_address, inserted_at DESC);

        CREATE TABLE IF NOT EXISTS strategies (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            name        TEXT NOT NULL,
            kind        TEXT NOT NULL,
            config      TEXT NOT NULL DEFAULT '{}',
            status      TEXT NOT NULL DEFAULT 'stopped',
            paper_mode  INTEGER NOT NULL DEFAULT 1,
            inserted_at INTEGER NOT NULL,
            updated_at  INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS strategy_events (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            strategy_id INTEGER NOT NULL,
            kind        TEXT NOT NULL,
            message     TEXT NOT NULL,
            metadata    TEXT NOT NULL DEFAULT '{}',
            inserted_at INTEGER NOT NULL,
            FOREIGN KEY (strategy_id) REFERENCES strategies(id)
        );
        CREATE INDEX IF NOT EXISTS idx_events_strategy_time
            ON strategy_events(strategy_id, inserted_at DESC);

        CREATE TABLE IF NOT EXISTS positions (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            strategy_id   INTEGER NOT NULL,
            token_id      TEXT NOT NULL,
            side          TEXT NOT NULL,
            size          TEXT NOT NULL,
            avg_price     TEXT NOT NULL,
            current_price TEXT NOT NULL,
            updated_at    INTEGER NOT NULL,
            UNIQUE (strategy_id, token_id)
        );

        CREATE TABLE IF NOT EXISTS trades (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            strategy_id   INTEGER NOT NULL,
            market_id     TEXT NOT NULL DEFAULT '',
            asset_id      TEXT NOT NULL,
            side          TEXT NOT NULL,
            price         TEXT NOT NULL,
            size          TEXT NOT NULL,
            status        TEXT NOT NULL,
            order_id      TEXT,
            error_message TEXT,
            title         TEXT NOT NULL DEFAULT '',
            outcome       TEXT NOT NULL DEFAULT '',
            pnl           TEXT,
            inserted_at   INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_trades_strategy_time
            ON trades(strategy_id, inserted_at DESC);
        ",
    )?;

    Ok(())
}
