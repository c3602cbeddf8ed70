//! The copy executor: turns new-trade events into venue orders.

use std::sync::Arc;

use event_bus::{topic, BusEvent, EventBus};
use model::{ActivityTrade, CopyTradeStatus, Side};
use order_signer::{clamp_price_to_grid, OrderArgs, OrderSigner, OrderType};
use rust_decimal::Decimal;
use storage::{NewCopyTrade, Store};
use tokio::sync::watch;
use tracing::{debug, info, warn};
use venue_client::ClobClient;

use crate::error::CopyError;
use crate::sizing::copy_size;

/// Consumes `new_trade` events and places mirrored orders.
#[derive(Clone)]
pub struct CopyExecutor {
    store: Store,
    clob: Arc<ClobClient>,
    bus: EventBus,
}

impl CopyExecutor {
    pub fn new(store: Store, clob: Arc<ClobClient>, bus: EventBus) -> Self {
        Self { store, clob, bus }
    }

    /// Event loop: runs until shutdown. New-trade events are processed in
    /// arrival order; failures are persisted, never propagated.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut events = self.bus.subscribe(topic::COPY_TRADING);
        info!("copy executor started");

        loop {
            tokio::select! {
                biased;

                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }

                event = events.recv() => {
                    match event {
                        Ok(BusEvent::NewTrade { trade, .. }) => {
                            if let Err(e) = self.handle_new_trade(&trade, false).await {
                                warn!(trade_id = %trade.id, error = %e, "copy execution error");
                            }
                        }
                        Ok(_) => {}
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                            warn!(missed = n, "copy executor lagged behind the bus");
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    }
                }
            }
        }
        info!("copy executor stopped");
    }

    /// Copy one source trade. `force` is the manual-copy path: it bypasses
    /// the `enabled` gate but never the anti-duplication gate.
    pub async fn handle_new_trade(
        &self,
        trade: &ActivityTrade,
        force: bool,
    ) -> Result<(), CopyError> {
        let settings = self.store.settings()?;
        if !settings.enabled && !force {
            debug!(trade_id = %trade.id, "copy trading disabled, skipping");
            return Ok(());
        }
        if self.store.copy_trade_exists(&trade.id)? {
            debug!(trade_id = %trade.id, "already copied, skipping");
            return Ok(());
        }

        let price = clamp_price_to_grid(trade.price);
        let balance = if settings.sizing_mode == model::SizingMode::Percentage {
            match self.clob.balance().await {
                Ok(b) => Some(b),
                Err(e) => {
                    warn!(error = %e, "balance unavailable, using fallback for sizing");
                    None
                }
            }
        } else {
            None
        };
        let shares = copy_size(&settings, trade.size, price, balance);

        let (status, error_message) = match self
            .place_order(&trade.asset_id, trade.side, price, shares)
            .await
        {
            Ok(PlacementOutcome::Placed) => (CopyTradeStatus::Executed, None),
            Ok(PlacementOutcome::Simulated) => (CopyTradeStatus::Simulated, None),
            Err(e) => (CopyTradeStatus::Failed, Some(e.to_string())),
        };

        let stored = self.store.insert_copy_trade(&NewCopyTrade {
            source_address: trade.address.clone(),
            original_trade_id: trade.id.clone(),
            market: trade.market.clone(),
            asset_id: trade.asset_id.clone(),
            side: trade.side,
            original_size: trade.size,
            original_price: trade.price,
            copy_size: shares,
            status,
            error_message,
            title: trade.title.clone(),
            outcome: trade.outcome.clone(),
            event_slug: trade.event_slug.clone(),
        })?;

        if let Some(row) = stored {
            info!(
                copy_trade_id = row.id,
                trade_id = %trade.id,
                status = row.status.as_str(),
                shares = %shares,
                price = %price,
                "copy trade recorded"
            );
            self.bus.publish(
                topic::COPY_TRADING,
                BusEvent::CopyTradeExecuted {
                    copy_trade_id: row.id,
                    status: row.status.as_str().to_string(),
                },
            );
        }
        Ok(())
    }

    /// Retry a stored copy trade using its persisted asset, side, size and
    /// price. Transitions `failed -> executed | failed`.
    pub async fn retry(&self, copy_trade_id: i64) -> Result<CopyTradeStatus, CopyError> {
        let row = self
            .store
            .copy_trade(copy_trade_id)?
            .ok_or(CopyError::UnknownCopyTrade(copy_trade_id))?;

        let price = clamp_price_to_grid(row.original_price);
        let (status, error_message) = match self
            .place_order(&row.asset_id, row.side, price, row.copy_size)
            .await
        {
            Ok(PlacementOutcome::Placed) => (CopyTradeStatus::Executed, None),
            Ok(PlacementOutcome::Simulated) => (CopyTradeStatus::Simulated, None),
            Err(e) => (CopyTradeStatus::Failed, Some(e.to_string())),
        };

        self.store
            .update_copy_trade_status(copy_trade_id, status, error_message.as_deref())?;
        self.bus.publish(
            topic::COPY_TRADING,
            BusEvent::CopyTradeExecuted {
                copy_trade_id,
                status: status.as_str().to_string(),
            },
        );
        Ok(status)
    }

    async fn place_order(
        &self,
        token_id: &str,
        side: Side,
        price: Decimal,
        shares: Decimal,
    ) -> Result<PlacementOutcome, CopyError> {
        let Some(creds) = self.store.credentials()? else {
            debug!("no credentials stored, recording simulated copy");
            return Ok(PlacementOutcome::Simulated);
        };
        if !creds.configured() {
            debug!("credentials incomplete, recording simulated copy");
            return Ok(PlacementOutcome::Simulated);
        }

        let neg_risk = self.clob.market_neg_risk(token_id).await?;
        let signer = OrderSigner::new(
            creds.expose_private_key(),
            &creds.wallet_address,
            creds.signer_address.as_deref(),
        )?;
        let signed = signer.sign_order(&OrderArgs {
            token_id: token_id.to_string(),
            price,
            size: shares,
            is_buy: side == Side::Buy,
            neg_risk,
        })?;

        let request = signed.into_request(creds.api_key.clone(), OrderType::GTC);
        let response = self.clob.post_order(&request).await?;
        debug!(order_id = %response.order_id, "copy order accepted");
        Ok(PlacementOutcome::Placed)
    }
}

enum PlacementOutcome {
    Placed,
    Simulated,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rate_limit::RateLimiter;
    use rust_decimal_macros::dec;
    use storage::CopyTradingSettings;

    fn trade(id: &str, price: Decimal) -> ActivityTrade {
        ActivityTrade {
            id: id.to_string(),
            address: "0xabc".to_string(),
            market: "0xcond".to_string(),
            asset_id: "123".to_string(),
            side: Side::Buy,
            size: dec!(20),
            price,
            outcome: "Yes".to_string(),
            title: "Will it?".to_string(),
            event_slug: "will-it".to_string(),
            timestamp: 1,
        }
    }

    fn executor() -> CopyExecutor {
        let store = Store::open_in_memory().unwrap();
        let mut settings = CopyTradingSettings::default();
        settings.enabled = true;
        store.update_settings(&settings).unwrap();

        let clob = Arc::new(
            ClobClient::new(
                "https://clob.invalid",
                store.clone(),
                RateLimiter::start(),
            )
            .unwrap(),
        );
        CopyExecutor::new(store, clob, EventBus::new())
    }

    #[tokio::test]
    async fn duplicate_source_trades_copy_once() {
        let ex = executor();
        let t = trade("0xhash1", dec!(0.9));

        // No credentials stored: the copy is recorded as simulated, which
        // still arms the anti-duplication gate.
        ex.handle_new_trade(&t, false).await.unwrap();
        ex.handle_new_trade(&t, false).await.unwrap();

        let rows = ex.store.recent_copy_trades(10).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, CopyTradeStatus::Simulated);
        // fixed $10 at 0.9 -> 11.11… shares, above the 5-share minimum
        assert!(rows[0].copy_size > dec!(11.11) && rows[0].copy_size < dec!(11.12));
    }

    #[tokio::test]
    async fn disabled_settings_skip_unless_forced() {
        let ex = executor();
        let mut settings = ex.store.settings().unwrap();
        settings.enabled = false;
        ex.store.update_settings(&settings).unwrap();

        let t = trade("0xhash2", dec!(0.5));
        ex.handle_new_trade(&t, false).await.unwrap();
        assert!(ex.store.recent_copy_trades(10).unwrap().is_empty());

        // Manual copy bypasses the enabled gate.
        ex.handle_new_trade(&t, true).await.unwrap();
        assert_eq!(ex.store.recent_copy_trades(10).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn prices_are_clamped_before_sizing() {
        let ex = executor();
        // 0.9994 clamps to 0.999; sizing divides by the clamped price.
        ex.handle_new_trade(&trade("0xhash3", dec!(0.9994)), false)
            .await
            .unwrap();
        let row = &ex.store.recent_copy_trades(1).unwrap()[0];
        // $10 / 0.999 = 10.01001…
        assert!(row.copy_size > dec!(10.01) && row.copy_size < dec!(10.011));
    }
}
