//! Notification seam for downstream consumers. Period close announces that
//! an account's balances changed so dashboards can re-read their
//! aggregates; the engine itself never depends on the outcome.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// Event sink for engine side effects.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// The account's balances changed and downstream aggregates are stale.
    async fn balances_changed(&self, account_id: i32);
}

#[async_trait]
impl<T: EventSink + ?Sized> EventSink for Arc<T> {
    async fn balances_changed(&self, account_id: i32) {
        self.as_ref().balances_changed(account_id).await;
    }
}

/// Default sink: announce through the log stream.
pub struct LogEventSink;

#[async_trait]
impl EventSink for LogEventSink {
    async fn balances_changed(&self, account_id: i32) {
        info!("Balances changed for account {}", account_id);
    }
}
