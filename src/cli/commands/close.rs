use anyhow::{Context, Result};
use chrono::NaiveDate;
use engine::{CloseRequest, LogEventSink, OperationContext, PeriodCloser};
use rust_decimal::Decimal;
use sea_orm::Database;
use tracing::{info, trace};

#[allow(clippy::too_many_arguments)]
pub async fn close_period(
    database_url: &str,
    account_id: i32,
    period_start: NaiveDate,
    period_end: NaiveDate,
    opening_balance: Decimal,
    closing_balance: Decimal,
    statement_ids: Option<Vec<i32>>,
    user_id: i32,
) -> Result<()> {
    trace!("Entering close_period function");
    info!(
        "Closing period {}..{} for account {}",
        period_start, period_end, account_id
    );

    let db = Database::connect(database_url)
        .await
        .context("Failed to connect to database")?;
    let ctx = OperationContext::new(user_id, chrono::Utc::now().naive_utc());

    let reconciliation = PeriodCloser::new(LogEventSink)
        .handle(
            &db,
            CloseRequest {
                account_id,
                period_start,
                period_end,
                opening_balance,
                closing_balance,
                statement_ids,
            },
            &ctx,
        )
        .await?;

    println!(
        "Reconciliation {} closed for account {} ({}..{})",
        reconciliation.id, account_id, reconciliation.period_start, reconciliation.period_end
    );
    Ok(())
}
