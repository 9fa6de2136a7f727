use anyhow::{Context, Result};
use chrono::NaiveDate;
use engine::{MatchResolver, OperationContext};
use sea_orm::Database;
use tracing::{info, trace};

pub async fn confirm_match(
    database_url: &str,
    line_id: i32,
    installment_id: i32,
    payment_date: Option<NaiveDate>,
    user_id: i32,
) -> Result<()> {
    trace!("Entering confirm_match function");
    info!(
        "Confirming line {} against installment {}",
        line_id, installment_id
    );

    let db = Database::connect(database_url)
        .await
        .context("Failed to connect to database")?;
    let ctx = OperationContext::new(user_id, chrono::Utc::now().naive_utc());
    let payment_date = payment_date.unwrap_or_else(|| ctx.today());

    let line = MatchResolver::new()
        .confirm(&db, line_id, installment_id, payment_date, &ctx)
        .await?;

    println!(
        "Line {} confirmed against installment {}",
        line.id, installment_id
    );
    Ok(())
}

pub async fn ignore_line(
    database_url: &str,
    line_id: i32,
    reason: Option<String>,
    user_id: i32,
) -> Result<()> {
    trace!("Entering ignore_line function");
    info!("Ignoring line {}", line_id);

    let db = Database::connect(database_url)
        .await
        .context("Failed to connect to database")?;
    let ctx = OperationContext::new(user_id, chrono::Utc::now().naive_utc());

    let line = MatchResolver::new().ignore(&db, line_id, reason, &ctx).await?;

    println!("Line {} ignored", line.id);
    Ok(())
}
