use anyhow::{Context, Result};
use model::entities::statement_line;
use sea_orm::{ColumnTrait, Database, EntityTrait, QueryFilter, QueryOrder};
use tracing::trace;

pub async fn list_lines(database_url: &str, statement_id: i32) -> Result<()> {
    trace!("Entering list_lines function");

    let db = Database::connect(database_url)
        .await
        .context("Failed to connect to database")?;

    let lines = statement_line::Entity::find()
        .filter(statement_line::Column::StatementId.eq(statement_id))
        .order_by_asc(statement_line::Column::Position)
        .all(&db)
        .await?;

    if lines.is_empty() {
        println!("Statement {} has no lines", statement_id);
        return Ok(());
    }

    for line in lines {
        let top = line
            .match_meta()
            .candidates()
            .first()
            .map(|candidate| {
                format!(
                    " (top candidate: installment {} at {})",
                    candidate.installment_id, candidate.confidence
                )
            })
            .unwrap_or_default();
        println!(
            "#{:<4} {} {:>12} {:<10} {}{}",
            line.id,
            line.date,
            line.amount,
            format!("{:?}", line.match_status).to_lowercase(),
            line.description,
            top
        );
    }
    Ok(())
}
