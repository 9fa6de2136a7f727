use anyhow::{Context, Result};
use engine::{OperationContext, SuggestionEngine};
use model::entities::statement_line::{self, MatchStatus};
use sea_orm::{ColumnTrait, Database, EntityTrait, PaginatorTrait, QueryFilter};
use tracing::{info, trace};

pub async fn suggest_matches(database_url: &str, statement_id: i32, user_id: i32) -> Result<()> {
    trace!("Entering suggest_matches function");
    info!("Scoring suggestions for statement {}", statement_id);

    let db = Database::connect(database_url)
        .await
        .context("Failed to connect to database")?;
    let ctx = OperationContext::new(user_id, chrono::Utc::now().naive_utc());

    let statement = SuggestionEngine.handle(&db, statement_id, &ctx).await?;

    let suggested = statement_line::Entity::find()
        .filter(statement_line::Column::StatementId.eq(statement.id))
        .filter(statement_line::Column::MatchStatus.eq(MatchStatus::Suggested))
        .count(&db)
        .await?;
    let total = statement_line::Entity::find()
        .filter(statement_line::Column::StatementId.eq(statement.id))
        .count(&db)
        .await?;

    println!(
        "Statement {}: {} of {} line(s) now have a suggestion",
        statement.id, suggested, total
    );
    Ok(())
}
