//! Match resolution: the explicit confirm/ignore decisions that move lines
//! into their terminal states, write the audit trail and keep the parent
//! statement's status in sync. Confirmation is the only path that ever
//! marks a line `confirmed`.

use chrono::NaiveDate;
use model::entities::statement::{self, StatementStatus};
use model::entities::statement_line::{self, MatchMeta, MatchStatus};
use model::entities::{entry, installment, match_record};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    PaginatorTrait, QueryFilter, Set, TransactionTrait,
};
use tracing::{debug, info, instrument};

use crate::context::OperationContext;
use crate::error::{EngineError, Result};
use crate::payments::{DbPayments, InstallmentPayments};

/// Applies confirm/ignore decisions to statement lines.
pub struct MatchResolver<P = DbPayments> {
    payments: P,
}

impl MatchResolver<DbPayments> {
    /// Resolver settling installments directly in the database.
    pub fn new() -> Self {
        Self {
            payments: DbPayments,
        }
    }
}

impl Default for MatchResolver<DbPayments> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: InstallmentPayments> MatchResolver<P> {
    pub fn with_payments(payments: P) -> Self {
        Self { payments }
    }

    /// Confirm that the line and the installment are the same real-world
    /// payment. Settles the installment (unless already paid — then the
    /// recorded payment date takes precedence over the caller's), moves the
    /// line to `confirmed`, writes the immutable match record and
    /// recomputes the statement status.
    #[instrument(skip(self, db, ctx), fields(line_id = line_id, installment_id = installment_id))]
    pub async fn confirm(
        &self,
        db: &DatabaseConnection,
        line_id: i32,
        installment_id: i32,
        payment_date: NaiveDate,
        ctx: &OperationContext,
    ) -> Result<statement_line::Model> {
        let txn = db.begin().await?;

        let line = statement_line::Entity::find_by_id(line_id)
            .one(&txn)
            .await?
            .ok_or_else(|| EngineError::not_found("statement line", line_id))?;
        let parent = statement::Entity::find_by_id(line.statement_id)
            .one(&txn)
            .await?
            .ok_or_else(|| EngineError::not_found("statement", line.statement_id))?;
        let target = installment::Entity::find_by_id(installment_id)
            .one(&txn)
            .await?
            .ok_or_else(|| EngineError::not_found("installment", installment_id))?;
        let owner = entry::Entity::find_by_id(target.entry_id)
            .one(&txn)
            .await?
            .ok_or_else(|| EngineError::not_found("entry", target.entry_id))?;

        if owner.account_id != parent.account_id {
            return Err(EngineError::validation(
                "installment",
                format!(
                    "installment {} belongs to account {}, statement {} belongs to account {}",
                    target.id, owner.account_id, parent.id, parent.account_id
                ),
            ));
        }

        match target.payment_date {
            None => {
                self.payments
                    .mark_paid(&txn, target.id, payment_date, ctx)
                    .await?;
            }
            Some(recorded) => {
                debug!(
                    "Installment {} already paid on {}; keeping the recorded date",
                    target.id, recorded
                );
            }
        }

        let meta = line.match_meta();
        let confidence = meta.confidence_for(target.id);
        let merged = MatchMeta::Confirmed {
            confirmed_at: ctx.now,
            candidates: meta.candidates().to_vec(),
        };

        let mut active: statement_line::ActiveModel = line.into();
        active.match_status = Set(MatchStatus::Confirmed);
        active.matched_installment_id = Set(Some(target.id));
        active.matched_by = Set(Some(ctx.user_id));
        active.matched_at = Set(Some(ctx.now));
        active.match_meta = Set(Some(merged.to_json()));
        let confirmed = active.update(&txn).await?;

        match_record::ActiveModel {
            line_id: Set(confirmed.id),
            installment_id: Set(target.id),
            confidence: Set(confidence),
            matched_by: Set(ctx.user_id),
            matched_at: Set(ctx.now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        refresh_statement_status(&txn, &parent).await?;
        txn.commit().await?;

        info!(
            "Line {} confirmed against installment {} (confidence {:?})",
            confirmed.id, target.id, confidence
        );
        Ok(confirmed)
    }

    /// Mark the line as deliberately ignored: it represents no installment
    /// (bank fee, internal transfer, ...) and must not block the period.
    #[instrument(skip(self, db, reason, ctx), fields(line_id = line_id))]
    pub async fn ignore(
        &self,
        db: &DatabaseConnection,
        line_id: i32,
        reason: Option<String>,
        ctx: &OperationContext,
    ) -> Result<statement_line::Model> {
        let txn = db.begin().await?;

        let line = statement_line::Entity::find_by_id(line_id)
            .one(&txn)
            .await?
            .ok_or_else(|| EngineError::not_found("statement line", line_id))?;
        let parent = statement::Entity::find_by_id(line.statement_id)
            .one(&txn)
            .await?
            .ok_or_else(|| EngineError::not_found("statement", line.statement_id))?;

        let meta = line.match_meta();
        let merged = MatchMeta::Ignored {
            ignored_at: ctx.now,
            reason,
            candidates: meta.candidates().to_vec(),
        };

        let mut active: statement_line::ActiveModel = line.into();
        active.match_status = Set(MatchStatus::Ignored);
        active.matched_installment_id = Set(None);
        active.matched_by = Set(Some(ctx.user_id));
        active.matched_at = Set(Some(ctx.now));
        active.match_meta = Set(Some(merged.to_json()));
        let ignored = active.update(&txn).await?;

        refresh_statement_status(&txn, &parent).await?;
        txn.commit().await?;

        info!("Line {} ignored", ignored.id);
        Ok(ignored)
    }
}

/// A statement is reconciled once it has lines and none of them is still
/// unmatched or suggested. A statement with zero lines never reconciles.
pub(crate) async fn refresh_statement_status(
    txn: &DatabaseTransaction,
    target: &statement::Model,
) -> Result<()> {
    let total = statement_line::Entity::find()
        .filter(statement_line::Column::StatementId.eq(target.id))
        .count(txn)
        .await?;
    let pending = statement_line::Entity::find()
        .filter(statement_line::Column::StatementId.eq(target.id))
        .filter(
            statement_line::Column::MatchStatus
                .is_in([MatchStatus::Unmatched, MatchStatus::Suggested]),
        )
        .count(txn)
        .await?;

    let status = if total > 0 && pending == 0 {
        StatementStatus::Reconciled
    } else {
        StatementStatus::Imported
    };
    if status != target.status {
        debug!("Statement {} status moves to {:?}", target.id, status);
        let mut active: statement::ActiveModel = target.clone().into();
        active.status = Set(status);
        active.update(txn).await?;
    }
    Ok(())
}
