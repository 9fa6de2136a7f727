//! Period close: the terminal operation of the workflow. Validates that
//! every statement imported in the period is fully resolved and that the
//! declared balances tie out with the confirmed movements, then locks the
//! period into a reconciliation row.

use chrono::NaiveDate;
use model::entities::reconciliation::{self, ReconciliationStatus};
use model::entities::statement::{self, StatementStatus};
use model::entities::statement_line::{self, MatchStatus};
use model::entities::{account, prelude::*};
use parser::round2;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    Set, TransactionTrait,
};
use tracing::{debug, info, instrument, warn};

use crate::context::OperationContext;
use crate::error::{EngineError, Result};
use crate::events::EventSink;

/// The closing balance may differ from opening + confirmed movements by at
/// most this. Deliberately looser than the 0.01 candidate-amount gate.
fn balance_tolerance() -> Decimal {
    Decimal::new(5, 2) // 0.05
}

/// Request to close one accounting period for an account.
#[derive(Debug, Clone)]
pub struct CloseRequest {
    pub account_id: i32,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub opening_balance: Decimal,
    pub closing_balance: Decimal,
    /// When set, only these statements are considered; otherwise every
    /// statement imported in the period.
    pub statement_ids: Option<Vec<i32>>,
}

/// Closes accounting periods into reconciliation records.
pub struct PeriodCloser<E> {
    events: E,
}

impl<E: EventSink> PeriodCloser<E> {
    pub fn new(events: E) -> Self {
        Self { events }
    }

    /// Close the period. On success the reconciliation is created closed,
    /// the selected statements flip to `reconciled`, the account balance is
    /// updated and a balances-changed event goes out.
    #[instrument(skip(self, db, request, ctx), fields(account_id = request.account_id))]
    pub async fn handle(
        &self,
        db: &DatabaseConnection,
        request: CloseRequest,
        ctx: &OperationContext,
    ) -> Result<reconciliation::Model> {
        if request.period_end < request.period_start {
            return Err(EngineError::validation(
                "period_end",
                format!(
                    "period end {} precedes period start {}",
                    request.period_end, request.period_start
                ),
            ));
        }

        let txn = db.begin().await?;

        let target_account = Account::find_by_id(request.account_id)
            .one(&txn)
            .await?
            .ok_or_else(|| EngineError::not_found("account", request.account_id))?;

        let overlapping = Reconciliation::find()
            .filter(reconciliation::Column::AccountId.eq(target_account.id))
            .filter(reconciliation::Column::PeriodStart.lte(request.period_end))
            .filter(reconciliation::Column::PeriodEnd.gte(request.period_start))
            .one(&txn)
            .await?;
        if let Some(existing) = overlapping {
            warn!(
                "Close rejected: period {}..{} overlaps reconciliation {}",
                request.period_start, request.period_end, existing.id
            );
            return Err(EngineError::validation(
                "period",
                format!(
                    "period overlaps existing reconciliation {} ({}..{})",
                    existing.id, existing.period_start, existing.period_end
                ),
            ));
        }

        let mut selection = Statement::find()
            .filter(statement::Column::AccountId.eq(target_account.id))
            .filter(
                statement::Column::ImportedAt
                    .gte(request.period_start.and_hms_opt(0, 0, 0).unwrap()),
            )
            .filter(
                statement::Column::ImportedAt
                    .lte(request.period_end.and_hms_opt(23, 59, 59).unwrap()),
            );
        if let Some(ids) = &request.statement_ids {
            selection = selection.filter(statement::Column::Id.is_in(ids.clone()));
        }
        let statements = selection.all(&txn).await?;
        let statement_ids: Vec<i32> = statements.iter().map(|s| s.id).collect();
        debug!(
            "{} statement(s) selected for period {}..{}",
            statements.len(),
            request.period_start,
            request.period_end
        );

        if !statement_ids.is_empty() {
            let pending = StatementLine::find()
                .filter(statement_line::Column::StatementId.is_in(statement_ids.clone()))
                .filter(
                    statement_line::Column::MatchStatus
                        .is_in([MatchStatus::Unmatched, MatchStatus::Suggested]),
                )
                .count(&txn)
                .await?;
            if pending > 0 {
                return Err(EngineError::validation(
                    "statements",
                    format!("{pending} line(s) still unmatched or suggested"),
                ));
            }

            let confirmed = StatementLine::find()
                .filter(statement_line::Column::StatementId.is_in(statement_ids.clone()))
                .filter(statement_line::Column::MatchStatus.eq(MatchStatus::Confirmed))
                .all(&txn)
                .await?;
            let movements: Decimal = confirmed.iter().map(|line| line.amount).sum();
            let expected_closing = round2(request.opening_balance + movements);
            let difference = (expected_closing - request.closing_balance).abs();
            if difference > balance_tolerance() {
                return Err(EngineError::validation(
                    "closing_balance",
                    format!(
                        "expected closing balance {} (opening {} + movements {}), got {}",
                        expected_closing, request.opening_balance, movements, request.closing_balance
                    ),
                ));
            }
        }

        let closed = reconciliation::ActiveModel {
            account_id: Set(target_account.id),
            period_start: Set(request.period_start),
            period_end: Set(request.period_end),
            opening_balance: Set(request.opening_balance),
            closing_balance: Set(request.closing_balance),
            status: Set(ReconciliationStatus::Closed),
            created_by: Set(ctx.user_id),
            created_at: Set(ctx.now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        for stmt in statements {
            let mut active: statement::ActiveModel = stmt.into();
            active.status = Set(StatementStatus::Reconciled);
            active.update(&txn).await?;
        }

        let mut active: account::ActiveModel = target_account.clone().into();
        active.current_balance = Set(request.closing_balance);
        active.update(&txn).await?;

        txn.commit().await?;

        info!(
            "Period {}..{} closed for account {} as reconciliation {}",
            closed.period_start, closed.period_end, target_account.id, closed.id
        );
        self.events.balances_changed(target_account.id).await;
        Ok(closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::MatchResolver;
    use crate::suggest::SuggestionEngine;
    use crate::testing::{self, RecordingSink};
    use model::entities::installment::InstallmentStatus;
    use std::sync::Arc;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn request(account_id: i32, opening: Decimal, closing: Decimal) -> CloseRequest {
        CloseRequest {
            account_id,
            period_start: date(2025, 1, 1),
            period_end: date(2025, 1, 31),
            opening_balance: opening,
            closing_balance: closing,
            statement_ids: None,
        }
    }

    /// One fully confirmed statement: a 1500.50 credit and a -300.00 debit.
    async fn resolved_scenario() -> (sea_orm::DatabaseConnection, account::Model) {
        let db = testing::setup_db().await;
        let account = testing::seed_account(&db).await;
        let entry = testing::seed_entry(&db, account.id, "Pagamento Cliente").await;
        let credit = testing::seed_installment(
            &db,
            entry.id,
            1,
            Some(date(2025, 1, 1)),
            Decimal::new(150050, 2),
            InstallmentStatus::Pending,
        )
        .await;
        let debit = testing::seed_installment(
            &db,
            entry.id,
            2,
            Some(date(2025, 1, 5)),
            Decimal::new(30000, 2),
            InstallmentStatus::Pending,
        )
        .await;
        let statement = testing::seed_statement_with_lines(
            &db,
            account.id,
            &[
                (date(2025, 1, 1), "Pagamento Cliente", Decimal::new(150050, 2)),
                (date(2025, 1, 5), "Pagamento Fornecedor", Decimal::new(-30000, 2)),
            ],
        )
        .await;
        SuggestionEngine
            .handle(&db, statement.id, &testing::ctx())
            .await
            .unwrap();
        let lines = testing::lines_of(&db, statement.id).await;
        let resolver = MatchResolver::new();
        resolver
            .confirm(&db, lines[0].id, credit.id, date(2025, 1, 2), &testing::ctx())
            .await
            .unwrap();
        resolver
            .confirm(&db, lines[1].id, debit.id, date(2025, 1, 6), &testing::ctx())
            .await
            .unwrap();
        (db, account)
    }

    #[tokio::test]
    async fn closes_a_fully_resolved_period() {
        let (db, account) = resolved_scenario().await;
        let sink = Arc::new(RecordingSink::default());
        let closer = PeriodCloser::new(Arc::clone(&sink));

        // opening 1000.00 + (1500.50 - 300.00) = 2200.50
        let closed = closer
            .handle(
                &db,
                request(account.id, Decimal::new(100000, 2), Decimal::new(220050, 2)),
                &testing::ctx(),
            )
            .await
            .unwrap();

        assert_eq!(closed.status, ReconciliationStatus::Closed);
        assert_eq!(closed.created_by, testing::ctx().user_id);

        let statements = Statement::find().all(&db).await.unwrap();
        assert!(statements
            .iter()
            .all(|s| s.status == StatementStatus::Reconciled));

        let refreshed = Account::find_by_id(account.id)
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(refreshed.current_balance, Decimal::new(220050, 2));
        assert_eq!(sink.seen(), vec![account.id]);
    }

    #[tokio::test]
    async fn pending_lines_block_the_close() {
        let db = testing::setup_db().await;
        let account = testing::seed_account(&db).await;
        testing::seed_statement_with_line(
            &db,
            account.id,
            date(2025, 1, 10),
            "Pagamento",
            Decimal::new(50000, 2),
        )
        .await;
        let closer = PeriodCloser::new(RecordingSink::default());

        let err = closer
            .handle(
                &db,
                request(account.id, Decimal::ZERO, Decimal::new(50000, 2)),
                &testing::ctx(),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Validation {
                field: "statements",
                ..
            }
        ));
        assert_eq!(Reconciliation::find().count(&db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn balance_mismatch_fails_beyond_tolerance_and_passes_at_it() {
        let (db, account) = resolved_scenario().await;
        let closer = PeriodCloser::new(RecordingSink::default());

        // expected closing = 1000.00 + 1200.50 = 2200.50; 0.06 off fails.
        let err = closer
            .handle(
                &db,
                request(account.id, Decimal::new(100000, 2), Decimal::new(220056, 2)),
                &testing::ctx(),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Validation {
                field: "closing_balance",
                ..
            }
        ));

        // Exactly 0.05 off is accepted.
        closer
            .handle(
                &db,
                request(account.id, Decimal::new(100000, 2), Decimal::new(220055, 2)),
                &testing::ctx(),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn overlapping_periods_are_rejected() {
        let (db, account) = resolved_scenario().await;
        let closer = PeriodCloser::new(RecordingSink::default());
        closer
            .handle(
                &db,
                request(account.id, Decimal::new(100000, 2), Decimal::new(220050, 2)),
                &testing::ctx(),
            )
            .await
            .unwrap();

        // A later period reaching back into January is rejected.
        let overlapping = CloseRequest {
            period_start: date(2025, 1, 31),
            period_end: date(2025, 2, 28),
            ..request(account.id, Decimal::new(220050, 2), Decimal::new(220050, 2))
        };
        let err = closer
            .handle(&db, overlapping, &testing::ctx())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Validation { field: "period", .. }
        ));

        // A disjoint following period is fine (no statements, no checks).
        let following = CloseRequest {
            period_start: date(2025, 2, 1),
            period_end: date(2025, 2, 28),
            ..request(account.id, Decimal::new(220050, 2), Decimal::new(220050, 2))
        };
        closer.handle(&db, following, &testing::ctx()).await.unwrap();
    }

    #[tokio::test]
    async fn inverted_period_is_rejected() {
        let db = testing::setup_db().await;
        let account = testing::seed_account(&db).await;
        let closer = PeriodCloser::new(RecordingSink::default());

        let inverted = CloseRequest {
            period_start: date(2025, 2, 1),
            period_end: date(2025, 1, 1),
            ..request(account.id, Decimal::ZERO, Decimal::ZERO)
        };
        let err = closer
            .handle(&db, inverted, &testing::ctx())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Validation {
                field: "period_end",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn subset_selection_ignores_other_statements() {
        let (db, account) = resolved_scenario().await;
        // A second, unresolved statement in the same period.
        let other = testing::seed_statement_with_line(
            &db,
            account.id,
            date(2025, 1, 20),
            "Pendente",
            Decimal::new(9900, 2),
        )
        .await;
        let resolved_ids: Vec<i32> = Statement::find()
            .all(&db)
            .await
            .unwrap()
            .into_iter()
            .filter(|s| s.id != other.id)
            .map(|s| s.id)
            .collect();

        let closer = PeriodCloser::new(RecordingSink::default());
        let selected = CloseRequest {
            statement_ids: Some(resolved_ids),
            ..request(account.id, Decimal::new(100000, 2), Decimal::new(220050, 2))
        };
        closer.handle(&db, selected, &testing::ctx()).await.unwrap();

        // The skipped statement is untouched.
        let skipped = Statement::find_by_id(other.id)
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(skipped.status, StatementStatus::Imported);
    }
}
