//! Match suggestion: scores every open installment of the statement's
//! account against each unresolved line and stores the ranked candidates.
//! Re-runnable at any time; confirmed lines are never touched.

use chrono::NaiveDate;
use model::entities::statement_line::{MatchMeta, MatchStatus, SuggestionCandidate};
use model::entities::{entry, installment, statement, statement_line};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use tracing::{debug, instrument, trace};

use crate::context::OperationContext;
use crate::error::{EngineError, Result};

/// Every candidate starts here; date and description evidence add on top.
const BASE_SCORE: i32 = 50;
/// Scores are clamped to this ceiling.
const MAX_SCORE: i32 = 100;
/// A line becomes `suggested` only when its best candidate reaches this.
const SUGGESTION_THRESHOLD: i32 = 75;
/// Only the strongest candidates are stored per line.
const MAX_CANDIDATES: usize = 5;

/// Installment totals must equal the absolute line amount within this.
fn amount_tolerance() -> Decimal {
    Decimal::new(1, 2) // 0.01
}

/// Scores statement lines against open installments.
pub struct SuggestionEngine;

impl SuggestionEngine {
    /// Re-score every non-confirmed line of the statement. Idempotent: the
    /// same data produces the same suggestions, and re-running never
    /// reverts a confirmed line.
    #[instrument(skip(self, db, _ctx), fields(statement_id = statement_id))]
    pub async fn handle(
        &self,
        db: &DatabaseConnection,
        statement_id: i32,
        _ctx: &OperationContext,
    ) -> Result<statement::Model> {
        let txn = db.begin().await?;

        let target = statement::Entity::find_by_id(statement_id)
            .one(&txn)
            .await?
            .ok_or_else(|| EngineError::not_found("statement", statement_id))?;

        let open = open_installments(&txn, target.account_id).await?;
        debug!(
            "{} open installment(s) on account {}",
            open.len(),
            target.account_id
        );

        let lines = statement_line::Entity::find()
            .filter(statement_line::Column::StatementId.eq(target.id))
            .order_by_asc(statement_line::Column::Position)
            .all(&txn)
            .await?;

        let mut suggested = 0usize;
        for line in lines {
            if line.match_status == MatchStatus::Confirmed {
                continue;
            }
            let candidates = rank_candidates(&line, &open);
            let (status, meta) = if candidates.is_empty() {
                (MatchStatus::Unmatched, MatchMeta::default())
            } else if candidates[0].confidence >= SUGGESTION_THRESHOLD {
                suggested += 1;
                (MatchStatus::Suggested, MatchMeta::Suggested { candidates })
            } else {
                // The ranked list is kept even when no candidate is strong
                // enough to suggest.
                (MatchStatus::Unmatched, MatchMeta::Unmatched { candidates })
            };
            trace!(
                "Line {} scored as {:?} with {} candidate(s)",
                line.id,
                status,
                meta.candidates().len()
            );

            let mut active: statement_line::ActiveModel = line.into();
            active.match_status = Set(status);
            active.match_meta = Set(Some(meta.to_json()));
            active.update(&txn).await?;
        }
        txn.commit().await?;

        debug!(
            "Suggestion pass over statement {} left {} line(s) suggested",
            statement_id, suggested
        );

        let refreshed = statement::Entity::find_by_id(statement_id)
            .one(db)
            .await?
            .ok_or_else(|| EngineError::not_found("statement", statement_id))?;
        Ok(refreshed)
    }
}

/// All match candidates for the account: installments of non-canceled
/// entries, planned or pending, with no payment date yet.
async fn open_installments<C: ConnectionTrait>(
    conn: &C,
    account_id: i32,
) -> Result<Vec<(installment::Model, entry::Model)>> {
    let rows = installment::Entity::find()
        .find_also_related(entry::Entity)
        .filter(entry::Column::AccountId.eq(account_id))
        .filter(entry::Column::Status.ne(entry::EntryStatus::Canceled))
        .filter(installment::Column::Status.is_in([
            installment::InstallmentStatus::Planned,
            installment::InstallmentStatus::Pending,
        ]))
        .filter(installment::Column::PaymentDate.is_null())
        .all(conn)
        .await?;
    Ok(rows
        .into_iter()
        .filter_map(|(installment, entry)| entry.map(|entry| (installment, entry)))
        .collect())
}

/// Score the open installments against one line and keep the best five.
fn rank_candidates(
    line: &statement_line::Model,
    open: &[(installment::Model, entry::Model)],
) -> Vec<SuggestionCandidate> {
    let mut candidates: Vec<SuggestionCandidate> = open
        .iter()
        .filter(|(installment, _)| {
            (installment.total - line.amount.abs()).abs() <= amount_tolerance()
        })
        .map(|(installment, entry)| {
            let anchor = installment.anchor_date().unwrap_or(line.date);
            let score = confidence(line.date, anchor, &line.description, &entry.description);
            SuggestionCandidate {
                installment_id: installment.id,
                entry_id: entry.id,
                confidence: score,
                entry_description: entry.description.clone(),
                due_date: installment.due_date,
                installment_number: installment.number,
            }
        })
        .collect();

    candidates.sort_by(|a, b| {
        b.confidence
            .cmp(&a.confidence)
            .then(a.installment_id.cmp(&b.installment_id))
    });
    candidates.truncate(MAX_CANDIDATES);
    candidates
}

/// Total confidence for one line/installment pair, clamped to 100.
pub fn confidence(
    line_date: NaiveDate,
    anchor_date: NaiveDate,
    line_description: &str,
    entry_description: &str,
) -> i32 {
    let score = BASE_SCORE
        + date_score(line_date, anchor_date)
        + description_score(line_description, entry_description);
    score.min(MAX_SCORE)
}

/// 30 points at zero distance, decaying one point per day, floored at 0.
fn date_score(line_date: NaiveDate, anchor_date: NaiveDate) -> i32 {
    let days = (line_date - anchor_date).num_days().unsigned_abs().min(30) as i32;
    30 - days
}

/// 30 when one lowercased description contains the other (both non-empty),
/// 15 when either side is empty, 10 otherwise.
fn description_score(line_description: &str, entry_description: &str) -> i32 {
    let line = line_description.trim().to_lowercase();
    let entry = entry_description.trim().to_lowercase();
    if line.is_empty() || entry.is_empty() {
        return 15;
    }
    if line.contains(&entry) || entry.contains(&line) {
        30
    } else {
        10
    }
}
