//! Statement import: hash, dedup, parse, store the raw file, persist the
//! statement and its lines. One atomic transaction — a failure at any step
//! leaves no partial statement behind.

use model::entities::statement::{self, StatementStatus};
use model::entities::statement_line::{self, MatchMeta, MatchStatus};
use parser::{NormalizedLine, ParserRegistry};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set,
    SqlErr, TransactionTrait,
};
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument, trace, warn};

use crate::context::OperationContext;
use crate::error::{EngineError, Result};
use crate::storage::BlobStorage;

/// Lines are inserted in fixed-size batches to bound the statement size of
/// any single insert.
const LINE_INSERT_BATCH: usize = 500;

/// One uploaded statement file, as received from the outer layer.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: None,
            bytes,
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// The file extension, lowercased, without the dot.
    pub fn extension(&self) -> String {
        self.file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
            .unwrap_or_default()
    }
}

/// Caller-supplied metadata that takes precedence over everything the
/// parser derives.
#[derive(Debug, Clone, Default)]
pub struct ImportOverrides {
    pub reference: Option<String>,
    pub opening_balance: Option<Decimal>,
    pub closing_balance: Option<Decimal>,
}

/// Imports uploaded statement files for an account.
pub struct StatementImporter<S> {
    registry: ParserRegistry,
    storage: S,
}

impl<S: BlobStorage> StatementImporter<S> {
    /// Importer with the default parser configuration (CSV before OFX).
    pub fn new(storage: S) -> Self {
        Self {
            registry: ParserRegistry::with_default_parsers(),
            storage,
        }
    }

    pub fn with_registry(registry: ParserRegistry, storage: S) -> Self {
        Self { registry, storage }
    }

    /// Import one file. Rejects byte-identical re-imports for the same
    /// account, runs the matching parser, stores the raw bytes and persists
    /// the statement with all its lines unmatched.
    #[instrument(skip(self, db, upload, overrides), fields(account_id = account_id, file = %upload.file_name))]
    pub async fn handle(
        &self,
        db: &DatabaseConnection,
        account_id: i32,
        upload: UploadedFile,
        overrides: ImportOverrides,
        ctx: &OperationContext,
    ) -> Result<statement::Model> {
        let content_hash = hex::encode(Sha256::digest(&upload.bytes));
        trace!("Content hash for {:?} is {}", upload.file_name, content_hash);

        let txn = db.begin().await?;

        let account = model::entities::account::Entity::find_by_id(account_id)
            .one(&txn)
            .await?
            .ok_or_else(|| EngineError::not_found("account", account_id))?;

        // Pre-check for a friendly error; the unique index on
        // (account_id, content_hash) is what makes concurrent imports safe.
        let duplicate = statement::Entity::find()
            .filter(statement::Column::AccountId.eq(account.id))
            .filter(statement::Column::ContentHash.eq(&content_hash))
            .one(&txn)
            .await?;
        if duplicate.is_some() {
            warn!(
                "Rejecting duplicate import of {} for account {}",
                content_hash, account.id
            );
            return Err(EngineError::Duplicate {
                account_id: account.id,
            });
        }

        let selected = self
            .registry
            .select(&upload.extension(), upload.mime_type.as_deref())?;
        let parsed = selected.parse(&upload.bytes, &upload.file_name)?;
        debug!(
            "Parsed {} line(s) from {:?}",
            parsed.lines.len(),
            upload.file_name
        );

        let storage_path = self
            .storage
            .put(
                &format!(
                    "accounts/{}/{}-{}",
                    account.id, content_hash, upload.file_name
                ),
                &upload.bytes,
            )
            .await?;

        let (inferred_opening, inferred_closing) = infer_balances(&parsed.lines);

        let new_statement = statement::ActiveModel {
            account_id: Set(account.id),
            reference: Set(overrides
                .reference
                .unwrap_or_else(|| parsed.reference.clone())),
            original_filename: Set(upload.file_name.clone()),
            content_hash: Set(content_hash),
            imported_at: Set(ctx.now),
            imported_by: Set(ctx.user_id),
            status: Set(StatementStatus::Imported),
            opening_balance: Set(overrides
                .opening_balance
                .or(parsed.meta.opening_balance)
                .or(inferred_opening)),
            closing_balance: Set(overrides
                .closing_balance
                .or(parsed.meta.closing_balance)
                .or(inferred_closing)),
            closing_balance_date: Set(parsed.meta.closing_balance_date),
            account_number: Set(parsed.meta.account_number.clone()),
            bank_id: Set(parsed.meta.bank_id.clone()),
            range_start: Set(parsed.meta.range_start),
            range_end: Set(parsed.meta.range_end),
            storage_path: Set(Some(storage_path)),
            ..Default::default()
        };

        let stored = match new_statement.insert(&txn).await {
            Ok(model) => model,
            // The pre-check raced another import of the same bytes.
            Err(err) if is_unique_violation(&err) => {
                return Err(EngineError::Duplicate {
                    account_id: account.id,
                });
            }
            Err(err) => return Err(err.into()),
        };

        for chunk in parsed
            .lines
            .iter()
            .enumerate()
            .collect::<Vec<_>>()
            .chunks(LINE_INSERT_BATCH)
        {
            let models = chunk.iter().map(|(position, line)| {
                statement_line::ActiveModel {
                    statement_id: Set(stored.id),
                    position: Set(*position as i32),
                    date: Set(line.date),
                    description: Set(line.description.clone()),
                    amount: Set(line.amount),
                    balance: Set(line.balance),
                    document_number: Set(line.document_number.clone()),
                    fit_id: Set(line.fit_id.clone()),
                    match_status: Set(MatchStatus::Unmatched),
                    match_meta: Set(Some(MatchMeta::default().to_json())),
                    ..Default::default()
                }
            });
            statement_line::Entity::insert_many(models).exec(&txn).await?;
        }

        txn.commit().await?;
        info!(
            "Imported statement {} ({} lines) for account {}",
            stored.id,
            parsed.lines.len(),
            account.id
        );
        Ok(stored)
    }
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

/// Infer opening/closing balances from the running-balance column: opening
/// is the first line's balance minus its amount, closing is the last
/// line's balance. Lines are ordered by transaction date, ties broken by
/// original file order.
fn infer_balances(lines: &[NormalizedLine]) -> (Option<Decimal>, Option<Decimal>) {
    let mut ordered: Vec<&NormalizedLine> = lines.iter().collect();
    ordered.sort_by_key(|line| line.date);

    let opening = ordered
        .first()
        .and_then(|line| line.balance.map(|balance| balance - line.amount));
    let closing = ordered.last().and_then(|line| line.balance);
    (opening, closing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use crate::testing;
    use chrono::NaiveDate;
    use model::entities::prelude::*;
    use sea_orm::{PaginatorTrait, QueryOrder};

    const CSV: &str = "Data,Descrição,Valor,Saldo\n\
2025-01-01,Pagamento Cliente,1500.50,5000.00\n\
2025-01-05,Pagamento Fornecedor,-300.00,4700.00\n";

    fn importer() -> StatementImporter<MemoryStorage> {
        StatementImporter::new(MemoryStorage::new())
    }

    #[tokio::test]
    async fn imports_csv_and_infers_balances() {
        let db = testing::setup_db().await;
        let account = testing::seed_account(&db).await;
        let ctx = testing::ctx();

        let stored = importer()
            .handle(
                &db,
                account.id,
                UploadedFile::new("extrato-jan.csv", CSV.into()),
                ImportOverrides::default(),
                &ctx,
            )
            .await
            .unwrap();

        assert_eq!(stored.reference, "extrato-jan");
        assert_eq!(stored.status, StatementStatus::Imported);
        assert_eq!(stored.opening_balance, Some(Decimal::new(349950, 2)));
        assert_eq!(stored.closing_balance, Some(Decimal::new(470000, 2)));
        assert_eq!(stored.imported_by, ctx.user_id);
        assert!(stored.storage_path.is_some());

        let lines = StatementLine::find()
            .filter(statement_line::Column::StatementId.eq(stored.id))
            .order_by_asc(statement_line::Column::Position)
            .all(&db)
            .await
            .unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].description, "Pagamento Cliente");
        assert_eq!(lines[0].amount, Decimal::new(150050, 2));
        assert_eq!(lines[0].match_status, MatchStatus::Unmatched);
        assert_eq!(lines[1].amount, Decimal::new(-30000, 2));
    }

    #[tokio::test]
    async fn rejects_byte_identical_reimport_regardless_of_filename() {
        let db = testing::setup_db().await;
        let account = testing::seed_account(&db).await;
        let ctx = testing::ctx();
        let importer = importer();

        importer
            .handle(
                &db,
                account.id,
                UploadedFile::new("extrato-jan.csv", CSV.into()),
                ImportOverrides::default(),
                &ctx,
            )
            .await
            .unwrap();

        let err = importer
            .handle(
                &db,
                account.id,
                UploadedFile::new("renamed.csv", CSV.into()),
                ImportOverrides::default(),
                &ctx,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Duplicate { .. }));
        assert_eq!(Statement::find().count(&db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn same_content_is_allowed_on_another_account() {
        let db = testing::setup_db().await;
        let account = testing::seed_account(&db).await;
        let other = testing::seed_named_account(&db, account.owner_id, "Savings").await;
        let ctx = testing::ctx();
        let importer = importer();

        importer
            .handle(
                &db,
                account.id,
                UploadedFile::new("extrato.csv", CSV.into()),
                ImportOverrides::default(),
                &ctx,
            )
            .await
            .unwrap();
        importer
            .handle(
                &db,
                other.id,
                UploadedFile::new("extrato.csv", CSV.into()),
                ImportOverrides::default(),
                &ctx,
            )
            .await
            .unwrap();
        assert_eq!(Statement::find().count(&db).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn parse_failure_leaves_nothing_behind() {
        let db = testing::setup_db().await;
        let account = testing::seed_account(&db).await;
        let ctx = testing::ctx();
        let storage = MemoryStorage::new();
        let importer = StatementImporter::new(storage);

        let err = importer
            .handle(
                &db,
                account.id,
                UploadedFile::new("broken.csv", b"data,valor\n2025-01-01,10.00\n".to_vec()),
                ImportOverrides::default(),
                &ctx,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Parse(_)));
        assert_eq!(Statement::find().count(&db).await.unwrap(), 0);
        assert_eq!(StatementLine::find().count(&db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn unsupported_format_is_a_parse_error() {
        let db = testing::setup_db().await;
        let account = testing::seed_account(&db).await;
        let ctx = testing::ctx();

        let err = importer()
            .handle(
                &db,
                account.id,
                UploadedFile::new("report.pdf", b"%PDF-1.4".to_vec()),
                ImportOverrides::default(),
                &ctx,
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Parse(parser::ParseError::Unsupported(_))
        ));
    }

    #[tokio::test]
    async fn caller_overrides_win_over_inference() {
        let db = testing::setup_db().await;
        let account = testing::seed_account(&db).await;
        let ctx = testing::ctx();

        let stored = importer()
            .handle(
                &db,
                account.id,
                UploadedFile::new("extrato.csv", CSV.into()),
                ImportOverrides {
                    reference: Some("janeiro/2025".to_string()),
                    opening_balance: Some(Decimal::new(100000, 2)),
                    closing_balance: None,
                },
                &ctx,
            )
            .await
            .unwrap();
        assert_eq!(stored.reference, "janeiro/2025");
        assert_eq!(stored.opening_balance, Some(Decimal::new(100000, 2)));
        // Unset overrides still fall back to inference.
        assert_eq!(stored.closing_balance, Some(Decimal::new(470000, 2)));
    }

    #[tokio::test]
    async fn missing_account_is_not_found() {
        let db = testing::setup_db().await;
        let ctx = testing::ctx();

        let err = importer()
            .handle(
                &db,
                999,
                UploadedFile::new("extrato.csv", CSV.into()),
                ImportOverrides::default(),
                &ctx,
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::NotFound {
                entity: "account",
                ..
            }
        ));
    }

    #[test]
    fn balance_inference_orders_by_date() {
        // Lines arrive out of date order; inference must sort first.
        let lines = vec![
            NormalizedLine {
                date: NaiveDate::from_ymd_opt(2025, 1, 5).unwrap(),
                description: "later".into(),
                amount: Decimal::new(-30000, 2),
                balance: Some(Decimal::new(470000, 2)),
                document_number: None,
                fit_id: None,
            },
            NormalizedLine {
                date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
                description: "earlier".into(),
                amount: Decimal::new(150050, 2),
                balance: Some(Decimal::new(500000, 2)),
                document_number: None,
                fit_id: None,
            },
        ];
        let (opening, closing) = infer_balances(&lines);
        assert_eq!(opening, Some(Decimal::new(349950, 2)));
        assert_eq!(closing, Some(Decimal::new(470000, 2)));
    }

    #[test]
    fn extension_is_lowercased() {
        assert_eq!(UploadedFile::new("A.CSV", vec![]).extension(), "csv");
        assert_eq!(UploadedFile::new("noext", vec![]).extension(), "");
    }
}
