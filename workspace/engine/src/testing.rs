//! Shared fixtures for the engine tests: an in-memory database with the
//! full schema, seed helpers for the entity graph and collaborator test
//! doubles.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use migration::{Migrator, MigratorTrait};
use model::entities::installment::InstallmentStatus;
use model::entities::statement::{self, StatementStatus};
use model::entities::statement_line::{self, MatchMeta, MatchStatus};
use model::entities::{account, entry, installment, user};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, Database, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, Set,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::context::OperationContext;
use crate::events::EventSink;

static SEED_COUNTER: AtomicUsize = AtomicUsize::new(0);

fn next_seed() -> usize {
    SEED_COUNTER.fetch_add(1, Ordering::Relaxed)
}

pub async fn setup_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("Failed to connect to in-memory database");
    db.execute_unprepared("PRAGMA foreign_keys = ON;")
        .await
        .expect("Failed to enable foreign keys");
    Migrator::up(&db, None).await.expect("Migrations failed");
    db
}

/// The fixed operation context every test runs under: user 1 at
/// 2025-01-31 12:00.
pub fn ctx() -> OperationContext {
    OperationContext::new(1, fixed_now())
}

pub fn fixed_now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 1, 31)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
}

/// Seed the default user (id 1) and an account owned by it.
pub async fn seed_account(db: &DatabaseConnection) -> account::Model {
    let owner = user::ActiveModel {
        username: Set(format!("user-{}", next_seed())),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to create user");
    seed_named_account(db, owner.id, "Operating").await
}

pub async fn seed_named_account(
    db: &DatabaseConnection,
    owner_id: i32,
    name: &str,
) -> account::Model {
    account::ActiveModel {
        name: Set(name.to_string()),
        description: Set(None),
        currency_code: Set("BRL".to_string()),
        owner_id: Set(owner_id),
        current_balance: Set(Decimal::ZERO),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to create account")
}

pub async fn seed_entry(
    db: &DatabaseConnection,
    account_id: i32,
    description: &str,
) -> entry::Model {
    entry::ActiveModel {
        account_id: Set(account_id),
        description: Set(description.to_string()),
        status: Set(entry::EntryStatus::Active),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to create entry")
}

pub async fn seed_canceled_entry(
    db: &DatabaseConnection,
    account_id: i32,
    description: &str,
) -> entry::Model {
    entry::ActiveModel {
        account_id: Set(account_id),
        description: Set(description.to_string()),
        status: Set(entry::EntryStatus::Canceled),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to create entry")
}

pub async fn seed_installment(
    db: &DatabaseConnection,
    entry_id: i32,
    number: i32,
    due_date: Option<NaiveDate>,
    total: Decimal,
    status: InstallmentStatus,
) -> installment::Model {
    installment::ActiveModel {
        entry_id: Set(entry_id),
        number: Set(number),
        due_date: Set(due_date),
        movement_date: Set(None),
        total: Set(total),
        status: Set(status),
        payment_date: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to create installment")
}

pub async fn seed_paid_installment(
    db: &DatabaseConnection,
    entry_id: i32,
    number: i32,
    due_date: Option<NaiveDate>,
    total: Decimal,
    payment_date: NaiveDate,
) -> installment::Model {
    installment::ActiveModel {
        entry_id: Set(entry_id),
        number: Set(number),
        due_date: Set(due_date),
        movement_date: Set(None),
        total: Set(total),
        status: Set(InstallmentStatus::Paid),
        payment_date: Set(Some(payment_date)),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to create installment")
}

/// A statement with one unmatched line, bypassing the importer.
pub async fn seed_statement_with_line(
    db: &DatabaseConnection,
    account_id: i32,
    date: NaiveDate,
    description: &str,
    amount: Decimal,
) -> statement::Model {
    seed_statement_with_lines(db, account_id, &[(date, description, amount)]).await
}

pub async fn seed_statement_with_lines(
    db: &DatabaseConnection,
    account_id: i32,
    lines: &[(NaiveDate, &str, Decimal)],
) -> statement::Model {
    let seed = next_seed();
    let stmt = statement::ActiveModel {
        account_id: Set(account_id),
        reference: Set(format!("seed-{seed}")),
        original_filename: Set(format!("seed-{seed}.csv")),
        content_hash: Set(format!("hash-{seed}")),
        imported_at: Set(fixed_now()),
        imported_by: Set(1),
        status: Set(StatementStatus::Imported),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to create statement");

    for (position, (date, description, amount)) in lines.iter().enumerate() {
        statement_line::ActiveModel {
            statement_id: Set(stmt.id),
            position: Set(position as i32),
            date: Set(*date),
            description: Set(description.to_string()),
            amount: Set(*amount),
            match_status: Set(MatchStatus::Unmatched),
            match_meta: Set(Some(MatchMeta::default().to_json())),
            ..Default::default()
        }
        .insert(db)
        .await
        .expect("Failed to create statement line");
    }
    stmt
}

/// The statement's only line.
pub async fn single_line(
    db: &DatabaseConnection,
    statement_id: i32,
) -> statement_line::Model {
    let mut lines = lines_of(db, statement_id).await;
    assert_eq!(lines.len(), 1, "expected exactly one line");
    lines.remove(0)
}

pub async fn lines_of(
    db: &DatabaseConnection,
    statement_id: i32,
) -> Vec<statement_line::Model> {
    statement_line::Entity::find()
        .filter(statement_line::Column::StatementId.eq(statement_id))
        .order_by_asc(statement_line::Column::Position)
        .all(db)
        .await
        .expect("Failed to load lines")
}

/// Confirm a line directly, without going through the resolver.
pub async fn force_confirm(
    db: &DatabaseConnection,
    line: statement_line::Model,
    installment_id: i32,
) -> statement_line::Model {
    let candidates = line.match_meta().candidates().to_vec();
    let mut active: statement_line::ActiveModel = line.into();
    active.match_status = Set(MatchStatus::Confirmed);
    active.matched_installment_id = Set(Some(installment_id));
    active.matched_by = Set(Some(1));
    active.matched_at = Set(Some(fixed_now()));
    active.match_meta = Set(Some(
        MatchMeta::Confirmed {
            confirmed_at: fixed_now(),
            candidates,
        }
        .to_json(),
    ));
    active.update(db).await.expect("Failed to confirm line")
}

/// Event sink that records every notified account id.
#[derive(Default)]
pub struct RecordingSink {
    seen: Mutex<Vec<i32>>,
}

impl RecordingSink {
    pub fn seen(&self) -> Vec<i32> {
        self.seen.lock().expect("sink lock poisoned").clone()
    }
}

#[async_trait]
impl EventSink for RecordingSink {
    async fn balances_changed(&self, account_id: i32) {
        self.seen
            .lock()
            .expect("sink lock poisoned")
            .push(account_id);
    }
}
