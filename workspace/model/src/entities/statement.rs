use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;

/// Lifecycle of an imported statement. A statement becomes `reconciled`
/// only once every line has been confirmed or ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum StatementStatus {
    #[sea_orm(string_value = "imported")]
    Imported,
    #[sea_orm(string_value = "reconciled")]
    Reconciled,
}

/// One imported bank statement file. The content hash is the dedup key:
/// the same bytes can be imported at most once per account, enforced by a
/// unique index on (account_id, content_hash).
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "statements")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// The account this statement was imported for.
    pub account_id: i32,
    /// Human label, defaulting to the file name stem (OFX TRNUID wins).
    pub reference: String,
    pub original_filename: String,
    /// SHA-256 of the raw uploaded bytes, hex-encoded.
    pub content_hash: String,
    pub imported_at: NaiveDateTime,
    pub imported_by: i32,
    pub status: StatementStatus,
    /// Balance before the first movement; parser-supplied or inferred from
    /// the first line's running balance.
    #[sea_orm(column_type = "Decimal(Some((16, 4)))", nullable)]
    pub opening_balance: Option<Decimal>,
    /// Balance after the last movement; parser-supplied or inferred from
    /// the last line's running balance.
    #[sea_orm(column_type = "Decimal(Some((16, 4)))", nullable)]
    pub closing_balance: Option<Decimal>,
    /// As-of date the file declares for the closing balance (OFX DTASOF).
    pub closing_balance_date: Option<NaiveDate>,
    /// Account identifier as stated in the file (OFX ACCTID).
    pub account_number: Option<String>,
    /// Routing/bank identifier as stated in the file (OFX BANKID).
    pub bank_id: Option<String>,
    /// Declared transaction range start (OFX DTSTART).
    pub range_start: Option<NaiveDate>,
    /// Declared transaction range end (OFX DTEND).
    pub range_end: Option<NaiveDate>,
    /// Where the raw file bytes were stored.
    pub storage_path: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::account::Entity",
        from = "Column::AccountId",
        to = "super::account::Column::Id",
        on_delete = "Cascade"
    )]
    Account,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::ImportedBy",
        to = "super::user::Column::Id"
    )]
    User,
    #[sea_orm(has_many = "super::statement_line::Entity")]
    StatementLine,
}

impl Related<super::account::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Account.def()
    }
}

impl Related<super::statement_line::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StatementLine.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
