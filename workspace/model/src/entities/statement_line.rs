pub mod meta;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use tracing::warn;

pub use meta::{MatchMeta, SuggestionCandidate};

/// Match state of a statement line.
///
/// `unmatched` and `suggested` are interchangeable from the suggestion
/// engine's point of view; `confirmed` is terminal and only ever set by an
/// explicit resolution, never automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum MatchStatus {
    #[sea_orm(string_value = "unmatched")]
    Unmatched,
    #[sea_orm(string_value = "suggested")]
    Suggested,
    #[sea_orm(string_value = "confirmed")]
    Confirmed,
    #[sea_orm(string_value = "ignored")]
    Ignored,
}

/// One transaction row within an imported statement.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "statement_lines")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub statement_id: i32,
    /// Position within the original file, 0-based.
    pub position: i32,
    pub date: NaiveDate,
    pub description: String,
    /// Signed movement amount as stated in the file.
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub amount: Decimal,
    /// Running balance after this movement, when the file provides one.
    #[sea_orm(column_type = "Decimal(Some((16, 4)))", nullable)]
    pub balance: Option<Decimal>,
    pub document_number: Option<String>,
    /// External transaction identifier (OFX FITID).
    pub fit_id: Option<String>,
    pub match_status: MatchStatus,
    /// Status-keyed match metadata, see [`MatchMeta`].
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub match_meta: Option<Json>,
    pub matched_installment_id: Option<i32>,
    pub matched_by: Option<i32>,
    pub matched_at: Option<NaiveDateTime>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::statement::Entity",
        from = "Column::StatementId",
        to = "super::statement::Column::Id",
        on_delete = "Cascade"
    )]
    Statement,
    #[sea_orm(
        belongs_to = "super::installment::Entity",
        from = "Column::MatchedInstallmentId",
        to = "super::installment::Column::Id",
        on_delete = "SetNull"
    )]
    Installment,
    #[sea_orm(has_many = "super::match_record::Entity")]
    MatchRecord,
}

impl Related<super::statement::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Statement.def()
    }
}

impl Related<super::installment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Installment.def()
    }
}

impl Model {
    /// Decode the stored match metadata. An absent or undecodable column is
    /// treated as a fresh unmatched line.
    pub fn match_meta(&self) -> MatchMeta {
        match &self.match_meta {
            None => MatchMeta::default(),
            Some(json) => serde_json::from_value(json.clone()).unwrap_or_else(|err| {
                warn!(
                    "Undecodable match metadata on statement line {}: {}",
                    self.id, err
                );
                MatchMeta::default()
            }),
        }
    }

    /// Whether the line still blocks its statement from reconciling.
    pub fn is_pending(&self) -> bool {
        matches!(
            self.match_status,
            MatchStatus::Unmatched | MatchStatus::Suggested
        )
    }
}

impl ActiveModelBehavior for ActiveModel {}
