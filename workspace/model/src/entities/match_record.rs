use chrono::NaiveDateTime;
use sea_orm::entity::prelude::*;

/// Immutable audit record written once per confirmation. Never updated or
/// deleted by the engine.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "match_records")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub line_id: i32,
    pub installment_id: i32,
    /// Confidence at confirmation time; absent when the confirmation did
    /// not originate from a stored suggestion.
    pub confidence: Option<i32>,
    pub matched_by: i32,
    pub matched_at: NaiveDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::statement_line::Entity",
        from = "Column::LineId",
        to = "super::statement_line::Column::Id",
        on_delete = "Cascade"
    )]
    StatementLine,
    #[sea_orm(
        belongs_to = "super::installment::Entity",
        from = "Column::InstallmentId",
        to = "super::installment::Column::Id",
        on_delete = "Cascade"
    )]
    Installment,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::MatchedBy",
        to = "super::user::Column::Id"
    )]
    User,
}

impl Related<super::statement_line::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StatementLine.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
