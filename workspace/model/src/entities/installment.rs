use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;

/// Payment status of an installment. Only `planned` and `pending`
/// installments are match candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum InstallmentStatus {
    #[sea_orm(string_value = "planned")]
    Planned,
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "paid")]
    Paid,
}

/// One scheduled payment obligation of an entry. Matching compares the
/// installment total against the absolute statement line amount and its due
/// or movement date against the line date.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "installments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub entry_id: i32,
    /// Ordinal within the entry (1-based, "3/12" style numbering).
    pub number: i32,
    pub due_date: Option<NaiveDate>,
    /// Expected settlement date when it differs from the due date.
    pub movement_date: Option<NaiveDate>,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub total: Decimal,
    pub status: InstallmentStatus,
    /// Set exactly once, when the installment is marked paid.
    pub payment_date: Option<NaiveDate>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::entry::Entity",
        from = "Column::EntryId",
        to = "super::entry::Column::Id",
        on_delete = "Cascade"
    )]
    Entry,
}

impl Related<super::entry::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Entry.def()
    }
}

impl Model {
    /// Whether this installment can still be offered as a match candidate.
    pub fn is_open(&self) -> bool {
        matches!(
            self.status,
            InstallmentStatus::Planned | InstallmentStatus::Pending
        ) && self.payment_date.is_none()
    }

    /// The date match scoring anchors on: due date, else movement date.
    pub fn anchor_date(&self) -> Option<NaiveDate> {
        self.due_date.or(self.movement_date)
    }
}

impl ActiveModelBehavior for ActiveModel {}
