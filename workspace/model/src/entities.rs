//! This file serves as the root for all SeaORM entity modules.
//! We define the data models for the statement reconciliation service
//! here: the financial accounts, the accounting entries and installments
//! they owe, and the imported statements being reconciled against them.

pub mod account;
pub mod entry;
pub mod installment;
pub mod match_record;
pub mod reconciliation;
pub mod statement;
pub mod statement_line;
pub mod user;

pub mod prelude {
    //! A prelude module for easy importing of all entities.
    pub use super::account::Entity as Account;
    pub use super::entry::Entity as Entry;
    pub use super::installment::Entity as Installment;
    pub use super::match_record::Entity as MatchRecord;
    pub use super::reconciliation::Entity as Reconciliation;
    pub use super::statement::Entity as Statement;
    pub use super::statement_line::Entity as StatementLine;
    pub use super::user::Entity as User;
}
