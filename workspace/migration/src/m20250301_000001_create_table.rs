use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create users table
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(pk_auto(Users::Id))
                    .col(string(Users::Username).unique_key())
                    .to_owned(),
            )
            .await?;

        // Create accounts table
        manager
            .create_table(
                Table::create()
                    .table(Accounts::Table)
                    .if_not_exists()
                    .col(pk_auto(Accounts::Id))
                    .col(string(Accounts::Name))
                    .col(string_null(Accounts::Description))
                    .col(string(Accounts::CurrencyCode))
                    .col(integer(Accounts::OwnerId))
                    .col(decimal(Accounts::CurrentBalance).decimal_len(16, 4))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_account_owner")
                            .from(Accounts::Table, Accounts::OwnerId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create entries table
        manager
            .create_table(
                Table::create()
                    .table(Entries::Table)
                    .if_not_exists()
                    .col(pk_auto(Entries::Id))
                    .col(integer(Entries::AccountId))
                    .col(string(Entries::Description))
                    .col(string(Entries::Status))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_entry_account")
                            .from(Entries::Table, Entries::AccountId)
                            .to(Accounts::Table, Accounts::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create installments table
        manager
            .create_table(
                Table::create()
                    .table(Installments::Table)
                    .if_not_exists()
                    .col(pk_auto(Installments::Id))
                    .col(integer(Installments::EntryId))
                    .col(integer(Installments::Number))
                    .col(date_null(Installments::DueDate))
                    .col(date_null(Installments::MovementDate))
                    .col(decimal(Installments::Total).decimal_len(16, 4))
                    .col(string(Installments::Status))
                    .col(date_null(Installments::PaymentDate))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_installment_entry")
                            .from(Installments::Table, Installments::EntryId)
                            .to(Entries::Table, Entries::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create statements table
        manager
            .create_table(
                Table::create()
                    .table(Statements::Table)
                    .if_not_exists()
                    .col(pk_auto(Statements::Id))
                    .col(integer(Statements::AccountId))
                    .col(string(Statements::Reference))
                    .col(string(Statements::OriginalFilename))
                    .col(string(Statements::ContentHash))
                    .col(date_time(Statements::ImportedAt))
                    .col(integer(Statements::ImportedBy))
                    .col(string(Statements::Status))
                    .col(decimal_null(Statements::OpeningBalance).decimal_len(16, 4))
                    .col(decimal_null(Statements::ClosingBalance).decimal_len(16, 4))
                    .col(date_null(Statements::ClosingBalanceDate))
                    .col(string_null(Statements::AccountNumber))
                    .col(string_null(Statements::BankId))
                    .col(date_null(Statements::RangeStart))
                    .col(date_null(Statements::RangeEnd))
                    .col(string_null(Statements::StoragePath))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_statement_account")
                            .from(Statements::Table, Statements::AccountId)
                            .to(Accounts::Table, Accounts::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_statement_imported_by")
                            .from(Statements::Table, Statements::ImportedBy)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // The duplicate-import guard. The importer also pre-checks, but only
        // this index makes concurrent imports of the same file safe.
        manager
            .create_index(
                Index::create()
                    .name("idx_statements_account_content_hash")
                    .table(Statements::Table)
                    .col(Statements::AccountId)
                    .col(Statements::ContentHash)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Create statement_lines table
        manager
            .create_table(
                Table::create()
                    .table(StatementLines::Table)
                    .if_not_exists()
                    .col(pk_auto(StatementLines::Id))
                    .col(integer(StatementLines::StatementId))
                    .col(integer(StatementLines::Position))
                    .col(date(StatementLines::Date))
                    .col(string(StatementLines::Description))
                    .col(decimal(StatementLines::Amount).decimal_len(16, 4))
                    .col(decimal_null(StatementLines::Balance).decimal_len(16, 4))
                    .col(string_null(StatementLines::DocumentNumber))
                    .col(string_null(StatementLines::FitId))
                    .col(string(StatementLines::MatchStatus))
                    .col(json_binary_null(StatementLines::MatchMeta))
                    .col(integer_null(StatementLines::MatchedInstallmentId))
                    .col(integer_null(StatementLines::MatchedBy))
                    .col(date_time_null(StatementLines::MatchedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_statement_line_statement")
                            .from(StatementLines::Table, StatementLines::StatementId)
                            .to(Statements::Table, Statements::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_statement_line_installment")
                            .from(StatementLines::Table, StatementLines::MatchedInstallmentId)
                            .to(Installments::Table, Installments::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_statement_line_matched_by")
                            .from(StatementLines::Table, StatementLines::MatchedBy)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create match_records table
        manager
            .create_table(
                Table::create()
                    .table(MatchRecords::Table)
                    .if_not_exists()
                    .col(pk_auto(MatchRecords::Id))
                    .col(integer(MatchRecords::LineId))
                    .col(integer(MatchRecords::InstallmentId))
                    .col(integer_null(MatchRecords::Confidence))
                    .col(integer(MatchRecords::MatchedBy))
                    .col(date_time(MatchRecords::MatchedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_match_record_line")
                            .from(MatchRecords::Table, MatchRecords::LineId)
                            .to(StatementLines::Table, StatementLines::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_match_record_installment")
                            .from(MatchRecords::Table, MatchRecords::InstallmentId)
                            .to(Installments::Table, Installments::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_match_record_matched_by")
                            .from(MatchRecords::Table, MatchRecords::MatchedBy)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create reconciliations table
        manager
            .create_table(
                Table::create()
                    .table(Reconciliations::Table)
                    .if_not_exists()
                    .col(pk_auto(Reconciliations::Id))
                    .col(integer(Reconciliations::AccountId))
                    .col(date(Reconciliations::PeriodStart))
                    .col(date(Reconciliations::PeriodEnd))
                    .col(decimal(Reconciliations::OpeningBalance).decimal_len(16, 4))
                    .col(decimal(Reconciliations::ClosingBalance).decimal_len(16, 4))
                    .col(string(Reconciliations::Status))
                    .col(integer(Reconciliations::CreatedBy))
                    .col(date_time(Reconciliations::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reconciliation_account")
                            .from(Reconciliations::Table, Reconciliations::AccountId)
                            .to(Accounts::Table, Accounts::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reconciliation_created_by")
                            .from(Reconciliations::Table, Reconciliations::CreatedBy)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Reconciliations::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(MatchRecords::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(StatementLines::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Statements::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Installments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Entries::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Accounts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Username,
}

#[derive(DeriveIden)]
enum Accounts {
    Table,
    Id,
    Name,
    Description,
    CurrencyCode,
    OwnerId,
    CurrentBalance,
}

#[derive(DeriveIden)]
enum Entries {
    Table,
    Id,
    AccountId,
    Description,
    Status,
}

#[derive(DeriveIden)]
enum Installments {
    Table,
    Id,
    EntryId,
    Number,
    DueDate,
    MovementDate,
    Total,
    Status,
    PaymentDate,
}

#[derive(DeriveIden)]
enum Statements {
    Table,
    Id,
    AccountId,
    Reference,
    OriginalFilename,
    ContentHash,
    ImportedAt,
    ImportedBy,
    Status,
    OpeningBalance,
    ClosingBalance,
    ClosingBalanceDate,
    AccountNumber,
    BankId,
    RangeStart,
    RangeEnd,
    StoragePath,
}

#[derive(DeriveIden)]
enum StatementLines {
    Table,
    Id,
    StatementId,
    Position,
    Date,
    Description,
    Amount,
    Balance,
    DocumentNumber,
    FitId,
    MatchStatus,
    MatchMeta,
    MatchedInstallmentId,
    MatchedBy,
    MatchedAt,
}

#[derive(DeriveIden)]
enum MatchRecords {
    Table,
    Id,
    LineId,
    InstallmentId,
    Confidence,
    MatchedBy,
    MatchedAt,
}

#[derive(DeriveIden)]
enum Reconciliations {
    Table,
    Id,
    AccountId,
    PeriodStart,
    PeriodEnd,
    OpeningBalance,
    ClosingBalance,
    Status,
    CreatedBy,
    CreatedAt,
}
