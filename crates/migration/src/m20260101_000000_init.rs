//! Initial schema.
//!
//! - `users`: login identities mapped to roles and investors
//! - `investors`: capital holders
//! - `transactions`: the ledger (contributions, expenses, settlements)
//! - `eggs` / `egg_deliveries`: production batches and per-family deliveries
//! - `debts` / `debt_payments`: the debt subledger
//! - `settings`: JSON documents keyed by name
//! - `logs` / `notifications`: audit trail and investor notifications

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Users {
    Table,
    Email,
    Password,
    Role,
    InvestorId,
}

#[derive(Iden)]
enum Investors {
    Table,
    Id,
    Name,
    InitialCapital,
    CurrentCapital,
    Email,
    Role,
    Gender,
}

#[derive(Iden)]
enum Transactions {
    Table,
    Id,
    Kind,
    AmountMinor,
    Note,
    OccurredAt,
    CreatedBy,
    Category,
    InvestorId,
    InvestorName,
    SettlementType,
    Automated,
    RelatedEggId,
    RelatedFamilyId,
    RelatedDebtId,
}

#[derive(Iden)]
enum Eggs {
    Table,
    Id,
    Quantity,
    Note,
    OccurredAt,
    RecordedBy,
    FamilyCountAtProduction,
}

#[derive(Iden)]
enum EggDeliveries {
    Table,
    EggId,
    FamilyId,
    Status,
    Amount,
    ResolvedAt,
    ResolvedBy,
    EggPriceMinor,
    CashValueMinor,
}

#[derive(Iden)]
enum Debts {
    Table,
    Id,
    CreditorName,
    TotalAmount,
    PaidAmount,
    RemainingAmount,
    Status,
    OccurredAt,
    DeductFromFund,
    Note,
}

#[derive(Iden)]
enum DebtPayments {
    Table,
    Id,
    DebtId,
    AmountMinor,
    Source,
    InvestorPayments,
    Note,
    PaidAt,
    RecordedBy,
}

#[derive(Iden)]
enum Settings {
    Table,
    Key,
    Value,
}

#[derive(Iden)]
enum Logs {
    Table,
    Id,
    Kind,
    Message,
    User,
    Details,
    CreatedAt,
}

#[derive(Iden)]
enum Notifications {
    Table,
    Id,
    TitleKey,
    MessageKey,
    Params,
    CreatedAt,
}

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Investors
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Investors::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Investors::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Investors::Name).string().not_null())
                    .col(
                        ColumnDef::new(Investors::InitialCapital)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Investors::CurrentCapital)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Investors::Email).string())
                    .col(
                        ColumnDef::new(Investors::Role)
                            .string()
                            .not_null()
                            .default("investor"),
                    )
                    .col(ColumnDef::new(Investors::Gender).string())
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Users
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Email)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Users::Password).string().not_null())
                    .col(ColumnDef::new(Users::Role).string().not_null())
                    .col(ColumnDef::new(Users::InvestorId).uuid())
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Transactions
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Transactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Transactions::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Transactions::Kind).string().not_null())
                    .col(
                        ColumnDef::new(Transactions::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Transactions::Note).string())
                    .col(
                        ColumnDef::new(Transactions::OccurredAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Transactions::CreatedBy).string().not_null())
                    .col(ColumnDef::new(Transactions::Category).string())
                    .col(ColumnDef::new(Transactions::InvestorId).uuid())
                    .col(ColumnDef::new(Transactions::InvestorName).string())
                    .col(ColumnDef::new(Transactions::SettlementType).string())
                    .col(
                        ColumnDef::new(Transactions::Automated)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Transactions::RelatedEggId).uuid())
                    .col(ColumnDef::new(Transactions::RelatedFamilyId).string())
                    .col(ColumnDef::new(Transactions::RelatedDebtId).uuid())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-transactions-occurred_at")
                    .table(Transactions::Table)
                    .col(Transactions::OccurredAt)
                    .col(Transactions::Id)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-transactions-investor_id")
                    .table(Transactions::Table)
                    .col(Transactions::InvestorId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 4. Eggs and deliveries
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Eggs::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Eggs::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Eggs::Quantity).big_integer().not_null())
                    .col(ColumnDef::new(Eggs::Note).string())
                    .col(
                        ColumnDef::new(Eggs::OccurredAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Eggs::RecordedBy).string().not_null())
                    .col(
                        ColumnDef::new(Eggs::FamilyCountAtProduction)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(EggDeliveries::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(EggDeliveries::EggId).uuid().not_null())
                    .col(ColumnDef::new(EggDeliveries::FamilyId).string().not_null())
                    .col(ColumnDef::new(EggDeliveries::Status).string().not_null())
                    .col(
                        ColumnDef::new(EggDeliveries::Amount)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(EggDeliveries::ResolvedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(EggDeliveries::ResolvedBy).string())
                    .col(ColumnDef::new(EggDeliveries::EggPriceMinor).big_integer())
                    .col(ColumnDef::new(EggDeliveries::CashValueMinor).big_integer())
                    .primary_key(
                        Index::create()
                            .col(EggDeliveries::EggId)
                            .col(EggDeliveries::FamilyId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-egg_deliveries-egg_id")
                            .from(EggDeliveries::Table, EggDeliveries::EggId)
                            .to(Eggs::Table, Eggs::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 5. Debts and payments
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Debts::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Debts::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Debts::CreditorName).string().not_null())
                    .col(ColumnDef::new(Debts::TotalAmount).big_integer().not_null())
                    .col(ColumnDef::new(Debts::PaidAmount).big_integer().not_null())
                    .col(
                        ColumnDef::new(Debts::RemainingAmount)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Debts::Status).string().not_null())
                    .col(
                        ColumnDef::new(Debts::OccurredAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Debts::DeductFromFund)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Debts::Note).string())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(DebtPayments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DebtPayments::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(DebtPayments::DebtId).uuid().not_null())
                    .col(
                        ColumnDef::new(DebtPayments::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(DebtPayments::Source).string().not_null())
                    .col(
                        ColumnDef::new(DebtPayments::InvestorPayments)
                            .text()
                            .not_null()
                            .default("[]"),
                    )
                    .col(ColumnDef::new(DebtPayments::Note).string())
                    .col(
                        ColumnDef::new(DebtPayments::PaidAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(DebtPayments::RecordedBy).string().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-debt_payments-debt_id")
                            .from(DebtPayments::Table, DebtPayments::DebtId)
                            .to(Debts::Table, Debts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-debt_payments-debt_id")
                    .table(DebtPayments::Table)
                    .col(DebtPayments::DebtId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 6. Settings
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Settings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Settings::Key)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Settings::Value).text().not_null())
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 7. Audit log and notifications
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Logs::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Logs::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Logs::Kind).string().not_null())
                    .col(ColumnDef::new(Logs::Message).string().not_null())
                    .col(ColumnDef::new(Logs::User).string().not_null())
                    .col(ColumnDef::new(Logs::Details).text().not_null())
                    .col(
                        ColumnDef::new(Logs::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-logs-created_at")
                    .table(Logs::Table)
                    .col(Logs::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Notifications::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Notifications::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Notifications::TitleKey).string().not_null())
                    .col(ColumnDef::new(Notifications::MessageKey).string().not_null())
                    .col(ColumnDef::new(Notifications::Params).text().not_null())
                    .col(
                        ColumnDef::new(Notifications::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Reverse creation order so foreign keys never dangle
        manager
            .drop_table(Table::drop().table(Notifications::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Logs::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Settings::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(DebtPayments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Debts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(EggDeliveries::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Eggs::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Transactions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Investors::Table).to_owned())
            .await?;
        Ok(())
    }
}
