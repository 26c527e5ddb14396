use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::DbBackend;
use sea_orm_migration::sea_query::Expr;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let backend = manager.get_database_backend();

        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Users::TelegramId)
                            .big_integer()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Users::FullName).string_len(255).not_null())
                    .col(ColumnDef::new(Users::Role).string_len(16).not_null())
                    .col(
                        ColumnDef::new(Users::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Users::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Users::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(WalletChecks::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(WalletChecks::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(WalletChecks::Address).text().not_null())
                    .col(ColumnDef::new(WalletChecks::Network).string_len(32).not_null())
                    .col(ColumnDef::new(WalletChecks::Provider).string_len(64).not_null())
                    .col(
                        numeric(
                            ColumnDef::new(WalletChecks::RiskScore).not_null(),
                            backend,
                            5,
                            2,
                        )
                        .check(
                            Expr::col(WalletChecks::RiskScore)
                                .gte(0)
                                .and(Expr::col(WalletChecks::RiskScore).lte(100)),
                        ),
                    )
                    .col(ColumnDef::new(WalletChecks::RiskLevel).string_len(16).not_null())
                    .col(ColumnDef::new(WalletChecks::CategoriesJson).json().not_null())
                    .col(ColumnDef::new(WalletChecks::RawReportJson).json().not_null())
                    .col(ColumnDef::new(WalletChecks::CheckedBy).big_integer().null())
                    .col(
                        ColumnDef::new(WalletChecks::CheckedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_wallet_checks_address_network")
                    .table(WalletChecks::Table)
                    .col(WalletChecks::Address)
                    .col(WalletChecks::Network)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PaymentRequests::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PaymentRequests::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(PaymentRequests::RequestNo)
                            .string_len(32)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(PaymentRequests::CreatorId).big_integer().not_null())
                    .col(ColumnDef::new(PaymentRequests::Address).text().not_null())
                    .col(ColumnDef::new(PaymentRequests::Network).string_len(32).not_null())
                    .col(ColumnDef::new(PaymentRequests::Asset).string_len(32).not_null())
                    .col(
                        numeric(
                            ColumnDef::new(PaymentRequests::Amount).not_null(),
                            backend,
                            36,
                            18,
                        )
                        .check(Expr::col(PaymentRequests::Amount).gt(0)),
                    )
                    .col(ColumnDef::new(PaymentRequests::Comment).text().null())
                    .col(ColumnDef::new(PaymentRequests::AttachmentUrl).text().null())
                    .col(ColumnDef::new(PaymentRequests::AmlCheckId).uuid().not_null())
                    .col(
                        ColumnDef::new(PaymentRequests::Status)
                            .string_len(16)
                            .not_null()
                            .default("draft"),
                    )
                    .col(ColumnDef::new(PaymentRequests::ApprovedBy).big_integer().null())
                    .col(
                        ColumnDef::new(PaymentRequests::ApprovedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(PaymentRequests::RejectionReason).text().null())
                    // Unique but nullable: only paid requests carry a hash
                    .col(
                        ColumnDef::new(PaymentRequests::TxHash)
                            .string_len(128)
                            .null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(PaymentRequests::PaidAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(PaymentRequests::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(PaymentRequests::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_payment_requests_aml_check")
                            .from(PaymentRequests::Table, PaymentRequests::AmlCheckId)
                            .to(WalletChecks::Table, WalletChecks::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_payment_requests_status")
                    .table(PaymentRequests::Table)
                    .col(PaymentRequests::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_payment_requests_creator")
                    .table(PaymentRequests::Table)
                    .col(PaymentRequests::CreatorId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(StatusHistory::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(StatusHistory::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(StatusHistory::RequestId).uuid().not_null())
                    .col(ColumnDef::new(StatusHistory::OldStatus).string_len(16).null())
                    .col(ColumnDef::new(StatusHistory::NewStatus).string_len(16).not_null())
                    .col(ColumnDef::new(StatusHistory::ActorId).big_integer().null())
                    .col(ColumnDef::new(StatusHistory::Reason).text().null())
                    .col(
                        ColumnDef::new(StatusHistory::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_status_history_request")
                            .from(StatusHistory::Table, StatusHistory::RequestId)
                            .to(PaymentRequests::Table, PaymentRequests::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_status_history_request_id")
                    .table(StatusHistory::Table)
                    .col(StatusHistory::RequestId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AuditLogs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AuditLogs::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AuditLogs::ActorId).big_integer().null())
                    .col(ColumnDef::new(AuditLogs::Action).string_len(128).not_null())
                    .col(ColumnDef::new(AuditLogs::EntityType).string_len(64).not_null())
                    .col(ColumnDef::new(AuditLogs::EntityId).string_len(128).not_null())
                    .col(ColumnDef::new(AuditLogs::PayloadJson).json().not_null())
                    .col(
                        ColumnDef::new(AuditLogs::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_audit_logs_created_at")
                    .table(AuditLogs::Table)
                    .col(AuditLogs::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_audit_logs_entity")
                    .table(AuditLogs::Table)
                    .col(AuditLogs::EntityType)
                    .col(AuditLogs::EntityId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AuditLogs::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(StatusHistory::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PaymentRequests::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(WalletChecks::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await
    }
}

/// SQLite stores decimals with numeric affinity and rejects wide precisions.
fn numeric(column: &mut ColumnDef, backend: DbBackend, precision: u32, scale: u32) -> &mut ColumnDef {
    match backend {
        DbBackend::Sqlite => column.decimal(),
        _ => column.decimal_len(precision, scale),
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    TelegramId,
    FullName,
    Role,
    IsActive,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum WalletChecks {
    Table,
    Id,
    Address,
    Network,
    Provider,
    RiskScore,
    RiskLevel,
    CategoriesJson,
    RawReportJson,
    CheckedBy,
    CheckedAt,
}

#[derive(DeriveIden)]
enum PaymentRequests {
    Table,
    Id,
    RequestNo,
    CreatorId,
    Address,
    Network,
    Asset,
    Amount,
    Comment,
    AttachmentUrl,
    AmlCheckId,
    Status,
    ApprovedBy,
    ApprovedAt,
    RejectionReason,
    TxHash,
    PaidAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum StatusHistory {
    Table,
    Id,
    RequestId,
    OldStatus,
    NewStatus,
    ActorId,
    Reason,
    CreatedAt,
}

#[derive(DeriveIden)]
enum AuditLogs {
    Table,
    Id,
    ActorId,
    Action,
    EntityType,
    EntityId,
    PayloadJson,
    CreatedAt,
}
