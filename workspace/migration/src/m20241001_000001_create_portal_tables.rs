use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create accounts table
        manager
            .create_table(
                Table::create()
                    .table(Accounts::Table)
                    .if_not_exists()
                    .col(string(Accounts::Id).primary_key())
                    .col(string(Accounts::Username).unique_key())
                    .col(string(Accounts::Email))
                    .col(string_null(Accounts::PasswordHash))
                    .col(string_len(Accounts::Role, 16))
                    .col(string(Accounts::FullName))
                    .col(string(Accounts::Designation))
                    .col(string_null(Accounts::Phone))
                    .col(string_null(Accounts::ProfilePhoto))
                    .col(boolean(Accounts::ProfilePictureUploaded).default(false))
                    .col(string_len(Accounts::Status, 16))
                    .col(timestamp_with_time_zone_null(Accounts::RequestedAt))
                    .col(timestamp_with_time_zone_null(Accounts::ApprovedAt))
                    .col(timestamp_with_time_zone(Accounts::CreatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_accounts_status")
                    .table(Accounts::Table)
                    .col(Accounts::Status)
                    .to_owned(),
            )
            .await?;

        // Create requests table
        manager
            .create_table(
                Table::create()
                    .table(Requests::Table)
                    .if_not_exists()
                    .col(string(Requests::Id).primary_key())
                    .col(string_len(Requests::RequestType, 16))
                    .col(string(Requests::Title))
                    .col(string(Requests::CreatedBy))
                    .col(string_null(Requests::CreatedById))
                    .col(string_null(Requests::CreatedByRole))
                    .col(string_null(Requests::CreatedByDesignation))
                    .col(json(Requests::Payload))
                    .col(string_len(Requests::Target, 16))
                    .col(string_len(Requests::Status, 16))
                    .col(string_null(Requests::ForwardedTo))
                    .col(timestamp_with_time_zone(Requests::CreatedAt))
                    .col(timestamp_with_time_zone_null(Requests::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_requests_target_status")
                    .table(Requests::Table)
                    .col(Requests::Target)
                    .col(Requests::Status)
                    .to_owned(),
            )
            .await?;

        // Create notifications table
        manager
            .create_table(
                Table::create()
                    .table(Notifications::Table)
                    .if_not_exists()
                    .col(string(Notifications::Id).primary_key())
                    .col(string(Notifications::NotificationType))
                    .col(string(Notifications::Title))
                    .col(text(Notifications::Message))
                    .col(string(Notifications::TargetUser).default("all"))
                    .col(string_null(Notifications::RelatedId))
                    .col(timestamp_with_time_zone(Notifications::CreatedAt))
                    .col(boolean(Notifications::Read).default(false))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_notifications_created_at")
                    .table(Notifications::Table)
                    .col(Notifications::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Notifications::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Requests::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Accounts::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Accounts {
    Table,
    Id,
    Username,
    Email,
    PasswordHash,
    Role,
    FullName,
    Designation,
    Phone,
    ProfilePhoto,
    ProfilePictureUploaded,
    Status,
    RequestedAt,
    ApprovedAt,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Requests {
    Table,
    Id,
    RequestType,
    Title,
    CreatedBy,
    CreatedById,
    CreatedByRole,
    CreatedByDesignation,
    Payload,
    Target,
    Status,
    ForwardedTo,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Notifications {
    Table,
    Id,
    NotificationType,
    Title,
    Message,
    TargetUser,
    RelatedId,
    CreatedAt,
    Read,
}
