//! Migration to create the user_accounts join table.
//!
//! One row per user/account entitlement; composite primary key keeps the
//! relationship naturally idempotent to detach.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(UserAccounts::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(UserAccounts::UserId).uuid().not_null())
                    .col(ColumnDef::new(UserAccounts::AccountId).uuid().not_null())
                    .primary_key(
                        Index::create()
                            .col(UserAccounts::UserId)
                            .col(UserAccounts::AccountId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_accounts_user")
                            .from(UserAccounts::Table, UserAccounts::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_accounts_account")
                            .from(UserAccounts::Table, UserAccounts::AccountId)
                            .to(Accounts::Table, Accounts::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UserAccounts::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum UserAccounts {
    Table,
    UserId,
    AccountId,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Accounts {
    Table,
    Id,
}
