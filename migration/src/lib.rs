//! Database migrations for fleetscan.
//!
//! This module contains all database migrations using SeaORM Migration.

pub use sea_orm_migration::prelude::*;

mod m2025_07_01_000100_create_users;
mod m2025_07_01_000200_create_accounts;
mod m2025_07_01_000300_create_user_accounts;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2025_07_01_000100_create_users::Migration),
            Box::new(m2025_07_01_000200_create_accounts::Migration),
            Box::new(m2025_07_01_000300_create_user_accounts::Migration),
        ]
    }
}
