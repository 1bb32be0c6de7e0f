//! Account entity model
//!
//! This module contains the SeaORM entity model for the accounts table,
//! which stores the cloud accounts enrolled for security scanning.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;

/// Account entity representing a cloud account enrolled for scanning
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    /// Surrogate identifier assigned at enrollment (primary key, immutable)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// External cloud provider account number (unique among live rows)
    pub number: String,

    /// Display name, truncated to 32 characters at enrollment
    pub name: String,

    /// True for accounts outside our administrative trust; no role is
    /// assumed for these
    pub third_party: bool,

    /// Inactive accounts are excluded from scanning but retained for history
    pub active: bool,

    /// Role assumed for first-party accounts; empty for third-party ones
    pub role_name: String,

    /// Free-text annotation (full alias, documentation link)
    pub notes: Option<String>,

    /// Timestamp when the account was enrolled
    pub created_at: DateTimeWithTimeZone,

    /// Timestamp when the account was last updated
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        super::user_account::Relation::User.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::user_account::Relation::Account.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
