//! Account repository for database operations
//!
//! This module provides the AccountRepository struct which encapsulates
//! SeaORM operations for the accounts table. The registry is the single
//! source of truth for enrolled accounts: upsert never overwrites an
//! existing row, which makes bulk enrollment safe to re-run.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{RegistryError, is_unique_violation};
use crate::models::account::{self, Entity as Account};
use crate::models::user_account::{self, Entity as UserAccount};

/// Display names are truncated to this many characters at upsert time.
pub const NAME_MAX_CHARS: usize = 32;

/// Parameters for enrolling an account.
///
/// Use [`AccountUpsertParams::first_party`] or
/// [`AccountUpsertParams::third_party`] so the third-party/role-name
/// invariant holds by construction.
#[derive(Debug, Clone)]
pub struct AccountUpsertParams {
    pub number: String,
    pub third_party: bool,
    pub name: String,
    pub active: bool,
    pub notes: Option<String>,
    pub role_name: String,
}

impl AccountUpsertParams {
    /// A first-party account: role-assumable, enrolled active.
    pub fn first_party<N, D, R>(number: N, name: D, role_name: R, notes: Option<String>) -> Self
    where
        N: Into<String>,
        D: Into<String>,
        R: Into<String>,
    {
        Self {
            number: number.into(),
            third_party: false,
            name: name.into(),
            active: true,
            notes,
            role_name: role_name.into(),
        }
    }

    /// A third-party account: informational only, enrolled inactive with no
    /// role to assume.
    pub fn third_party<N, D>(number: N, name: D, notes: Option<String>) -> Self
    where
        N: Into<String>,
        D: Into<String>,
    {
        Self {
            number: number.into(),
            third_party: true,
            name: name.into(),
            active: false,
            notes,
            role_name: String::new(),
        }
    }
}

/// Outcome of an idempotent upsert.
#[derive(Debug, Clone)]
pub enum UpsertOutcome {
    /// A new row was created.
    Created(account::Model),
    /// A row with this number already existed; nothing was written.
    AlreadyExists(account::Model),
}

impl UpsertOutcome {
    pub fn created(&self) -> bool {
        matches!(self, UpsertOutcome::Created(_))
    }

    pub fn account(&self) -> &account::Model {
        match self {
            UpsertOutcome::Created(model) | UpsertOutcome::AlreadyExists(model) => model,
        }
    }
}

/// Repository for account database operations
#[derive(Debug, Clone)]
pub struct AccountRepository {
    /// Database connection pool
    pub db: Arc<DatabaseConnection>,
}

impl AccountRepository {
    /// Creates a new AccountRepository instance
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Idempotently enrolls an account.
    ///
    /// If an account with this number already exists (in any active state)
    /// the call is a no-op reporting [`UpsertOutcome::AlreadyExists`];
    /// existing fields are never overwritten. The loser of a concurrent
    /// insert race on the same number is folded into the same outcome via
    /// the unique index on `number`.
    pub async fn upsert(&self, params: AccountUpsertParams) -> Result<UpsertOutcome, RegistryError> {
        if let Some(existing) = self.find_by_number(&params.number).await? {
            return Ok(UpsertOutcome::AlreadyExists(existing));
        }

        let id = Uuid::new_v4();
        let now = Utc::now();
        let name: String = params.name.chars().take(NAME_MAX_CHARS).collect();

        let active_model = account::ActiveModel {
            id: Set(id),
            number: Set(params.number.clone()),
            name: Set(name),
            third_party: Set(params.third_party),
            active: Set(params.active),
            role_name: Set(params.role_name),
            notes: Set(params.notes),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        match active_model.insert(&*self.db).await {
            Ok(_) => {
                // For SQLite, query the record directly since we already know the ID
                let created = Account::find_by_id(id)
                    .one(&*self.db)
                    .await?
                    .ok_or(RegistryError::NotFound(id))?;
                Ok(UpsertOutcome::Created(created))
            }
            Err(err) if is_unique_violation(&err) => {
                let existing = self
                    .find_by_number(&params.number)
                    .await?
                    .ok_or(RegistryError::Database(err))?;
                Ok(UpsertOutcome::AlreadyExists(existing))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Finds an account by its external account number.
    pub async fn find_by_number(&self, number: &str) -> Result<Option<account::Model>, RegistryError> {
        Ok(Account::find()
            .filter(account::Column::Number.eq(number))
            .one(&*self.db)
            .await?)
    }

    /// Looks up accounts by surrogate ids.
    pub async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<account::Model>, RegistryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(Account::find()
            .filter(account::Column::Id.is_in(ids.iter().copied()))
            .all(&*self.db)
            .await?)
    }

    /// Looks up accounts by external account numbers.
    pub async fn find_by_numbers(
        &self,
        numbers: &[String],
    ) -> Result<Vec<account::Model>, RegistryError> {
        if numbers.is_empty() {
            return Ok(Vec::new());
        }
        Ok(Account::find()
            .filter(account::Column::Number.is_in(numbers.iter().cloned()))
            .all(&*self.db)
            .await?)
    }

    /// Lists every enrolled account ordered by number.
    pub async fn list_all(&self) -> Result<Vec<account::Model>, RegistryError> {
        Ok(Account::find()
            .order_by_asc(account::Column::Number)
            .all(&*self.db)
            .await?)
    }

    /// Lists first-party active accounts, the candidate set for bulk
    /// retirement.
    pub async fn list_active_first_party(&self) -> Result<Vec<account::Model>, RegistryError> {
        Ok(Account::find()
            .filter(account::Column::ThirdParty.eq(false))
            .filter(account::Column::Active.eq(true))
            .order_by_asc(account::Column::Number)
            .all(&*self.db)
            .await?)
    }

    /// Deletes an account row.
    ///
    /// Precondition: every user entitlement referencing the account has
    /// already been detached. A remaining entitlement indicates a
    /// coordinator bug and is reported as a fatal
    /// [`RegistryError::PreconditionViolation`].
    pub async fn delete(&self, account_id: Uuid) -> Result<(), RegistryError> {
        self.delete_on(&*self.db, account_id).await
    }

    /// Same as [`delete`](Self::delete), runnable inside a transaction.
    pub async fn delete_on<C: ConnectionTrait>(
        &self,
        conn: &C,
        account_id: Uuid,
    ) -> Result<(), RegistryError> {
        let entitlements = UserAccount::find()
            .filter(user_account::Column::AccountId.eq(account_id))
            .count(conn)
            .await?;
        if entitlements > 0 {
            return Err(RegistryError::PreconditionViolation {
                account_id,
                entitlements,
            });
        }

        let result = Account::delete_by_id(account_id).exec(conn).await?;
        if result.rows_affected == 0 {
            return Err(RegistryError::NotFound(account_id));
        }

        Ok(())
    }
}
