//! User repository for database operations
//!
//! Provides user creation, entitlement management, and the idempotent
//! detach operation used by the retirement coordinator.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    Set,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{RegistryError, is_unique_violation};
use crate::models::user::{self, Entity as User};
use crate::models::user_account::{self, Entity as UserAccount};

/// Repository for user and entitlement database operations
#[derive(Debug, Clone)]
pub struct UserRepository {
    /// Database connection pool
    pub db: Arc<DatabaseConnection>,
}

impl UserRepository {
    /// Creates a new UserRepository instance
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Creates a new user.
    pub async fn create(&self, email: Option<String>) -> Result<user::Model, RegistryError> {
        let id = Uuid::new_v4();
        let active_model = user::ActiveModel {
            id: Set(id),
            email: Set(email),
            created_at: Set(Utc::now().into()),
        };
        active_model.insert(&*self.db).await?;

        User::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or(RegistryError::NotFound(id))
    }

    /// Gets a user by id.
    pub async fn find_by_id(&self, user_id: Uuid) -> Result<Option<user::Model>, RegistryError> {
        Ok(User::find_by_id(user_id).one(&*self.db).await?)
    }

    /// Grants a user access to an account. Granting an existing entitlement
    /// is a no-op.
    pub async fn entitle(&self, user_id: Uuid, account_id: Uuid) -> Result<(), RegistryError> {
        let link = user_account::ActiveModel {
            user_id: Set(user_id),
            account_id: Set(account_id),
        };
        match link.insert(&*self.db).await {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    /// Lists the accounts a user is entitled to. A missing user has no
    /// entitlements.
    pub async fn accounts_for(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<crate::models::account::Model>, RegistryError> {
        use sea_orm::ModelTrait;
        let Some(user) = self.find_by_id(user_id).await? else {
            return Ok(Vec::new());
        };
        Ok(user
            .find_related(crate::models::account::Entity)
            .all(&*self.db)
            .await?)
    }

    /// Loads every user entitled to the given account.
    pub async fn find_entitled_to(
        &self,
        account_id: Uuid,
    ) -> Result<Vec<user::Model>, RegistryError> {
        let user_ids: Vec<Uuid> = UserAccount::find()
            .filter(user_account::Column::AccountId.eq(account_id))
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|link| link.user_id)
            .collect();

        if user_ids.is_empty() {
            return Ok(Vec::new());
        }

        Ok(User::find()
            .filter(user::Column::Id.is_in(user_ids))
            .all(&*self.db)
            .await?)
    }

    /// Severs every user entitlement to the given account, returning how
    /// many were removed. Detaching an already-absent entitlement is a
    /// no-op, so the operation is safe to re-run.
    pub async fn detach_account_on<C: ConnectionTrait>(
        &self,
        conn: &C,
        account_id: Uuid,
    ) -> Result<u64, RegistryError> {
        let result = UserAccount::delete_many()
            .filter(user_account::Column::AccountId.eq(account_id))
            .exec(conn)
            .await?;
        Ok(result.rows_affected)
    }
}
