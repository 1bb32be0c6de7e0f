//! Test utilities for database testing.
//!
//! Sets up in-memory SQLite databases with migrations applied, plus fixture
//! helpers and mock credential-exchange implementations.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use fleetscan::credentials::{AliasLister, AliasListError, CredentialExchange, Credentials};
use fleetscan::error::CredentialExchangeError;
use fleetscan::migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};
use uuid::Uuid;

/// Sets up an in-memory SQLite database with all migrations applied.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = Database::connect("sqlite::memory:").await?;
    Migrator::up(&db, None).await?;
    Ok(db)
}

/// Same as [`setup_test_db`], wrapped in an Arc.
pub async fn setup_test_db_arc() -> Result<Arc<DatabaseConnection>> {
    let db = setup_test_db().await?;
    Ok(Arc::new(db))
}

/// Inserts an account row directly, bypassing the registry upsert. Useful
/// for fixtures the upsert constructors cannot produce (e.g. inactive
/// first-party accounts).
#[allow(dead_code)]
pub async fn insert_account(
    db: &DatabaseConnection,
    number: &str,
    name: &str,
    third_party: bool,
    active: bool,
    role_name: &str,
) -> Result<Uuid> {
    let id = Uuid::new_v4();
    let stmt = Statement::from_sql_and_values(
        db.get_database_backend(),
        "INSERT INTO accounts (id, number, name, third_party, active, role_name, notes, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, NULL, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)",
        vec![
            sea_orm::Value::Uuid(Some(Box::new(id))),
            number.into(),
            name.into(),
            third_party.into(),
            active.into(),
            role_name.into(),
        ],
    );
    db.execute(stmt).await?;
    Ok(id)
}

/// Mock exchange: succeeds for every role ARN not in the deny set, and
/// encodes the ARN into the session token so the mock lister can key off it.
#[allow(dead_code)]
#[derive(Debug, Default)]
pub struct MockExchange {
    pub deny: BTreeSet<String>,
}

#[allow(dead_code)]
impl MockExchange {
    pub fn denying<I: IntoIterator<Item = String>>(arns: I) -> Self {
        Self {
            deny: arns.into_iter().collect(),
        }
    }
}

#[async_trait]
impl CredentialExchange for MockExchange {
    async fn assume_role(&self, role_arn: &str) -> Result<Credentials, CredentialExchangeError> {
        if self.deny.contains(role_arn) {
            return Err(CredentialExchangeError::new(role_arn, "access denied"));
        }
        Ok(Credentials {
            access_key_id: "AKIATESTACCESSKEY".to_string(),
            secret_access_key: "test-secret".to_string(),
            session_token: role_arn.to_string(),
        })
    }
}

/// Mock lister: returns the aliases registered for the role ARN carried in
/// the session token; an empty listing for unknown roles.
#[allow(dead_code)]
#[derive(Debug, Default)]
pub struct MockLister {
    pub aliases: BTreeMap<String, Vec<String>>,
}

#[allow(dead_code)]
impl MockLister {
    pub fn with_alias(mut self, role_arn: &str, alias: &str) -> Self {
        self.aliases
            .entry(role_arn.to_string())
            .or_default()
            .push(alias.to_string());
        self
    }
}

#[async_trait]
impl AliasLister for MockLister {
    async fn list_account_aliases(
        &self,
        credentials: &Credentials,
    ) -> Result<Vec<String>, AliasListError> {
        Ok(self
            .aliases
            .get(&credentials.session_token)
            .cloned()
            .unwrap_or_default())
    }
}

/// A lister whose calls always fail, for fallback-path tests.
#[allow(dead_code)]
#[derive(Debug, Default)]
pub struct FailingLister;

#[async_trait]
impl AliasLister for FailingLister {
    async fn list_account_aliases(
        &self,
        _credentials: &Credentials,
    ) -> Result<Vec<String>, AliasListError> {
        Err(AliasListError {
            reason: "introspection unavailable".to_string(),
        })
    }
}
