//! # Error Handling
//!
//! This module provides the domain error types for the enrollment pipeline,
//! separating recoverable per-candidate failures (which feed the run report)
//! from fatal registry errors.

use thiserror::Error;
use uuid::Uuid;

/// Role assumption was denied, throttled, or timed out.
///
/// Recoverable: the candidate is skipped and the batch continues. The error
/// always carries the role identifier so the skip can be reported against a
/// concrete account.
#[derive(Debug, Clone, Error)]
#[error("unable to assume role {role_arn}: {reason}")]
pub struct CredentialExchangeError {
    /// Fully-qualified identifier of the role that could not be assumed
    pub role_arn: String,
    /// Human-readable failure reason from the credential provider
    pub reason: String,
}

impl CredentialExchangeError {
    pub fn new<A: Into<String>, R: Into<String>>(role_arn: A, reason: R) -> Self {
        Self {
            role_arn: role_arn.into(),
            reason: reason.into(),
        }
    }

    /// A per-call timeout is reported the same way as a denied exchange.
    pub fn timeout<A: Into<String>>(role_arn: A, timeout_ms: u64) -> Self {
        Self {
            role_arn: role_arn.into(),
            reason: format!("credential exchange timed out after {}ms", timeout_ms),
        }
    }
}

/// A role or account descriptor that cannot be parsed.
///
/// Recoverable: the single descriptor is skipped with a reported reason.
#[derive(Debug, Clone, Error)]
#[error("malformed descriptor '{descriptor}': {detail}")]
pub struct MalformedDescriptorError {
    /// The offending descriptor text (usually a role ARN)
    pub descriptor: String,
    /// What was wrong with it
    pub detail: String,
}

impl MalformedDescriptorError {
    pub fn new<D: Into<String>, T: Into<String>>(descriptor: D, detail: T) -> Self {
        Self {
            descriptor: descriptor.into(),
            detail: detail.into(),
        }
    }
}

/// Why a candidate was skipped during a bulk enrollment run.
#[derive(Debug, Clone, Error)]
pub enum SkipReason {
    #[error(transparent)]
    CredentialExchange(#[from] CredentialExchangeError),
    #[error(transparent)]
    MalformedDescriptor(#[from] MalformedDescriptorError),
}

/// Errors surfaced by the account registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("account {0} not found")]
    NotFound(Uuid),

    /// Deleting an account that still has entitlement rows is a coordinator
    /// bug, never a recoverable condition.
    #[error(
        "refusing to delete account {account_id}: {entitlements} user entitlement(s) still attached"
    )]
    PreconditionViolation {
        account_id: Uuid,
        entitlements: u64,
    },
}

/// Returns true when a DbErr is a unique-constraint violation.
///
/// Concurrent enrollment runs can race on the insert for the same account
/// number; the loser hits the unique index on `accounts.number` and must be
/// folded into the "already exists" outcome rather than failing the run.
pub fn is_unique_violation(error: &sea_orm::DbErr) -> bool {
    use sea_orm::RuntimeErr;

    const PG_UNIQUE: &str = "23505";
    const SQLITE_DUPLICATE_CODES: &[&str] = &["1555", "2067"];

    let runtime_err = match error {
        sea_orm::DbErr::Query(RuntimeErr::SqlxError(sqlx_err))
        | sea_orm::DbErr::Exec(RuntimeErr::SqlxError(sqlx_err)) => sqlx_err,
        _ => return false,
    };

    let Some(db_error) = runtime_err.as_database_error() else {
        return false;
    };

    if db_error.is_unique_violation() {
        return true;
    }

    if let Some(code) = db_error.code() {
        let code_str = code.as_ref();
        if code_str == PG_UNIQUE || SQLITE_DUPLICATE_CODES.contains(&code_str) {
            return true;
        }
    }

    false
}
