//! Account retirement.
//!
//! Removes first-party active accounts, first severing every user
//! entitlement in the same transaction as the account delete so no user
//! ever references a deleted account. Each account commits independently:
//! a failure on one account never rolls back removals already committed.

use std::collections::BTreeSet;
use std::sync::Arc;

use metrics::counter;
use sea_orm::{DatabaseConnection, TransactionTrait};
use tracing::{error, info};

use crate::error::RegistryError;
use crate::models::account;
use crate::repositories::{AccountRepository, UserRepository};

/// Which account numbers a retirement run targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountSelector {
    /// Every first-party active account.
    All,
    /// Only first-party active accounts with these numbers.
    Numbers(BTreeSet<String>),
}

impl AccountSelector {
    /// Parses the CLI filter convention: the sentinel `"all"` or a
    /// comma-separated list of account numbers.
    pub fn parse(input: &str) -> Self {
        if input.trim() == "all" {
            return AccountSelector::All;
        }
        AccountSelector::Numbers(
            input
                .split(',')
                .map(str::trim)
                .filter(|number| !number.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    fn matches(&self, number: &str) -> bool {
        match self {
            AccountSelector::All => true,
            AccountSelector::Numbers(numbers) => numbers.contains(number),
        }
    }
}

/// Outcome of one retirement run.
#[derive(Debug, Clone, Default)]
pub struct RetirementReport {
    /// Account numbers successfully removed.
    pub removed: Vec<String>,
    /// Account number and failure reason for candidates that could not be
    /// removed this run.
    pub failed: Vec<(String, String)>,
}

/// Coordinates entitlement detachment and account deletion.
pub struct RetirementCoordinator {
    db: Arc<DatabaseConnection>,
    accounts: AccountRepository,
    users: UserRepository,
}

impl RetirementCoordinator {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            accounts: AccountRepository::new(db.clone()),
            users: UserRepository::new(db.clone()),
            db,
        }
    }

    /// Removes every selected first-party active account.
    ///
    /// Third-party and already-inactive accounts are never candidates.
    /// Failures are isolated per account and reported individually;
    /// re-running the operation is the standard remediation since
    /// detachment is idempotent.
    pub async fn remove_accounts(
        &self,
        selector: &AccountSelector,
    ) -> Result<RetirementReport, RegistryError> {
        let candidates = self.accounts.list_active_first_party().await?;
        let mut report = RetirementReport::default();

        for account in candidates
            .into_iter()
            .filter(|account| selector.matches(&account.number))
        {
            match self.remove_one(&account).await {
                Ok(detached) => {
                    info!(
                        account_number = %account.number,
                        name = %account.name,
                        entitlements_detached = detached,
                        "deleted account"
                    );
                    counter!("accounts_retired_total").increment(1);
                    report.removed.push(account.number);
                }
                Err(err @ RegistryError::PreconditionViolation { .. }) => {
                    // A remaining entitlement after detach means the
                    // coordinator itself is broken; do not keep going.
                    return Err(err);
                }
                Err(err) => {
                    error!(account_number = %account.number, %err, "failed to delete account");
                    report.failed.push((account.number, err.to_string()));
                }
            }
        }

        Ok(report)
    }

    /// Detaches all users from one account and deletes it, in one unit of
    /// work. Returns the number of entitlements severed.
    async fn remove_one(&self, account: &account::Model) -> Result<u64, RegistryError> {
        let entitled = self.users.find_entitled_to(account.id).await?;
        for user in &entitled {
            info!(
                account_number = %account.number,
                user_id = %user.id,
                "detaching user from account"
            );
        }

        let txn = self.db.begin().await?;
        let detached = self.users.detach_account_on(&txn, account.id).await?;
        self.accounts.delete_on(&txn, account.id).await?;
        txn.commit().await?;

        Ok(detached)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_all_sentinel() {
        assert_eq!(AccountSelector::parse("all"), AccountSelector::All);
        assert_eq!(AccountSelector::parse(" all "), AccountSelector::All);
    }

    #[test]
    fn parse_comma_separated_numbers() {
        let selector = AccountSelector::parse("111122223333, 444455556666,");
        let AccountSelector::Numbers(numbers) = &selector else {
            panic!("expected number selector");
        };
        assert_eq!(numbers.len(), 2);
        assert!(selector.matches("111122223333"));
        assert!(selector.matches("444455556666"));
        assert!(!selector.matches("999999999999"));
    }

    #[test]
    fn all_matches_everything() {
        assert!(AccountSelector::All.matches("anything"));
    }
}
