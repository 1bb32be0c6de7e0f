//! Bulk enrollment orchestration.
//!
//! Drives credential exchange and alias resolution per candidate account
//! and upserts the results into the account registry. The batch tolerates
//! partial failure: a candidate that cannot be parsed or whose role cannot
//! be assumed is recorded as a skip and the run continues.

use std::sync::Arc;

use metrics::counter;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::aliases::AliasResolver;
use crate::credentials::{AliasLister, CredentialExchange};
use crate::descriptors::{AliasTable, RoleArn, RoleDescriptor, ThirdPartyTable};
use crate::error::{RegistryError, SkipReason};
use crate::repositories::{AccountRepository, AccountUpsertParams};

/// Exact-match filter applied to role descriptors before enrollment.
#[derive(Debug, Clone)]
pub struct EnrollmentFilter {
    pub trusted_entity: String,
    pub role_type: String,
}

/// Created/already-existing tallies for one enrollment category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CategoryCounts {
    pub created: u64,
    pub existing: u64,
}

/// One candidate that was skipped, with the reason operators need to
/// re-run safely.
#[derive(Debug, Clone)]
pub struct SkippedCandidate {
    pub descriptor: String,
    pub reason: String,
}

/// Outcome of one bulk enrollment run.
#[derive(Debug, Clone, Default)]
pub struct EnrollmentReport {
    pub first_party: CategoryCounts,
    pub third_party: CategoryCounts,
    pub skipped: Vec<SkippedCandidate>,
    /// True when the run stopped early at a cancellation checkpoint.
    pub cancelled: bool,
}

impl EnrollmentReport {
    fn record_skip(&mut self, descriptor: &str, reason: &SkipReason) {
        warn!(descriptor, %reason, "skipping enrollment candidate");
        counter!("enrollment_skipped_total", "category" => "first_party").increment(1);
        self.skipped.push(SkippedCandidate {
            descriptor: descriptor.to_string(),
            reason: reason.to_string(),
        });
    }
}

/// Bulk enrollment orchestrator.
///
/// Holds its collaborators by injection; the process entry point owns their
/// lifecycle.
pub struct Enroller {
    registry: AccountRepository,
    exchange: Arc<dyn CredentialExchange>,
    alias_lister: Arc<dyn AliasLister>,
    cancel: CancellationToken,
}

impl Enroller {
    pub fn new(
        registry: AccountRepository,
        exchange: Arc<dyn CredentialExchange>,
        alias_lister: Arc<dyn AliasLister>,
    ) -> Self {
        Self {
            registry,
            exchange,
            alias_lister,
            cancel: CancellationToken::new(),
        }
    }

    /// Installs a cancellation token checked between candidates. The run is
    /// never interrupted mid-upsert.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Enrolls every eligible account from the supplied descriptor sets.
    ///
    /// Re-running with identical inputs is safe: previously enrolled
    /// accounts are reported as already existing and left untouched.
    /// Per-candidate failures land in the report; only registry errors fail
    /// the run.
    pub async fn enroll_all(
        &self,
        roles: &[RoleDescriptor],
        alias_table: &AliasTable,
        third_party: &ThirdPartyTable,
        filter: &EnrollmentFilter,
    ) -> Result<EnrollmentReport, RegistryError> {
        let resolver = AliasResolver::new(alias_table.clone());
        let mut report = EnrollmentReport::default();

        let eligible = roles.iter().filter(|role| {
            role.trusted_entity == filter.trusted_entity && role.role_type == filter.role_type
        });

        for role in eligible {
            if self.cancel.is_cancelled() {
                warn!("enrollment cancelled between candidates");
                report.cancelled = true;
                return Ok(report);
            }

            self.enroll_first_party(role, &resolver, &mut report).await?;
        }

        for (number, entry) in third_party {
            if self.cancel.is_cancelled() {
                warn!("enrollment cancelled between candidates");
                report.cancelled = true;
                return Ok(report);
            }

            let params = AccountUpsertParams::third_party(
                number.clone(),
                entry.name.clone(),
                Some(entry.documentation.clone()),
            );
            if self.registry.upsert(params).await?.created() {
                info!(account_number = %number, name = %entry.name, "enrolled third-party account");
                counter!("enrollment_created_total", "category" => "third_party").increment(1);
                report.third_party.created += 1;
            } else {
                info!(account_number = %number, "third-party account already exists");
                counter!("enrollment_existing_total", "category" => "third_party").increment(1);
                report.third_party.existing += 1;
            }
        }

        Ok(report)
    }

    async fn enroll_first_party(
        &self,
        role: &RoleDescriptor,
        resolver: &AliasResolver,
        report: &mut EnrollmentReport,
    ) -> Result<(), RegistryError> {
        let parsed = match RoleArn::parse(&role.arn) {
            Ok(parsed) => parsed,
            Err(err) => {
                report.record_skip(&role.arn, &SkipReason::MalformedDescriptor(err));
                return Ok(());
            }
        };

        let credentials = match self.exchange.assume_role(&role.arn).await {
            Ok(credentials) => credentials,
            Err(err) => {
                report.record_skip(&role.arn, &SkipReason::CredentialExchange(err));
                return Ok(());
            }
        };

        // Listing failure degrades to the static table or the raw number;
        // it never skips the candidate.
        let listed = match self.alias_lister.list_account_aliases(&credentials).await {
            Ok(aliases) => Some(aliases),
            Err(err) => {
                warn!(
                    account_number = %parsed.account_number,
                    %err,
                    "alias listing failed, falling back"
                );
                None
            }
        };

        let alias = resolver.resolve(parsed.account_number, listed.as_deref());
        // Truncation to 32 chars happens at upsert time; notes keep the
        // full alias.
        let params = AccountUpsertParams::first_party(
            parsed.account_number,
            alias.clone(),
            parsed.role_name,
            Some(alias.clone()),
        );

        if self.registry.upsert(params).await?.created() {
            info!(
                account_number = %parsed.account_number,
                name = %alias,
                role_name = %parsed.role_name,
                "enrolled account"
            );
            counter!("enrollment_created_total", "category" => "first_party").increment(1);
            report.first_party.created += 1;
        } else {
            info!(account_number = %parsed.account_number, "account already exists");
            counter!("enrollment_existing_total", "category" => "first_party").increment(1);
            report.first_party.existing += 1;
        }

        Ok(())
    }
}
