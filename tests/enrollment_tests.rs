//! Integration tests for the bulk enrollment pipeline.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use fleetscan::descriptors::{AliasTable, RoleDescriptor, ThirdPartyAccount, ThirdPartyTable};
use fleetscan::enrollment::{Enroller, EnrollmentFilter};
use fleetscan::repositories::AccountRepository;
use sea_orm::DatabaseConnection;
use tokio_util::sync::CancellationToken;

#[path = "test_utils/mod.rs"]
mod test_utils;
use test_utils::{FailingLister, MockExchange, MockLister, setup_test_db_arc};

const TRUSTED: &str = "arn:aws:iam::999999999999:root";
const ROLE_TYPE: &str = "SecurityAuditRole";

fn filter() -> EnrollmentFilter {
    EnrollmentFilter {
        trusted_entity: TRUSTED.to_string(),
        role_type: ROLE_TYPE.to_string(),
    }
}

fn descriptor(arn: &str) -> RoleDescriptor {
    RoleDescriptor {
        arn: arn.to_string(),
        trusted_entity: TRUSTED.to_string(),
        role_type: ROLE_TYPE.to_string(),
    }
}

fn enroller(
    db: Arc<DatabaseConnection>,
    exchange: MockExchange,
    lister: MockLister,
) -> Enroller {
    Enroller::new(
        AccountRepository::new(db),
        Arc::new(exchange),
        Arc::new(lister),
    )
}

#[tokio::test]
async fn enrolls_first_party_account_with_listed_alias() -> Result<()> {
    let db = setup_test_db_arc().await?;
    let arn = "arn:aws:iam::123456789012:role/AuditRole";
    let enroller = enroller(
        db.clone(),
        MockExchange::default(),
        MockLister::default().with_alias(arn, "prod-main"),
    );

    let report = enroller
        .enroll_all(&[descriptor(arn)], &AliasTable::new(), &ThirdPartyTable::new(), &filter())
        .await?;

    assert_eq!(report.first_party.created, 1);
    assert_eq!(report.first_party.existing, 0);
    assert!(report.skipped.is_empty());
    assert!(!report.cancelled);

    let registry = AccountRepository::new(db);
    let account = registry.find_by_number("123456789012").await?.unwrap();
    assert_eq!(account.name, "prod-main");
    assert_eq!(account.role_name, "AuditRole");
    assert_eq!(account.notes.as_deref(), Some("prod-main"));
    assert!(account.active);
    assert!(!account.third_party);
    Ok(())
}

#[tokio::test]
async fn rerun_with_identical_inputs_is_idempotent() -> Result<()> {
    let db = setup_test_db_arc().await?;
    let arn = "arn:aws:iam::123456789012:role/AuditRole";
    let roles = [descriptor(arn)];
    let mut third_party = ThirdPartyTable::new();
    third_party.insert(
        "111122223333".to_string(),
        ThirdPartyAccount {
            name: "vendor-a".to_string(),
            documentation: "https://wiki/vendor-a".to_string(),
        },
    );

    let enroller = enroller(
        db.clone(),
        MockExchange::default(),
        MockLister::default().with_alias(arn, "prod-main"),
    );

    let first = enroller
        .enroll_all(&roles, &AliasTable::new(), &third_party, &filter())
        .await?;
    assert_eq!(first.first_party.created, 1);
    assert_eq!(first.third_party.created, 1);

    let second = enroller
        .enroll_all(&roles, &AliasTable::new(), &third_party, &filter())
        .await?;
    assert_eq!(second.first_party.created, 0);
    assert_eq!(second.first_party.existing, 1);
    assert_eq!(second.third_party.created, 0);
    assert_eq!(second.third_party.existing, 1);

    let registry = AccountRepository::new(db);
    assert_eq!(registry.list_all().await?.len(), 2);
    Ok(())
}

#[tokio::test]
async fn credential_failure_skips_only_that_candidate() -> Result<()> {
    let db = setup_test_db_arc().await?;
    let good_a = "arn:aws:iam::111111111111:role/AuditRole";
    let bad = "arn:aws:iam::222222222222:role/AuditRole";
    let good_b = "arn:aws:iam::333333333333:role/AuditRole";

    let enroller = enroller(
        db.clone(),
        MockExchange::denying([bad.to_string()]),
        MockLister::default()
            .with_alias(good_a, "alpha")
            .with_alias(good_b, "gamma"),
    );

    let report = enroller
        .enroll_all(
            &[descriptor(good_a), descriptor(bad), descriptor(good_b)],
            &AliasTable::new(),
            &ThirdPartyTable::new(),
            &filter(),
        )
        .await?;

    assert_eq!(report.first_party.created, 2);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].descriptor, bad);
    assert!(report.skipped[0].reason.contains("access denied"));

    let registry = AccountRepository::new(db);
    assert!(registry.find_by_number("111111111111").await?.is_some());
    assert!(registry.find_by_number("222222222222").await?.is_none());
    assert!(registry.find_by_number("333333333333").await?.is_some());
    Ok(())
}

#[tokio::test]
async fn malformed_arn_skips_without_stopping_the_batch() -> Result<()> {
    let db = setup_test_db_arc().await?;
    let good = "arn:aws:iam::111111111111:role/AuditRole";

    let enroller = enroller(
        db.clone(),
        MockExchange::default(),
        MockLister::default().with_alias(good, "alpha"),
    );

    let report = enroller
        .enroll_all(
            &[descriptor("arn:aws:iam:not-a-role"), descriptor(good)],
            &AliasTable::new(),
            &ThirdPartyTable::new(),
            &filter(),
        )
        .await?;

    assert_eq!(report.first_party.created, 1);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].descriptor, "arn:aws:iam:not-a-role");
    Ok(())
}

#[tokio::test]
async fn non_matching_descriptors_are_not_enrolled() -> Result<()> {
    let db = setup_test_db_arc().await?;
    let mut wrong_entity = descriptor("arn:aws:iam::111111111111:role/AuditRole");
    wrong_entity.trusted_entity = "arn:aws:iam::888888888888:root".to_string();
    let mut wrong_type = descriptor("arn:aws:iam::222222222222:role/AuditRole");
    wrong_type.role_type = "ReadOnlyRole".to_string();

    let enroller = enroller(db.clone(), MockExchange::default(), MockLister::default());
    let report = enroller
        .enroll_all(
            &[wrong_entity, wrong_type],
            &AliasTable::new(),
            &ThirdPartyTable::new(),
            &filter(),
        )
        .await?;

    assert_eq!(report.first_party.created, 0);
    assert!(report.skipped.is_empty());
    assert!(AccountRepository::new(db).list_all().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn alias_fallback_chain_static_table_then_raw_number() -> Result<()> {
    let db = setup_test_db_arc().await?;
    let tabled = "arn:aws:iam::111111111111:role/AuditRole";
    let bare = "arn:aws:iam::222222222222:role/AuditRole";

    let mut alias_table = AliasTable::new();
    alias_table.insert("111111111111".to_string(), "from-static-table".to_string());

    // Lister fails every call, so resolution falls back to the table and
    // then to the raw number.
    let enroller = Enroller::new(
        AccountRepository::new(db.clone()),
        Arc::new(MockExchange::default()),
        Arc::new(FailingLister),
    );
    let report = enroller
        .enroll_all(
            &[descriptor(tabled), descriptor(bare)],
            &alias_table,
            &ThirdPartyTable::new(),
            &filter(),
        )
        .await?;

    // A lister failure degrades, it does not skip.
    assert_eq!(report.first_party.created, 2);
    assert!(report.skipped.is_empty());

    let registry = AccountRepository::new(db);
    let tabled_account = registry.find_by_number("111111111111").await?.unwrap();
    assert_eq!(tabled_account.name, "from-static-table");
    let bare_account = registry.find_by_number("222222222222").await?.unwrap();
    assert_eq!(bare_account.name, "222222222222");
    Ok(())
}

#[tokio::test]
async fn long_alias_is_truncated_but_notes_keep_it() -> Result<()> {
    let db = setup_test_db_arc().await?;
    let arn = "arn:aws:iam::123456789012:role/AuditRole";
    let long_alias = "an-alias-well-beyond-thirty-two-characters-long";

    let enroller = enroller(
        db.clone(),
        MockExchange::default(),
        MockLister::default().with_alias(arn, long_alias),
    );
    enroller
        .enroll_all(&[descriptor(arn)], &AliasTable::new(), &ThirdPartyTable::new(), &filter())
        .await?;

    let account = AccountRepository::new(db)
        .find_by_number("123456789012")
        .await?
        .unwrap();
    assert_eq!(account.name.chars().count(), 32);
    assert_eq!(account.notes.as_deref(), Some(long_alias));
    Ok(())
}

#[tokio::test]
async fn third_party_accounts_are_inactive_with_empty_role() -> Result<()> {
    let db = setup_test_db_arc().await?;
    let mut third_party = ThirdPartyTable::new();
    third_party.insert(
        "444455556666".to_string(),
        ThirdPartyAccount {
            name: "vendor-b".to_string(),
            documentation: "https://wiki/vendor-b".to_string(),
        },
    );

    let enroller = enroller(db.clone(), MockExchange::default(), MockLister::default());
    let report = enroller
        .enroll_all(&[], &AliasTable::new(), &third_party, &filter())
        .await?;
    assert_eq!(report.third_party.created, 1);

    let account = AccountRepository::new(db)
        .find_by_number("444455556666")
        .await?
        .unwrap();
    assert!(account.third_party);
    assert!(!account.active);
    assert_eq!(account.role_name, "");
    assert_eq!(account.name, "vendor-b");
    assert_eq!(account.notes.as_deref(), Some("https://wiki/vendor-b"));
    Ok(())
}

#[tokio::test]
async fn cancelled_token_stops_before_any_work() -> Result<()> {
    let db = setup_test_db_arc().await?;
    let cancel = CancellationToken::new();
    cancel.cancel();

    let enroller = enroller(db.clone(), MockExchange::default(), MockLister::default())
        .with_cancellation(cancel);
    let report = enroller
        .enroll_all(
            &[descriptor("arn:aws:iam::111111111111:role/AuditRole")],
            &AliasTable::new(),
            &ThirdPartyTable::new(),
            &filter(),
        )
        .await?;

    assert!(report.cancelled);
    assert_eq!(report.first_party.created, 0);
    assert!(AccountRepository::new(db).list_all().await?.is_empty());
    Ok(())
}
