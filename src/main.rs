//! # Fleetscan Main Entry Point
//!
//! Thin CLI over the enrollment pipeline. Commands wire repositories,
//! credential clients, and descriptor sources together; all the logic
//! lives in the library.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sea_orm::DatabaseConnection;
use tokio_util::sync::CancellationToken;

use fleetscan::config::{AppConfig, ConfigLoader};
use fleetscan::credentials::{IamAliasLister, StsCredentialExchange, load_sdk_config};
use fleetscan::descriptors::{
    AliasTable, LocalAccountRecord, RoleDescriptor, S3DescriptorSource, ThirdPartyTable,
    read_json_file,
};
use fleetscan::enrollment::{Enroller, EnrollmentFilter, EnrollmentReport};
use fleetscan::migration::{Migrator, MigratorTrait};
use fleetscan::repositories::{AccountRepository, AccountUpsertParams};
use fleetscan::retirement::{AccountSelector, RetirementCoordinator};
use fleetscan::{db, telemetry};

#[derive(Parser)]
#[command(name = "fleetscan", version, about = "Account enrollment for the scanning fleet")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create all database tables.
    InitDb,
    /// Drop all database tables.
    DropDb,
    /// Bulk-load accounts from a local JSON file of {number, name, role_name}.
    AddAccounts {
        #[arg(short, long)]
        filename: PathBuf,
    },
    /// Enroll accounts from the role/alias/third-party descriptor sets.
    Enroll {
        /// S3 bucket holding the descriptor documents (default from config).
        #[arg(short, long)]
        bucket: Option<String>,
        /// Read descriptor documents from this local directory instead of S3.
        #[arg(long)]
        from_dir: Option<PathBuf>,
        /// Key or relative path of the role descriptor document.
        #[arg(long)]
        role_file: Option<String>,
        /// Key or relative path of the static alias table document.
        #[arg(long)]
        alias_file: Option<String>,
        /// Key or relative path of the third-party account document.
        #[arg(long)]
        third_party_file: Option<String>,
        /// Trusted-entity ARN descriptors must match (default from config).
        #[arg(short, long)]
        trusted_entity: Option<String>,
        /// Role type descriptors must match (default from config).
        #[arg(short, long)]
        role_type: Option<String>,
    },
    /// Remove accounts and their user entitlements.
    RemoveAccounts {
        /// "all" or a comma-separated list of account numbers.
        #[arg(short, long, default_value = "all")]
        accounts: String,
    },
    /// List enrolled accounts.
    ListAccounts,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse first so --help/--version never depend on a valid environment.
    let cli = Cli::parse();

    let config = ConfigLoader::new().load()?;
    telemetry::init_tracing(&config)?;

    tracing::info!(profile = %config.profile, "loaded configuration");
    if let Ok(redacted_json) = config.redacted_json() {
        tracing::debug!(config = %redacted_json, "effective configuration");
    }

    let db = Arc::new(db::init_pool(&config).await?);

    match cli.command {
        Command::InitDb => {
            Migrator::up(&*db, None).await?;
            println!("Database initialized");
        }
        Command::DropDb => {
            Migrator::down(&*db, None).await?;
            println!("Database dropped");
        }
        Command::AddAccounts { filename } => add_accounts(&db, &filename).await?,
        Command::Enroll {
            bucket,
            from_dir,
            role_file,
            alias_file,
            third_party_file,
            trusted_entity,
            role_type,
        } => {
            let files = DescriptorFiles {
                role_file: role_file.unwrap_or_else(|| config.role_file.clone()),
                alias_file: alias_file.unwrap_or_else(|| config.alias_file.clone()),
                third_party_file: third_party_file
                    .unwrap_or_else(|| config.third_party_file.clone()),
            };
            enroll(
                &config,
                db.clone(),
                bucket,
                from_dir,
                files,
                trusted_entity,
                role_type,
            )
            .await?
        }
        Command::RemoveAccounts { accounts } => {
            let selector = AccountSelector::parse(&accounts);
            let coordinator = RetirementCoordinator::new(db.clone());
            let report = coordinator.remove_accounts(&selector).await?;
            println!(
                "Removed {} account(s), {} failure(s)",
                report.removed.len(),
                report.failed.len()
            );
            for (number, reason) in &report.failed {
                println!("  failed {}: {}", number, reason);
            }
        }
        Command::ListAccounts => {
            let registry = AccountRepository::new(db.clone());
            for account in registry.list_all().await? {
                println!(
                    "{}\t{}\tthird_party={}\tactive={}\trole={}",
                    account.number, account.name, account.third_party, account.active,
                    account.role_name
                );
            }
        }
    }

    Ok(())
}

/// Bulk-loads first-party accounts from a local JSON file.
async fn add_accounts(db: &Arc<DatabaseConnection>, filename: &Path) -> anyhow::Result<()> {
    let records: Vec<LocalAccountRecord> = read_json_file(filename)?;
    let registry = AccountRepository::new(db.clone());

    for record in records {
        let params = AccountUpsertParams::first_party(
            record.number.clone(),
            record.name.clone(),
            record.role_name,
            None,
        );
        if registry.upsert(params).await?.created() {
            println!("Successfully added account {}", record.name);
        } else {
            println!("Account with id {} already exists", record.number);
        }
    }

    Ok(())
}

/// The three descriptor document locations for one enrollment run, after
/// CLI flags and config defaults have been merged.
struct DescriptorFiles {
    role_file: String,
    alias_file: String,
    third_party_file: String,
}

async fn enroll(
    config: &AppConfig,
    db: Arc<DatabaseConnection>,
    bucket: Option<String>,
    from_dir: Option<PathBuf>,
    files: DescriptorFiles,
    trusted_entity: Option<String>,
    role_type: Option<String>,
) -> anyhow::Result<()> {
    let trusted_entity = trusted_entity
        .or_else(|| config.trusted_entity.clone())
        .context("trusted entity must be set via --trusted-entity or FLEETSCAN_TRUSTED_ENTITY")?;
    let role_type = role_type.unwrap_or_else(|| config.role_type.clone());

    let sdk_config = load_sdk_config(config.aws_region.clone()).await;

    let (roles, alias_table, third_party): (Vec<RoleDescriptor>, AliasTable, ThirdPartyTable) =
        if let Some(dir) = from_dir {
            (
                read_json_file(&dir.join(&files.role_file))?,
                read_json_file(&dir.join(&files.alias_file))?,
                read_json_file(&dir.join(&files.third_party_file))?,
            )
        } else {
            let bucket = bucket
                .or_else(|| config.descriptor_bucket.clone())
                .context("descriptor bucket must be set via --bucket or FLEETSCAN_DESCRIPTOR_BUCKET")?;
            let source = S3DescriptorSource::new(&sdk_config, bucket);
            (
                source.fetch(&files.role_file).await?,
                source.fetch(&files.alias_file).await?,
                source.fetch(&files.third_party_file).await?,
            )
        };

    let call_timeout = Duration::from_millis(config.exchange_timeout_ms);
    let exchange = Arc::new(StsCredentialExchange::new(&sdk_config, call_timeout));
    let alias_lister = Arc::new(IamAliasLister::new(sdk_config, call_timeout));

    // Ctrl-C stops the run at the next between-candidate checkpoint.
    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal_cancel.cancel();
        }
    });

    let enroller = Enroller::new(AccountRepository::new(db), exchange, alias_lister)
        .with_cancellation(cancel);
    let filter = EnrollmentFilter {
        trusted_entity,
        role_type,
    };

    let report = enroller
        .enroll_all(&roles, &alias_table, &third_party, &filter)
        .await?;
    print_report(&report);

    Ok(())
}

fn print_report(report: &EnrollmentReport) {
    println!(
        "First-party: {} created, {} already existed",
        report.first_party.created, report.first_party.existing
    );
    println!(
        "Third-party: {} created, {} already existed",
        report.third_party.created, report.third_party.existing
    );
    for skip in &report.skipped {
        println!("  skipped {}: {}", skip.descriptor, skip.reason);
    }
    if report.cancelled {
        println!("Run cancelled before completion; re-run to finish enrollment");
    }
}
