//! Cross-account credential exchange
//!
//! Defines the boundary for assuming a trust role in a candidate account
//! and for listing the aliases that account exposes, plus the AWS-backed
//! implementations. Both calls are plain network requests with an enforced
//! per-call timeout; a timeout is reported exactly like a denied exchange.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::time::timeout;

use crate::error::CredentialExchangeError;

/// Session name used when assuming roles to fetch aliases.
pub const ROLE_SESSION_NAME: &str = "fetch-aliases";

/// Short-lived credentials for an assumed role.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
}

/// Obtains temporary cross-account credentials for a trust role.
///
/// No retries are performed; a failed exchange is reported once and the
/// candidate account is skipped for the run.
#[async_trait]
pub trait CredentialExchange: Send + Sync {
    async fn assume_role(&self, role_arn: &str) -> Result<Credentials, CredentialExchangeError>;
}

/// Alias listing failed after a successful exchange.
///
/// This never skips a candidate; the resolver falls back to the static
/// table or the raw account number.
#[derive(Debug, Clone, Error)]
#[error("unable to list account aliases: {reason}")]
pub struct AliasListError {
    pub reason: String,
}

/// Lists the alias strings the assumed identity's account exposes.
#[async_trait]
pub trait AliasLister: Send + Sync {
    async fn list_account_aliases(
        &self,
        credentials: &Credentials,
    ) -> Result<Vec<String>, AliasListError>;
}

/// Loads the ambient AWS SDK configuration, optionally pinning a region.
pub async fn load_sdk_config(region: Option<String>) -> aws_config::SdkConfig {
    match region {
        Some(region) => {
            aws_config::defaults(aws_config::BehaviorVersion::latest())
                .region(aws_config::Region::new(region))
                .load()
                .await
        }
        None => aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await,
    }
}

/// STS-backed credential exchange.
pub struct StsCredentialExchange {
    client: aws_sdk_sts::Client,
    call_timeout: Duration,
}

impl StsCredentialExchange {
    pub fn new(sdk_config: &aws_config::SdkConfig, call_timeout: Duration) -> Self {
        Self {
            client: aws_sdk_sts::Client::new(sdk_config),
            call_timeout,
        }
    }
}

#[async_trait]
impl CredentialExchange for StsCredentialExchange {
    async fn assume_role(&self, role_arn: &str) -> Result<Credentials, CredentialExchangeError> {
        let call = self
            .client
            .assume_role()
            .role_arn(role_arn)
            .role_session_name(ROLE_SESSION_NAME)
            .send();

        let response = timeout(self.call_timeout, call)
            .await
            .map_err(|_| {
                CredentialExchangeError::timeout(role_arn, self.call_timeout.as_millis() as u64)
            })?
            .map_err(|err| {
                CredentialExchangeError::new(
                    role_arn,
                    format!("{}", aws_sdk_sts::error::DisplayErrorContext(&err)),
                )
            })?;

        let credentials = response.credentials().ok_or_else(|| {
            CredentialExchangeError::new(role_arn, "assume-role response carried no credentials")
        })?;

        Ok(Credentials {
            access_key_id: credentials.access_key_id().to_string(),
            secret_access_key: credentials.secret_access_key().to_string(),
            session_token: credentials.session_token().to_string(),
        })
    }
}

/// IAM-backed alias lister; builds a scoped client from the temporary
/// credentials of each assumed role.
pub struct IamAliasLister {
    base: aws_config::SdkConfig,
    call_timeout: Duration,
}

impl IamAliasLister {
    pub fn new(sdk_config: aws_config::SdkConfig, call_timeout: Duration) -> Self {
        Self {
            base: sdk_config,
            call_timeout,
        }
    }

    fn client_for(&self, credentials: &Credentials) -> aws_sdk_iam::Client {
        let provider = aws_sdk_iam::config::Credentials::new(
            credentials.access_key_id.clone(),
            credentials.secret_access_key.clone(),
            Some(credentials.session_token.clone()),
            None,
            "fleetscan-assumed-role",
        );
        let config = aws_sdk_iam::config::Builder::from(&self.base)
            .credentials_provider(provider)
            .build();
        aws_sdk_iam::Client::from_conf(config)
    }
}

#[async_trait]
impl AliasLister for IamAliasLister {
    async fn list_account_aliases(
        &self,
        credentials: &Credentials,
    ) -> Result<Vec<String>, AliasListError> {
        let client = self.client_for(credentials);
        let call = client.list_account_aliases().send();

        let response = timeout(self.call_timeout, call)
            .await
            .map_err(|_| AliasListError {
                reason: format!(
                    "alias listing timed out after {}ms",
                    self.call_timeout.as_millis()
                ),
            })?
            .map_err(|err| AliasListError {
                reason: format!("{}", aws_sdk_iam::error::DisplayErrorContext(&err)),
            })?;

        Ok(response.account_aliases().to_vec())
    }
}
