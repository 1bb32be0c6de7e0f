//! Externally supplied enrollment descriptors.
//!
//! Role descriptors, the static alias table, and the third-party account
//! table arrive as JSON documents, either from local files or from an S3
//! bucket. Field names follow the external wire format.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::MalformedDescriptorError;

/// Mapping of account-number string to alias string.
pub type AliasTable = BTreeMap<String, String>;

/// Mapping of account-number string to third-party descriptor.
pub type ThirdPartyTable = BTreeMap<String, ThirdPartyAccount>;

/// One role eligible for enrollment, as supplied by the descriptor feed.
#[derive(Debug, Clone, Deserialize)]
pub struct RoleDescriptor {
    #[serde(rename = "Arn")]
    pub arn: String,
    #[serde(rename = "TrustedEntity")]
    pub trusted_entity: String,
    #[serde(rename = "Type")]
    pub role_type: String,
}

/// A third-party account entry: informational only, never role-assumed.
#[derive(Debug, Clone, Deserialize)]
pub struct ThirdPartyAccount {
    pub name: String,
    pub documentation: String,
}

/// A record in the local bulk-load file.
#[derive(Debug, Clone, Deserialize)]
pub struct LocalAccountRecord {
    pub number: String,
    pub name: String,
    pub role_name: String,
}

/// The account-bearing parts of a role ARN.
///
/// A role ARN is colon-delimited; segment 4 is the account number and the
/// trailing path segment of segment 5 is the role name:
/// `arn:aws:iam::123456789012:role/path/AuditRole`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleArn<'a> {
    pub account_number: &'a str,
    pub role_name: &'a str,
}

impl<'a> RoleArn<'a> {
    pub fn parse(arn: &'a str) -> Result<Self, MalformedDescriptorError> {
        let segments: Vec<&str> = arn.splitn(6, ':').collect();
        if segments.len() != 6 {
            return Err(MalformedDescriptorError::new(
                arn,
                "expected six colon-delimited segments",
            ));
        }

        let account_number = segments[4];
        if account_number.is_empty() {
            return Err(MalformedDescriptorError::new(
                arn,
                "account number segment is empty",
            ));
        }

        let resource = segments[5];
        let Some((_, role_name)) = resource.rsplit_once('/') else {
            return Err(MalformedDescriptorError::new(
                arn,
                "resource segment has no role path",
            ));
        };
        if role_name.is_empty() {
            return Err(MalformedDescriptorError::new(arn, "role name is empty"));
        }

        Ok(Self {
            account_number,
            role_name,
        })
    }
}

/// Reads a JSON document from a local file.
pub fn read_json_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("failed to read descriptor file {}", path.display()))?;
    serde_json::from_slice(&bytes)
        .with_context(|| format!("failed to parse descriptor file {}", path.display()))
}

/// Fetches descriptor documents from an S3 bucket.
pub struct S3DescriptorSource {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3DescriptorSource {
    pub fn new(sdk_config: &aws_config::SdkConfig, bucket: String) -> Self {
        Self {
            client: aws_sdk_s3::Client::new(sdk_config),
            bucket,
        }
    }

    /// Downloads and deserializes one JSON document.
    pub async fn fetch<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .with_context(|| format!("failed to fetch s3://{}/{}", self.bucket, key))?;

        let bytes = response
            .body
            .collect()
            .await
            .with_context(|| format!("failed to read body of s3://{}/{}", self.bucket, key))?
            .into_bytes();

        serde_json::from_slice(&bytes)
            .with_context(|| format!("failed to parse s3://{}/{}", self.bucket, key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_account_number_and_role_name() {
        let parsed = RoleArn::parse("arn:aws:iam::123456789012:role/AuditRole").unwrap();
        assert_eq!(parsed.account_number, "123456789012");
        assert_eq!(parsed.role_name, "AuditRole");
    }

    #[test]
    fn role_name_is_trailing_path_segment() {
        let parsed = RoleArn::parse("arn:aws:iam::123456789012:role/service/deep/AuditRole")
            .unwrap();
        assert_eq!(parsed.role_name, "AuditRole");
    }

    #[test]
    fn too_few_segments_is_malformed() {
        let err = RoleArn::parse("arn:aws:iam:role-only").unwrap_err();
        assert!(err.detail.contains("six colon-delimited"));
    }

    #[test]
    fn missing_role_path_is_malformed() {
        let err = RoleArn::parse("arn:aws:iam::123456789012:rolename").unwrap_err();
        assert!(err.detail.contains("no role path"));
    }

    #[test]
    fn empty_account_segment_is_malformed() {
        assert!(RoleArn::parse("arn:aws:iam:::role/AuditRole").is_err());
    }

    #[test]
    fn role_descriptor_deserializes_wire_field_names() {
        let json = r#"{
            "Arn": "arn:aws:iam::123456789012:role/AuditRole",
            "TrustedEntity": "arn:aws:iam::999999999999:root",
            "Type": "SecurityAuditRole"
        }"#;
        let descriptor: RoleDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(descriptor.role_type, "SecurityAuditRole");
        assert_eq!(
            descriptor.trusted_entity,
            "arn:aws:iam::999999999999:root"
        );
    }

    #[test]
    fn third_party_table_deserializes() {
        let json = r#"{
            "111122223333": {"name": "vendor-a", "documentation": "https://wiki/vendor-a"}
        }"#;
        let table: ThirdPartyTable = serde_json::from_str(json).unwrap();
        assert_eq!(table["111122223333"].name, "vendor-a");
    }
}
