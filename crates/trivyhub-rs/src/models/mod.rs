use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

pub const SCHEMA_VERSION: &str = "2018-10-08";
pub const RECORD_STATE_ACTIVE: &str = "ACTIVE";
pub const AWS_PARTITION: &str = "aws";

/// Normalized finding record, vendor-neutral until the sink boundary.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Finding {
    pub schema_version: String,
    pub id: String,
    pub product_arn: String,
    pub generator_id: String,
    pub account_id: String,
    pub types: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub severity: String,
    pub title: String,
    pub description: String,
    pub remediation: Remediation,
    pub product_fields: BTreeMap<String, String>,
    pub resource: ResourceRef,
    pub record_state: String,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Remediation {
    pub text: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ResourceRef {
    pub resource_type: String,
    pub id: String,
    pub partition: String,
    pub region: String,
    pub details: BTreeMap<String, String>,
}
