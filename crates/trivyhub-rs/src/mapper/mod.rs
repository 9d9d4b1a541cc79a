use std::collections::BTreeMap;

use anyhow::Context;
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::{
    identity::{CallerIdentity, IdentityResolver},
    models::{Finding, Remediation, ResourceRef, AWS_PARTITION, RECORD_STATE_ACTIVE, SCHEMA_VERSION},
    reports::{ConfigAuditReport, TypedReport, VulnerabilityReport},
};

const PRODUCT_NAME: &str = "Trivy";
const TYPE_MISCONFIGURATION: &str = "Software and Configuration Checks";
const TYPE_VULNERABILITY: &str = "Software and Configuration Checks/Vulnerabilities/CVE";
const CONTAINER_NAME_LABEL: &str = "trivy-operator.container.name";
const MAX_DESCRIPTION_LEN: usize = 1024;

/// Converts a decoded report into findings. Resolves the caller identity
/// once per report; the result is shared across all entries.
pub async fn map_report(
    report: &TypedReport,
    resolver: &dyn IdentityResolver,
) -> anyhow::Result<Vec<Finding>> {
    match report {
        TypedReport::ConfigAudit(report) => {
            let identity = resolver.resolve().await?;
            config_audit_findings(report, &identity, Utc::now())
        }
        TypedReport::Vulnerability(report) => {
            let identity = resolver.resolve().await?;
            Ok(vulnerability_findings(report, &identity, Utc::now()))
        }
        // Accepted and logged, but no mapping rule is defined yet.
        TypedReport::InfraAssessment(report) => {
            if let Ok(raw) = serde_json::to_string(report) {
                debug!(report = %raw, "infra assessment report accepted, no mapping defined");
            }
            Ok(Vec::new())
        }
        TypedReport::ClusterCompliance(report) => {
            if let Ok(raw) = serde_json::to_string(report) {
                debug!(report = %raw, "cluster compliance report accepted, no mapping defined");
            }
            Ok(Vec::new())
        }
    }
}

pub fn config_audit_findings(
    report: &ConfigAuditReport,
    identity: &CallerIdentity,
    now: DateTime<Utc>,
) -> anyhow::Result<Vec<Finding>> {
    let owner = report
        .metadata
        .owner_references
        .first()
        .with_context(|| format!("report {} has no owner references", report.metadata.name))?;
    let resource_name = format!("{}/{}", owner.kind, owner.name);
    let product_arn = product_arn(&identity.region);

    let mut findings = Vec::with_capacity(report.report.checks.len());
    for check in &report.report.checks {
        let message = check
            .messages
            .first()
            .with_context(|| format!("check {} has no messages", check.id))?;

        findings.push(Finding {
            schema_version: SCHEMA_VERSION.to_string(),
            id: format!("{}-{}", check.id, resource_name),
            product_arn: product_arn.clone(),
            generator_id: format!("Trivy/{}", check.id),
            account_id: identity.account_id.clone(),
            types: vec![TYPE_MISCONFIGURATION.to_string()],
            created_at: now,
            updated_at: now,
            severity: normalize_severity(&check.severity),
            title: format!(
                "Trivy found a misconfiguration in {}: {}",
                resource_name, check.title
            ),
            description: truncate_description(&check.description),
            remediation: Remediation {
                text: check.remediation.clone(),
                url: None,
            },
            product_fields: product_fields(),
            resource: ResourceRef {
                resource_type: "Other".to_string(),
                id: resource_name.clone(),
                partition: AWS_PARTITION.to_string(),
                region: identity.region.clone(),
                details: BTreeMap::from([("Message".to_string(), message.clone())]),
            },
            record_state: RECORD_STATE_ACTIVE.to_string(),
        });
    }

    Ok(findings)
}

pub fn vulnerability_findings(
    report: &VulnerabilityReport,
    identity: &CallerIdentity,
    now: DateTime<Utc>,
) -> Vec<Finding> {
    let registry = &report.report.registry.server;
    let repository = &report.report.artifact.repository;
    let digest = &report.report.artifact.digest;
    let tag = &report.report.artifact.tag;
    let container = report
        .metadata
        .labels
        .get(CONTAINER_NAME_LABEL)
        .cloned()
        .unwrap_or_default();

    let image_name = format!("{registry}/{repository}");
    let full_image_name = if digest.is_empty() {
        format!("{image_name}:{tag}")
    } else {
        format!("{image_name}@{digest}")
    };
    let product_arn = product_arn(&identity.region);

    report
        .report
        .vulnerabilities
        .iter()
        .map(|vuln| {
            let description = if vuln.description.is_empty() {
                &vuln.title
            } else {
                &vuln.description
            };

            let details = BTreeMap::from([
                ("Container Image".to_string(), image_name.clone()),
                ("CVE ID".to_string(), vuln.vulnerability_id.clone()),
                ("CVE Title".to_string(), vuln.title.clone()),
                ("PkgName".to_string(), vuln.resource.clone()),
                ("Installed Package".to_string(), vuln.installed_version.clone()),
                ("Patched Package".to_string(), vuln.fixed_version.clone()),
                (
                    "NvdCvssScoreV3".to_string(),
                    format!("{:.6}", vuln.score.unwrap_or(0.0)),
                ),
                // No vector data is ever populated by the upstream report.
                ("NvdCvssVectorV3".to_string(), String::new()),
            ]);

            Finding {
                schema_version: SCHEMA_VERSION.to_string(),
                id: format!("{}-{}", full_image_name, vuln.vulnerability_id),
                product_arn: product_arn.clone(),
                generator_id: format!("Trivy/{}", vuln.vulnerability_id),
                account_id: identity.account_id.clone(),
                types: vec![TYPE_VULNERABILITY.to_string()],
                created_at: now,
                updated_at: now,
                severity: normalize_severity(&vuln.severity),
                title: format!(
                    "{}/{}:{} {}",
                    image_name, container, tag, vuln.vulnerability_id
                ),
                description: truncate_description(description),
                remediation: Remediation {
                    text: format!("Upgrade to version {}", vuln.fixed_version),
                    url: Some(vuln.primary_link.clone()),
                },
                product_fields: product_fields(),
                resource: ResourceRef {
                    resource_type: "Container".to_string(),
                    id: image_name.clone(),
                    partition: AWS_PARTITION.to_string(),
                    region: identity.region.clone(),
                    details,
                },
                record_state: RECORD_STATE_ACTIVE.to_string(),
            }
        })
        .collect()
}

fn product_arn(region: &str) -> String {
    format!("arn:aws:securityhub:{region}::product/aquasecurity/aquasecurity")
}

fn product_fields() -> BTreeMap<String, String> {
    BTreeMap::from([("Product Name".to_string(), PRODUCT_NAME.to_string())])
}

fn normalize_severity(severity: &str) -> String {
    if severity == "UNKNOWN" {
        "INFORMATIONAL".to_string()
    } else {
        severity.to_string()
    }
}

fn truncate_description(description: &str) -> String {
    if description.len() <= MAX_DESCRIPTION_LEN {
        return description.to_string();
    }
    let mut cut = MAX_DESCRIPTION_LEN - 3;
    while !description.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}...", &description[..cut])
}
