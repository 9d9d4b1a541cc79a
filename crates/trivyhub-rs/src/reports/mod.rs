use std::collections::HashMap;

use anyhow::Context;
use tracing::info;

/// Top-level envelope, read only to pick the decoder.
#[derive(Debug, serde::Deserialize)]
pub struct RawReport {
    #[serde(default)]
    pub kind: String,
    #[serde(default, rename = "apiVersion")]
    pub api_version: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    ConfigAudit,
    InfraAssessment,
    ClusterCompliance,
    Vulnerability,
}

impl ReportKind {
    pub fn from_kind(kind: &str) -> Option<Self> {
        match kind {
            "ConfigAuditReport" => Some(Self::ConfigAudit),
            "InfraAssessmentReport" => Some(Self::InfraAssessment),
            "ClusterComplianceReport" => Some(Self::ClusterCompliance),
            "VulnerabilityReport" => Some(Self::Vulnerability),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConfigAudit => "ConfigAuditReport",
            Self::InfraAssessment => "InfraAssessmentReport",
            Self::ClusterCompliance => "ClusterComplianceReport",
            Self::Vulnerability => "VulnerabilityReport",
        }
    }
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ObjectMeta {
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "ownerReferences")]
    pub owner_references: Vec<OwnerReference>,
    #[serde(default)]
    pub labels: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct OwnerReference {
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ConfigAuditReport {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub report: ConfigAuditData,
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ConfigAuditData {
    #[serde(default)]
    pub checks: Vec<Check>,
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct Check {
    #[serde(default, rename = "checkID")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub severity: String,
    #[serde(default)]
    pub remediation: String,
    #[serde(default)]
    pub messages: Vec<String>,
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct InfraAssessmentReport {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub report: InfraAssessmentData,
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct InfraAssessmentData {
    #[serde(default)]
    pub checks: Vec<Check>,
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ClusterComplianceReport {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub status: ClusterComplianceStatus,
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ClusterComplianceStatus {
    #[serde(default)]
    pub summary: ComplianceSummary,
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ComplianceSummary {
    #[serde(default, rename = "passCount")]
    pub pass_count: i64,
    #[serde(default, rename = "failCount")]
    pub fail_count: i64,
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct VulnerabilityReport {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub report: VulnerabilityData,
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct VulnerabilityData {
    #[serde(default)]
    pub registry: Registry,
    #[serde(default)]
    pub artifact: Artifact,
    #[serde(default)]
    pub vulnerabilities: Vec<VulnerabilityEntry>,
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct Registry {
    #[serde(default)]
    pub server: String,
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct Artifact {
    #[serde(default)]
    pub repository: String,
    #[serde(default)]
    pub digest: String,
    #[serde(default)]
    pub tag: String,
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct VulnerabilityEntry {
    #[serde(default, rename = "vulnerabilityID")]
    pub vulnerability_id: String,
    #[serde(default)]
    pub resource: String,
    #[serde(default, rename = "installedVersion")]
    pub installed_version: String,
    #[serde(default, rename = "fixedVersion")]
    pub fixed_version: String,
    #[serde(default)]
    pub severity: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, rename = "primaryLink")]
    pub primary_link: String,
    #[serde(default)]
    pub score: Option<f64>,
}

/// Decoded report, one variant per webhook kind.
#[derive(Debug)]
pub enum TypedReport {
    ConfigAudit(ConfigAuditReport),
    InfraAssessment(InfraAssessmentReport),
    ClusterCompliance(ClusterComplianceReport),
    Vulnerability(VulnerabilityReport),
}

impl TypedReport {
    pub fn name(&self) -> &str {
        match self {
            Self::ConfigAudit(r) => &r.metadata.name,
            Self::InfraAssessment(r) => &r.metadata.name,
            Self::ClusterCompliance(r) => &r.metadata.name,
            Self::Vulnerability(r) => &r.metadata.name,
        }
    }

    pub fn kind(&self) -> ReportKind {
        match self {
            Self::ConfigAudit(_) => ReportKind::ConfigAudit,
            Self::InfraAssessment(_) => ReportKind::InfraAssessment,
            Self::ClusterCompliance(_) => ReportKind::ClusterCompliance,
            Self::Vulnerability(_) => ReportKind::Vulnerability,
        }
    }
}

pub fn decode(kind: ReportKind, body: &[u8]) -> anyhow::Result<TypedReport> {
    let report = match kind {
        ReportKind::ConfigAudit => {
            let report: ConfigAuditReport =
                serde_json::from_slice(body).context("error decoding config audit report")?;
            TypedReport::ConfigAudit(report)
        }
        ReportKind::InfraAssessment => {
            let report: InfraAssessmentReport =
                serde_json::from_slice(body).context("error decoding infra assessment report")?;
            TypedReport::InfraAssessment(report)
        }
        ReportKind::ClusterCompliance => {
            let report: ClusterComplianceReport = serde_json::from_slice(body)
                .context("error decoding cluster compliance report")?;
            TypedReport::ClusterCompliance(report)
        }
        ReportKind::Vulnerability => {
            let report: VulnerabilityReport =
                serde_json::from_slice(body).context("error decoding vulnerability report")?;
            TypedReport::Vulnerability(report)
        }
    };

    info!(report = %report.name(), kind = kind.as_str(), "processing report");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_kind_maps_the_four_report_kinds() {
        assert_eq!(
            ReportKind::from_kind("ConfigAuditReport"),
            Some(ReportKind::ConfigAudit)
        );
        assert_eq!(
            ReportKind::from_kind("InfraAssessmentReport"),
            Some(ReportKind::InfraAssessment)
        );
        assert_eq!(
            ReportKind::from_kind("ClusterComplianceReport"),
            Some(ReportKind::ClusterCompliance)
        );
        assert_eq!(
            ReportKind::from_kind("VulnerabilityReport"),
            Some(ReportKind::Vulnerability)
        );
        assert_eq!(ReportKind::from_kind("FooReport"), None);
        assert_eq!(ReportKind::from_kind(""), None);
    }

    #[test]
    fn decode_config_audit_extracts_checks_and_owner() {
        let body = r#"{
            "kind": "ConfigAuditReport",
            "apiVersion": "aquasecurity.github.io/v1alpha1",
            "metadata": {
                "name": "replicaset-nginx-6d4cf56db6",
                "ownerReferences": [{"kind": "ReplicaSet", "name": "nginx-6d4cf56db6"}]
            },
            "report": {
                "checks": [{
                    "checkID": "KSV014",
                    "title": "Root file system is not read-only",
                    "description": "An immutable root file system prevents applications from writing to their local disk.",
                    "severity": "LOW",
                    "remediation": "Change ReadOnlyRootFilesystem to true.",
                    "messages": ["Container 'nginx' should set 'securityContext.readOnlyRootFilesystem' to true"]
                }]
            }
        }"#;

        let report = decode(ReportKind::ConfigAudit, body.as_bytes()).expect("decode should work");
        let TypedReport::ConfigAudit(report) = report else {
            panic!("expected config audit variant");
        };
        assert_eq!(report.metadata.name, "replicaset-nginx-6d4cf56db6");
        assert_eq!(report.metadata.owner_references[0].kind, "ReplicaSet");
        assert_eq!(report.report.checks.len(), 1);
        assert_eq!(report.report.checks[0].id, "KSV014");
        assert_eq!(report.report.checks[0].messages.len(), 1);
    }

    #[test]
    fn decode_vulnerability_extracts_artifact_and_entries() {
        let body = r#"{
            "kind": "VulnerabilityReport",
            "metadata": {
                "name": "replicaset-app-578f59db",
                "labels": {"trivy-operator.container.name": "app"}
            },
            "report": {
                "registry": {"server": "index.docker.io"},
                "artifact": {"repository": "library/nginx", "digest": "sha256:abc123", "tag": "1.27"},
                "vulnerabilities": [{
                    "vulnerabilityID": "CVE-2024-12345",
                    "resource": "libssl3",
                    "installedVersion": "3.0.11",
                    "fixedVersion": "3.0.13",
                    "severity": "HIGH",
                    "title": "openssl: something bad",
                    "primaryLink": "https://avd.aquasec.com/nvd/cve-2024-12345",
                    "score": 7.5
                }]
            }
        }"#;

        let report = decode(ReportKind::Vulnerability, body.as_bytes()).expect("decode should work");
        let TypedReport::Vulnerability(report) = report else {
            panic!("expected vulnerability variant");
        };
        assert_eq!(report.report.registry.server, "index.docker.io");
        assert_eq!(report.report.artifact.digest, "sha256:abc123");
        assert_eq!(report.report.vulnerabilities.len(), 1);
        assert_eq!(report.report.vulnerabilities[0].score, Some(7.5));
        assert_eq!(
            report.metadata.labels["trivy-operator.container.name"],
            "app"
        );
    }

    #[test]
    fn decode_tolerates_missing_sections() {
        // zero findable entries is a valid report, not an error
        let report = decode(
            ReportKind::Vulnerability,
            br#"{"kind": "VulnerabilityReport", "metadata": {"name": "empty"}}"#,
        )
        .expect("decode should work");
        let TypedReport::Vulnerability(report) = report else {
            panic!("expected vulnerability variant");
        };
        assert!(report.report.vulnerabilities.is_empty());
    }

    #[test]
    fn decode_rejects_mistyped_fields() {
        let err = decode(
            ReportKind::ConfigAudit,
            br#"{"kind": "ConfigAuditReport", "report": {"checks": "notalist"}}"#,
        )
        .expect_err("mistyped checks should fail");
        assert!(err.to_string().contains("config audit"));
    }

    #[test]
    fn decode_cluster_compliance_reads_summary() {
        let report = decode(
            ReportKind::ClusterCompliance,
            br#"{"kind": "ClusterComplianceReport", "metadata": {"name": "cis"}, "status": {"summary": {"passCount": 10, "failCount": 2}}}"#,
        )
        .expect("decode should work");
        let TypedReport::ClusterCompliance(report) = report else {
            panic!("expected cluster compliance variant");
        };
        assert_eq!(report.status.summary.pass_count, 10);
        assert_eq!(report.status.summary.fail_count, 2);
    }
}
