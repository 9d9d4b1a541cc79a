use anyhow::Context;
use aws_sdk_securityhub::types as sh;
use tracing::{info, warn};

use crate::models::Finding;

pub const BATCH_SIZE: usize = 100;

#[async_trait::async_trait]
pub trait FindingsSink: Send + Sync {
    fn name(&self) -> &'static str;
    async fn submit_batch(&self, findings: &[Finding]) -> anyhow::Result<()>;
}

/// Submits findings to the sink in ordered chunks of at most [`BATCH_SIZE`].
/// The first failed chunk aborts the rest; chunks already submitted are not
/// rolled back, so delivery is at-least-once on error.
pub async fn export_in_batches(
    sink: &dyn FindingsSink,
    findings: &[Finding],
) -> anyhow::Result<usize> {
    for batch in findings.chunks(BATCH_SIZE) {
        sink.submit_batch(batch).await.with_context(|| {
            format!(
                "error submitting batch of {} findings to {}",
                batch.len(),
                sink.name()
            )
        })?;
    }

    info!(findings = findings.len(), sink = sink.name(), "findings exported");
    Ok(findings.len())
}

pub struct SecurityHubSink {
    client: aws_sdk_securityhub::Client,
}

impl SecurityHubSink {
    pub fn new(aws_config: &aws_config::SdkConfig) -> Self {
        Self {
            client: aws_sdk_securityhub::Client::new(aws_config),
        }
    }
}

#[async_trait::async_trait]
impl FindingsSink for SecurityHubSink {
    fn name(&self) -> &'static str {
        "securityhub"
    }

    async fn submit_batch(&self, findings: &[Finding]) -> anyhow::Result<()> {
        let converted = findings
            .iter()
            .map(to_sdk_finding)
            .collect::<anyhow::Result<Vec<_>>>()?;

        let output = self
            .client
            .batch_import_findings()
            .set_findings(Some(converted))
            .send()
            .await
            .context("BatchImportFindings call failed")?;

        if output.failed_count().unwrap_or(0) > 0 {
            warn!(
                failed = output.failed_count(),
                succeeded = output.success_count(),
                "security hub rejected findings in batch"
            );
        }
        Ok(())
    }
}

fn to_sdk_finding(finding: &Finding) -> anyhow::Result<sh::AwsSecurityFinding> {
    let mut details = sh::ResourceDetails::builder();
    for (key, value) in &finding.resource.details {
        details = details.other(key.clone(), value.clone());
    }

    let resource = sh::Resource::builder()
        .r#type(&finding.resource.resource_type)
        .id(&finding.resource.id)
        .partition(sh::Partition::from(finding.resource.partition.as_str()))
        .region(&finding.resource.region)
        .details(details.build())
        .build();

    let mut recommendation = sh::Recommendation::builder().text(&finding.remediation.text);
    if let Some(url) = &finding.remediation.url {
        recommendation = recommendation.url(url);
    }

    let mut builder = sh::AwsSecurityFinding::builder()
        .schema_version(&finding.schema_version)
        .id(&finding.id)
        .product_arn(&finding.product_arn)
        .generator_id(&finding.generator_id)
        .aws_account_id(&finding.account_id)
        .created_at(finding.created_at.to_rfc3339())
        .updated_at(finding.updated_at.to_rfc3339())
        .severity(
            sh::Severity::builder()
                .label(sh::SeverityLabel::from(finding.severity.as_str()))
                .build(),
        )
        .title(&finding.title)
        .description(&finding.description)
        .remediation(
            sh::Remediation::builder()
                .recommendation(recommendation.build())
                .build(),
        )
        .resources(resource)
        .record_state(sh::RecordState::from(finding.record_state.as_str()));

    for finding_type in &finding.types {
        builder = builder.types(finding_type);
    }
    for (key, value) in &finding.product_fields {
        builder = builder.product_fields(key.clone(), value.clone());
    }

    Ok(builder.build())
}
