use std::sync::Arc;

use anyhow::Context;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    pub account_id: String,
    pub region: String,
}

/// Account/region lookup used to build sink-specific identifiers.
#[async_trait::async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn resolve(&self) -> anyhow::Result<CallerIdentity>;
}

/// Resolves the caller identity through STS; the account and region do not
/// change over the process lifetime, so the first answer is cached.
pub struct StsIdentityResolver {
    sts: aws_sdk_sts::Client,
    region: String,
    cached: Arc<RwLock<Option<CallerIdentity>>>,
}

impl StsIdentityResolver {
    pub fn new(aws_config: &aws_config::SdkConfig) -> Self {
        Self {
            sts: aws_sdk_sts::Client::new(aws_config),
            region: aws_config
                .region()
                .map(|r| r.as_ref().to_string())
                .unwrap_or_default(),
            cached: Arc::new(RwLock::new(None)),
        }
    }
}

#[async_trait::async_trait]
impl IdentityResolver for StsIdentityResolver {
    async fn resolve(&self) -> anyhow::Result<CallerIdentity> {
        if let Some(identity) = self.cached.read().await.clone() {
            return Ok(identity);
        }

        let caller = self
            .sts
            .get_caller_identity()
            .send()
            .await
            .context("failed to get caller identity")?;

        let identity = CallerIdentity {
            account_id: caller.account().unwrap_or_default().to_string(),
            region: self.region.clone(),
        };
        debug!(account_id = %identity.account_id, region = %identity.region, "resolved caller identity");

        *self.cached.write().await = Some(identity.clone());
        Ok(identity)
    }
}
