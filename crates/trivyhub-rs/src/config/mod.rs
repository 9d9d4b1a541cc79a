use std::{env, fs};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::reports::ReportKind;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub config_audit_enable: bool,
    pub infra_assessment_enable: bool,
    pub cluster_compliance_enable: bool,
    pub vulnerability_enable: bool,
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = env::var("TRIVYHUB_CONFIG").unwrap_or_else(|_| "config.json".to_string());
        let file_cfg: Option<AppConfig> = fs::read_to_string(&path)
            .ok()
            .map(|raw| serde_json::from_str(&raw))
            .transpose()
            .context("failed to parse config.json")?;

        let mut cfg = file_cfg.unwrap_or_else(Self::default);

        if let Ok(v) = env::var("TRIVYHUB_HOST") {
            cfg.host = v;
        }
        if let Ok(v) = env::var("TRIVYHUB_PORT") {
            cfg.port = v.parse().unwrap_or(cfg.port);
        }
        cfg.config_audit_enable = env_bool("CONFIG_AUDIT_ENABLE", cfg.config_audit_enable);
        cfg.infra_assessment_enable =
            env_bool("INFRA_ASSESSMENT_ENABLE", cfg.infra_assessment_enable);
        cfg.cluster_compliance_enable =
            env_bool("CLUSTER_COMPLIANCE_ENABLE", cfg.cluster_compliance_enable);
        cfg.vulnerability_enable = env_bool("VULNERABILITY_ENABLE", cfg.vulnerability_enable);

        Ok(cfg)
    }

    pub fn kind_enabled(&self, kind: ReportKind) -> bool {
        match kind {
            ReportKind::ConfigAudit => self.config_audit_enable,
            ReportKind::InfraAssessment => self.infra_assessment_enable,
            ReportKind::ClusterCompliance => self.cluster_compliance_enable,
            ReportKind::Vulnerability => self.vulnerability_enable,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            config_audit_enable: true,
            infra_assessment_enable: true,
            cluster_compliance_enable: true,
            vulnerability_enable: true,
        }
    }
}

fn env_bool(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(raw) => match parse_bool(&raw) {
            Some(v) => v,
            None => {
                warn!(key, value = %raw, default, "invalid boolean, using default");
                default
            }
        },
        Err(_) => default,
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "t" | "true" => Some(true),
        "0" | "f" | "false" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_kinds_enabled_by_default() {
        let cfg = AppConfig::default();
        assert!(cfg.kind_enabled(ReportKind::ConfigAudit));
        assert!(cfg.kind_enabled(ReportKind::InfraAssessment));
        assert!(cfg.kind_enabled(ReportKind::ClusterCompliance));
        assert!(cfg.kind_enabled(ReportKind::Vulnerability));
    }

    #[test]
    fn kind_enabled_follows_its_own_flag() {
        let cfg = AppConfig {
            vulnerability_enable: false,
            ..AppConfig::default()
        };
        assert!(!cfg.kind_enabled(ReportKind::Vulnerability));
        assert!(cfg.kind_enabled(ReportKind::ConfigAudit));
    }

    #[test]
    fn parse_bool_accepts_go_style_spellings() {
        assert_eq!(parse_bool("true"), Some(true));
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool("1"), Some(true));
        assert_eq!(parse_bool("t"), Some(true));
        assert_eq!(parse_bool("false"), Some(false));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("F"), Some(false));
        assert_eq!(parse_bool("yes"), None);
        assert_eq!(parse_bool(""), None);
    }
}
