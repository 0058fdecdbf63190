use autoscale_core::{AutoscaleError, Result};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_ENDPOINT_TEMPLATE: &str =
    "https://{zone}.autoscale.api.rackspacecloud.com/v1.0/{tenant}";
pub const DEFAULT_ZONES: &[&str] = &["DFW", "ORD"];
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(30_000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    #[default]
    Http,
    /// In-process emulation of the group endpoints.
    Memory,
}

impl FromStr for Backend {
    type Err = AutoscaleError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "http" => Ok(Backend::Http),
            "memory" => Ok(Backend::Memory),
            other => Err(AutoscaleError::InvalidConfiguration(format!(
                "unknown backend '{other}', expected 'http' or 'memory'"
            ))),
        }
    }
}

#[derive(Clone)]
pub struct AutoscaleConfig {
    pub tenant_id: String,
    pub auth_token: Option<String>,
    /// Zone identifiers in the order they were configured.
    pub zones: Vec<String>,
    pub endpoint_template: String,
    pub timeout: Duration,
    pub backend: Backend,
}

impl AutoscaleConfig {
    pub fn new(tenant_id: impl Into<String>, zones: Vec<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            auth_token: None,
            zones,
            endpoint_template: DEFAULT_ENDPOINT_TEMPLATE.to_string(),
            timeout: DEFAULT_TIMEOUT,
            backend: Backend::Http,
        }
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the `AUTOSCALE_*` settings through `lookup`, applying defaults
    /// for everything but the tenant id.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let tenant_id = lookup("AUTOSCALE_TENANT_ID")
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| {
                AutoscaleError::InvalidConfiguration("AUTOSCALE_TENANT_ID is not set".to_string())
            })?;

        let zones = match lookup("AUTOSCALE_ZONES") {
            Some(raw) => parse_zones(&raw),
            None => DEFAULT_ZONES.iter().map(ToString::to_string).collect(),
        };

        let timeout = match lookup("AUTOSCALE_TIMEOUT_MS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|e| {
                    AutoscaleError::InvalidConfiguration(format!(
                        "invalid AUTOSCALE_TIMEOUT_MS '{raw}': {e}"
                    ))
                })?,
            None => DEFAULT_TIMEOUT,
        };

        let backend = match lookup("AUTOSCALE_BACKEND") {
            Some(raw) => raw.parse()?,
            None => Backend::default(),
        };

        let config = Self {
            tenant_id,
            auth_token: lookup("AUTOSCALE_AUTH_TOKEN")
                .map(|token| token.trim().to_string())
                .filter(|token| !token.is_empty()),
            zones,
            endpoint_template: lookup("AUTOSCALE_ENDPOINT")
                .filter(|value| !value.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_ENDPOINT_TEMPLATE.to_string()),
            timeout,
            backend,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.tenant_id.trim().is_empty() {
            return Err(AutoscaleError::InvalidConfiguration(
                "tenant id must not be empty".to_string(),
            ));
        }
        if self.zones.is_empty() {
            return Err(AutoscaleError::InvalidConfiguration(
                "at least one zone must be configured".to_string(),
            ));
        }
        for placeholder in ["{zone}", "{tenant}"] {
            if !self.endpoint_template.contains(placeholder) {
                return Err(AutoscaleError::InvalidConfiguration(format!(
                    "endpoint template '{}' has no {placeholder} placeholder",
                    self.endpoint_template
                )));
            }
        }
        Ok(())
    }

    /// Tenant base URL for `zone`, e.g.
    /// `https://dfw.autoscale.api.rackspacecloud.com/v1.0/123456`.
    pub fn zone_endpoint(&self, zone: &str) -> String {
        self.endpoint_template
            .replace("{zone}", &zone.to_ascii_lowercase())
            .replace("{tenant}", &self.tenant_id)
            .trim_end_matches('/')
            .to_string()
    }
}

impl fmt::Debug for AutoscaleConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AutoscaleConfig")
            .field("tenant_id", &self.tenant_id)
            .field(
                "auth_token",
                &self.auth_token.as_ref().map(|_| "<redacted>"),
            )
            .field("zones", &self.zones)
            .field("endpoint_template", &self.endpoint_template)
            .field("timeout", &self.timeout)
            .field("backend", &self.backend)
            .finish()
    }
}

fn parse_zones(raw: &str) -> Vec<String> {
    let mut zones: Vec<String> = Vec::new();
    for zone in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let zone = zone.to_ascii_uppercase();
        if !zones.contains(&zone) {
            zones.push(zone);
        }
    }
    zones
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_applied() {
        let config = AutoscaleConfig::from_lookup(lookup(&[("AUTOSCALE_TENANT_ID", "123")])).unwrap();
        assert_eq!(config.zones, vec!["DFW", "ORD"]);
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
        assert_eq!(config.backend, Backend::Http);
        assert!(config.auth_token.is_none());
        assert_eq!(
            config.zone_endpoint("DFW"),
            "https://dfw.autoscale.api.rackspacecloud.com/v1.0/123"
        );
    }

    #[test]
    fn test_missing_tenant_is_rejected() {
        let err = AutoscaleConfig::from_lookup(lookup(&[("AUTOSCALE_ZONES", "DFW")])).unwrap_err();
        assert!(matches!(err, AutoscaleError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_zones_trimmed_deduplicated_in_order() {
        let config = AutoscaleConfig::from_lookup(lookup(&[
            ("AUTOSCALE_TENANT_ID", "123"),
            ("AUTOSCALE_ZONES", " ord, ,dfw,ORD,iad "),
        ]))
        .unwrap();
        assert_eq!(config.zones, vec!["ORD", "DFW", "IAD"]);
    }

    #[test]
    fn test_empty_zone_list_is_rejected() {
        let err = AutoscaleConfig::from_lookup(lookup(&[
            ("AUTOSCALE_TENANT_ID", "123"),
            ("AUTOSCALE_ZONES", " , "),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("zone"));
    }

    #[test]
    fn test_custom_endpoint_and_backend() {
        let config = AutoscaleConfig::from_lookup(lookup(&[
            ("AUTOSCALE_TENANT_ID", "t1"),
            ("AUTOSCALE_ENDPOINT", "http://localhost:9000/{zone}/v1.0/{tenant}/"),
            ("AUTOSCALE_BACKEND", "Memory"),
            ("AUTOSCALE_TIMEOUT_MS", "1500"),
        ]))
        .unwrap();
        assert_eq!(config.backend, Backend::Memory);
        assert_eq!(config.timeout, Duration::from_millis(1500));
        assert_eq!(
            config.zone_endpoint("LON"),
            "http://localhost:9000/lon/v1.0/t1"
        );
    }

    #[test]
    fn test_invalid_timeout_and_backend() {
        assert!(AutoscaleConfig::from_lookup(lookup(&[
            ("AUTOSCALE_TENANT_ID", "t1"),
            ("AUTOSCALE_TIMEOUT_MS", "soon"),
        ]))
        .is_err());
        assert!(AutoscaleConfig::from_lookup(lookup(&[
            ("AUTOSCALE_TENANT_ID", "t1"),
            ("AUTOSCALE_BACKEND", "grpc"),
        ]))
        .is_err());
    }

    #[test]
    fn test_template_without_zone_placeholder_is_rejected() {
        let err = AutoscaleConfig::from_lookup(lookup(&[
            ("AUTOSCALE_TENANT_ID", "t1"),
            ("AUTOSCALE_ENDPOINT", "https://autoscale.example.com/v1.0/{tenant}"),
        ]))
        .unwrap_err();
        assert!(matches!(err, AutoscaleError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_template_without_tenant_placeholder_is_rejected() {
        let err = AutoscaleConfig::from_lookup(lookup(&[
            ("AUTOSCALE_TENANT_ID", "123456"),
            (
                "AUTOSCALE_ENDPOINT",
                "https://{zone}.autoscale.api.rackspacecloud.com/v1.0/999999",
            ),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("{tenant}"));

        let mut config = AutoscaleConfig::new("123456", vec!["DFW".to_string()]);
        config.endpoint_template =
            "https://{zone}.autoscale.api.rackspacecloud.com/v1.0/999999".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = AutoscaleConfig::from_lookup(lookup(&[
            ("AUTOSCALE_TENANT_ID", "t1"),
            ("AUTOSCALE_AUTH_TOKEN", "super-secret"),
        ]))
        .unwrap();
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
