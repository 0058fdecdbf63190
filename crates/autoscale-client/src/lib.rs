pub mod config;
pub mod features;

use std::collections::HashMap;
use std::sync::Arc;

use autoscale_core::{AutoscaleError, Result};
use tracing::info;

pub use config::{AutoscaleConfig, Backend};
pub use features::group_api::build_group_api;
pub use features::group_api::controller::GroupApi;
pub use features::group_api::repo::memory::InMemoryAutoscaleRepository;
pub use features::group_api::repo::{
    ApiRequest, ApiResponse, AutoscaleRepository, ReqwestAutoscaleRepository,
};
pub use features::group_api::service::{GroupStates, ListOptions};

/// Client handle holding one group sub-client per configured zone.
pub struct AutoscaleApi {
    tenant_id: String,
    zones: Vec<String>,
    group_apis: HashMap<String, GroupApi>,
}

impl AutoscaleApi {
    /// Builds the handle on top of the transport selected by `config.backend`.
    pub fn from_config(config: &AutoscaleConfig) -> Result<Self> {
        let repo: Arc<dyn AutoscaleRepository> = match config.backend {
            Backend::Http => Arc::new(ReqwestAutoscaleRepository::new(
                config.auth_token.as_deref(),
                config.timeout,
            )?),
            Backend::Memory => Arc::new(InMemoryAutoscaleRepository::new()),
        };
        Self::new(config, repo)
    }

    pub fn new(config: &AutoscaleConfig, repo: Arc<dyn AutoscaleRepository>) -> Result<Self> {
        config.validate()?;

        let mut zones = Vec::with_capacity(config.zones.len());
        let mut group_apis = HashMap::with_capacity(config.zones.len());
        for zone in &config.zones {
            let key = zone.to_ascii_uppercase();
            if group_apis.contains_key(&key) {
                continue;
            }
            let base_url = config.zone_endpoint(zone);
            info!(zone = %zone, base_url = %base_url, "Configured autoscale zone");
            group_apis.insert(key, build_group_api(zone.clone(), base_url, repo.clone()));
            zones.push(zone.clone());
        }

        Ok(Self {
            tenant_id: config.tenant_id.clone(),
            zones,
            group_apis,
        })
    }

    /// Zones in configuration order.
    pub fn configured_zones(&self) -> &[String] {
        &self.zones
    }

    pub fn group_api_for_zone(&self, zone: &str) -> Result<&GroupApi> {
        self.group_apis
            .get(&zone.to_ascii_uppercase())
            .ok_or_else(|| AutoscaleError::UnknownZone(zone.to_string()))
    }

    pub fn current_tenant_id(&self) -> &str {
        &self.tenant_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(zones: &[&str]) -> AutoscaleConfig {
        let mut config =
            AutoscaleConfig::new("123456", zones.iter().map(ToString::to_string).collect());
        config.backend = Backend::Memory;
        config
    }

    #[test]
    fn test_zones_keep_configuration_order() {
        let api = AutoscaleApi::from_config(&config(&["ORD", "DFW", "IAD"])).unwrap();
        assert_eq!(api.configured_zones(), ["ORD", "DFW", "IAD"]);
        assert_eq!(api.current_tenant_id(), "123456");
    }

    #[test]
    fn test_group_api_per_zone_uses_zone_endpoint() {
        let api = AutoscaleApi::from_config(&config(&["DFW", "ORD"])).unwrap();
        let ord = api.group_api_for_zone("ord").unwrap();
        assert_eq!(ord.zone(), "ORD");
        assert_eq!(
            ord.base_url(),
            "https://ord.autoscale.api.rackspacecloud.com/v1.0/123456"
        );
    }

    #[test]
    fn test_unknown_zone_is_an_error() {
        let api = AutoscaleApi::from_config(&config(&["DFW"])).unwrap();
        assert!(matches!(
            api.group_api_for_zone("LON"),
            Err(AutoscaleError::UnknownZone(zone)) if zone == "LON"
        ));
    }

    #[test]
    fn test_empty_zone_list_is_rejected() {
        assert!(matches!(
            AutoscaleApi::from_config(&config(&[])),
            Err(AutoscaleError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_zones_share_one_emulated_service_but_not_groups() {
        let api = AutoscaleApi::new(
            &config(&["DFW", "ORD"]),
            Arc::new(InMemoryAutoscaleRepository::new()),
        )
        .unwrap();
        let dfw = api.group_api_for_zone("DFW").unwrap();
        let ord = api.group_api_for_zone("ORD").unwrap();

        let created = dfw
            .create(
                &autoscale_core::GroupConfiguration {
                    name: "only-in-dfw".to_string(),
                    cooldown: 0,
                    min_entities: 0,
                    max_entities: 1,
                    metadata: HashMap::new(),
                },
                &autoscale_core::LaunchConfiguration {
                    launch_type: autoscale_core::LaunchConfigurationType::LaunchServer,
                    server_name: "s".to_string(),
                    server_image_ref: "i".to_string(),
                    server_flavor_ref: "f".to_string(),
                    server_disk_config: None,
                    server_metadata: HashMap::new(),
                    networks: vec![],
                    personalities: vec![],
                    load_balancers: vec![],
                },
                &[],
            )
            .unwrap();

        assert!(dfw.get(&created.id).is_ok());
        assert!(matches!(
            ord.get(&created.id),
            Err(AutoscaleError::NotFound(_))
        ));
    }
}
