pub mod controller;
pub mod repo;
pub mod service;

use controller::GroupApi;
use repo::AutoscaleRepository;
use service::GroupService;
use std::sync::Arc;

/// Wires a zone's group sub-client onto a shared transport.
pub fn build_group_api(
    zone: impl Into<String>,
    base_url: impl Into<String>,
    repo: Arc<dyn AutoscaleRepository>,
) -> GroupApi {
    GroupApi::new(zone, GroupService::new(repo, base_url))
}

#[cfg(test)]
mod tests {
    use super::*;
    use repo::memory::InMemoryAutoscaleRepository;

    #[test]
    fn test_build_group_api_normalizes_base_url() {
        let api = build_group_api(
            "SYD",
            "https://syd.autoscale.api.rackspacecloud.com/v1.0/42/",
            Arc::new(InMemoryAutoscaleRepository::new()),
        );
        assert_eq!(api.zone(), "SYD");
        assert_eq!(
            api.base_url(),
            "https://syd.autoscale.api.rackspacecloud.com/v1.0/42"
        );
    }
}
