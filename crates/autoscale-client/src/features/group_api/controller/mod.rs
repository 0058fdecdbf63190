use crate::features::group_api::service::{GroupService, GroupStates, ListOptions};
use autoscale_core::{
    CreateScalingPolicy, Group, GroupConfiguration, GroupState, LaunchConfiguration, Result,
};
use tracing::info;

/// Group sub-client for a single zone.
pub struct GroupApi {
    zone: String,
    service: GroupService,
}

impl GroupApi {
    pub fn new(zone: impl Into<String>, service: GroupService) -> Self {
        Self {
            zone: zone.into(),
            service,
        }
    }

    pub fn zone(&self) -> &str {
        &self.zone
    }

    pub fn base_url(&self) -> &str {
        self.service.base_url()
    }

    pub fn create(
        &self,
        group_configuration: &GroupConfiguration,
        launch_configuration: &LaunchConfiguration,
        scaling_policies: &[CreateScalingPolicy],
    ) -> Result<Group> {
        info!(
            zone = %self.zone,
            name = %group_configuration.name,
            policies = scaling_policies.len(),
            "Creating scaling group"
        );
        let group = self
            .service
            .create(group_configuration, launch_configuration, scaling_policies)?;
        info!(zone = %self.zone, group_id = %group.id, "Scaling group created");
        Ok(group)
    }

    pub fn get(&self, group_id: &str) -> Result<Group> {
        info!(zone = %self.zone, group_id, "Fetching scaling group");
        self.service.get(group_id)
    }

    pub fn get_state(&self, group_id: &str) -> Result<GroupState> {
        info!(zone = %self.zone, group_id, "Fetching scaling group state");
        self.service.get_state(group_id)
    }

    /// Lazily lists the state of every group in the zone.
    pub fn list_group_states(&self) -> Result<GroupStates<'_>> {
        self.list_group_states_with(&ListOptions::default())
    }

    pub fn list_group_states_with(&self, options: &ListOptions) -> Result<GroupStates<'_>> {
        info!(
            zone = %self.zone,
            limit = ?options.limit,
            marker = ?options.marker,
            "Listing scaling group states"
        );
        self.service.list_group_states(options)
    }

    pub fn get_group_configuration(&self, group_id: &str) -> Result<GroupConfiguration> {
        info!(zone = %self.zone, group_id, "Fetching group configuration");
        self.service.get_group_configuration(group_id)
    }

    pub fn update_group_configuration(
        &self,
        group_id: &str,
        group_configuration: &GroupConfiguration,
    ) -> Result<bool> {
        info!(zone = %self.zone, group_id, "Replacing group configuration");
        self.service
            .update_group_configuration(group_id, group_configuration)
    }

    pub fn get_launch_configuration(&self, group_id: &str) -> Result<LaunchConfiguration> {
        info!(zone = %self.zone, group_id, "Fetching launch configuration");
        self.service.get_launch_configuration(group_id)
    }

    pub fn update_launch_configuration(
        &self,
        group_id: &str,
        launch_configuration: &LaunchConfiguration,
    ) -> Result<bool> {
        info!(zone = %self.zone, group_id, "Replacing launch configuration");
        self.service
            .update_launch_configuration(group_id, launch_configuration)
    }

    pub fn pause(&self, group_id: &str) -> Result<bool> {
        info!(zone = %self.zone, group_id, "Pausing scaling group");
        self.service.pause(group_id)
    }

    pub fn resume(&self, group_id: &str) -> Result<bool> {
        info!(zone = %self.zone, group_id, "Resuming scaling group");
        self.service.resume(group_id)
    }

    pub fn delete(&self, group_id: &str) -> Result<bool> {
        info!(zone = %self.zone, group_id, "Deleting scaling group");
        self.service.delete(group_id)
    }
}
