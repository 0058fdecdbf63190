use crate::features::group_api::repo::{ApiRequest, ApiResponse, AutoscaleRepository};
use autoscale_core::{
    AutoscaleError, CreateGroupRequest, CreateScalingPolicy, Group, GroupConfiguration,
    GroupState, LaunchConfiguration, Link, LinkRelation, Result,
};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use tracing::{debug, warn};

/// Query options for a group listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOptions {
    pub limit: Option<u32>,
    pub marker: Option<String>,
}

#[derive(Deserialize)]
struct GroupEnvelope {
    group: Group,
}

#[derive(Deserialize)]
struct StateEnvelope {
    group: GroupState,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroupConfigurationEnvelope {
    group_configuration: GroupConfiguration,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LaunchConfigurationEnvelope {
    launch_configuration: LaunchConfiguration,
}

#[derive(Deserialize)]
struct GroupListEntry {
    id: String,
    #[serde(default)]
    links: Vec<Link>,
    #[serde(default)]
    state: GroupState,
}

#[derive(Deserialize)]
struct GroupListPage {
    groups: Vec<GroupListEntry>,
    #[serde(default)]
    groups_links: Vec<Link>,
}

/// Maps group operations of one zone onto REST calls under its tenant base URL.
pub struct GroupService {
    repo: Arc<dyn AutoscaleRepository>,
    base_url: String,
}

impl GroupService {
    pub fn new(repo: Arc<dyn AutoscaleRepository>, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { repo, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn create(
        &self,
        group_configuration: &GroupConfiguration,
        launch_configuration: &LaunchConfiguration,
        scaling_policies: &[CreateScalingPolicy],
    ) -> Result<Group> {
        let body = serde_json::to_value(CreateGroupRequest {
            group_configuration: group_configuration.clone(),
            launch_configuration: launch_configuration.clone(),
            scaling_policies: scaling_policies.to_vec(),
        })?;

        let response = self
            .repo
            .execute(&ApiRequest::post(self.groups_url(), Some(body)))?;
        if !response.is_success() {
            return Err(self.failure("create group", &response));
        }
        decode::<GroupEnvelope>(&response).map(|envelope| envelope.group)
    }

    pub fn get(&self, group_id: &str) -> Result<Group> {
        let url = self.group_url(group_id, "")?;
        self.fetch::<GroupEnvelope>(url, group_id)
            .map(|envelope| envelope.group)
    }

    pub fn get_state(&self, group_id: &str) -> Result<GroupState> {
        let url = self.group_url(group_id, "state")?;
        self.fetch::<StateEnvelope>(url, group_id)
            .map(|envelope| envelope.group)
    }

    pub fn list_group_states(&self, options: &ListOptions) -> Result<GroupStates<'_>> {
        let mut url = Url::parse(&self.groups_url()).map_err(|e| {
            AutoscaleError::InvalidConfiguration(format!(
                "invalid endpoint '{}': {e}",
                self.base_url
            ))
        })?;
        if options.limit.is_some() || options.marker.is_some() {
            let mut query = url.query_pairs_mut();
            if let Some(limit) = options.limit {
                query.append_pair("limit", &limit.to_string());
            }
            if let Some(marker) = &options.marker {
                query.append_pair("marker", marker);
            }
        }

        Ok(GroupStates {
            service: self,
            next_url: Some(url.to_string()),
            visited: HashSet::new(),
            buffer: VecDeque::new(),
        })
    }

    pub fn get_group_configuration(&self, group_id: &str) -> Result<GroupConfiguration> {
        let url = self.group_url(group_id, "config")?;
        self.fetch::<GroupConfigurationEnvelope>(url, group_id)
            .map(|envelope| envelope.group_configuration)
    }

    pub fn update_group_configuration(
        &self,
        group_id: &str,
        group_configuration: &GroupConfiguration,
    ) -> Result<bool> {
        let url = self.group_url(group_id, "config")?;
        let body = serde_json::to_value(group_configuration)?;
        self.acknowledge(ApiRequest::put(url, body), "update group configuration")
    }

    pub fn get_launch_configuration(&self, group_id: &str) -> Result<LaunchConfiguration> {
        let url = self.group_url(group_id, "launch")?;
        self.fetch::<LaunchConfigurationEnvelope>(url, group_id)
            .map(|envelope| envelope.launch_configuration)
    }

    pub fn update_launch_configuration(
        &self,
        group_id: &str,
        launch_configuration: &LaunchConfiguration,
    ) -> Result<bool> {
        let url = self.group_url(group_id, "launch")?;
        let body = serde_json::to_value(launch_configuration)?;
        self.acknowledge(ApiRequest::put(url, body), "update launch configuration")
    }

    pub fn pause(&self, group_id: &str) -> Result<bool> {
        let url = self.group_url(group_id, "pause")?;
        self.acknowledge(ApiRequest::post(url, None), "pause group")
    }

    pub fn resume(&self, group_id: &str) -> Result<bool> {
        let url = self.group_url(group_id, "resume")?;
        self.acknowledge(ApiRequest::post(url, None), "resume group")
    }

    pub fn delete(&self, group_id: &str) -> Result<bool> {
        let url = self.group_url(group_id, "")?;
        self.acknowledge(ApiRequest::delete(url), "delete group")
    }

    fn groups_url(&self) -> String {
        format!("{}/groups", self.base_url)
    }

    fn group_url(&self, group_id: &str, suffix: &str) -> Result<String> {
        let group_id = group_id.trim();
        if group_id.is_empty() || group_id.contains('/') {
            return Err(AutoscaleError::InvalidRequest(format!(
                "invalid group id '{group_id}'"
            )));
        }
        if suffix.is_empty() {
            Ok(format!("{}/groups/{group_id}", self.base_url))
        } else {
            Ok(format!("{}/groups/{group_id}/{suffix}", self.base_url))
        }
    }

    fn fetch<T: DeserializeOwned>(&self, url: String, group_id: &str) -> Result<T> {
        let response = self.repo.execute(&ApiRequest::get(url))?;
        match response.status {
            _ if response.is_success() => decode(&response),
            404 => Err(AutoscaleError::NotFound(format!("group {group_id}"))),
            _ => Err(self.failure("get group resource", &response)),
        }
    }

    /// 2xx is `true`, 404 is `false`, anything else is an error.
    fn acknowledge(&self, request: ApiRequest, operation: &str) -> Result<bool> {
        let response = self.repo.execute(&request)?;
        if response.is_success() {
            return Ok(true);
        }
        if response.status == 404 {
            warn!(url = %request.url, operation, "Autoscale resource not found");
            return Ok(false);
        }
        Err(self.failure(operation, &response))
    }

    fn fetch_page(&self, url: &str) -> Result<(Vec<GroupState>, Option<String>)> {
        debug!(url, "Fetching group listing page");
        let response = self.repo.execute(&ApiRequest::get(url))?;
        if !response.is_success() {
            return Err(self.failure("list groups", &response));
        }
        let page: GroupListPage = decode(&response)?;

        let next = page
            .groups_links
            .into_iter()
            .find(|link| link.rel == LinkRelation::Next)
            .map(|link| link.href);
        let states = page
            .groups
            .into_iter()
            .map(|entry| GroupState {
                id: Some(entry.id),
                links: entry.links,
                ..entry.state
            })
            .collect();
        Ok((states, next))
    }

    fn failure(&self, operation: &str, response: &ApiResponse) -> AutoscaleError {
        warn!(
            base_url = %self.base_url,
            operation,
            status = response.status,
            "Autoscale request failed"
        );
        AutoscaleError::from_response(response.status, &response.body)
    }
}

fn decode<T: DeserializeOwned>(response: &ApiResponse) -> Result<T> {
    serde_json::from_str(&response.body).map_err(|e| {
        AutoscaleError::SerializationError(format!(
            "unexpected response body (status {}): {e}",
            response.status
        ))
    })
}

/// Lazily walks a group listing, fetching the next page only once the
/// current one is drained. A failed page fetch is yielded once and ends
/// the iteration, as does a next link to a page already fetched.
pub struct GroupStates<'a> {
    service: &'a GroupService,
    next_url: Option<String>,
    visited: HashSet<String>,
    buffer: VecDeque<GroupState>,
}

impl Iterator for GroupStates<'_> {
    type Item = Result<GroupState>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(state) = self.buffer.pop_front() {
                return Some(Ok(state));
            }
            let url = self.next_url.take()?;
            let result = self.service.fetch_page(&url);
            self.visited.insert(url);
            match result {
                Ok((states, next)) => {
                    self.buffer.extend(states);
                    self.next_url = next.filter(|href| !self.visited.contains(href));
                }
                Err(error) => return Some(Err(error)),
            }
        }
    }
}
