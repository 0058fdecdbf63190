use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::launch::LaunchConfiguration;
use crate::policy::{CreateScalingPolicy, ScalingPolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkRelation {
    #[serde(rename = "self")]
    SelfLink,
    Bookmark,
    Describedby,
    Alternate,
    Next,
    Previous,
    #[serde(other)]
    Unrecognized,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub href: String,
    pub rel: LinkRelation,
}

impl Link {
    pub fn new(rel: LinkRelation, href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            rel,
        }
    }

    pub fn self_link(href: impl Into<String>) -> Self {
        Self::new(LinkRelation::SelfLink, href)
    }
}

/// Scaling bounds and metadata of a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupConfiguration {
    pub name: String,
    pub cooldown: u32,
    pub min_entities: u32,
    pub max_entities: u32,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// A scaling group as returned by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: String,
    #[serde(default)]
    pub links: Vec<Link>,
    pub group_configuration: GroupConfiguration,
    pub launch_configuration: LaunchConfiguration,
    #[serde(default)]
    pub scaling_policies: Vec<ScalingPolicy>,
}

impl Group {
    pub fn self_link(&self) -> Option<&Link> {
        self.links
            .iter()
            .find(|link| link.rel == LinkRelation::SelfLink)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupInstance {
    pub id: String,
    #[serde(default)]
    pub links: Vec<Link>,
}

/// Runtime status of a group. The `/state` endpoint no longer includes the
/// group id, so `id` is only populated for entries of a group listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<Link>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub active: Vec<GroupInstance>,
    #[serde(default)]
    pub active_capacity: u32,
    #[serde(default)]
    pub pending_capacity: u32,
    #[serde(default)]
    pub desired_capacity: u32,
    #[serde(default)]
    pub paused: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGroupRequest {
    pub group_configuration: GroupConfiguration,
    pub launch_configuration: LaunchConfiguration,
    #[serde(default)]
    pub scaling_policies: Vec<CreateScalingPolicy>,
}
