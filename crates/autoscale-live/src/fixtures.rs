//! Payloads the live suite creates and updates, along with the values it
//! expects the service to echo back.

use autoscale_core::{
    CreateScalingPolicy, GroupConfiguration, LaunchConfiguration, LaunchConfigurationType,
    LoadBalancer, Personality, ScalingPolicyTargetType, ScalingPolicyType,
};
use std::collections::HashMap;

pub const GROUP_NAME: &str = "testscalinggroup198547";
pub const GROUP_COOLDOWN: u32 = 360;
pub const GROUP_MIN_ENTITIES: u32 = 0;
pub const GROUP_MAX_ENTITIES: u32 = 10;

pub const SERVER_NAME: &str = "autoscale_server";
pub const SERVER_IMAGE_REF: &str = "57b8a366-ab2c-454b-939f-215303a4431f";
pub const SERVER_FLAVOR_REF: &str = "2";
pub const SERVER_DISK_CONFIG: &str = "AUTO";
pub const NETWORKS: [&str; 2] = [
    "11111111-1111-1111-1111-111111111111",
    "00000000-0000-0000-0000-000000000000",
];
pub const PERSONALITY_PATH: &str = "testfile";
pub const UPDATED_PERSONALITY_PATH: &str = "testfile2";
/// "This is a test file."
pub const PERSONALITY_CONTENTS: &str = "VGhpcyBpcyBhIHRlc3QgZmlsZS4=";
pub const LOAD_BALANCER_ID: u64 = 9099;
pub const LOAD_BALANCER_PORT: u16 = 8080;

pub const POLICY_NAME: &str = "scale up by 1";
pub const POLICY_COOLDOWN: u32 = 1;
pub const POLICY_TARGET: &str = "1";

/// Self link the service assigns to a created group. The host is derived
/// from the lower-cased zone and the path from the account's tenant id.
pub fn group_href(zone: &str, tenant_id: &str, group_id: &str) -> String {
    format!(
        "https://{}.autoscale.api.rackspacecloud.com/v1.0/{tenant_id}/groups/{group_id}/",
        zone.to_ascii_lowercase()
    )
}

pub fn policy_href(zone: &str, tenant_id: &str, group_id: &str, policy_id: &str) -> String {
    format!(
        "{}policies/{policy_id}/",
        group_href(zone, tenant_id, group_id)
    )
}

fn string_map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

pub fn group_configuration() -> GroupConfiguration {
    GroupConfiguration {
        name: GROUP_NAME.to_string(),
        cooldown: GROUP_COOLDOWN,
        min_entities: GROUP_MIN_ENTITIES,
        max_entities: GROUP_MAX_ENTITIES,
        metadata: string_map(&[
            ("gc_meta_key_2", "gc_meta_value_2"),
            ("gc_meta_key_1", "gc_meta_value_1"),
        ]),
    }
}

/// Same bounds as the created group, with one extra metadata entry so the
/// replacement is observable.
pub fn updated_group_configuration() -> GroupConfiguration {
    let mut configuration = group_configuration();
    configuration
        .metadata
        .insert("gc_meta_key_3".to_string(), "gc_meta_value_3".to_string());
    configuration
}

fn launch_configuration_with_personality(path: &str) -> LaunchConfiguration {
    LaunchConfiguration {
        launch_type: LaunchConfigurationType::LaunchServer,
        server_name: SERVER_NAME.to_string(),
        server_image_ref: SERVER_IMAGE_REF.to_string(),
        server_flavor_ref: SERVER_FLAVOR_REF.to_string(),
        server_disk_config: Some(SERVER_DISK_CONFIG.to_string()),
        server_metadata: string_map(&[
            ("build_config", "core"),
            ("meta_key_1", "meta_value_1"),
            ("meta_key_2", "meta_value_2"),
        ]),
        networks: NETWORKS.iter().map(ToString::to_string).collect(),
        personalities: vec![Personality {
            path: path.to_string(),
            contents: PERSONALITY_CONTENTS.to_string(),
        }],
        load_balancers: vec![LoadBalancer {
            id: LOAD_BALANCER_ID,
            port: LOAD_BALANCER_PORT,
        }],
    }
}

pub fn launch_configuration() -> LaunchConfiguration {
    launch_configuration_with_personality(PERSONALITY_PATH)
}

pub fn updated_launch_configuration() -> LaunchConfiguration {
    launch_configuration_with_personality(UPDATED_PERSONALITY_PATH)
}

pub fn scaling_policies() -> Vec<CreateScalingPolicy> {
    vec![CreateScalingPolicy {
        name: POLICY_NAME.to_string(),
        cooldown: POLICY_COOLDOWN,
        policy_type: ScalingPolicyType::Webhook,
        target_type: ScalingPolicyTargetType::Incremental,
        target: POLICY_TARGET.to_string(),
        schedule: None,
    }]
}
