use crate::fixtures;
use crate::{CreatedGroups, LiveTestError};
use autoscale_client::{AutoscaleApi, GroupApi};
use autoscale_core::{Group, LinkRelation, ScalingPolicyTargetType, ScalingPolicyType};
use std::fmt::Debug;
use tracing::{error, info};

type SuiteResult = Result<(), LiveTestError>;
type TestFn = fn(&GroupApiLiveSuite) -> SuiteResult;

const TESTS: &[(&str, TestFn)] = &[
    ("get_group", GroupApiLiveSuite::test_get_group),
    ("get_state", GroupApiLiveSuite::test_get_state),
    ("list_groups", GroupApiLiveSuite::test_list_groups),
    (
        "get_group_configuration",
        GroupApiLiveSuite::test_get_group_configuration,
    ),
    (
        "get_launch_configuration",
        GroupApiLiveSuite::test_get_launch_configuration,
    ),
    (
        "update_launch_configuration",
        GroupApiLiveSuite::test_update_launch_configuration,
    ),
    (
        "update_group_configuration",
        GroupApiLiveSuite::test_update_group_configuration,
    ),
    ("pause_and_resume", GroupApiLiveSuite::test_pause_and_resume),
];

#[derive(Debug)]
pub struct TestOutcome {
    pub name: &'static str,
    pub result: SuiteResult,
}

#[derive(Debug, Default)]
pub struct SuiteReport {
    pub outcomes: Vec<TestOutcome>,
}

impl SuiteReport {
    pub fn passed(&self) -> bool {
        self.outcomes.iter().all(|outcome| outcome.result.is_ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = &TestOutcome> {
        self.outcomes.iter().filter(|outcome| outcome.result.is_err())
    }

    fn push(&mut self, name: &'static str, result: SuiteResult) {
        match &result {
            Ok(()) => info!(test = name, "passed"),
            Err(err) => error!(test = name, error = %err, "failed"),
        }
        self.outcomes.push(TestOutcome { name, result });
    }
}

/// Drives every group operation against each configured zone. Groups created
/// during setup are kept in the suite's own `CreatedGroups` and deleted by
/// `teardown`.
pub struct GroupApiLiveSuite {
    api: AutoscaleApi,
    created: CreatedGroups,
}

impl GroupApiLiveSuite {
    pub fn new(api: AutoscaleApi, created: CreatedGroups) -> Self {
        Self { api, created }
    }

    pub fn api(&self) -> &AutoscaleApi {
        &self.api
    }

    pub fn created(&self) -> &CreatedGroups {
        &self.created
    }

    /// Setup, every test in a fixed order, then teardown. Tests are skipped
    /// when setup fails; teardown always runs.
    pub fn run(&mut self) -> SuiteReport {
        let mut report = SuiteReport::default();

        let setup = self.setup();
        let setup_ok = setup.is_ok();
        report.push("setup", setup);

        if setup_ok {
            for &(name, test) in TESTS {
                report.push(name, test(self));
            }
        }

        report.push("teardown", self.teardown());
        report
    }

    pub fn setup(&mut self) -> SuiteResult {
        let zones = self.api.configured_zones().to_vec();
        let tenant_id = self.api.current_tenant_id().to_string();
        for zone in &zones {
            let group_api = self
                .api
                .group_api_for_zone(zone)
                .map_err(|e| LiveTestError::client(zone, e))?;
            let group = group_api
                .create(
                    &fixtures::group_configuration(),
                    &fixtures::launch_configuration(),
                    &fixtures::scaling_policies(),
                )
                .map_err(|e| LiveTestError::client(zone, e))?;
            self.created.record(zone, group.clone());

            check_created_group(zone, &tenant_id, &group)?;
            info!(zone = %zone, group_id = %group.id, "Created fixture group");
        }
        Ok(())
    }

    pub fn test_get_group(&self) -> SuiteResult {
        for zone in self.api.configured_zones() {
            let (group_api, group_id) = self.fixture_group(zone)?;
            let group = group_api
                .get(group_id)
                .map_err(|e| LiveTestError::client(zone, e))?;

            check_eq(zone, "group id", group.id.as_str(), group_id)?;
            check_eq(
                zone,
                "cooldown",
                group.group_configuration.cooldown,
                fixtures::GROUP_COOLDOWN,
            )?;
            check_eq(
                zone,
                "server name",
                group.launch_configuration.server_name.as_str(),
                fixtures::SERVER_NAME,
            )?;
            let policy = group
                .scaling_policies
                .first()
                .ok_or_else(|| LiveTestError::assertion(zone, "group has no scaling policy"))?;
            check_eq(
                zone,
                "policy name",
                policy.policy.name.as_str(),
                fixtures::POLICY_NAME,
            )?;
        }
        Ok(())
    }

    pub fn test_get_state(&self) -> SuiteResult {
        for zone in self.api.configured_zones() {
            let (group_api, group_id) = self.fixture_group(zone)?;
            let state = group_api
                .get_state(group_id)
                .map_err(|e| LiveTestError::client(zone, e))?;
            check(zone, state.id.is_none(), "state must not carry a group id")?;
        }
        Ok(())
    }

    pub fn test_list_groups(&self) -> SuiteResult {
        for zone in self.api.configured_zones() {
            let (group_api, group_id) = self.fixture_group(zone)?;
            let mut found = false;
            for state in group_api
                .list_group_states()
                .map_err(|e| LiveTestError::client(zone, e))?
            {
                let state = state.map_err(|e| LiveTestError::client(zone, e))?;
                if state.id.as_deref() == Some(group_id) {
                    found = true;
                    break;
                }
            }
            check(
                zone,
                found,
                format!("could not find known group id {group_id}"),
            )?;
        }
        Ok(())
    }

    pub fn test_get_group_configuration(&self) -> SuiteResult {
        for zone in self.api.configured_zones() {
            let (group_api, group_id) = self.fixture_group(zone)?;
            let configuration = group_api
                .get_group_configuration(group_id)
                .map_err(|e| LiveTestError::client(zone, e))?;
            check_eq(zone, "cooldown", configuration.cooldown, fixtures::GROUP_COOLDOWN)?;
            check_eq(
                zone,
                "max entities",
                configuration.max_entities,
                fixtures::GROUP_MAX_ENTITIES,
            )?;
            check_eq(
                zone,
                "min entities",
                configuration.min_entities,
                fixtures::GROUP_MIN_ENTITIES,
            )?;
        }
        Ok(())
    }

    pub fn test_get_launch_configuration(&self) -> SuiteResult {
        for zone in self.api.configured_zones() {
            let (group_api, group_id) = self.fixture_group(zone)?;
            let launch = group_api
                .get_launch_configuration(group_id)
                .map_err(|e| LiveTestError::client(zone, e))?;
            let port = launch.load_balancers.first().map(|lb| lb.port);
            check_eq(
                zone,
                "load balancer port",
                port,
                Some(fixtures::LOAD_BALANCER_PORT),
            )?;
            check_eq(
                zone,
                "launch type",
                launch.launch_type,
                fixtures::launch_configuration().launch_type,
            )?;
            check_eq(
                zone,
                "flavor ref",
                launch.server_flavor_ref.as_str(),
                fixtures::SERVER_FLAVOR_REF,
            )?;
        }
        Ok(())
    }

    pub fn test_update_launch_configuration(&self) -> SuiteResult {
        let replacement = fixtures::updated_launch_configuration();
        for zone in self.api.configured_zones() {
            let (group_api, group_id) = self.fixture_group(zone)?;
            let updated = group_api
                .update_launch_configuration(group_id, &replacement)
                .map_err(|e| LiveTestError::client(zone, e))?;
            check(zone, updated, "launch configuration update was not accepted")?;

            let current = group_api
                .get_launch_configuration(group_id)
                .map_err(|e| LiveTestError::client(zone, e))?;
            check_eq(zone, "launch configuration", &current, &replacement)?;
        }
        Ok(())
    }

    pub fn test_update_group_configuration(&self) -> SuiteResult {
        let replacement = fixtures::updated_group_configuration();
        for zone in self.api.configured_zones() {
            let (group_api, group_id) = self.fixture_group(zone)?;
            let updated = group_api
                .update_group_configuration(group_id, &replacement)
                .map_err(|e| LiveTestError::client(zone, e))?;
            check(zone, updated, "group configuration update was not accepted")?;

            let current = group_api
                .get_group_configuration(group_id)
                .map_err(|e| LiveTestError::client(zone, e))?;
            check_eq(zone, "group configuration", &current, &replacement)?;
        }
        Ok(())
    }

    pub fn test_pause_and_resume(&self) -> SuiteResult {
        for zone in self.api.configured_zones() {
            let (group_api, group_id) = self.fixture_group(zone)?;
            let paused = group_api
                .pause(group_id)
                .map_err(|e| LiveTestError::client(zone, e))?;
            check(zone, paused, "pause was not accepted")?;

            let resumed = group_api
                .resume(group_id)
                .map_err(|e| LiveTestError::client(zone, e))?;
            check(zone, resumed, "resume was not accepted")?;
        }
        Ok(())
    }

    /// Deletes every recorded group. The first delete that fails or reports
    /// the group missing aborts the remaining deletions.
    pub fn teardown(&mut self) -> SuiteResult {
        let zones = self.api.configured_zones().to_vec();
        for zone in &zones {
            let group_api = self
                .api
                .group_api_for_zone(zone)
                .map_err(|e| LiveTestError::client(zone, e))?;
            let ids: Vec<String> = self
                .created
                .groups(zone)
                .iter()
                .map(|group| group.id.clone())
                .collect();

            for group_id in ids {
                match group_api.delete(&group_id) {
                    Ok(true) => {
                        info!(zone = %zone, group_id = %group_id, "Deleted fixture group");
                        self.created.remove(zone, &group_id);
                    }
                    Ok(false) => {
                        return Err(LiveTestError::Teardown {
                            zone: zone.clone(),
                            message: format!("could not delete autoscale group {group_id}"),
                        })
                    }
                    Err(err) => {
                        return Err(LiveTestError::Teardown {
                            zone: zone.clone(),
                            message: format!("deleting autoscale group {group_id}: {err}"),
                        })
                    }
                }
            }
        }
        Ok(())
    }

    fn group_api(&self, zone: &str) -> Result<&GroupApi, LiveTestError> {
        self.api
            .group_api_for_zone(zone)
            .map_err(|e| LiveTestError::client(zone, e))
    }

    fn fixture_group(&self, zone: &str) -> Result<(&GroupApi, &str), LiveTestError> {
        let group = self
            .created
            .first(zone)
            .ok_or_else(|| LiveTestError::assertion(zone, "no group was created in setup"))?;
        Ok((self.group_api(zone)?, group.id.as_str()))
    }
}

fn check_created_group(zone: &str, tenant_id: &str, group: &Group) -> SuiteResult {
    check(zone, !group.id.is_empty(), "created group has no id")?;
    let group_href = fixtures::group_href(zone, tenant_id, &group.id);
    check_eq(zone, "group link count", group.links.len(), 1)?;
    check_eq(zone, "group link relation", group.links[0].rel, LinkRelation::SelfLink)?;
    check_eq(zone, "group link", group.links[0].href.as_str(), group_href.as_str())?;

    let policy = group
        .scaling_policies
        .first()
        .ok_or_else(|| LiveTestError::assertion(zone, "created group has no scaling policy"))?;
    check(zone, !policy.id.is_empty(), "created policy has no id")?;
    check_eq(zone, "policy link count", policy.links.len(), 1)?;
    check_eq(zone, "policy link relation", policy.links[0].rel, LinkRelation::SelfLink)?;
    check_eq(
        zone,
        "policy link",
        policy.links[0].href.as_str(),
        fixtures::policy_href(zone, tenant_id, &group.id, &policy.id).as_str(),
    )?;
    check_eq(zone, "policy cooldown", policy.policy.cooldown, fixtures::POLICY_COOLDOWN)?;
    check_eq(zone, "policy target", policy.policy.target.as_str(), fixtures::POLICY_TARGET)?;
    check_eq(
        zone,
        "policy target type",
        policy.policy.target_type,
        ScalingPolicyTargetType::Incremental,
    )?;
    check_eq(zone, "policy type", policy.policy.policy_type, ScalingPolicyType::Webhook)?;
    check_eq(zone, "policy name", policy.policy.name.as_str(), fixtures::POLICY_NAME)?;

    let expected = fixtures::launch_configuration();
    let launch = &group.launch_configuration;
    check_eq(zone, "load balancers", &launch.load_balancers, &expected.load_balancers)?;
    check_eq(zone, "server name", &launch.server_name, &expected.server_name)?;
    check(
        zone,
        !launch.server_image_ref.is_empty(),
        "server image ref is empty",
    )?;
    check_eq(zone, "flavor ref", &launch.server_flavor_ref, &expected.server_flavor_ref)?;
    check_eq(zone, "disk config", &launch.server_disk_config, &expected.server_disk_config)?;
    check_eq(zone, "personalities", &launch.personalities, &expected.personalities)?;
    check_eq(zone, "networks", &launch.networks, &expected.networks)?;
    check_eq(zone, "server metadata", &launch.server_metadata, &expected.server_metadata)?;
    check_eq(zone, "launch type", launch.launch_type, expected.launch_type)?;

    check_eq(
        zone,
        "group configuration",
        &group.group_configuration,
        &fixtures::group_configuration(),
    )
}

fn check(zone: &str, condition: bool, message: impl Into<String>) -> SuiteResult {
    if condition {
        Ok(())
    } else {
        Err(LiveTestError::assertion(zone, message))
    }
}

fn check_eq<T: PartialEq + Debug>(zone: &str, what: &str, actual: T, expected: T) -> SuiteResult {
    check(
        zone,
        actual == expected,
        format!("{what}: expected {expected:?}, got {actual:?}"),
    )
}
