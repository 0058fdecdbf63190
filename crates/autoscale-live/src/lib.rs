pub mod fixtures;
pub mod suite;

use autoscale_core::{AutoscaleError, Group};
use std::collections::HashMap;
use thiserror::Error;

pub use suite::{GroupApiLiveSuite, SuiteReport, TestOutcome};

#[derive(Debug, Error)]
pub enum LiveTestError {
    #[error("[{zone}] assertion failed: {message}")]
    Assertion { zone: String, message: String },
    #[error("[{zone}] client call failed: {source}")]
    Client {
        zone: String,
        #[source]
        source: AutoscaleError,
    },
    #[error("[{zone}] teardown failed: {message}")]
    Teardown { zone: String, message: String },
}

impl LiveTestError {
    pub fn assertion(zone: &str, message: impl Into<String>) -> Self {
        LiveTestError::Assertion {
            zone: zone.to_string(),
            message: message.into(),
        }
    }

    pub fn client(zone: &str, source: AutoscaleError) -> Self {
        LiveTestError::Client {
            zone: zone.to_string(),
            source,
        }
    }
}

/// Groups created by a suite run, per zone, in creation order.
#[derive(Debug, Clone, Default)]
pub struct CreatedGroups {
    by_zone: HashMap<String, Vec<Group>>,
}

impl CreatedGroups {
    pub fn record(&mut self, zone: &str, group: Group) {
        self.by_zone.entry(zone.to_string()).or_default().push(group);
    }

    pub fn groups(&self, zone: &str) -> &[Group] {
        self.by_zone.get(zone).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn first(&self, zone: &str) -> Option<&Group> {
        self.groups(zone).first()
    }

    pub fn remove(&mut self, zone: &str, group_id: &str) {
        if let Some(groups) = self.by_zone.get_mut(zone) {
            groups.retain(|group| group.id != group_id);
            if groups.is_empty() {
                self.by_zone.remove(zone);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.by_zone.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(id: &str) -> Group {
        Group {
            id: id.to_string(),
            links: vec![],
            group_configuration: fixtures::group_configuration(),
            launch_configuration: fixtures::launch_configuration(),
            scaling_policies: vec![],
        }
    }

    #[test]
    fn test_created_groups_track_per_zone() {
        let mut created = CreatedGroups::default();
        created.record("DFW", group("a"));
        created.record("DFW", group("b"));
        created.record("ORD", group("c"));

        assert_eq!(created.len(), 3);
        assert_eq!(created.first("DFW").map(|g| g.id.as_str()), Some("a"));
        assert!(created.groups("IAD").is_empty());

        created.remove("DFW", "a");
        created.remove("ORD", "c");
        assert_eq!(created.groups("DFW").len(), 1);
        assert!(created.first("ORD").is_none());
        assert_eq!(created.len(), 1);
    }

    #[test]
    fn test_error_display_names_zone() {
        let err = LiveTestError::client("ORD", AutoscaleError::NotFound("group x".to_string()));
        assert_eq!(
            err.to_string(),
            "[ORD] client call failed: Not found: group x"
        );
    }
}
