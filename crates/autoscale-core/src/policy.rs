use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;

use crate::group::Link;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalingPolicyType {
    Webhook,
    Schedule,
}

/// How `target` is applied when a policy executes. Each variant is carried
/// on the wire under its own key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalingPolicyTargetType {
    Incremental,
    PercentChange,
    DesiredCapacity,
}

impl ScalingPolicyTargetType {
    pub fn wire_key(&self) -> &'static str {
        match self {
            ScalingPolicyTargetType::Incremental => "change",
            ScalingPolicyTargetType::PercentChange => "changePercent",
            ScalingPolicyTargetType::DesiredCapacity => "desiredCapacity",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Schedule {
    Cron(String),
    At(DateTime<Utc>),
}

/// A policy as submitted on group creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateScalingPolicy {
    pub name: String,
    pub cooldown: u32,
    pub policy_type: ScalingPolicyType,
    pub target_type: ScalingPolicyTargetType,
    /// Numeric text in canonical form (`"1"`, `"-3"`, `"12.5"`). Forms the
    /// service would echo back differently, such as `"+1"` or `"10.0"`, are
    /// rejected when the policy is serialized.
    pub target: String,
    pub schedule: Option<Schedule>,
}

/// A policy as returned by the service, with its assigned id and links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScalingPolicy {
    pub id: String,
    pub links: Vec<Link>,
    pub policy: CreateScalingPolicy,
}

#[derive(Serialize, Deserialize)]
struct PolicyWire {
    name: String,
    cooldown: u32,
    #[serde(rename = "type")]
    policy_type: ScalingPolicyType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    change: Option<i64>,
    #[serde(
        rename = "changePercent",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    change_percent: Option<f64>,
    #[serde(
        rename = "desiredCapacity",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    desired_capacity: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    args: Option<ScheduleArgs>,
}

#[derive(Serialize, Deserialize)]
struct ScheduleArgs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cron: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    at: Option<DateTime<Utc>>,
}

#[derive(Serialize, Deserialize)]
struct ScalingPolicyWire {
    id: String,
    #[serde(default)]
    links: Vec<Link>,
    #[serde(flatten)]
    policy: PolicyWire,
}

impl TryFrom<&CreateScalingPolicy> for PolicyWire {
    type Error = String;

    fn try_from(policy: &CreateScalingPolicy) -> Result<Self, Self::Error> {
        let invalid = || {
            format!(
                "invalid target '{}' for {} policy '{}'",
                policy.target,
                policy.target_type.wire_key(),
                policy.name
            )
        };
        let target = policy.target.as_str();

        let mut wire = PolicyWire {
            name: policy.name.clone(),
            cooldown: policy.cooldown,
            policy_type: policy.policy_type,
            change: None,
            change_percent: None,
            desired_capacity: None,
            args: None,
        };
        match policy.target_type {
            ScalingPolicyTargetType::Incremental => {
                wire.change = Some(parse_canonical(target).ok_or_else(invalid)?);
            }
            ScalingPolicyTargetType::PercentChange => {
                let percent: f64 = parse_canonical(target).ok_or_else(invalid)?;
                if !percent.is_finite() {
                    return Err(invalid());
                }
                wire.change_percent = Some(percent);
            }
            ScalingPolicyTargetType::DesiredCapacity => {
                wire.desired_capacity = Some(parse_canonical(target).ok_or_else(invalid)?);
            }
        }

        wire.args = match (&policy.policy_type, &policy.schedule) {
            (ScalingPolicyType::Schedule, Some(Schedule::Cron(cron))) => Some(ScheduleArgs {
                cron: Some(cron.clone()),
                at: None,
            }),
            (ScalingPolicyType::Schedule, Some(Schedule::At(at))) => Some(ScheduleArgs {
                cron: None,
                at: Some(*at),
            }),
            (ScalingPolicyType::Schedule, None) => {
                return Err(format!(
                    "schedule policy '{}' requires a cron or at trigger",
                    policy.name
                ))
            }
            (ScalingPolicyType::Webhook, _) => None,
        };

        Ok(wire)
    }
}

/// Parses `target` only if formatting the parsed value gives back the same
/// text, so a create/get round trip leaves the target unchanged.
fn parse_canonical<T>(target: &str) -> Option<T>
where
    T: FromStr + ToString,
{
    let value: T = target.parse().ok()?;
    (value.to_string() == target).then_some(value)
}

impl TryFrom<PolicyWire> for CreateScalingPolicy {
    type Error = String;

    fn try_from(wire: PolicyWire) -> Result<Self, Self::Error> {
        let (target_type, target) =
            match (wire.change, wire.change_percent, wire.desired_capacity) {
                (Some(change), None, None) => {
                    (ScalingPolicyTargetType::Incremental, change.to_string())
                }
                (None, Some(percent), None) => {
                    (ScalingPolicyTargetType::PercentChange, percent.to_string())
                }
                (None, None, Some(capacity)) => {
                    (ScalingPolicyTargetType::DesiredCapacity, capacity.to_string())
                }
                _ => {
                    return Err(format!(
                        "policy '{}' must carry exactly one of change, changePercent, desiredCapacity",
                        wire.name
                    ))
                }
            };

        let schedule = match wire.policy_type {
            ScalingPolicyType::Webhook => None,
            ScalingPolicyType::Schedule => match wire.args {
                Some(ScheduleArgs {
                    cron: Some(cron),
                    at: None,
                }) => Some(Schedule::Cron(cron)),
                Some(ScheduleArgs {
                    cron: None,
                    at: Some(at),
                }) => Some(Schedule::At(at)),
                _ => {
                    return Err(format!(
                        "schedule policy '{}' must carry exactly one of args.cron, args.at",
                        wire.name
                    ))
                }
            },
        };

        Ok(Self {
            name: wire.name,
            cooldown: wire.cooldown,
            policy_type: wire.policy_type,
            target_type,
            target,
            schedule,
        })
    }
}

impl Serialize for CreateScalingPolicy {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        PolicyWire::try_from(self)
            .map_err(serde::ser::Error::custom)?
            .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for CreateScalingPolicy {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = PolicyWire::deserialize(deserializer)?;
        CreateScalingPolicy::try_from(wire).map_err(serde::de::Error::custom)
    }
}

impl Serialize for ScalingPolicy {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let wire = ScalingPolicyWire {
            id: self.id.clone(),
            links: self.links.clone(),
            policy: PolicyWire::try_from(&self.policy).map_err(serde::ser::Error::custom)?,
        };
        wire.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ScalingPolicy {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = ScalingPolicyWire::deserialize(deserializer)?;
        Ok(Self {
            id: wire.id,
            links: wire.links,
            policy: CreateScalingPolicy::try_from(wire.policy).map_err(serde::de::Error::custom)?,
        })
    }
}
